use super::config::{BatteryRebateRules, SolarRebateRules};
use serde::Serialize;

/// Years of generation the certificate scheme still credits.
pub(crate) fn deeming_period_years(scheme_end_year: i32, current_year: i32) -> i32 {
    (scheme_end_year - current_year).max(1)
}

pub(crate) fn solar_rebate(size_kw: f64, rules: &SolarRebateRules, current_year: i32) -> f64 {
    let years = deeming_period_years(rules.scheme_end_year, current_year);
    (size_kw * f64::from(years) * rules.zone_rating * rules.stc_price).round()
}

/// Battery incentive split into its state and national components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryRebate {
    pub state: f64,
    pub national: f64,
    pub total: f64,
}

pub(crate) fn battery_rebate(
    capacity_kwh: f64,
    is_excluded_brand: bool,
    rules: &BatteryRebateRules,
) -> BatteryRebate {
    let state = if is_excluded_brand {
        0.0
    } else {
        capacity_kwh.min(rules.state_max_eligible_kwh) * rules.state_per_kwh
    };
    // one certificate per whole kWh
    let national = capacity_kwh.floor() * rules.national_per_certificate;

    BatteryRebate {
        state,
        national,
        total: state + national,
    }
}
