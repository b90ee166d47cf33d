//! Government incentive formulas for solar and battery systems.
//!
//! These are formula evaluators only: callers reject negative or malformed
//! sizes before reaching them.

mod config;
mod rules;

pub use config::{BatteryRebateRules, RebateRules, SolarRebateRules};
pub use rules::BatteryRebate;

use chrono::{Datelike, Local};

/// Stateless calculator bound to one set of rebate constants.
#[derive(Debug, Clone)]
pub struct RebateCalculator {
    rules: RebateRules,
}

impl RebateCalculator {
    pub fn new(rules: RebateRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RebateRules {
        &self.rules
    }

    /// STC rebate for a system installed this calendar year.
    pub fn calculate_solar_rebate(&self, size_kw: f64) -> f64 {
        self.solar_rebate_in_year(size_kw, Local::now().year())
    }

    pub fn solar_rebate_in_year(&self, size_kw: f64, year: i32) -> f64 {
        rules::solar_rebate(size_kw, &self.rules.solar, year)
    }

    pub fn calculate_battery_rebate(
        &self,
        capacity_kwh: f64,
        is_excluded_brand: bool,
    ) -> BatteryRebate {
        rules::battery_rebate(capacity_kwh, is_excluded_brand, &self.rules.battery)
    }

    /// Whether a battery brand is carved out of the state scheme, either by
    /// its own catalog flag or by the rule block's exclusion list.
    pub fn is_excluded_brand(&self, brand_key: &str, flagged: bool) -> bool {
        flagged
            || self
                .rules
                .battery
                .excluded_brands
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(brand_key))
    }
}
