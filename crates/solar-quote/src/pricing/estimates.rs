//! Coarse savings, payback, and emissions figures for the quote summary.
//!
//! The tables below are illustrative, not precise: they are keyed by
//! approximate package size and ignore the household's real consumption,
//! tariff, orientation, and shading. They exist so the form can show a
//! ballpark next to the price.

use serde::Serialize;

/// (upper bound kW, annual savings, tonnes CO2 avoided per year)
const SOLAR_TABLE: &[(f64, f64, f64)] = &[
    (5.0, 1_200.0, 6.5),
    (6.6, 1_500.0, 8.6),
    (8.0, 1_800.0, 10.4),
    (10.0, 2_200.0, 13.0),
    (13.2, 2_700.0, 17.2),
];
const SOLAR_LARGEST: (f64, f64) = (3_200.0, 20.0);

/// (upper bound kWh, annual savings, tonnes CO2 avoided per year)
const BATTERY_TABLE: &[(f64, f64, f64)] = &[
    (5.0, 500.0, 0.8),
    (10.0, 800.0, 1.4),
    (13.5, 1_000.0, 1.9),
];
const BATTERY_LARGEST: (f64, f64) = (1_200.0, 2.3);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsEstimate {
    pub annual_savings: f64,
    /// `None` when there are no savings to pay the system back.
    pub payback_years: Option<f64>,
    pub co2_reduction_tonnes: f64,
}

fn lookup(table: &[(f64, f64, f64)], largest: (f64, f64), size: f64) -> (f64, f64) {
    table
        .iter()
        .find(|(upper, _, _)| size <= *upper)
        .map(|(_, savings, co2)| (*savings, *co2))
        .unwrap_or(largest)
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Estimate for the resolved solar and battery sizes against the final price.
pub fn estimate(
    solar_kw: Option<f64>,
    battery_kwh: Option<f64>,
    final_price: f64,
) -> Option<SavingsEstimate> {
    if solar_kw.is_none() && battery_kwh.is_none() {
        return None;
    }

    let (solar_savings, solar_co2) = solar_kw
        .map(|size| lookup(SOLAR_TABLE, SOLAR_LARGEST, size))
        .unwrap_or((0.0, 0.0));
    let (battery_savings, battery_co2) = battery_kwh
        .map(|size| lookup(BATTERY_TABLE, BATTERY_LARGEST, size))
        .unwrap_or((0.0, 0.0));

    let annual_savings = solar_savings + battery_savings;
    let payback_years =
        (annual_savings > 0.0).then(|| one_decimal(final_price.max(0.0) / annual_savings));

    Some(SavingsEstimate {
        annual_savings,
        payback_years,
        co2_reduction_tonnes: one_decimal(solar_co2 + battery_co2),
    })
}
