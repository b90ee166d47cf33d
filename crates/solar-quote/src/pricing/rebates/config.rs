use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Incentive constants stored in the catalog's `rebates` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RebateRules {
    #[serde(default)]
    pub solar: SolarRebateRules,
    #[serde(default)]
    pub battery: BatteryRebateRules,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Small-scale Technology Certificate parameters for rooftop solar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarRebateRules {
    pub stc_price: f64,
    pub zone_rating: f64,
    pub scheme_end_year: i32,
}

impl Default for SolarRebateRules {
    fn default() -> Self {
        Self {
            stc_price: 38.0,
            zone_rating: 1.382,
            scheme_end_year: 2031,
        }
    }
}

/// State per-kWh scheme plus the national certificate estimate for batteries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryRebateRules {
    pub state_per_kwh: f64,
    pub state_max_eligible_kwh: f64,
    pub national_per_certificate: f64,
    /// Brand keys never eligible for the state component.
    pub excluded_brands: Vec<String>,
}

impl Default for BatteryRebateRules {
    fn default() -> Self {
        Self {
            state_per_kwh: 130.0,
            state_max_eligible_kwh: 10.0,
            national_per_certificate: 372.0,
            excluded_brands: vec!["tesla".to_string()],
        }
    }
}
