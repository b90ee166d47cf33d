use serde::{Deserialize, Serialize};
use serde_json::Map;

use super::catalog::{
    BatteryOption, BrandUpdate, EvChargerOption, InverterOption, Phase, ProductFamily,
    SolarPackage, Variant,
};
use super::ids::{brand_slug, VariantId};

/// Admin form payload describing one priced option and where it belongs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub phase: Phase,
    pub brand: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub warranty_years: Option<u32>,
    #[serde(default)]
    pub performance_warranty_years: Option<u32>,
    #[serde(default)]
    pub chemistry: Option<String>,
    #[serde(default)]
    pub requires_hybrid_inverter: Option<bool>,
    #[serde(default)]
    pub state_rebate_excluded: Option<bool>,
    pub price_after_rebate: f64,
    #[serde(default)]
    pub rrp: Option<f64>,
    #[serde(flatten)]
    pub spec: ProductSpec,
}

/// Family-specific sizing fields, selected by `productType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "productType",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ProductSpec {
    Solar {
        size_kw: f64,
        #[serde(default)]
        panel_count: Option<u32>,
        #[serde(default)]
        panel_watts: Option<u32>,
        #[serde(default)]
        rebate: Option<f64>,
    },
    Inverter {
        power_kw: f64,
    },
    Battery {
        capacity_kwh: f64,
        #[serde(default)]
        power_kw: Option<f64>,
        #[serde(default)]
        rebate: Option<f64>,
    },
    #[serde(rename = "ev", alias = "ev_charger")]
    EvCharger {
        power_kw: f64,
    },
}

impl ProductInput {
    pub fn family(&self) -> ProductFamily {
        match self.spec {
            ProductSpec::Solar { .. } => ProductFamily::Solar,
            ProductSpec::Inverter { .. } => ProductFamily::Inverter,
            ProductSpec::Battery { .. } => ProductFamily::Battery,
            ProductSpec::EvCharger { .. } => ProductFamily::EvCharger,
        }
    }

    pub fn brand_key(&self) -> String {
        brand_slug(&self.brand)
    }

    pub fn size(&self) -> f64 {
        match self.spec {
            ProductSpec::Solar { size_kw, .. } => size_kw,
            ProductSpec::Inverter { power_kw } | ProductSpec::EvCharger { power_kw } => power_kw,
            ProductSpec::Battery { capacity_kwh, .. } => capacity_kwh,
        }
    }

    /// Rebate supplied by the form, if any.
    pub fn rebate(&self) -> Option<f64> {
        match self.spec {
            ProductSpec::Solar { rebate, .. } | ProductSpec::Battery { rebate, .. } => rebate,
            ProductSpec::Inverter { .. } | ProductSpec::EvCharger { .. } => None,
        }
    }

    /// Brand metadata the form carries; absent fields keep stored values.
    pub fn brand_update(&self) -> BrandUpdate {
        BrandUpdate {
            brand: self.brand.trim().to_string(),
            model: self.model.clone(),
            warranty_years: self.warranty_years,
            performance_warranty_years: self.performance_warranty_years,
            requires_hybrid_inverter: self.requires_hybrid_inverter,
            chemistry: self.chemistry.clone(),
            state_rebate_excluded: self.state_rebate_excluded,
        }
    }

    /// Reject payloads that would write a nonsensical option.
    pub fn validate(&self) -> Result<(), String> {
        if self.brand_key().is_empty() {
            return Err("brand must contain at least one letter or digit".to_string());
        }

        let size = self.size();
        if !size.is_finite() || size <= 0.0 {
            return Err(format!(
                "{} size must be a positive number, got {size}",
                self.family()
            ));
        }

        if !self.price_after_rebate.is_finite() || self.price_after_rebate < 0.0 {
            return Err("priceAfterRebate must be zero or more".to_string());
        }

        if let Some(rrp) = self.rrp {
            if !rrp.is_finite() || rrp < 0.0 {
                return Err("rrp must be zero or more".to_string());
            }
        }

        if let ProductSpec::Battery {
            power_kw: Some(power_kw),
            ..
        } = self.spec
        {
            if !power_kw.is_finite() || power_kw <= 0.0 {
                return Err("battery powerKw must be a positive number".to_string());
            }
        }

        Ok(())
    }

    /// Build the catalog record under `id`, recording `rebate` for the
    /// families that carry one.
    pub fn to_variant(&self, id: VariantId, rebate: Option<f64>) -> Variant {
        match self.spec {
            ProductSpec::Solar {
                size_kw,
                panel_count,
                panel_watts,
                ..
            } => Variant::Solar(SolarPackage {
                id,
                size_kw,
                panel_count,
                panel_watts,
                price_after_rebate: self.price_after_rebate,
                rrp: self.rrp,
                rebate,
                extra: Map::new(),
            }),
            ProductSpec::Inverter { power_kw } => Variant::Inverter(InverterOption {
                id,
                power_kw,
                price_after_rebate: self.price_after_rebate,
                rrp: self.rrp,
                extra: Map::new(),
            }),
            ProductSpec::Battery {
                capacity_kwh,
                power_kw,
                ..
            } => Variant::Battery(BatteryOption {
                id,
                capacity_kwh,
                power_kw,
                price_after_rebate: self.price_after_rebate,
                rrp: self.rrp,
                rebate,
                extra: Map::new(),
            }),
            ProductSpec::EvCharger { power_kw } => Variant::EvCharger(EvChargerOption {
                id,
                power_kw,
                price_after_rebate: self.price_after_rebate,
                rrp: self.rrp,
                extra: Map::new(),
            }),
        }
    }
}
