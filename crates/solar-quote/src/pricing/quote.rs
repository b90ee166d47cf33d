use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::catalog::{CatalogDocument, Phase, ProductFamily};
use super::estimates::{self, SavingsEstimate};
use super::ids::VariantId;

/// System types a customer can tick on the quote form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemType {
    Solar,
    Battery,
    #[serde(alias = "ev_charger")]
    Ev,
    /// Tags this service does not price, such as legacy form options.
    #[serde(other)]
    Other,
}

impl SystemType {
    fn family(&self) -> Option<ProductFamily> {
        match self {
            SystemType::Solar => Some(ProductFamily::Solar),
            SystemType::Battery => Some(ProductFamily::Battery),
            SystemType::Ev => Some(ProductFamily::EvCharger),
            SystemType::Other => None,
        }
    }
}

fn default_power_supply() -> Phase {
    Phase::SinglePhase
}

// The form posts whatever state it is in, so malformed fields degrade to
// "nothing chosen" instead of failing the request.

fn lenient_systems<'de, D>(deserializer: D) -> Result<Vec<SystemType>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => Some(raw),
        _ => None,
    })
}

fn lenient_phase<'de, D>(deserializer: D) -> Result<Phase, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => serde_json::from_value(Value::String(raw.trim().to_string()))
            .unwrap_or_else(|_| default_power_supply()),
        _ => default_power_supply(),
    })
}

/// In-progress selections sent by the quote form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSelection {
    #[serde(default, deserialize_with = "lenient_systems")]
    pub selected_systems: Vec<SystemType>,
    #[serde(default, deserialize_with = "lenient_identifier")]
    pub solar_package: Option<String>,
    #[serde(default, deserialize_with = "lenient_identifier")]
    pub battery_system: Option<String>,
    #[serde(default, deserialize_with = "lenient_identifier")]
    pub ev_charger: Option<String>,
    #[serde(
        default = "default_power_supply",
        deserialize_with = "lenient_phase"
    )]
    pub power_supply: Phase,
}

impl PricingSelection {
    fn identifier_for(&self, system: SystemType) -> Option<&str> {
        let chosen = match system {
            SystemType::Solar => self.solar_package.as_deref(),
            SystemType::Battery => self.battery_system.as_deref(),
            SystemType::Ev => self.ev_charger.as_deref(),
            SystemType::Other => None,
        };
        chosen.map(str::trim).filter(|value| !value.is_empty())
    }

    fn wants(&self, system: SystemType) -> bool {
        self.selected_systems.contains(&system)
    }
}

/// Catalog option resolved for one selected system.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotedProduct {
    pub id: VariantId,
    pub product_type: ProductFamily,
    pub brand: String,
    pub brand_key: String,
    pub model: Option<String>,
    /// kW for solar and EV chargers, kWh for batteries.
    pub size: f64,
    pub price: f64,
    pub rrp: f64,
    pub rebate: f64,
    pub discount: Option<f64>,
    pub warranty_years: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectedProducts {
    pub solar: Option<QuotedProduct>,
    pub battery: Option<QuotedProduct>,
    pub ev: Option<QuotedProduct>,
}

/// The figures a quote record stores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTotals {
    pub total_price: f64,
    pub rebate_amount: f64,
    pub final_price: f64,
}

/// Priced response for the quote form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    pub total_price: f64,
    pub rebate_amount: f64,
    pub final_price: f64,
    pub breakdown: SelectedProducts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimates: Option<SavingsEstimate>,
}

impl PricingBreakdown {
    pub fn totals(&self) -> QuoteTotals {
        QuoteTotals {
            total_price: self.total_price,
            rebate_amount: self.rebate_amount,
            final_price: self.final_price,
        }
    }
}

/// Raised only by submission-time pricing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("{system:?} was selected without choosing a product")]
    MissingSelection { system: SystemType },
    #[error("{system:?} selection '{identifier}' does not match any {phase} product")]
    UnresolvedSelection {
        system: SystemType,
        identifier: String,
        phase: Phase,
    },
}

const PRICED_SYSTEMS: [SystemType; 3] = [SystemType::Solar, SystemType::Battery, SystemType::Ev];

fn resolve(
    catalog: &CatalogDocument,
    phase: Phase,
    family: ProductFamily,
    identifier: &str,
) -> Option<QuotedProduct> {
    let location = catalog.locate(identifier, &[phase], &[family])?;
    let variant = catalog.variant_at(&location)?;
    let profile = catalog.brand_profile(location.phase, location.family, &location.brand_key)?;

    Some(QuotedProduct {
        id: variant.id().clone(),
        product_type: family,
        brand: profile.brand,
        brand_key: location.brand_key,
        model: profile.model,
        size: variant.size(),
        price: variant.price_after_rebate(),
        rrp: variant.rrp(),
        rebate: variant.recorded_rebate().unwrap_or(0.0),
        discount: variant.discount(),
        warranty_years: profile.warranty_years,
    })
}

/// Price the selection against the catalog.
///
/// Selected systems without a chosen product, and identifiers that no longer
/// resolve, contribute nothing. This is called on every form change, so it
/// never fails on selection problems.
pub fn calculate_pricing(
    catalog: &CatalogDocument,
    selection: &PricingSelection,
) -> PricingBreakdown {
    let mut breakdown = SelectedProducts::default();

    for system in PRICED_SYSTEMS {
        if !selection.wants(system) {
            continue;
        }
        let (Some(family), Some(identifier)) = (system.family(), selection.identifier_for(system))
        else {
            continue;
        };

        let resolved = resolve(catalog, selection.power_supply, family, identifier);
        match system {
            SystemType::Solar => breakdown.solar = resolved,
            SystemType::Battery => breakdown.battery = resolved,
            SystemType::Ev => breakdown.ev = resolved,
            SystemType::Other => {}
        }
    }

    let resolved: Vec<&QuotedProduct> = [&breakdown.solar, &breakdown.battery, &breakdown.ev]
        .into_iter()
        .flatten()
        .collect();
    let subtotal: f64 = resolved.iter().map(|item| item.price).sum();
    let rebates_total: f64 = resolved.iter().map(|item| item.rebate).sum();
    let final_price = subtotal - rebates_total;

    let estimates = estimates::estimate(
        breakdown.solar.as_ref().map(|item| item.size),
        breakdown.battery.as_ref().map(|item| item.size),
        final_price,
    );

    PricingBreakdown {
        total_price: subtotal,
        rebate_amount: rebates_total,
        final_price,
        breakdown,
        estimates,
    }
}

/// Price a final submission, refusing selections that would silently
/// become a zero line item.
pub fn calculate_submission_pricing(
    catalog: &CatalogDocument,
    selection: &PricingSelection,
) -> Result<PricingBreakdown, PricingError> {
    let priced = calculate_pricing(catalog, selection);

    for system in PRICED_SYSTEMS {
        if !selection.wants(system) {
            continue;
        }
        let Some(identifier) = selection.identifier_for(system) else {
            return Err(PricingError::MissingSelection { system });
        };
        let resolved = match system {
            SystemType::Solar => priced.breakdown.solar.is_some(),
            SystemType::Battery => priced.breakdown.battery.is_some(),
            SystemType::Ev => priced.breakdown.ev.is_some(),
            SystemType::Other => true,
        };
        if !resolved {
            return Err(PricingError::UnresolvedSelection {
                system,
                identifier: identifier.to_string(),
                phase: selection.power_supply,
            });
        }
    }

    Ok(priced)
}
