//! Product catalog, rebate formulas, and quote pricing.
//!
//! The catalog is one JSON document holding every brand and priced option
//! for both electrical phases. [`CatalogService`] owns all access to it:
//! reads come from a cached parse, and every mutation rewrites the whole
//! document through a [`CatalogStore`] before the cache is dropped.

pub mod catalog;
pub mod estimates;
pub mod export;
pub mod ids;
pub mod product;
pub mod quote;
pub mod rebates;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use catalog::{
    BatteryOption, BrandEntry, BrandProfile, BrandUpdate, CatalogDocument, EvChargerOption,
    FlatVariant, InverterOption, Phase, PhaseSection, ProductFamily, SolarPackage, Variant,
    VariantLocation,
};
pub use estimates::SavingsEstimate;
pub use export::{export_to_path, write_csv, CatalogExportError};
pub use ids::{brand_slug, VariantId};
pub use product::{ProductInput, ProductSpec};
pub use quote::{
    calculate_pricing, calculate_submission_pricing, PricingBreakdown, PricingError,
    PricingSelection, QuoteTotals, QuotedProduct, SelectedProducts, SystemType,
};
pub use rebates::{BatteryRebate, RebateCalculator, RebateRules};
pub use router::pricing_router;
pub use service::{CatalogError, CatalogService, IdMigration, MinimumPrices};
pub use store::{CatalogStore, FileCatalogStore, StoreError};
