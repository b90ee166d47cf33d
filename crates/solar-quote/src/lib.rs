//! Pricing catalog, rebate calculator, and quote aggregation for residential
//! solar, battery, and EV charger installations.

pub mod config;
pub mod error;
pub mod pricing;
pub mod telemetry;

pub use error::AppError;
