use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use solar_quote::pricing::{CatalogService, FileCatalogStore, Phase, SystemType};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type FileCatalogService = CatalogService<FileCatalogStore>;

pub(crate) fn file_catalog_service(path: &Path) -> Arc<FileCatalogService> {
    let store = Arc::new(FileCatalogStore::new(path));
    Arc::new(CatalogService::new(store))
}

fn parse_tag<T: DeserializeOwned>(raw: &str, expected: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string()))
        .map_err(|_| format!("'{raw}' is not a valid {expected}"))
}

pub(crate) fn parse_phase(raw: &str) -> Result<Phase, String> {
    parse_tag(raw, "phase (single_phase or three_phase)")
}

pub(crate) fn parse_system(raw: &str) -> Result<SystemType, String> {
    match parse_tag(raw, "system (solar, battery, or ev)")? {
        SystemType::Other => Err(format!("'{raw}' is not a priced system")),
        system => Ok(system),
    }
}

pub(crate) fn parse_non_negative(raw: &str) -> Result<f64, String> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(format!("'{raw}' is not a non-negative number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_phase_aliases() {
        assert_eq!(parse_phase("three"), Ok(Phase::ThreePhase));
        assert_eq!(parse_phase(" single_phase "), Ok(Phase::SinglePhase));
        assert!(parse_phase("split").is_err());
    }

    #[test]
    fn rejects_unpriced_systems() {
        assert_eq!(parse_system("ev_charger"), Ok(SystemType::Ev));
        assert!(parse_system("hot_water").is_err());
    }

    #[test]
    fn rejects_negative_or_non_numeric_sizes() {
        assert_eq!(parse_non_negative("6.6"), Ok(6.6));
        assert_eq!(parse_non_negative("0"), Ok(0.0));
        assert!(parse_non_negative("-1").is_err());
        assert!(parse_non_negative("NaN").is_err());
        assert!(parse_non_negative("ten").is_err());
    }
}
