use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::to_bytes;
use axum::response::Response;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::pricing::catalog::CatalogDocument;
use crate::pricing::service::CatalogService;
use crate::pricing::store::{CatalogStore, StoreError};

pub(super) const JINKO_6_6: &str = "0b6f7c1e-2d4a-4f7e-9c1a-5e8d2b3a6f01";
pub(super) const JINKO_10: &str = "0b6f7c1e-2d4a-4f7e-9c1a-5e8d2b3a6f02";
pub(super) const BYD_10: &str = "0b6f7c1e-2d4a-4f7e-9c1a-5e8d2b3a6f03";
pub(super) const TESLA_13_5: &str = "0b6f7c1e-2d4a-4f7e-9c1a-5e8d2b3a6f04";
pub(super) const ZAPPI_7: &str = "0b6f7c1e-2d4a-4f7e-9c1a-5e8d2b3a6f05";
pub(super) const SUNGROW_5: &str = "0b6f7c1e-2d4a-4f7e-9c1a-5e8d2b3a6f06";
pub(super) const JINKO_THREE_6_6: &str = "0b6f7c1e-2d4a-4f7e-9c1a-5e8d2b3a6f07";
pub(super) const ZAPPI_THREE_22: &str = "0b6f7c1e-2d4a-4f7e-9c1a-5e8d2b3a6f08";

/// Catalog where every option already carries a UUID.
pub(super) fn catalog_document() -> CatalogDocument {
    serde_json::from_value(json!({
        "version": "2025.3",
        "lastUpdated": "2025-03-01T00:00:00Z",
        "single_phase": {
            "solar_panels": {
                "jinko": {
                    "brand": "Jinko",
                    "model": "Tiger Neo",
                    "warranty_years": 25,
                    "performance_warranty_years": 30,
                    "options": [
                        { "id": JINKO_6_6, "size_kw": 6.6, "panel_count": 15, "panel_watts": 440,
                          "price_after_rebate": 7078.0, "rrp": 9166.0, "rebate": 2088.0 },
                        { "id": JINKO_10, "size_kw": 10.0, "panel_count": 23, "panel_watts": 440,
                          "price_after_rebate": 9990.0, "rrp": 13154.0, "rebate": 3164.0 }
                    ]
                }
            },
            "hybrid_inverters": {
                "sungrow": {
                    "brand": "Sungrow",
                    "warranty_years": 10,
                    "options": [
                        { "id": SUNGROW_5, "power_kw": 5.0, "price_after_rebate": 2490.0 }
                    ]
                }
            },
            "batteries": {
                "byd": {
                    "brand": "BYD",
                    "model": "HVM",
                    "chemistry": "LFP",
                    "warranty_years": 10,
                    "requires_hybrid_inverter": true,
                    "options": [
                        { "id": BYD_10, "capacity_kwh": 10.0, "power_kw": 5.0,
                          "price_after_rebate": 9490.0, "rrp": 12490.0, "rebate": 3000.0 }
                    ]
                },
                "tesla": {
                    "brand": "Tesla",
                    "model": "Powerwall 3",
                    "state_rebate_excluded": true,
                    "options": [
                        { "id": TESLA_13_5, "capacity_kwh": 13.5, "power_kw": 11.5,
                          "price_after_rebate": 14990.0, "rrp": 16990.0 }
                    ]
                }
            },
            "ev_chargers": {
                "zappi": {
                    "brand": "Zappi",
                    "options": [
                        { "id": ZAPPI_7, "power_kw": 7.0, "price_after_rebate": 1990.0, "rrp": 2290.0 }
                    ]
                }
            }
        },
        "three_phase": {
            "solar_panels": {
                "jinko": {
                    "brand": "Jinko",
                    "options": [
                        { "id": JINKO_THREE_6_6, "size_kw": 6.6, "price_after_rebate": 7578.0, "rebate": 2088.0 }
                    ]
                }
            },
            "ev_chargers": {
                "zappi": {
                    "brand": "Zappi",
                    "options": [
                        { "id": ZAPPI_THREE_22, "power_kw": 22.0, "price_after_rebate": 2690.0 }
                    ]
                }
            }
        },
        "trade_in": { "enabled": false }
    }))
    .expect("fixture catalog parses")
}

/// Catalog from before identifiers were UUIDs: one slug, one missing, one
/// duplicated UUID.
pub(super) fn legacy_document() -> CatalogDocument {
    serde_json::from_value(json!({
        "version": "2024.9",
        "lastUpdated": "2024-09-01",
        "single_phase": {
            "solar_panels": {
                "jinko": {
                    "brand": "Jinko",
                    "options": [
                        { "id": "solar-single_phase-jinko-6.6", "size_kw": 6.6,
                          "price_after_rebate": 7078.0, "rebate": 2088.0 },
                        { "size_kw": 10.0, "price_after_rebate": 9990.0 }
                    ]
                }
            },
            "batteries": {
                "byd": {
                    "brand": "BYD",
                    "options": [
                        { "id": BYD_10, "capacity_kwh": 10.0, "price_after_rebate": 9490.0 },
                        { "id": BYD_10, "capacity_kwh": 15.0, "price_after_rebate": 12490.0 }
                    ]
                }
            }
        },
        "three_phase": {}
    }))
    .expect("legacy catalog parses")
}

/// In-memory store counting how often the document was rewritten.
pub(super) struct MemoryCatalogStore {
    document: Mutex<CatalogDocument>,
    saves: AtomicUsize,
}

impl MemoryCatalogStore {
    pub(super) fn new(document: CatalogDocument) -> Self {
        Self {
            document: Mutex::new(document),
            saves: AtomicUsize::new(0),
        }
    }

    pub(super) fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub(super) fn snapshot(&self) -> CatalogDocument {
        self.document.lock().clone()
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn load(&self) -> Result<CatalogDocument, StoreError> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, document: &CatalogDocument) -> Result<(), StoreError> {
        *self.document.lock() = document.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(super) struct UnavailableStore;

impl CatalogStore for UnavailableStore {
    fn load(&self) -> Result<CatalogDocument, StoreError> {
        Err(StoreError::Unavailable("disk detached".to_string()))
    }

    fn save(&self, _document: &CatalogDocument) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk detached".to_string()))
    }
}

pub(super) fn build_service(
    document: CatalogDocument,
) -> (
    Arc<CatalogService<MemoryCatalogStore>>,
    Arc<MemoryCatalogStore>,
) {
    let store = Arc::new(MemoryCatalogStore::new(document));
    let service = Arc::new(CatalogService::new(Arc::clone(&store)));
    (service, store)
}

pub(super) fn unavailable_service() -> Arc<CatalogService<UnavailableStore>> {
    Arc::new(CatalogService::new(Arc::new(UnavailableStore)))
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
