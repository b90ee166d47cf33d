use serde_json::json;

use super::common::*;
use crate::pricing::catalog::{Phase, ProductFamily};
use crate::pricing::ids::VariantId;
use crate::pricing::product::ProductInput;
use crate::pricing::service::CatalogError;

fn product(value: serde_json::Value) -> ProductInput {
    serde_json::from_value(value).expect("product payload parses")
}

#[test]
fn normalization_runs_once_and_is_stable() {
    let (service, store) = build_service(legacy_document());

    let first = service.list_all_variants().expect("first listing");
    assert_eq!(store.saves(), 1);
    assert!(first.iter().all(|record| record.id.is_uuid()));

    let second = service.list_all_variants().expect("second listing");
    assert_eq!(store.saves(), 1, "already-normalized catalog is not rewritten");
    let first_ids: Vec<_> = first.iter().map(|record| record.id.clone()).collect();
    let second_ids: Vec<_> = second.iter().map(|record| record.id.clone()).collect();
    assert_eq!(first_ids, second_ids);
}

#[test]
fn normalization_reports_slug_missing_and_duplicate_identifiers() {
    let (service, store) = build_service(legacy_document());

    let migrations = service.normalize_ids().expect("normalizes");
    assert_eq!(migrations.len(), 3);
    assert_eq!(
        migrations[0].previous.as_deref(),
        Some("solar-single_phase-jinko-6.6")
    );
    assert_eq!(migrations[1].previous, None);
    assert_eq!(migrations[2].previous.as_deref(), Some(BYD_10));

    let saved = store.snapshot();
    let byd = &saved.single_phase.batteries["byd"].options;
    assert_eq!(byd[0].id, VariantId::parse(BYD_10));
    assert_ne!(byd[1].id, VariantId::parse(BYD_10));
    assert_ne!(saved.last_updated, "2024-09-01");

    assert!(service.normalize_ids().expect("second pass").is_empty());
    assert_eq!(store.saves(), 1);
}

#[test]
fn lookup_requires_exact_size() {
    let (service, _) = build_service(catalog_document());

    let found = service
        .find_variant(Phase::SinglePhase, ProductFamily::Solar, "jinko", 6.6)
        .expect("catalog loads")
        .expect("6.6 kW package exists");
    assert_eq!(found.id(), &VariantId::parse(JINKO_6_6));

    let missing = service
        .find_variant(Phase::SinglePhase, ProductFamily::Solar, "jinko", 7.0)
        .expect("catalog loads");
    assert!(missing.is_none());

    let unknown_brand = service
        .find_variant(Phase::SinglePhase, ProductFamily::Solar, "trina", 6.6)
        .expect("catalog loads");
    assert!(unknown_brand.is_none());
}

#[test]
fn minimum_prices_span_both_phases() {
    let (service, _) = build_service(catalog_document());

    let minimums = service.min_prices().expect("catalog loads");
    assert_eq!(minimums.solar, Some(7078.0));
    assert_eq!(minimums.battery, Some(9490.0));
    assert_eq!(minimums.ev, Some(1990.0));
    assert_eq!(minimums.inverter, Some(2490.0));
}

#[test]
fn add_variant_computes_battery_rebate_for_excluded_brand() {
    let (service, store) = build_service(catalog_document());

    let record = service
        .add_variant(product(json!({
            "phase": "single_phase",
            "productType": "battery",
            "brand": "Tesla",
            "capacityKwh": 13.5,
            "priceAfterRebate": 13990
        })))
        .expect("adds");

    assert!(record.id.is_uuid());
    assert_eq!(record.brand_key, "tesla");
    assert_eq!(record.index, 1);
    // state component withheld, 13 national certificates
    assert_eq!(record.rebate, Some(13.0 * 372.0));
    assert_eq!(store.saves(), 1);

    let saved = store.snapshot();
    let tesla = &saved.single_phase.batteries["tesla"];
    assert_eq!(tesla.options.len(), 2);
    assert_eq!(tesla.model.as_deref(), Some("Powerwall 3"));
}

#[test]
fn add_variant_creates_brand_entry_from_form_metadata() {
    let (service, store) = build_service(catalog_document());

    let record = service
        .add_variant(product(json!({
            "phase": "three_phase",
            "productType": "inverter",
            "brand": "Fronius Gen24",
            "warrantyYears": 10,
            "powerKw": 8,
            "priceAfterRebate": 3890
        })))
        .expect("adds");

    assert_eq!(record.brand_key, "fronius_gen24");
    assert_eq!(record.rebate, None);

    let saved = store.snapshot();
    let entry = &saved.three_phase.hybrid_inverters["fronius_gen24"];
    assert_eq!(entry.brand, "Fronius Gen24");
    assert_eq!(entry.warranty_years, Some(10));
}

#[test]
fn add_variant_rejects_invalid_payload_without_writing() {
    let (service, store) = build_service(catalog_document());

    let err = service
        .add_variant(product(json!({
            "phase": "single_phase",
            "productType": "ev",
            "brand": "Zappi",
            "powerKw": -7,
            "priceAfterRebate": 1990
        })))
        .expect_err("negative power rejected");

    assert!(matches!(err, CatalogError::InvalidProduct(_)));
    assert_eq!(store.saves(), 0);
}

#[test]
fn update_moves_option_between_families_and_keeps_identifier() {
    let (service, store) = build_service(catalog_document());

    let record = service
        .update_variant(
            JINKO_10,
            product(json!({
                "phase": "single_phase",
                "productType": "battery",
                "brand": "BYD",
                "capacityKwh": 15.4,
                "priceAfterRebate": 11990,
                "rebate": 3500
            })),
        )
        .expect("updates");

    assert_eq!(record.id, VariantId::parse(JINKO_10));
    assert_eq!(record.product_type, ProductFamily::Battery);
    assert_eq!(record.brand_key, "byd");
    assert_eq!(record.capacity_kwh, Some(15.4));

    let saved = store.snapshot();
    let jinko = &saved.single_phase.solar_panels["jinko"];
    assert_eq!(jinko.options.len(), 1);
    assert_eq!(jinko.options[0].id, VariantId::parse(JINKO_6_6));

    let byd = &saved.single_phase.batteries["byd"];
    assert_eq!(byd.options.len(), 2);
    assert_eq!(byd.options[1].id, VariantId::parse(JINKO_10));
    assert_eq!(byd.model.as_deref(), Some("HVM"));
}

#[test]
fn update_moving_last_option_drops_source_brand() {
    let (service, store) = build_service(catalog_document());

    service
        .update_variant(
            ZAPPI_7,
            product(json!({
                "phase": "three_phase",
                "productType": "ev",
                "brand": "Zappi",
                "powerKw": 7,
                "priceAfterRebate": 2090
            })),
        )
        .expect("updates");

    let saved = store.snapshot();
    assert!(!saved.single_phase.ev_chargers.contains_key("zappi"));
    let zappi = &saved.three_phase.ev_chargers["zappi"];
    assert_eq!(zappi.options.len(), 2);
    assert_eq!(zappi.options[1].id, VariantId::parse(ZAPPI_7));
}

#[test]
fn update_accepts_legacy_slug_for_option() {
    let (service, _) = build_service(catalog_document());

    let record = service
        .update_variant(
            "solar-single_phase-jinko-6.6",
            product(json!({
                "phase": "single_phase",
                "productType": "solar",
                "brand": "Jinko",
                "sizeKw": 6.6,
                "priceAfterRebate": 6890,
                "rebate": 2088
            })),
        )
        .expect("slug resolves");

    assert_eq!(record.id, VariantId::parse(JINKO_6_6));
    assert_eq!(record.price_after_rebate, 6890.0);
}

#[test]
fn update_writes_brand_metadata_onto_shared_entry() {
    let (service, store) = build_service(catalog_document());

    let record = service
        .update_variant(
            JINKO_10,
            product(json!({
                "phase": "single_phase",
                "productType": "solar",
                "brand": "Jinko",
                "model": "Tiger Neo 3",
                "warrantyYears": 30,
                "sizeKw": 10,
                "priceAfterRebate": 9990,
                "rebate": 3164
            })),
        )
        .expect("updates");

    assert_eq!(record.model.as_deref(), Some("Tiger Neo 3"));
    assert_eq!(record.warranty_years, Some(30));

    let saved = store.snapshot();
    let jinko = &saved.single_phase.solar_panels["jinko"];
    assert_eq!(jinko.options.len(), 2);
    assert_eq!(jinko.options[0].id, VariantId::parse(JINKO_6_6));
    assert_eq!(jinko.model.as_deref(), Some("Tiger Neo 3"));
    assert_eq!(jinko.warranty_years, Some(30));
    assert_eq!(jinko.performance_warranty_years, Some(30));
}

#[test]
fn update_can_clear_brand_flags() {
    let (service, store) = build_service(catalog_document());

    service
        .update_variant(
            TESLA_13_5,
            product(json!({
                "phase": "single_phase",
                "productType": "battery",
                "brand": "Tesla",
                "capacityKwh": 13.5,
                "powerKw": 11.5,
                "priceAfterRebate": 14990,
                "stateRebateExcluded": false
            })),
        )
        .expect("updates");
    service
        .update_variant(
            BYD_10,
            product(json!({
                "phase": "single_phase",
                "productType": "battery",
                "brand": "BYD",
                "capacityKwh": 10,
                "priceAfterRebate": 9490,
                "requiresHybridInverter": false
            })),
        )
        .expect("updates");

    let saved = store.snapshot();
    assert!(!saved.single_phase.batteries["tesla"].state_rebate_excluded);
    let byd = &saved.single_phase.batteries["byd"];
    assert!(!byd.requires_hybrid_inverter);
    assert_eq!(byd.chemistry.as_deref(), Some("LFP"));
}

#[test]
fn update_unknown_identifier_is_not_found() {
    let (service, store) = build_service(catalog_document());

    let err = service
        .update_variant(
            "does-not-exist",
            product(json!({
                "phase": "single_phase",
                "productType": "ev",
                "brand": "Zappi",
                "powerKw": 7,
                "priceAfterRebate": 1990
            })),
        )
        .expect_err("unknown id");

    assert!(matches!(err, CatalogError::ProductNotFound { .. }));
    assert_eq!(store.saves(), 0);
}

#[test]
fn deleting_last_option_removes_brand() {
    let (service, store) = build_service(catalog_document());

    let removed = service
        .delete_variant(ZAPPI_7, Phase::SinglePhase, ProductFamily::EvCharger, "zappi", 0)
        .expect("deletes");
    assert_eq!(removed.id, VariantId::parse(ZAPPI_7));

    let saved = store.snapshot();
    assert!(saved.single_phase.ev_chargers.is_empty());
    assert!(saved.three_phase.ev_chargers.contains_key("zappi"));
    assert_eq!(store.saves(), 1);
}

#[test]
fn delete_checks_identifier_at_position() {
    let (service, store) = build_service(catalog_document());

    let err = service
        .delete_variant(JINKO_10, Phase::SinglePhase, ProductFamily::Solar, "jinko", 0)
        .expect_err("position holds a different option");
    assert!(matches!(err, CatalogError::VariantNotFound { index: 0, .. }));

    let err = service
        .delete_variant(JINKO_10, Phase::SinglePhase, ProductFamily::Solar, "trina", 0)
        .expect_err("unknown brand");
    assert!(matches!(err, CatalogError::BrandNotFound { .. }));

    let err = service
        .delete_variant(JINKO_10, Phase::SinglePhase, ProductFamily::Solar, "jinko", 9)
        .expect_err("index out of range");
    assert!(matches!(err, CatalogError::VariantNotFound { index: 9, .. }));

    assert_eq!(store.saves(), 0);
}

#[test]
fn unavailable_store_surfaces_as_catalog_error() {
    let service = unavailable_service();

    assert!(matches!(
        service.load_catalog(),
        Err(CatalogError::Unavailable(_))
    ));
    assert!(matches!(
        service.list_all_variants(),
        Err(CatalogError::Unavailable(_))
    ));
}

#[test]
fn reload_picks_up_external_edits() {
    let (service, store) = build_service(catalog_document());
    let before = service.load_catalog().expect("loads");
    assert_eq!(before.version, "2025.3");

    let mut edited = store.snapshot();
    edited.version = "2025.4".to_string();
    crate::pricing::store::CatalogStore::save(store.as_ref(), &edited).expect("external edit");

    assert_eq!(service.load_catalog().expect("cached").version, "2025.3");
    assert_eq!(service.reload_catalog().expect("reloads").version, "2025.4");
}

#[test]
fn unknown_document_fields_survive_a_rewrite() {
    let (service, store) = build_service(catalog_document());

    service
        .delete_variant(SUNGROW_5, Phase::SinglePhase, ProductFamily::Inverter, "sungrow", 0)
        .expect("deletes");

    let saved = store.snapshot();
    assert_eq!(saved.trade_in, Some(json!({ "enabled": false })));
    assert!(saved.single_phase.hybrid_inverters.is_empty());
}
