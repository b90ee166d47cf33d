use serde_json::json;

use super::common::*;
use crate::pricing::catalog::Phase;
use crate::pricing::quote::{
    calculate_pricing, calculate_submission_pricing, PricingError, PricingSelection, SystemType,
};

fn selection(value: serde_json::Value) -> PricingSelection {
    serde_json::from_value(value).expect("selection parses")
}

#[test]
fn sums_solar_and_battery_selection() {
    let catalog = catalog_document();
    let priced = calculate_pricing(
        &catalog,
        &selection(json!({
            "selectedSystems": ["solar", "battery"],
            "solarPackage": JINKO_6_6,
            "batterySystem": BYD_10,
            "powerSupply": "single_phase"
        })),
    );

    assert_eq!(priced.total_price, 16_568.0);
    assert_eq!(priced.rebate_amount, 5_088.0);
    assert_eq!(priced.final_price, 11_480.0);

    let solar = priced.breakdown.solar.as_ref().expect("solar line");
    assert_eq!(solar.brand, "Jinko");
    assert_eq!(solar.size, 6.6);
    assert_eq!(solar.discount, Some(9_166.0 - 7_078.0));
    assert!(priced.breakdown.ev.is_none());

    let estimates = priced.estimates.expect("estimates for solar and battery");
    assert_eq!(estimates.annual_savings, 2_300.0);
    assert_eq!(estimates.payback_years, Some(5.0));
}

#[test]
fn unresolvable_ev_prices_to_zero() {
    let catalog = catalog_document();
    let priced = calculate_pricing(
        &catalog,
        &selection(json!({
            "selectedSystems": ["ev"],
            "evCharger": "retired-charger",
            "powerSupply": "single_phase"
        })),
    );

    assert_eq!(priced.total_price, 0.0);
    assert_eq!(priced.rebate_amount, 0.0);
    assert_eq!(priced.final_price, 0.0);
    assert!(priced.breakdown.ev.is_none());
    assert!(priced.estimates.is_none());
}

#[test]
fn ignores_unselected_systems_and_blank_choices() {
    let catalog = catalog_document();
    let priced = calculate_pricing(
        &catalog,
        &selection(json!({
            "selectedSystems": ["solar", "ev", "hot_water"],
            "solarPackage": "  ",
            "batterySystem": BYD_10,
            "evCharger": ZAPPI_7
        })),
    );

    assert!(priced.breakdown.solar.is_none());
    assert!(priced.breakdown.battery.is_none());
    assert_eq!(priced.total_price, 1_990.0);
    assert_eq!(priced.rebate_amount, 0.0);
    assert_eq!(priced.final_price, 1_990.0);
}

#[test]
fn malformed_form_fields_degrade_to_defaults() {
    for power_supply in [json!(""), json!(null), json!("four_phase"), json!(3)] {
        let parsed = selection(json!({
            "selectedSystems": ["solar"],
            "solarPackage": JINKO_6_6,
            "powerSupply": power_supply
        }));
        assert_eq!(parsed.power_supply, Phase::SinglePhase);
    }

    let parsed = selection(json!({
        "selectedSystems": ["solar", 7, null, "battery"],
        "solarPackage": 42,
        "batterySystem": { "id": BYD_10 },
        "evCharger": null,
        "powerSupply": " three_phase "
    }));
    assert_eq!(
        parsed.selected_systems,
        vec![SystemType::Solar, SystemType::Battery]
    );
    assert_eq!(parsed.solar_package, None);
    assert_eq!(parsed.battery_system, None);
    assert_eq!(parsed.ev_charger, None);
    assert_eq!(parsed.power_supply, Phase::ThreePhase);

    let parsed = selection(json!({ "selectedSystems": null }));
    assert!(parsed.selected_systems.is_empty());
}

#[test]
fn resolves_only_within_selected_phase() {
    let catalog = catalog_document();
    let priced = calculate_pricing(
        &catalog,
        &selection(json!({
            "selectedSystems": ["solar"],
            "solarPackage": JINKO_6_6,
            "powerSupply": "three_phase"
        })),
    );
    assert!(priced.breakdown.solar.is_none());

    let priced = calculate_pricing(
        &catalog,
        &selection(json!({
            "selectedSystems": ["solar"],
            "solarPackage": JINKO_THREE_6_6,
            "powerSupply": "three_phase"
        })),
    );
    assert_eq!(priced.total_price, 7_578.0);
}

#[test]
fn legacy_slug_selections_still_resolve() {
    let catalog = catalog_document();
    let priced = calculate_pricing(
        &catalog,
        &selection(json!({
            "selectedSystems": ["battery"],
            "batterySystem": "battery-single_phase-byd-10"
        })),
    );

    let battery = priced.breakdown.battery.expect("slug resolves");
    assert_eq!(battery.brand_key, "byd");
    assert_eq!(priced.final_price, 6_490.0);
}

#[test]
fn option_without_rrp_has_no_discount() {
    let catalog = catalog_document();
    let priced = calculate_pricing(
        &catalog,
        &selection(json!({
            "selectedSystems": ["solar"],
            "solarPackage": JINKO_THREE_6_6,
            "powerSupply": "three"
        })),
    );

    let solar = priced.breakdown.solar.expect("resolves");
    assert_eq!(solar.rrp, solar.price);
    assert_eq!(solar.discount, None);
}

#[test]
fn submission_rejects_missing_choice() {
    let catalog = catalog_document();
    let err = calculate_submission_pricing(
        &catalog,
        &selection(json!({
            "selectedSystems": ["solar", "battery"],
            "solarPackage": JINKO_6_6
        })),
    )
    .expect_err("battery selected without a product");

    assert_eq!(
        err,
        PricingError::MissingSelection {
            system: SystemType::Battery
        }
    );
}

#[test]
fn submission_rejects_unresolved_choice() {
    let catalog = catalog_document();
    let err = calculate_submission_pricing(
        &catalog,
        &selection(json!({
            "selectedSystems": ["ev"],
            "evCharger": ZAPPI_7,
            "powerSupply": "three_phase"
        })),
    )
    .expect_err("single phase charger on a three phase quote");

    assert_eq!(
        err,
        PricingError::UnresolvedSelection {
            system: SystemType::Ev,
            identifier: ZAPPI_7.to_string(),
            phase: Phase::ThreePhase,
        }
    );
}

#[test]
fn submission_totals_match_live_pricing() {
    let catalog = catalog_document();
    let choice = selection(json!({
        "selectedSystems": ["solar", "battery"],
        "solarPackage": JINKO_6_6,
        "batterySystem": BYD_10
    }));

    let live = calculate_pricing(&catalog, &choice);
    let submitted = calculate_submission_pricing(&catalog, &choice).expect("resolves");
    assert_eq!(submitted.totals(), live.totals());
    assert_eq!(submitted.totals().final_price, 11_480.0);
}
