use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::catalog::{Phase, ProductFamily};
use super::ids::brand_slug;
use super::product::ProductInput;
use super::quote::{calculate_pricing, calculate_submission_pricing, PricingSelection};
use super::service::{CatalogError, CatalogService};
use super::store::CatalogStore;

/// Router builder exposing quote pricing, rebate previews, and catalog admin.
pub fn pricing_router<S>(service: Arc<CatalogService<S>>) -> Router
where
    S: CatalogStore + 'static,
{
    Router::new()
        .route("/api/v1/pricing/calculate", post(calculate_handler::<S>))
        .route("/api/v1/pricing/submit", post(submit_handler::<S>))
        .route("/api/v1/pricing/minimums", get(minimums_handler::<S>))
        .route("/api/v1/rebates/solar", get(solar_rebate_handler::<S>))
        .route("/api/v1/rebates/battery", get(battery_rebate_handler::<S>))
        .route(
            "/api/v1/admin/products",
            get(list_handler::<S>).post(create_handler::<S>),
        )
        .route("/api/v1/admin/products/lookup", get(lookup_handler::<S>))
        .route(
            "/api/v1/admin/products/:product_id",
            put(update_handler::<S>).delete(delete_handler::<S>),
        )
        .route("/api/v1/admin/catalog/reload", post(reload_handler::<S>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SolarRebateQuery {
    size_kw: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatteryRebateQuery {
    capacity_kwh: f64,
    #[serde(default)]
    brand: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LookupQuery {
    phase: Phase,
    product_type: ProductFamily,
    brand: String,
    size: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteQuery {
    phase: Phase,
    product_type: ProductFamily,
    brand: String,
    index: usize,
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (status, Json(payload)).into_response()
}

fn catalog_error_response(err: CatalogError) -> Response {
    let status = match &err {
        CatalogError::Unavailable(_) | CatalogError::Persist(_) => {
            error!(error = %err, "pricing catalog request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        CatalogError::ProductNotFound { .. }
        | CatalogError::BrandNotFound { .. }
        | CatalogError::VariantNotFound { .. } => StatusCode::NOT_FOUND,
        CatalogError::InvalidProduct(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_body(status, err.to_string())
}

fn non_negative(name: &str, value: f64) -> Result<f64, Response> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(error_body(
            StatusCode::BAD_REQUEST,
            format!("{name} must be a non-negative number"),
        ))
    }
}

pub(crate) async fn calculate_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Json(selection): Json<PricingSelection>,
) -> Response
where
    S: CatalogStore + 'static,
{
    match service.load_catalog() {
        Ok(catalog) => {
            let priced = calculate_pricing(&catalog, &selection);
            (StatusCode::OK, Json(priced)).into_response()
        }
        Err(err) => catalog_error_response(err),
    }
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Json(selection): Json<PricingSelection>,
) -> Response
where
    S: CatalogStore + 'static,
{
    let catalog = match service.load_catalog() {
        Ok(catalog) => catalog,
        Err(err) => return catalog_error_response(err),
    };

    match calculate_submission_pricing(&catalog, &selection) {
        Ok(priced) => (StatusCode::OK, Json(priced.totals())).into_response(),
        Err(err) => error_body(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
    }
}

pub(crate) async fn minimums_handler<S>(State(service): State<Arc<CatalogService<S>>>) -> Response
where
    S: CatalogStore + 'static,
{
    match service.min_prices() {
        Ok(minimums) => (StatusCode::OK, Json(minimums)).into_response(),
        Err(err) => catalog_error_response(err),
    }
}

pub(crate) async fn solar_rebate_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Query(query): Query<SolarRebateQuery>,
) -> Response
where
    S: CatalogStore + 'static,
{
    let size_kw = match non_negative("size_kw", query.size_kw) {
        Ok(size_kw) => size_kw,
        Err(response) => return response,
    };

    match service.rebate_calculator() {
        Ok(calculator) => {
            let payload = json!({
                "sizeKw": size_kw,
                "rebate": calculator.calculate_solar_rebate(size_kw),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => catalog_error_response(err),
    }
}

pub(crate) async fn battery_rebate_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Query(query): Query<BatteryRebateQuery>,
) -> Response
where
    S: CatalogStore + 'static,
{
    let capacity_kwh = match non_negative("capacity_kwh", query.capacity_kwh) {
        Ok(capacity_kwh) => capacity_kwh,
        Err(response) => return response,
    };

    let catalog = match service.load_catalog() {
        Ok(catalog) => catalog,
        Err(err) => return catalog_error_response(err),
    };
    let calculator = match service.rebate_calculator() {
        Ok(calculator) => calculator,
        Err(err) => return catalog_error_response(err),
    };

    let brand_key = query.brand.as_deref().map(brand_slug).unwrap_or_default();
    let flagged = Phase::ALL
        .iter()
        .any(|phase| catalog.section(*phase).battery_brand_flagged(&brand_key));
    let excluded = !brand_key.is_empty() && calculator.is_excluded_brand(&brand_key, flagged);
    let rebate = calculator.calculate_battery_rebate(capacity_kwh, excluded);

    let payload = json!({
        "capacityKwh": capacity_kwh,
        "brand": brand_key,
        "excluded": excluded,
        "state": rebate.state,
        "national": rebate.national,
        "total": rebate.total,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn list_handler<S>(State(service): State<Arc<CatalogService<S>>>) -> Response
where
    S: CatalogStore + 'static,
{
    match service.list_all_variants() {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => catalog_error_response(err),
    }
}

pub(crate) async fn lookup_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Query(query): Query<LookupQuery>,
) -> Response
where
    S: CatalogStore + 'static,
{
    let brand_key = query.brand.trim();
    match service.find_record(query.phase, query.product_type, brand_key, query.size) {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => error_body(
            StatusCode::NOT_FOUND,
            format!(
                "no {} {} option from '{}' at size {}",
                query.phase, query.product_type, brand_key, query.size
            ),
        ),
        Err(err) => catalog_error_response(err),
    }
}

pub(crate) async fn create_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Json(input): Json<ProductInput>,
) -> Response
where
    S: CatalogStore + 'static,
{
    match service.add_variant(input) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => catalog_error_response(err),
    }
}

pub(crate) async fn update_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Path(product_id): Path<String>,
    Json(input): Json<ProductInput>,
) -> Response
where
    S: CatalogStore + 'static,
{
    match service.update_variant(&product_id, input) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => catalog_error_response(err),
    }
}

pub(crate) async fn delete_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Path(product_id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Response
where
    S: CatalogStore + 'static,
{
    match service.delete_variant(
        &product_id,
        query.phase,
        query.product_type,
        query.brand.trim(),
        query.index,
    ) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => catalog_error_response(err),
    }
}

pub(crate) async fn reload_handler<S>(State(service): State<Arc<CatalogService<S>>>) -> Response
where
    S: CatalogStore + 'static,
{
    match service.reload_catalog() {
        Ok(catalog) => {
            let payload = json!({
                "version": catalog.version,
                "lastUpdated": catalog.last_updated,
                "options": catalog.flatten().len(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => catalog_error_response(err),
    }
}
