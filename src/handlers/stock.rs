use crate::handlers::{
    map_service_error, success_response, Paginated, PaginationParams,
};
use crate::{
    errors::ApiError,
    services::stock::StockStatus,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Admin stock dashboard. Every snapshot is computed fresh from the rows
/// backing it; nothing here is cached.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(stock_overview))
        .route("/alerts", get(list_alerts))
        .route("/alerts/:id/ack", post(acknowledge_alert))
        .route("/:variant_id", get(variant_snapshot))
        .route("/:variant_id", put(update_stock))
}

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    /// Filter by computed status: "Out of Stock", "Low" or "In Stock".
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub stock_quantity: i32,
}

async fn stock_overview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StockQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => Some(StockStatus::parse(s).ok_or_else(|| ApiError::BadRequest {
            message: format!("Unknown stock status '{}'", s),
        })?),
    };
    let params = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    };
    let (snapshots, total) = state
        .services
        .stock
        .overview(params.page(), params.per_page(), status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(snapshots, total, &params)))
}

async fn variant_snapshot(
    State(state): State<Arc<AppState>>,
    Path(variant_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let snapshot = state
        .services
        .stock
        .snapshot_for_variant(variant_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(snapshot))
}

/// Overwrite a variant's on-hand quantity. The value replaces the stored
/// count; holds and sold counts are unaffected.
async fn update_stock(
    State(state): State<Arc<AppState>>,
    Path(variant_id): Path<Uuid>,
    Json(payload): Json<UpdateStockRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let snapshot = state
        .services
        .stock
        .update_stock(variant_id, payload.stock_quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(snapshot))
}

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (alerts, total) = state
        .services
        .stock
        .alerts(params.page(), params.per_page())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(alerts, total, &params)))
}

async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let alert = state
        .services
        .stock
        .acknowledge_alert(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(alert))
}
