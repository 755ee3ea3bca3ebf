use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use sea_orm::{ConnectionTrait, Statement};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness probe that checks database connectivity.
async fn readiness(State(state): State<Arc<AppState>>) -> Json<Value> {
    let db_ok = state
        .db
        .execute(Statement::from_string(
            state.db.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    Json(json!({
        "status": if db_ok { "ready" } else { "degraded" },
        "database": db_ok,
    }))
}
