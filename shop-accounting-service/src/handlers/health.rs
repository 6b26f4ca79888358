use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services::get_metrics;
use crate::AppState;

fn probe_label<E>(result: &Result<(), E>) -> &'static str {
    if result.is_ok() {
        "ok"
    } else {
        "unavailable"
    }
}

/// Liveness probe covering the database and the token cache.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.store.health_check().await;
    let token_cache = state.tokens.health_check().await;

    if database.is_ok() && token_cache.is_ok() {
        tracing::debug!("Health check passed");
        return (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "shop-accounting-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        );
    }

    if let Err(e) = &database {
        tracing::warn!(error = %e, "Health check failed - database unavailable");
    }
    if let Err(e) = &token_cache {
        tracing::warn!(error = %e, "Health check failed - token cache unavailable");
    }

    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "status": "unhealthy",
            "service": "shop-accounting-service",
            "database": probe_label(&database),
            "token_cache": probe_label(&token_cache)
        })),
    )
}

pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    match (
        state.store.health_check().await,
        state.tokens.health_check().await,
    ) {
        (Ok(()), Ok(())) => StatusCode::OK,
        _ => {
            tracing::warn!("Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        get_metrics(),
    )
}
