use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, Utc};
use service_core::error::AppError;

use crate::{
    dtos::YearQuery,
    handlers::service_failure,
    models::ReplacePeriodRequest,
    services::period_matrix,
    AppState,
};

/// The title-by-month matrix for `?year=`, defaulting to the current UTC year.
pub async fn get_matrix(
    State(state): State<AppState>,
    Path(shop_id): Path<i64>,
    query: Result<Query<YearQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) =
        query.map_err(|e| AppError::BadRequest(anyhow::anyhow!("Query parse error: {}", e)))?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let matrix = period_matrix::build_matrix(state.store.as_ref(), shop_id, year)
        .await
        .map_err(service_failure)?;
    Ok(Json(matrix))
}

/// Replace the whole year's entries with the submitted matrix.
pub async fn replace_matrix(
    State(state): State<AppState>,
    Path(shop_id): Path<i64>,
    body: Result<Json<ReplacePeriodRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) =
        body.map_err(|e| AppError::BadRequest(anyhow::anyhow!("Json parse error: {}", e)))?;

    let matrix = period_matrix::replace_period(
        state.store.as_ref(),
        shop_id,
        request.year,
        &request.revenues,
        &request.expenses,
    )
    .await
    .map_err(service_failure)?;
    Ok(Json(matrix))
}
