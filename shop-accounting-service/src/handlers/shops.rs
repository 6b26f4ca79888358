use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::Pagination,
    models::{CreateShop, UpdateShop},
    services::ServiceError,
    utils::ValidatedJson,
    AppState,
};

pub async fn list_shops(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    page.validate()?;
    let shops = state.store.list_shops(page.skip, page.limit).await?;
    Ok(Json(shops))
}

pub async fn get_shop(
    State(state): State<AppState>,
    Path(shop_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let shop = state
        .store
        .find_shop(shop_id)
        .await?
        .ok_or(ServiceError::ShopNotFound)?;
    Ok(Json(shop))
}

pub async fn create_shop(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateShop>,
) -> Result<impl IntoResponse, AppError> {
    let shop = state.store.create_shop(&input).await?;
    Ok((StatusCode::CREATED, Json(shop)))
}

/// Apply a partial update. Changing `period_type` leaves stored entries as
/// they are; months outside the new cadence surface as matrix anomalies.
pub async fn update_shop(
    State(state): State<AppState>,
    Path(shop_id): Path<i64>,
    ValidatedJson(patch): ValidatedJson<UpdateShop>,
) -> Result<impl IntoResponse, AppError> {
    let mut shop = state
        .store
        .find_shop(shop_id)
        .await?
        .ok_or(ServiceError::ShopNotFound)?;
    shop.apply(patch);

    let shop = state.store.update_shop(&shop).await?;
    tracing::info!(shop_id, "Shop updated");
    Ok(Json(shop))
}

pub async fn delete_shop(
    State(state): State<AppState>,
    Path(shop_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete_shop(shop_id).await? {
        return Err(ServiceError::ShopNotFound.into());
    }
    Ok(StatusCode::NO_CONTENT)
}
