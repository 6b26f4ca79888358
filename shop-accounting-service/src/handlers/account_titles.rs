use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    models::{AccountTitleSubType, AccountTitleType, CreateAccountTitle, Shop, UpdateAccountTitle},
    services::{period_matrix::partition_titles, ServiceError},
    utils::ValidatedJson,
    AppState,
};

async fn require_shop(state: &AppState, shop_id: i64) -> Result<Shop, AppError> {
    state
        .store
        .find_shop(shop_id)
        .await?
        .ok_or_else(|| ServiceError::ShopNotFound.into())
}

fn misclassified(title_type: AccountTitleType, sub_type: AccountTitleSubType) -> AppError {
    AppError::BadRequest(anyhow::anyhow!(
        "sub_type {} does not belong to type {}",
        sub_type.as_str(),
        title_type.as_str()
    ))
}

/// Titles of a shop, split into revenues and expenses and sorted by `order`.
pub async fn list_titles(
    State(state): State<AppState>,
    Path(shop_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_shop(&state, shop_id).await?;
    let titles = state.store.find_titles_by_shop(shop_id).await?;
    Ok(Json(partition_titles(titles)))
}

pub async fn get_title(
    State(state): State<AppState>,
    Path((shop_id, title_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    require_shop(&state, shop_id).await?;
    let title = state
        .store
        .find_title(shop_id, title_id)
        .await?
        .ok_or(ServiceError::TitleNotFound)?;
    Ok(Json(title))
}

pub async fn create_title(
    State(state): State<AppState>,
    Path(shop_id): Path<i64>,
    ValidatedJson(input): ValidatedJson<CreateAccountTitle>,
) -> Result<impl IntoResponse, AppError> {
    require_shop(&state, shop_id).await?;
    if !input.is_classified_consistently() {
        return Err(misclassified(input.title_type, input.sub_type));
    }

    let title = state.store.create_title(shop_id, &input).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

pub async fn update_title(
    State(state): State<AppState>,
    Path((shop_id, title_id)): Path<(i64, i64)>,
    ValidatedJson(patch): ValidatedJson<UpdateAccountTitle>,
) -> Result<impl IntoResponse, AppError> {
    require_shop(&state, shop_id).await?;
    let mut title = state
        .store
        .find_title(shop_id, title_id)
        .await?
        .ok_or(ServiceError::TitleNotFound)?;

    title.apply(patch);
    if !title.is_classified_consistently() {
        return Err(misclassified(title.title_type, title.sub_type));
    }

    let title = state.store.update_title(&title).await?;
    tracing::info!(shop_id, title_id, "Account title updated");
    Ok(Json(title))
}

/// Delete a title together with its entries.
pub async fn delete_title(
    State(state): State<AppState>,
    Path((shop_id, title_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    require_shop(&state, shop_id).await?;
    if !state.store.delete_title(shop_id, title_id).await? {
        return Err(ServiceError::TitleNotFound.into());
    }
    tracing::info!(shop_id, title_id, "Account title deleted");
    Ok(StatusCode::NO_CONTENT)
}
