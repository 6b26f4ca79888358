pub mod account_entries;
pub mod account_titles;
pub mod auth;
pub mod health;
pub mod shops;

use service_core::error::AppError;

use crate::services::{record_error, ServiceError};

/// Count a service failure and convert it for the response.
pub(crate) fn service_failure(err: ServiceError) -> AppError {
    record_error(err.kind());
    AppError::from(err)
}
