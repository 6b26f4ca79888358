use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Shop not found")]
    ShopNotFound,

    #[error("Account title not found")]
    TitleNotFound,

    #[error("No account titles configured for shop")]
    TitlesNotConfigured,

    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Username already registered")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error(transparent)]
    Persistence(#[from] AppError),
}

impl ServiceError {
    /// Label used for the error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::ShopNotFound | ServiceError::TitleNotFound => "not_found",
            ServiceError::TitlesNotConfigured => "titles_not_configured",
            ServiceError::InvalidSubmission(_) => "invalid_submission",
            ServiceError::InvalidCredentials | ServiceError::InvalidToken => "unauthorized",
            ServiceError::UsernameTaken | ServiceError::EmailTaken => "conflict",
            ServiceError::Internal(_) => "internal",
            ServiceError::Persistence(_) => "persistence",
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::ShopNotFound => AppError::NotFound(anyhow::anyhow!("Shop not found")),
            ServiceError::TitleNotFound => {
                AppError::NotFound(anyhow::anyhow!("Account title not found"))
            }
            ServiceError::TitlesNotConfigured => AppError::NotFound(anyhow::anyhow!(
                "No account titles configured for shop"
            )),
            ServiceError::InvalidSubmission(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Incorrect username or password"))
            }
            ServiceError::UsernameTaken => {
                AppError::Conflict(anyhow::anyhow!("Username already registered"))
            }
            ServiceError::EmailTaken => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::InvalidToken => {
                AppError::Unauthorized(anyhow::anyhow!("Could not validate credentials"))
            }
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::Persistence(e) => e,
        }
    }
}
