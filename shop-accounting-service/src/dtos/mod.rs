pub mod auth;
pub mod query;

pub use auth::{LoginRequest, RegisterRequest};
pub use query::{Pagination, YearQuery};
