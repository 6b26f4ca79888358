pub mod auth;
pub mod database;
pub mod error;
pub mod jwt;
pub mod memory;
pub mod metrics;
pub mod period_matrix;
pub mod store;
pub mod token_store;

pub use auth::AuthService;
pub use database::Database;
pub use error::ServiceError;
pub use jwt::{Claims, JwtService, TokenResponse};
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics, record_error};
pub use store::{AccountingStore, EntryTransaction};
pub use token_store::{MockTokenStore, RedisTokenStore, TokenStore};
