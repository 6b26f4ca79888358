pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{account_entries, account_titles, auth, health, shops};
use crate::middleware::{auth_middleware, metrics_middleware};
use crate::services::{AccountingStore, AuthService, JwtService, TokenStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountingStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub auth_service: AuthService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AccountingStore>,
        tokens: Arc<dyn TokenStore>,
        jwt: JwtService,
    ) -> Self {
        let auth_service = AuthService::new(store.clone(), tokens.clone(), jwt);
        Self {
            store,
            tokens,
            auth_service,
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}

/// Assemble the HTTP API. Everything outside health, metrics, register and
/// login sits behind bearer authentication.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/shops", get(shops::list_shops).post(shops::create_shop))
        .route(
            "/shops/:shop_id",
            get(shops::get_shop)
                .put(shops::update_shop)
                .delete(shops::delete_shop),
        )
        .route(
            "/shop/:shop_id/account_title",
            get(account_titles::list_titles).post(account_titles::create_title),
        )
        .route(
            "/shop/:shop_id/account_title/:title_id",
            get(account_titles::get_title)
                .put(account_titles::update_title)
                .delete(account_titles::delete_title),
        )
        .route(
            "/shop/:shop_id/account_entry",
            get(account_entries::get_matrix).put(account_entries::replace_matrix),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(protected)
        .layer(cors_layer(allowed_origins))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
