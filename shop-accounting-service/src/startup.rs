//! Application startup and lifecycle management.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use secrecy::ExposeSecret;
use service_core::error::AppError;
use tokio::net::TcpListener;

use crate::config::ShopAccountingConfig;
use crate::services::{init_metrics, Database, JwtService, RedisTokenStore};
use crate::{build_router, AppState};

/// Bound listener plus the router it will serve.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect dependencies, apply migrations and bind the listener.
    pub async fn build(config: ShopAccountingConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: ShopAccountingConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(
        config: ShopAccountingConfig,
        run_migrations: bool,
    ) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let tokens = RedisTokenStore::new(config.redis.url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to Redis");
                AppError::InternalError(e)
            })?;

        let state = AppState::new(Arc::new(db), Arc::new(tokens), JwtService::new(&config.jwt));
        let router = build_router(state, &config.allowed_origins);

        let addr = config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "Shop accounting service listener bound");

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(
            service = "shop-accounting-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
