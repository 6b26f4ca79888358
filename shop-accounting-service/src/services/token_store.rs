//! Revocable store of each user's current access token.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use std::collections::HashMap;
use std::sync::Mutex;

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Record `token` as the user's only valid token.
    async fn store_token(
        &self,
        user_id: i64,
        token: &str,
        expiry_seconds: i64,
    ) -> Result<(), anyhow::Error>;
    async fn get_token(&self, user_id: i64) -> Result<Option<String>, anyhow::Error>;
    async fn delete_token(&self, user_id: i64) -> Result<(), anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;

    async fn is_token_valid(&self, user_id: i64, token: &str) -> Result<bool, anyhow::Error> {
        Ok(self.get_token(user_id).await?.as_deref() == Some(token))
    }
}

fn token_key(user_id: i64) -> String {
    format!("token:{}", user_id)
}

#[derive(Clone)]
pub struct RedisTokenStore {
    manager: ConnectionManager,
}

impl RedisTokenStore {
    pub async fn new(url: &str) -> Result<Self, anyhow::Error> {
        tracing::info!("Connecting to Redis");
        let client = Client::open(url)?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self { manager })
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn store_token(
        &self,
        user_id: i64,
        token: &str,
        expiry_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(token_key(user_id))
            .arg(token)
            .arg("EX")
            .arg(expiry_seconds.max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to store token: {}", e))
    }

    async fn get_token(&self, user_id: i64) -> Result<Option<String>, anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("GET")
            .arg(token_key(user_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get token: {}", e))
    }

    async fn delete_token(&self, user_id: i64) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(token_key(user_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete token: {}", e))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

/// Process-local token store for tests. Expiry is not enforced.
#[derive(Default)]
pub struct MockTokenStore {
    pub tokens: Mutex<HashMap<i64, String>>,
}

impl MockTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MockTokenStore {
    async fn store_token(
        &self,
        user_id: i64,
        token: &str,
        _expiry_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        self.tokens
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock token store mutex poisoned: {}", e))?
            .insert(user_id, token.to_string());
        Ok(())
    }

    async fn get_token(&self, user_id: i64) -> Result<Option<String>, anyhow::Error> {
        let token = self
            .tokens
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock token store mutex poisoned: {}", e))?
            .get(&user_id)
            .cloned();
        Ok(token)
    }

    async fn delete_token(&self, user_id: i64) -> Result<(), anyhow::Error> {
        self.tokens
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock token store mutex poisoned: {}", e))?
            .remove(&user_id);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespaced_by_user() {
        assert_eq!(token_key(12), "token:12");
    }

    #[tokio::test]
    async fn newer_token_supersedes_older() {
        let store = MockTokenStore::new();
        store.store_token(1, "first", 60).await.unwrap();
        store.store_token(1, "second", 60).await.unwrap();

        assert!(!store.is_token_valid(1, "first").await.unwrap());
        assert!(store.is_token_valid(1, "second").await.unwrap());
    }

    #[tokio::test]
    async fn deleted_token_is_invalid() {
        let store = MockTokenStore::new();
        store.store_token(1, "only", 60).await.unwrap();
        store.delete_token(1).await.unwrap();

        assert!(!store.is_token_valid(1, "only").await.unwrap());
        assert_eq!(store.get_token(1).await.unwrap(), None);
    }
}
