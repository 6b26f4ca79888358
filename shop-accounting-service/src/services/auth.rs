use std::sync::Arc;

use secrecy::Secret;
use tracing::{info, instrument, warn};

use crate::dtos::RegisterRequest;
use crate::models::{NewUser, User};
use crate::services::error::ServiceError;
use crate::services::jwt::{JwtService, TokenResponse};
use crate::services::store::AccountingStore;
use crate::services::token_store::TokenStore;
use crate::utils::password;

/// Registration, login and bearer-token authentication.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AccountingStore>,
    tokens: Arc<dyn TokenStore>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AccountingStore>,
        tokens: Arc<dyn TokenStore>,
        jwt: JwtService,
    ) -> Self {
        Self { store, tokens, jwt }
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<User, ServiceError> {
        if self
            .store
            .find_user_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(ServiceError::UsernameTaken);
        }
        if self.store.find_user_by_email(&request.email).await?.is_some() {
            return Err(ServiceError::EmailTaken);
        }

        let secret = Secret::new(request.password);
        let hashed_password =
            tokio::task::spawn_blocking(move || password::hash_password(&secret))
                .await
                .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;

        let user = self
            .store
            .create_user(&NewUser {
                username: request.username,
                email: request.email,
                hashed_password,
            })
            .await?;

        info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Issue a token and make it the user's only valid one.
    #[instrument(skip(self, supplied))]
    pub async fn login(
        &self,
        username: &str,
        supplied: String,
    ) -> Result<TokenResponse, ServiceError> {
        let user = self.store.find_user_by_username(username).await?;
        let secret = Secret::new(supplied);

        let Some(user) = user else {
            tokio::task::spawn_blocking(move || password::verify_dummy(&secret))
                .await
                .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))?;
            warn!("Login failed: unknown username");
            return Err(ServiceError::InvalidCredentials);
        };

        let hash = user.hashed_password.clone();
        let verified =
            tokio::task::spawn_blocking(move || password::verify_password(&secret, &hash))
                .await
                .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))??;
        if !verified {
            warn!(user_id = user.id, "Login failed: wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        let access_token = self.jwt.generate_access_token(user.id, &user.username)?;
        let expires_in = self.jwt.access_token_expiry_seconds();
        self.tokens
            .store_token(user.id, &access_token, expires_in)
            .await?;

        info!(user_id = user.id, "User logged in");
        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
        })
    }

    #[instrument(skip(self))]
    pub async fn logout(&self, user_id: i64) -> Result<(), ServiceError> {
        self.tokens.delete_token(user_id).await?;
        info!(user_id, "User logged out");
        Ok(())
    }

    /// Resolve a bearer token to its user.
    ///
    /// Fails unless the token verifies and is still the user's stored token.
    pub async fn authenticate(&self, token: &str) -> Result<User, ServiceError> {
        let claims = self
            .jwt
            .validate_access_token(token)
            .map_err(|_| ServiceError::InvalidToken)?;
        let user_id = claims.user_id().map_err(|_| ServiceError::InvalidToken)?;

        if !self.tokens.is_token_valid(user_id, token).await? {
            return Err(ServiceError::InvalidToken);
        }

        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::services::memory::InMemoryStore;
    use crate::services::token_store::MockTokenStore;
    use jsonwebtoken::Algorithm;

    fn auth_service() -> AuthService {
        let jwt = JwtService::new(&JwtConfig {
            secret_key: Secret::new("auth-service-test".to_string()),
            algorithm: Algorithm::HS256,
            access_token_expire_minutes: 30,
        });
        AuthService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(MockTokenStore::new()),
            jwt,
        )
    }

    fn registration(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login_then_authenticate() {
        let auth = auth_service();
        let user = auth
            .register(registration("ito", "ito@example.com"))
            .await
            .unwrap();
        assert_ne!(user.hashed_password, "password123");

        let token = auth.login("ito", "password123".to_string()).await.unwrap();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 1800);

        let resolved = auth.authenticate(&token.access_token).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_username_and_email_rejected() {
        let auth = auth_service();
        auth.register(registration("ito", "ito@example.com"))
            .await
            .unwrap();

        assert!(matches!(
            auth.register(registration("ito", "other@example.com")).await,
            Err(ServiceError::UsernameTaken)
        ));
        assert!(matches!(
            auth.register(registration("other", "ito@example.com")).await,
            Err(ServiceError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn bad_credentials_rejected() {
        let auth = auth_service();
        auth.register(registration("ito", "ito@example.com"))
            .await
            .unwrap();

        assert!(matches!(
            auth.login("ito", "wrong-password".to_string()).await,
            Err(ServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody", "password123".to_string()).await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn new_login_supersedes_old_token() {
        let auth = auth_service();
        auth.register(registration("ito", "ito@example.com"))
            .await
            .unwrap();

        let first = auth.login("ito", "password123".to_string()).await.unwrap();
        let second = auth.login("ito", "password123".to_string()).await.unwrap();

        assert!(auth.authenticate(&first.access_token).await.is_err());
        assert!(auth.authenticate(&second.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn logout_revokes_token() {
        let auth = auth_service();
        let user = auth
            .register(registration("ito", "ito@example.com"))
            .await
            .unwrap();
        let token = auth.login("ito", "password123".to_string()).await.unwrap();

        auth.logout(user.id).await.unwrap();

        assert!(matches!(
            auth.authenticate(&token.access_token).await,
            Err(ServiceError::InvalidToken)
        ));
    }
}
