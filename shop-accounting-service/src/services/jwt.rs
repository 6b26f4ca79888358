use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::config::JwtConfig;

/// Signs and verifies HMAC access tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_token_expire_minutes: i64,
}

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Token ID, makes every issued token distinct
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid token subject")))
    }
}

/// Token response returned to client
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret_key.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: config.algorithm,
            access_token_expire_minutes: config.access_token_expire_minutes,
        }
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user_id: i64, username: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expire_minutes);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?)
    }

    /// Validate and decode an access token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    /// Get access token expiry in seconds (for client info)
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expire_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn service(secret: &str, minutes: i64) -> JwtService {
        JwtService::new(&JwtConfig {
            secret_key: Secret::new(secret.to_string()),
            algorithm: Algorithm::HS256,
            access_token_expire_minutes: minutes,
        })
    }

    #[test]
    fn issued_token_validates() {
        let jwt = service("unit-test-secret", 30);
        let token = jwt.generate_access_token(7, "kimura").unwrap();

        let claims = jwt.validate_access_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.username, "kimura");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
        assert_eq!(jwt.access_token_expiry_seconds(), 1800);
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let jwt = service("unit-test-secret", 30);
        let first = jwt.generate_access_token(7, "kimura").unwrap();
        let second = jwt.generate_access_token(7, "kimura").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn token_signed_with_other_secret_rejected() {
        let token = service("one-secret", 30)
            .generate_access_token(7, "kimura")
            .unwrap();
        let result = service("another-secret", 30).validate_access_token(&token);
        assert!(matches!(result, Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_rejected() {
        let jwt = service("unit-test-secret", -5);
        let token = jwt.generate_access_token(7, "kimura").unwrap();
        assert!(matches!(
            jwt.validate_access_token(&token),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn garbage_rejected() {
        let jwt = service("unit-test-secret", 30);
        assert!(jwt.validate_access_token("not.a.jwt").is_err());
    }
}
