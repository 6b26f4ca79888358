use jsonwebtoken::Algorithm;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ShopAccountingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret_key: Secret<String>,
    pub algorithm: Algorithm,
    pub access_token_expire_minutes: i64,
}

impl ShopAccountingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_env = |key: &str, default: Option<&str>| -> Result<String, AppError> {
            match lookup(key) {
                Some(val) => Ok(val),
                None => default.map(str::to_string).ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!("{} is required but not set", key))
                }),
            }
        };

        let config = ShopAccountingConfig {
            common,
            service_name: get_env("SERVICE_NAME", Some("shop-accounting-service"))?,
            log_level: get_env("LOG_LEVEL", Some("info"))?,
            otlp_endpoint: lookup("OTLP_ENDPOINT").filter(|v| !v.trim().is_empty()),
            database: DatabaseConfig {
                url: Secret::new(get_env("DATABASE_URL", None)?),
                max_connections: parse_var(
                    "DATABASE_MAX_CONNECTIONS",
                    &get_env("DATABASE_MAX_CONNECTIONS", Some("10"))?,
                )?,
                min_connections: parse_var(
                    "DATABASE_MIN_CONNECTIONS",
                    &get_env("DATABASE_MIN_CONNECTIONS", Some("2"))?,
                )?,
            },
            redis: RedisConfig {
                url: Secret::new(get_env("REDIS_URL", Some("redis://localhost:6379/0"))?),
            },
            jwt: JwtConfig {
                secret_key: Secret::new(get_env("JWT_SECRET_KEY", None)?),
                algorithm: Algorithm::from_str(&get_env("JWT_ALGORITHM", Some("HS256"))?)
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!("Invalid JWT_ALGORITHM: {}", e))
                    })?,
                access_token_expire_minutes: parse_var(
                    "JWT_ACCESS_TOKEN_EXPIRE_MINUTES",
                    &get_env("JWT_ACCESS_TOKEN_EXPIRE_MINUTES", Some("30"))?,
                )?,
            },
            allowed_origins: get_env("ALLOWED_ORIGINS", Some(""))?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.access_token_expire_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRE_MINUTES must be positive"
            )));
        }

        if !matches!(
            self.jwt.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ALGORITHM must be one of HS256, HS384, HS512"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS must not exceed DATABASE_MAX_CONNECTIONS"
            )));
        }

        if self.allowed_origins.iter().any(|o| o == "*") {
            tracing::warn!("Wildcard CORS origin configured");
        }

        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e)))
}
