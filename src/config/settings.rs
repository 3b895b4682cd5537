//! Application settings loaded from environment variables.

use std::env;

use super::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_JWT_EXPIRATION_HOURS, DEFAULT_NOTIFICATION_RETENTION_DAYS,
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, MEMORY_DATABASE_SCHEME, MIN_JWT_SECRET_LENGTH,
};
use crate::errors::{AppError, AppResult};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub notification_retention_days: i64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field(
                "notification_retention_days",
                &self.notification_retention_days,
            )
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables, reading `.env` first.
    ///
    /// A missing JWT_SECRET falls back to a development value in debug
    /// builds only.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            }
            Err(_) => {
                return Err(AppError::validation(
                    "JWT_SECRET environment variable must be set in production",
                ))
            }
        };

        let mut config = Self::new(
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            jwt_secret,
        )?;
        config.jwt_expiration_hours =
            parse_var("JWT_EXPIRATION_HOURS").unwrap_or(DEFAULT_JWT_EXPIRATION_HOURS);
        config.server_host =
            env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string());
        config.server_port = parse_var("SERVER_PORT").unwrap_or(DEFAULT_SERVER_PORT);
        config.notification_retention_days = parse_var("NOTIFICATION_RETENTION_DAYS")
            .unwrap_or(DEFAULT_NOTIFICATION_RETENTION_DAYS);

        Ok(config)
    }

    /// Build a configuration with defaults for everything but the connection
    /// URL and signing secret.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> AppResult<Self> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::validation(format!(
                "JWT secret must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            )));
        }

        Ok(Self {
            database_url: database_url.into(),
            jwt_secret,
            jwt_expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            notification_retention_days: DEFAULT_NOTIFICATION_RETENTION_DAYS,
        })
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// True when the configured URL selects the in-memory store.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with(MEMORY_DATABASE_SCHEME)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_rejected() {
        let result = Config::new("memory://", "short");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_memory_scheme_detected() {
        let config = Config::new("memory://", "test-secret-key-for-testing-only-32chars").unwrap();
        assert!(config.uses_memory_store());

        let config = Config::new(
            "postgres://localhost/records",
            "test-secret-key-for-testing-only-32chars",
        )
        .unwrap();
        assert!(!config.uses_memory_store());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::new("memory://", "test-secret-key-for-testing-only-32chars").unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("test-secret-key"));
        assert!(printed.contains("[REDACTED]"));
    }
}
