//! Authentication service - Handles user authentication and authorization.
//!
//! SOLID (SRP): Handles authentication concerns only.
//! DDD: Uses domain Password value object for hashing.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{Config, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::domain::{Password, RoleName, User};
use crate::errors::{AppError, AppResult};
use crate::infra::UserRepository;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Checked against when the username is unknown so both paths hash once.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$ZHVtbXlzYWx0MTIzNDU2$8Cx2sXpGYHp3yEuNrBjl1UlI0klnHmP6sVs1d0jTR2c";

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Option<RoleName>,
    pub exp: i64,
    pub iat: i64,
}

/// Token response returned after successful authentication
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Token expiration time in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
}

/// Authentication service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Login by username and return a JWT
    async fn login(&self, username: String, password: String) -> AppResult<TokenResponse>;

    /// Sign a token for an already authenticated user
    fn issue_token(&self, user: &User) -> AppResult<TokenResponse>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;
}

/// Concrete implementation of AuthService.
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    config: Config,
}

impl Authenticator {
    pub fn new(users: Arc<dyn UserRepository>, config: Config) -> Self {
        Self { users, config }
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn login(&self, username: String, password: String) -> AppResult<TokenResponse> {
        let user = self.users.find_user_by_username(&username).await?;

        // Verify even for unknown users so response time does not reveal
        // which usernames exist.
        let stored_hash = user
            .as_ref()
            .map(|u| u.password_hash.as_str())
            .unwrap_or(DUMMY_HASH);
        let password_valid = Password::from_hash(stored_hash).verify(&password);

        match user {
            Some(user) if password_valid => {
                tracing::info!(user_id = %user.id, "User logged in");
                self.issue_token(&user)
            }
            _ => Err(AppError::InvalidCredentials),
        }
    }

    fn issue_token(&self, user: &User) -> AppResult<TokenResponse> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.jwt_expiration_hours);

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret_bytes()),
        )?;

        Ok(TokenResponse {
            access_token: token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.config.jwt_expiration_hours * SECONDS_PER_HOUR,
        })
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MockUserRepository;

    fn config() -> Config {
        Config::new("memory://", "test-secret-key-for-testing-only-32chars").unwrap()
    }

    fn user(password_hash: String) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash,
            role: Some(RoleName::Student),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_issued_token_round_trips() {
        let auth = Authenticator::new(Arc::new(MockUserRepository::new()), config());
        let user = user(String::new());

        let token = auth.issue_token(&user).unwrap();
        let claims = auth.verify_token(&token.access_token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.role, Some(RoleName::Student));
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn test_tampered_token_rejected() {
        let auth = Authenticator::new(Arc::new(MockUserRepository::new()), config());
        let token = auth.issue_token(&user(String::new())).unwrap();

        let result = auth.verify_token(&format!("{}x", token.access_token));
        assert!(matches!(result, Err(AppError::Jwt(_))));
    }

    #[tokio::test]
    async fn test_unknown_username_is_invalid_credentials() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_user_by_username()
            .returning(|_| Ok(None));
        let auth = Authenticator::new(Arc::new(users), config());

        let result = auth.login("nobody".to_string(), "whatever1".to_string()).await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let hash = Password::new("correct-horse").unwrap().into_string();
        let stored = user(hash);
        let mut users = MockUserRepository::new();
        users
            .expect_find_user_by_username()
            .returning(move |_| Ok(Some(stored.clone())));
        let auth = Authenticator::new(Arc::new(users), config());

        assert!(auth
            .login("ana".to_string(), "correct-horse".to_string())
            .await
            .is_ok());
        assert!(matches!(
            auth.login("ana".to_string(), "wrong-horse".to_string()).await,
            Err(AppError::InvalidCredentials)
        ));
    }
}
