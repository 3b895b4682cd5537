//! JWT authentication and role-gate middleware.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::BEARER_TOKEN_PREFIX;
use crate::domain::RoleName;
use crate::errors::AppError;

/// Authenticated user extracted from JWT token
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub role: Option<RoleName>,
}

impl CurrentUser {
    pub fn has_role(&self, role: RoleName) -> bool {
        self.role == Some(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(RoleName::Admin)
    }

    /// Admins may act on anyone; everyone else only on themselves.
    pub fn ensure_self_or_admin(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.is_admin() || self.id == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// JWT authentication middleware.
///
/// Extracts and validates the JWT token from the Authorization header,
/// then reloads the user so the role gates see the stored role rather
/// than the one captured at login. A token whose user no longer exists
/// is rejected with 401.
///
/// The CurrentUser is injected into the request extensions and also
/// attached to the response so outer layers can log it.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix(BEARER_TOKEN_PREFIX)
        .ok_or(AppError::Unauthorized)?;

    let claims = state.services.auth().verify_token(token)?;

    let user = match state.services.accounts().get_user(claims.sub).await {
        Ok(user) => user,
        Err(AppError::NotFound) => {
            tracing::debug!(user_id = %claims.sub, "Token refers to a deleted user");
            return Err(AppError::Unauthorized);
        }
        Err(e) => return Err(e),
    };

    let current_user = CurrentUser {
        id: user.id,
        username: user.username,
        role: user.role,
    };

    request.extensions_mut().insert(current_user.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(current_user);
    Ok(response)
}

async fn require_role(
    role: RoleName,
    user: CurrentUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !user.has_role(role) {
        tracing::debug!(user_id = %user.id, required = %role, "Role gate rejected request");
        return Err(AppError::Forbidden);
    }
    Ok(next.run(request).await)
}

pub async fn admin_only(
    user: CurrentUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(RoleName::Admin, user, request, next).await
}

pub async fn instructor_only(
    user: CurrentUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(RoleName::Instructor, user, request, next).await
}

pub async fn student_only(
    user: CurrentUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(RoleName::Student, user, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Option<RoleName>) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            username: "ana".to_string(),
            role,
        }
    }

    #[test]
    fn test_only_admin_reads_others() {
        let other = Uuid::new_v4();
        assert!(user(Some(RoleName::Admin)).ensure_self_or_admin(other).is_ok());
        assert!(matches!(
            user(Some(RoleName::Student)).ensure_self_or_admin(other),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_self_access_without_role() {
        let me = user(None);
        assert!(me.ensure_self_or_admin(me.id).is_ok());
        assert!(!me.is_admin());
    }
}
