//! Authentication middleware
//!
//! JWT authentication and role-based access control middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use shared::{permission, Action, Resource, UserRole};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::AuthService;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        self.permissions.contains(&permission(resource, action))
    }
}

/// Validates the bearer token and stores the [`AuthUser`] in request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid Authorization header".to_string())
    })?;

    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let claims = auth_service.validate_token(bearer.token())?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))?;
    let role = UserRole::parse_label(&claims.role)
        .ok_or_else(|| AppError::Unauthorized("Invalid role in token".to_string()))?;

    request.extensions_mut().insert(AuthUser {
        user_id,
        email: claims.email,
        role,
        permissions: claims.permissions,
    });

    Ok(next.run(request).await)
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Permission guard for use in handlers
pub fn check_permission(user: &AuthUser, resource: Resource, action: Action) -> AppResult<()> {
    if user.has_permission(resource, action) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %user.user_id,
            "Permission denied: requires {}",
            permission(resource, action)
        );
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
            permissions: role.permissions(),
        }
    }

    #[test]
    fn test_check_permission() {
        let staff = user(UserRole::Staff);
        assert!(check_permission(&staff, Resource::Order, Action::Create).is_ok());
        assert!(matches!(
            check_permission(&staff, Resource::User, Action::Create),
            Err(AppError::InsufficientPermissions)
        ));
    }

    #[test]
    fn test_viewer_is_read_only() {
        let viewer = user(UserRole::Viewer);
        assert!(viewer.has_permission(Resource::Inventory, Action::View));
        assert!(!viewer.has_permission(Resource::Inventory, Action::Create));
        assert_eq!(viewer.role, UserRole::Viewer);
    }
}
