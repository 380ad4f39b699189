//! User management service

use serde::Deserialize;
use shared::{PaginatedResponse, Pagination};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{User, UserRole, UserRow, USER_COLUMNS};
use crate::services::auth::{hash_password, verify_password};

/// User management service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// Input for creating a user
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub role: UserRole,
}

/// Input for updating a user
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(length(min = 1, max = 255, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// Input for changing a password
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordInput {
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

impl UpdateUserInput {
    /// Role changes and deactivation invalidate issued refresh tokens
    pub fn revokes_sessions(&self, current_role: UserRole) -> bool {
        self.is_active == Some(false) || self.role.is_some_and(|role| role != current_role)
    }
}

/// Filter for listing users
#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List users, newest first
    pub async fn list_users(&self, filter: &UserFilter) -> AppResult<PaginatedResponse<User>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let role = filter.role.map(|r| r.as_str());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR role = $1)
              AND ($2::bool IS NULL OR is_active = $2)
            "#,
        )
        .bind(role)
        .bind(filter.is_active)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {} FROM users
            WHERE ($1::text IS NULL OR role = $1)
              AND ($2::bool IS NULL OR is_active = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            USER_COLUMNS
        ))
        .bind(role)
        .bind(filter.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let users = rows
            .into_iter()
            .map(UserRow::into_user)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(users, &pagination, total as u64))
    }

    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        self.fetch_row(user_id).await?.into_user()
    }

    /// Create a user with a unique email
    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<User> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();

        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(&email)
            .fetch_one(&self.db)
            .await?;
        if existing > 0 {
            return Err(AppError::conflict("email", "A user with this email already exists"));
        }

        let password_hash = hash_password(&input.password)?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&email)
        .bind(&password_hash)
        .bind(input.name.trim())
        .bind(input.role.as_str())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %row.id, role = %row.role, "Created user");
        row.into_user()
    }

    /// Update name, role or active flag
    pub async fn update_user(
        &self,
        acting_user: Uuid,
        user_id: Uuid,
        input: UpdateUserInput,
    ) -> AppResult<User> {
        input.validate()?;
        if acting_user == user_id && input.is_active == Some(false) {
            return Err(AppError::validation("is_active", "You cannot deactivate your own account"));
        }
        let current_role = self.fetch_row(user_id).await?.role()?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                role = COALESCE($3, role),
                is_active = COALESCE($4, is_active)
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.role.map(|r| r.as_str()))
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        if input.revokes_sessions(current_role) {
            self.revoke_sessions(user_id).await?;
        }

        tracing::info!(user_id = %user_id, "Updated user");
        row.into_user()
    }

    /// Change a user's own password; the current password must match
    pub async fn change_password(&self, user_id: Uuid, input: ChangePasswordInput) -> AppResult<()> {
        input.validate()?;
        let row = self.fetch_row(user_id).await?;

        if !verify_password(&input.current_password, &row.password_hash)? {
            return Err(AppError::validation("current_password", "Current password is incorrect"));
        }

        let password_hash = hash_password(&input.new_password)?;
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(&password_hash)
            .execute(&self.db)
            .await?;

        self.revoke_sessions(user_id).await?;
        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Deactivate a user and revoke their refresh tokens
    pub async fn deactivate_user(&self, acting_user: Uuid, user_id: Uuid) -> AppResult<User> {
        if acting_user == user_id {
            return Err(AppError::validation("id", "You cannot deactivate your own account"));
        }

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET is_active = false WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        self.revoke_sessions(user_id).await?;
        tracing::info!(user_id = %user_id, "Deactivated user");
        row.into_user()
    }

    async fn fetch_row(&self, user_id: Uuid) -> AppResult<UserRow> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    async fn revoke_sessions(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_validation() {
        let input = CreateUserInput {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            name: "Somchai".to_string(),
            role: UserRole::Staff,
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_update_user_allows_partial() {
        let input = UpdateUserInput {
            name: None,
            role: Some(UserRole::Manager),
            is_active: None,
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_role_change_revokes_sessions() {
        let promote = UpdateUserInput {
            name: None,
            role: Some(UserRole::Manager),
            is_active: None,
        };
        assert!(promote.revokes_sessions(UserRole::Staff));
        assert!(!promote.revokes_sessions(UserRole::Manager));

        let rename = UpdateUserInput {
            name: Some("Somchai P.".to_string()),
            role: None,
            is_active: Some(true),
        };
        assert!(!rename.revokes_sessions(UserRole::Viewer));

        let deactivate = UpdateUserInput {
            name: None,
            role: None,
            is_active: Some(false),
        };
        assert!(deactivate.revokes_sessions(UserRole::Viewer));
    }
}
