//! User Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Backoffice role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    Cashier,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Cashier
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Unique login name
    pub username: String,
    /// Unique email, optional
    pub email: Option<String>,
    /// Argon2 PHC string; the web layer must strip this before rendering
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

/// Create user payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(length(min = 3, max = 80))]
    pub username: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 6))]
    pub password: String,
    pub role: Option<UserRole>,
}
