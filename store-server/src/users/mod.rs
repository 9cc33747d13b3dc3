//! User Directory - backoffice accounts
//!
//! User records with roles, Argon2 password hashing and uniqueness on
//! username and email. Session mechanics live in the external web layer;
//! this module only stores, verifies and stamps.

use crate::db::{StorageError, StoreStorage};
use shared::models::{User, UserCreate, UserRole};
use shared::util::{now_millis, snowflake_id};
use thiserror::Error;
use validator::Validate;

/// User directory errors
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type UserResult<T> = Result<T, UserError>;

/// Hash a password using argon2
pub fn hash_password(password: &str) -> UserResult<String> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| UserError::PasswordHash(e.to_string()))?;
    Ok(password_hash.to_string())
}

/// Verify a password against a stored argon2 hash
pub fn verify_hash(hash: &str, password: &str) -> bool {
    use argon2::{
        Argon2,
        password_hash::{PasswordHash, PasswordVerifier},
    };

    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// User directory over the embedded store
#[derive(Clone)]
pub struct UserDirectory {
    storage: StoreStorage,
}

impl UserDirectory {
    pub fn new(storage: StoreStorage) -> Self {
        Self { storage }
    }

    pub fn get_user(&self, id: i64) -> UserResult<Option<User>> {
        Ok(self.storage.get_user(id)?)
    }

    pub fn find_by_username(&self, username: &str) -> UserResult<Option<User>> {
        Ok(self.storage.find_user_by_username(username)?)
    }

    /// All users, newest first
    pub fn list_users(&self) -> UserResult<Vec<User>> {
        let mut users = self.storage.list_users()?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    /// Create a new user with a hashed password
    pub fn create_user(&self, data: UserCreate) -> UserResult<User> {
        data.validate()
            .map_err(|e| UserError::Validation(e.to_string()))?;

        let user = User {
            id: snowflake_id(),
            username: data.username,
            email: data.email,
            password_hash: hash_password(&data.password)?,
            role: data.role.unwrap_or_default(),
            is_active: true,
            created_at: now_millis(),
            last_login: None,
        };

        let txn = self.storage.begin_write()?;
        if self
            .storage
            .username_owner_txn(&txn, &user.username)?
            .is_some()
        {
            return Err(UserError::DuplicateUsername(user.username));
        }
        if let Some(email) = &user.email {
            if self.storage.user_email_owner_txn(&txn, email)?.is_some() {
                return Err(UserError::DuplicateEmail(email.clone()));
            }
            self.storage.index_user_email(&txn, email, user.id)?;
        }
        self.storage.index_username(&txn, &user.username, user.id)?;
        self.storage.put_user(&txn, &user)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(user_id = user.id, username = %user.username, role = ?user.role, "User created");
        Ok(user)
    }

    /// Verify a login attempt; returns the user only when the password
    /// matches and the account is active
    pub fn verify_password(&self, username: &str, password: &str) -> UserResult<Option<User>> {
        let Some(user) = self.storage.find_user_by_username(username)? else {
            return Ok(None);
        };
        if !user.is_active || !verify_hash(&user.password_hash, password) {
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Stamp a successful login
    pub fn record_login(&self, id: i64) -> UserResult<User> {
        let txn = self.storage.begin_write()?;
        let mut user = match self.storage.get_user(id)? {
            Some(u) => u,
            None => return Err(UserError::UserNotFound(id)),
        };
        user.last_login = Some(now_millis());
        self.storage.put_user(&txn, &user)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(user)
    }

    pub fn deactivate_user(&self, id: i64) -> UserResult<User> {
        let txn = self.storage.begin_write()?;
        let mut user = match self.storage.get_user(id)? {
            Some(u) => u,
            None => return Err(UserError::UserNotFound(id)),
        };
        user.is_active = false;
        self.storage.put_user(&txn, &user)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> UserDirectory {
        UserDirectory::new(StoreStorage::open_in_memory().unwrap())
    }

    fn payload(username: &str) -> UserCreate {
        UserCreate {
            username: username.to_string(),
            email: None,
            password: "s3cret-pw".to_string(),
            role: Some(UserRole::Cashier),
        }
    }

    #[test]
    fn test_create_hashes_password() {
        let directory = directory();
        let user = directory.create_user(payload("cashier1")).unwrap();
        assert_ne!(user.password_hash, "s3cret-pw");
        assert!(verify_hash(&user.password_hash, "s3cret-pw"));
        assert!(!verify_hash(&user.password_hash, "wrong"));
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let directory = directory();
        directory.create_user(payload("cashier1")).unwrap();
        let result = directory.create_user(payload("cashier1"));
        assert!(matches!(result, Err(UserError::DuplicateUsername(_))));
    }

    #[test]
    fn test_verify_password_flow() {
        let directory = directory();
        let user = directory.create_user(payload("admin1")).unwrap();

        let verified = directory.verify_password("admin1", "s3cret-pw").unwrap();
        assert_eq!(verified.unwrap().id, user.id);

        assert!(directory.verify_password("admin1", "nope").unwrap().is_none());
        assert!(directory.verify_password("ghost", "s3cret-pw").unwrap().is_none());
    }

    #[test]
    fn test_inactive_user_cannot_login() {
        let directory = directory();
        let user = directory.create_user(payload("leaver")).unwrap();
        directory.deactivate_user(user.id).unwrap();
        assert!(
            directory
                .verify_password("leaver", "s3cret-pw")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_short_password_rejected() {
        let directory = directory();
        let mut data = payload("shorty");
        data.password = "abc".to_string();
        assert!(matches!(
            directory.create_user(data),
            Err(UserError::Validation(_))
        ));
    }

    #[test]
    fn test_record_login_stamps_time() {
        let directory = directory();
        let user = directory.create_user(payload("clock")).unwrap();
        assert!(user.last_login.is_none());
        let stamped = directory.record_login(user.id).unwrap();
        assert!(stamped.last_login.is_some());
    }
}
