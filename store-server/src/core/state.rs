//! Application state
//!
//! Bundles the storage handle, the domain services and the backup manager
//! for the (external) web layer. Also runs the first-start seed routine.

use crate::backup::{BackupManager, BackupPaths};
use crate::catalog::CatalogService;
use crate::core::config::Config;
use crate::customers::CustomerLedger;
use crate::db::StoreStorage;
use crate::sales::SalesEngine;
use crate::users::UserDirectory;
use anyhow::Result;
use shared::models::{CategoryCreate, UserCreate, UserRole};
use std::sync::Arc;

const DEFAULT_CATEGORIES: [(&str, &str); 5] = [
    ("Groceries", "Staple food items"),
    ("Beverages", "Drinks and juices"),
    ("Cleaning", "Cleaning supplies and soap"),
    ("Personal Care", "Personal care items"),
    ("Dairy", "Milk, cheese and yogurt"),
];

/// Application state shared with the web layer
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: StoreStorage,
    pub catalog: CatalogService,
    pub ledger: CustomerLedger,
    pub users: UserDirectory,
    pub sales: SalesEngine,
    pub backup: Arc<BackupManager>,
}

impl AppState {
    /// Open the store, wire up every service and seed first-start defaults
    pub fn initialize(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        std::fs::create_dir_all(config.uploads_dir())?;

        let storage = StoreStorage::open(config.database_file())?;
        let backup = Arc::new(BackupManager::new(
            storage.clone(),
            BackupPaths {
                backup_dir: config.backup_dir(),
                database_file: config.database_file(),
                uploads_dir: config.uploads_dir(),
                config_file: config.backup_config_file(),
                extra_config_files: vec![config.work_dir.join(".env")],
            },
        )?);

        let state = Self {
            catalog: CatalogService::new(storage.clone()),
            ledger: CustomerLedger::new(storage.clone()),
            users: UserDirectory::new(storage.clone()),
            sales: SalesEngine::new(storage.clone()),
            backup,
            storage,
            config,
        };
        state.seed_defaults()?;
        Ok(state)
    }

    /// Create the default admin account and categories on an empty store
    fn seed_defaults(&self) -> Result<()> {
        if self.users.list_users()?.is_empty() {
            let password =
                std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
            self.users.create_user(UserCreate {
                username: "admin".to_string(),
                email: Some("admin@store.local".to_string()),
                password,
                role: Some(UserRole::Admin),
            })?;
            tracing::warn!("Created default admin user; change its password");
        }

        if self.storage.list_categories()?.is_empty() {
            for (name, description) in DEFAULT_CATEGORIES {
                self.catalog.create_category(CategoryCreate {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                })?;
            }
            tracing::info!("Created default categories");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_seeds_admin_and_categories_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_work_dir(dir.path());

        let state = AppState::initialize(config.clone()).unwrap();
        let admin = state.users.find_by_username("admin").unwrap().unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert_eq!(state.catalog.list_categories().unwrap().len(), 5);

        // Seeding is idempotent across restarts
        drop(state);
        let state = AppState::initialize(config).unwrap();
        assert_eq!(state.users.list_users().unwrap().len(), 1);
        assert_eq!(state.catalog.list_categories().unwrap().len(), 5);
    }
}
