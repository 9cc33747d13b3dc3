//! Server configuration
//!
//! All settings come from environment variables with defaults:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/store-server | Working directory (database, uploads, backups, logs) |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | LOG_LEVEL | info | tracing level filter |
//! | ADMIN_PASSWORD | admin123 | Password for the seeded admin account |

use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding database, uploads, backups and logs
    pub work_dir: PathBuf,
    /// development | staging | production
    pub environment: String,
    /// tracing level filter
    pub log_level: String,
}

impl Config {
    /// Load from environment variables, using defaults for unset values
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/var/lib/store-server")),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
        }
    }

    /// Override the working directory (used by tests)
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    // === Derived paths ===

    pub fn database_file(&self) -> PathBuf {
        self.work_dir.join("store.redb")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.work_dir.join("uploads")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.work_dir.join("backups")
    }

    pub fn backup_config_file(&self) -> PathBuf {
        self.work_dir.join("backup_config.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.work_dir.join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
