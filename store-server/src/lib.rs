//! Store Server - retail POS and backoffice core
//!
//! # Architecture
//!
//! The embedded core behind a (separately deployed) web layer:
//!
//! - **db**: embedded redb store with a single-writer transaction discipline
//!   and a portable JSON export
//! - **catalog**: product/category management, stock adjustment
//! - **customers**: loyalty ledger with additive-only accrual
//! - **users**: backoffice accounts, Argon2 hashing
//! - **sales**: the sale transaction engine - a cart commits atomically as
//!   Sale + items + stock decrements + loyalty accrual
//! - **backup**: snapshot/retention/restore plus the periodic scheduler
//!
//! # Module structure
//!
//! ```text
//! store-server/src/
//! ├── core/          # config, state, background tasks
//! ├── db/            # storage layer and portable export
//! ├── catalog/       # Catalog Store
//! ├── customers/     # Customer Ledger
//! ├── users/         # User Directory
//! ├── sales/         # Sale Transaction Engine
//! ├── backup/        # Backup Manager + scheduler
//! └── utils/         # logging
//! ```

pub mod backup;
pub mod catalog;
pub mod core;
pub mod customers;
pub mod db;
pub mod sales;
pub mod users;
pub mod utils;

// Re-export public types
pub use backup::{AutoBackupScheduler, BackupConfig, BackupError, BackupManager, BackupPaths};
pub use catalog::{CatalogError, CatalogService};
pub use customers::{CustomerLedger, LedgerError};
pub use db::{StorageError, StoreStorage};
pub use sales::{SaleError, SalesEngine};
pub use self::core::{AppState, BackgroundTasks, Config, TaskKind};
pub use users::{UserDirectory, UserError};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
