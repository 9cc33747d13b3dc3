//! Backup subsystem - snapshot, retention, restore and scheduling
//!
//! - **config**: persisted [`BackupConfig`] with merge-with-defaults load
//! - **manager**: [`BackupManager`] (create/list/restore/retention)
//! - **scheduler**: [`AutoBackupScheduler`] periodic trigger

pub mod config;
pub mod manager;
pub mod scheduler;

pub use config::BackupConfig;
pub use manager::{
    BackupError, BackupManager, BackupOutcome, BackupPaths, BackupResult, RestoreOutcome,
    SystemStatus,
};
pub use scheduler::AutoBackupScheduler;
