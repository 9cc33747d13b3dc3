//! Database layer - embedded redb store and portable export

pub mod export;
pub mod storage;

pub use export::{SaleExport, StoreExport};
pub use storage::{StorageError, StorageResult, StoreStorage};
