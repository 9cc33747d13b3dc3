//! Sales - transaction engine and money arithmetic

pub mod engine;
pub mod money;

pub use engine::{SaleAdjustments, SaleError, SaleResult, SalesEngine};
