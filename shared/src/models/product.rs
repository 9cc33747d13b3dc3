//! Product Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Product entity
///
/// Products are never deleted, only deactivated; historical sales keep
/// referring to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Unique barcode (EAN/UPC)
    pub barcode: Option<String>,
    /// Unit sale price
    pub price: f64,
    pub cost_price: f64,
    /// Current stock on hand, never negative
    pub stock_quantity: i32,
    /// Low-stock threshold
    pub min_stock: i32,
    /// Category reference (kept stale after category deactivation)
    pub category_id: Option<i64>,
    pub description: Option<String>,
    /// Uploads-relative image path
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub barcode: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[validate(range(min = 0.0))]
    pub cost_price: Option<f64>,
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i32>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Update product payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub price: Option<f64>,
    pub cost_price: Option<f64>,
    pub min_stock: Option<i32>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
}

/// Stock-state filter for product listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockState {
    /// stock_quantity > min_stock
    InStock,
    /// 0 < stock_quantity <= min_stock
    LowStock,
    /// stock_quantity == 0
    OutOfStock,
}

impl StockState {
    /// Whether a product with the given quantities falls into this state
    pub fn matches(self, stock_quantity: i32, min_stock: i32) -> bool {
        match self {
            StockState::InStock => stock_quantity > min_stock,
            StockState::LowStock => stock_quantity > 0 && stock_quantity <= min_stock,
            StockState::OutOfStock => stock_quantity == 0,
        }
    }
}

/// Product listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Substring match on name or barcode
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub stock: Option<StockState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_state_partitions_active_products() {
        // min_stock = 5
        assert!(StockState::InStock.matches(6, 5));
        assert!(!StockState::InStock.matches(5, 5));
        assert!(StockState::LowStock.matches(5, 5));
        assert!(StockState::LowStock.matches(1, 5));
        assert!(!StockState::LowStock.matches(0, 5));
        assert!(StockState::OutOfStock.matches(0, 5));
        assert!(!StockState::OutOfStock.matches(1, 5));
    }
}
