//! Sale Models

use serde::{Deserialize, Serialize};

/// Payment method recorded on a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Mixed,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

/// One caller-supplied cart line: which product, how many
///
/// Prices are never taken from the caller; the engine reads the current
/// catalog price at commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i32,
}

/// Sale entity
///
/// Immutable after creation. Owns an ordered sequence of [`SaleItem`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    /// Unique invoice reference, e.g. "INV-00000042"
    pub invoice_number: String,
    /// Sum of line totals (post discount/tax when applied)
    pub total_amount: f64,
    pub discount: f64,
    pub tax: f64,
    pub payment_method: PaymentMethod,
    /// Cashier (user) reference
    pub cashier_id: i64,
    /// Optional loyalty customer reference
    pub customer_id: Option<i64>,
    pub created_at: i64,
}

/// Sale line item
///
/// `unit_price` is frozen at sale time; later catalog price changes do not
/// alter historical sales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: f64,
    /// quantity × unit_price
    pub line_total: f64,
}

/// Sale with its items, as returned by read accessors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleWithItems {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Result of a committed sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub sale_id: i64,
    pub invoice_number: String,
    pub total_amount: f64,
    /// Loyalty points credited to the customer (0 without a customer)
    pub points_earned: i64,
}
