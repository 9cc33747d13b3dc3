//! Customer Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Customer tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    Regular,
    Vip,
    Premium,
}

impl Default for CustomerType {
    fn default() -> Self {
        CustomerType::Regular
    }
}

/// Customer entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    /// Unique phone number
    pub phone: String,
    /// Unique email, optional
    pub email: Option<String>,
    pub address: Option<String>,
    /// ISO date "YYYY-MM-DD"
    pub birth_date: Option<String>,
    pub customer_type: CustomerType,
    /// Loyalty balance, monotonically non-decreasing under sale accrual
    pub loyalty_points: i64,
    /// Lifetime purchase total, monotonically non-decreasing
    pub total_purchases: f64,
    pub is_active: bool,
    pub created_at: i64,
}

/// Create customer payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CustomerCreate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 5, max = 20))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub loyalty_points: Option<i64>,
}

/// Update customer payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub is_active: Option<bool>,
}

/// Customer listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerFilter {
    /// Substring match on name, phone or email
    pub search: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub is_active: Option<bool>,
}
