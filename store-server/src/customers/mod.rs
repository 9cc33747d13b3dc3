//! Customer Ledger - loyalty customers and accrual
//!
//! Owns Customer records: uniqueness on create (phone, optional email),
//! lookups, filtered listing and the additive-only accrual applied after a
//! completed sale.

use crate::db::{StorageError, StoreStorage};
use shared::PaginatedResponse;
use shared::models::{Customer, CustomerCreate, CustomerFilter, CustomerUpdate};
use shared::util::{now_millis, snowflake_id};
use thiserror::Error;
use validator::Validate;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(i64),

    #[error("Phone number already registered: {0}")]
    DuplicatePhone(String),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Customer ledger over the embedded store
#[derive(Clone)]
pub struct CustomerLedger {
    storage: StoreStorage,
}

impl CustomerLedger {
    pub fn new(storage: StoreStorage) -> Self {
        Self { storage }
    }

    // =========================================================================
    // Read
    // =========================================================================

    pub fn get_customer(&self, id: i64) -> LedgerResult<Option<Customer>> {
        Ok(self.storage.get_customer(id)?)
    }

    pub fn find_by_phone(&self, phone: &str) -> LedgerResult<Option<Customer>> {
        Ok(self.storage.find_customer_by_phone(phone)?)
    }

    pub fn find_by_email(&self, email: &str) -> LedgerResult<Option<Customer>> {
        Ok(self.storage.find_customer_by_email(email)?)
    }

    /// Filtered, paginated customer listing
    pub fn list_customers(
        &self,
        filter: &CustomerFilter,
        page: u32,
        per_page: u32,
    ) -> LedgerResult<PaginatedResponse<Customer>> {
        let needle = filter.search.as_deref().map(str::to_lowercase);

        let mut customers: Vec<Customer> = self
            .storage
            .list_customers()?
            .into_iter()
            .filter(|c| match &needle {
                Some(n) => {
                    c.name.to_lowercase().contains(n)
                        || c.phone.contains(n.as_str())
                        || c.email.as_deref().is_some_and(|e| e.to_lowercase().contains(n))
                }
                None => true,
            })
            .filter(|c| match filter.customer_type {
                Some(customer_type) => c.customer_type == customer_type,
                None => true,
            })
            .filter(|c| match filter.is_active {
                Some(is_active) => c.is_active == is_active,
                None => true,
            })
            .collect();

        // Newest first, stable across pages
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = customers.len() as u64;
        let page = page.max(1);
        let start = ((page - 1) * per_page) as usize;
        let data: Vec<Customer> = customers
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();

        Ok(PaginatedResponse::new(data, total, page, per_page))
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Create a new customer, enforcing phone/email uniqueness
    pub fn create_customer(&self, data: CustomerCreate) -> LedgerResult<Customer> {
        data.validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let customer = Customer {
            id: snowflake_id(),
            name: data.name,
            phone: data.phone,
            email: data.email,
            address: data.address,
            birth_date: data.birth_date,
            customer_type: data.customer_type.unwrap_or_default(),
            loyalty_points: data.loyalty_points.unwrap_or(0).max(0),
            total_purchases: 0.0,
            is_active: true,
            created_at: now_millis(),
        };

        let txn = self.storage.begin_write()?;
        if self.storage.phone_owner_txn(&txn, &customer.phone)?.is_some() {
            return Err(LedgerError::DuplicatePhone(customer.phone));
        }
        if let Some(email) = &customer.email {
            if self.storage.email_owner_txn(&txn, email)?.is_some() {
                return Err(LedgerError::DuplicateEmail(email.clone()));
            }
            self.storage.index_email(&txn, email, customer.id)?;
        }
        self.storage.index_phone(&txn, &customer.phone, customer.id)?;
        self.storage.put_customer(&txn, &customer)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(customer_id = customer.id, name = %customer.name, "Customer created");
        Ok(customer)
    }

    /// Update customer profile fields (phone/email changes are out of scope)
    pub fn update_customer(&self, id: i64, data: CustomerUpdate) -> LedgerResult<Customer> {
        let txn = self.storage.begin_write()?;
        let mut customer = self
            .storage
            .get_customer_txn(&txn, id)?
            .ok_or(LedgerError::CustomerNotFound(id))?;

        if let Some(name) = data.name {
            customer.name = name;
        }
        if let Some(address) = data.address {
            customer.address = Some(address);
        }
        if let Some(birth_date) = data.birth_date {
            customer.birth_date = Some(birth_date);
        }
        if let Some(customer_type) = data.customer_type {
            customer.customer_type = customer_type;
        }
        if let Some(is_active) = data.is_active {
            customer.is_active = is_active;
        }

        self.storage.put_customer(&txn, &customer)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(customer)
    }

    pub fn deactivate_customer(&self, id: i64) -> LedgerResult<Customer> {
        self.update_customer(
            id,
            CustomerUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
    }

    /// Add loyalty points and purchase total after a completed sale
    ///
    /// Accrual is additive only: negative deltas are rejected, so
    /// loyalty_points and total_purchases never decrease on this path.
    pub fn accrue(&self, customer_id: i64, points: i64, amount: f64) -> LedgerResult<Customer> {
        if points < 0 || amount < 0.0 {
            return Err(LedgerError::Validation(
                "accrual must be non-negative".into(),
            ));
        }

        let txn = self.storage.begin_write()?;
        let mut customer = self
            .storage
            .get_customer_txn(&txn, customer_id)?
            .ok_or(LedgerError::CustomerNotFound(customer_id))?;

        customer.loyalty_points += points;
        customer.total_purchases += amount;

        self.storage.put_customer(&txn, &customer)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::debug!(customer_id, points, amount, "Loyalty accrued");
        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::CustomerType;

    fn ledger() -> CustomerLedger {
        CustomerLedger::new(StoreStorage::open_in_memory().unwrap())
    }

    fn payload(name: &str, phone: &str, email: Option<&str>) -> CustomerCreate {
        CustomerCreate {
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.map(str::to_string),
            address: None,
            birth_date: None,
            customer_type: Some(CustomerType::Regular),
            loyalty_points: None,
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let ledger = ledger();
        let customer = ledger
            .create_customer(payload("Ada", "0101234567", Some("ada@example.com")))
            .unwrap();

        assert_eq!(
            ledger.find_by_phone("0101234567").unwrap().unwrap().id,
            customer.id
        );
        assert_eq!(
            ledger
                .find_by_email("ada@example.com")
                .unwrap()
                .unwrap()
                .id,
            customer.id
        );
    }

    #[test]
    fn test_duplicate_phone_rejected() {
        let ledger = ledger();
        ledger.create_customer(payload("Ada", "0101234567", None)).unwrap();

        let result = ledger.create_customer(payload("Eve", "0101234567", None));
        assert!(matches!(result, Err(LedgerError::DuplicatePhone(_))));

        // No second record was written
        let listing = ledger
            .list_customers(&CustomerFilter::default(), 1, 20)
            .unwrap();
        assert_eq!(listing.total, 1);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let ledger = ledger();
        ledger
            .create_customer(payload("Ada", "0101234567", Some("ada@example.com")))
            .unwrap();

        let result =
            ledger.create_customer(payload("Eve", "0109999999", Some("ada@example.com")));
        assert!(matches!(result, Err(LedgerError::DuplicateEmail(_))));
    }

    #[test]
    fn test_accrue_adds_points_and_total() {
        let ledger = ledger();
        let customer = ledger
            .create_customer(payload("Ada", "0101234567", None))
            .unwrap();

        let updated = ledger.accrue(customer.id, 4, 47.0).unwrap();
        assert_eq!(updated.loyalty_points, 4);
        assert_eq!(updated.total_purchases, 47.0);

        let again = ledger.accrue(customer.id, 0, 9.99).unwrap();
        assert_eq!(again.loyalty_points, 4);
        assert_eq!(again.total_purchases, 56.99);
    }

    #[test]
    fn test_negative_accrual_rejected() {
        let ledger = ledger();
        let customer = ledger
            .create_customer(payload("Ada", "0101234567", None))
            .unwrap();

        assert!(matches!(
            ledger.accrue(customer.id, -1, 10.0),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.accrue(customer.id, 1, -10.0),
            Err(LedgerError::Validation(_))
        ));

        let unchanged = ledger.get_customer(customer.id).unwrap().unwrap();
        assert_eq!(unchanged.loyalty_points, 0);
    }

    #[test]
    fn test_accrue_unknown_customer() {
        let ledger = ledger();
        assert!(matches!(
            ledger.accrue(12345, 1, 10.0),
            Err(LedgerError::CustomerNotFound(12345))
        ));
    }

    #[test]
    fn test_list_filter_by_type() {
        let ledger = ledger();
        ledger.create_customer(payload("Ada", "0101111", None)).unwrap();
        let mut vip = payload("Bea", "0102222", None);
        vip.customer_type = Some(CustomerType::Vip);
        ledger.create_customer(vip).unwrap();

        let vips = ledger
            .list_customers(
                &CustomerFilter {
                    customer_type: Some(CustomerType::Vip),
                    ..Default::default()
                },
                1,
                20,
            )
            .unwrap();
        assert_eq!(vips.total, 1);
        assert_eq!(vips.data[0].name, "Bea");
    }
}
