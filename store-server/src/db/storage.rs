//! redb-based storage layer for the store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `products` | `id` | `Product` | Catalog records |
//! | `categories` | `id` | `Category` | Catalog groupings |
//! | `customers` | `id` | `Customer` | Loyalty ledger records |
//! | `users` | `id` | `User` | Backoffice accounts |
//! | `sales` | `id` | `Sale` | Committed sales (immutable) |
//! | `sale_items` | `(sale_id, line_no)` | `SaleItem` | Ordered line items |
//! | `barcode_index` | `barcode` | `product_id` | Uniqueness + lookup |
//! | `phone_index` | `phone` | `customer_id` | Uniqueness + lookup |
//! | `email_index` | `email` | `customer_id` | Uniqueness + lookup |
//! | `username_index` | `username` | `user_id` | Uniqueness + lookup |
//! | `user_email_index` | `email` | `user_id` | Uniqueness + lookup |
//! | `counters` | `name` | `u64` | Invoice number sequence |
//!
//! # Transaction discipline
//!
//! Write methods take a `&WriteTransaction` so callers decide the commit
//! boundary: a multi-entity mutation (sale + items + stock + accrual) is
//! staged on one transaction and becomes visible atomically at `commit()`.
//! redb admits a single writer at a time, which serializes every
//! check-then-mutate sequence against the same records.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{Category, Customer, Product, Sale, SaleItem, User};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub(super) const PRODUCTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("products");
pub(super) const CATEGORIES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("categories");
pub(super) const CUSTOMERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("customers");
pub(super) const USERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("users");
pub(super) const SALES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("sales");

/// Line items keyed by (sale_id, line_no) so a range scan returns them in
/// cart order.
pub(super) const SALE_ITEMS_TABLE: TableDefinition<(i64, u32), &[u8]> = TableDefinition::new("sale_items");

pub(super) const BARCODE_INDEX: TableDefinition<&str, i64> = TableDefinition::new("barcode_index");
pub(super) const PHONE_INDEX: TableDefinition<&str, i64> = TableDefinition::new("phone_index");
pub(super) const EMAIL_INDEX: TableDefinition<&str, i64> = TableDefinition::new("email_index");
pub(super) const USERNAME_INDEX: TableDefinition<&str, i64> = TableDefinition::new("username_index");
pub(super) const USER_EMAIL_INDEX: TableDefinition<&str, i64> = TableDefinition::new("user_email_index");

pub(super) const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

pub(super) const INVOICE_SEQ_KEY: &str = "invoice_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

pub(super) fn to_bytes<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(super) fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Store storage backed by redb
///
/// Cheap to clone; all clones share the same database handle.
#[derive(Clone)]
pub struct StoreStorage {
    pub(super) db: Arc<Database>,
}

impl StoreStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: the file is always in a
    /// consistent state, even across power loss mid-commit.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let _ = txn.open_table(PRODUCTS_TABLE)?;
            let _ = txn.open_table(CATEGORIES_TABLE)?;
            let _ = txn.open_table(CUSTOMERS_TABLE)?;
            let _ = txn.open_table(USERS_TABLE)?;
            let _ = txn.open_table(SALES_TABLE)?;
            let _ = txn.open_table(SALE_ITEMS_TABLE)?;
            let _ = txn.open_table(BARCODE_INDEX)?;
            let _ = txn.open_table(PHONE_INDEX)?;
            let _ = txn.open_table(EMAIL_INDEX)?;
            let _ = txn.open_table(USERNAME_INDEX)?;
            let _ = txn.open_table(USER_EMAIL_INDEX)?;

            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            if counters.get(INVOICE_SEQ_KEY)?.is_none() {
                counters.insert(INVOICE_SEQ_KEY, 0u64)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    ///
    /// Blocks while another writer is active; dropping the transaction
    /// without `commit()` discards every staged change.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Products ==========

    pub fn put_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        table.insert(product.id, to_bytes(product)?.as_slice())?;
        Ok(())
    }

    pub fn get_product_txn(
        &self,
        txn: &WriteTransaction,
        id: i64,
    ) -> StorageResult<Option<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        table
            .get(id)?
            .map(|guard| from_bytes(guard.value()))
            .transpose()
    }

    pub fn get_product(&self, id: i64) -> StorageResult<Option<Product>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PRODUCTS_TABLE)?;
        table
            .get(id)?
            .map(|guard| from_bytes(guard.value()))
            .transpose()
    }

    pub fn list_products(&self) -> StorageResult<Vec<Product>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PRODUCTS_TABLE)?;
        let mut products = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            products.push(from_bytes(value.value())?);
        }
        Ok(products)
    }

    pub fn find_product_by_barcode(&self, barcode: &str) -> StorageResult<Option<Product>> {
        let txn = self.db.begin_read()?;
        let index = txn.open_table(BARCODE_INDEX)?;
        let Some(id) = index.get(barcode)?.map(|guard| guard.value()) else {
            return Ok(None);
        };
        drop(index);
        let table = txn.open_table(PRODUCTS_TABLE)?;
        table
            .get(id)?
            .map(|guard| from_bytes(guard.value()))
            .transpose()
    }

    /// Current owner of a barcode, within a write transaction
    pub fn barcode_owner_txn(
        &self,
        txn: &WriteTransaction,
        barcode: &str,
    ) -> StorageResult<Option<i64>> {
        let index = txn.open_table(BARCODE_INDEX)?;
        Ok(index.get(barcode)?.map(|guard| guard.value()))
    }

    pub fn index_barcode(
        &self,
        txn: &WriteTransaction,
        barcode: &str,
        product_id: i64,
    ) -> StorageResult<()> {
        let mut index = txn.open_table(BARCODE_INDEX)?;
        index.insert(barcode, product_id)?;
        Ok(())
    }

    pub fn unindex_barcode(&self, txn: &WriteTransaction, barcode: &str) -> StorageResult<()> {
        let mut index = txn.open_table(BARCODE_INDEX)?;
        index.remove(barcode)?;
        Ok(())
    }

    // ========== Categories ==========

    pub fn put_category(&self, txn: &WriteTransaction, category: &Category) -> StorageResult<()> {
        let mut table = txn.open_table(CATEGORIES_TABLE)?;
        table.insert(category.id, to_bytes(category)?.as_slice())?;
        Ok(())
    }

    pub fn get_category(&self, id: i64) -> StorageResult<Option<Category>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CATEGORIES_TABLE)?;
        table
            .get(id)?
            .map(|guard| from_bytes(guard.value()))
            .transpose()
    }

    pub fn list_categories(&self) -> StorageResult<Vec<Category>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CATEGORIES_TABLE)?;
        let mut categories = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            categories.push(from_bytes(value.value())?);
        }
        Ok(categories)
    }

    // ========== Customers ==========

    pub fn put_customer(&self, txn: &WriteTransaction, customer: &Customer) -> StorageResult<()> {
        let mut table = txn.open_table(CUSTOMERS_TABLE)?;
        table.insert(customer.id, to_bytes(customer)?.as_slice())?;
        Ok(())
    }

    pub fn get_customer_txn(
        &self,
        txn: &WriteTransaction,
        id: i64,
    ) -> StorageResult<Option<Customer>> {
        let table = txn.open_table(CUSTOMERS_TABLE)?;
        table
            .get(id)?
            .map(|guard| from_bytes(guard.value()))
            .transpose()
    }

    pub fn get_customer(&self, id: i64) -> StorageResult<Option<Customer>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CUSTOMERS_TABLE)?;
        table
            .get(id)?
            .map(|guard| from_bytes(guard.value()))
            .transpose()
    }

    pub fn list_customers(&self) -> StorageResult<Vec<Customer>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CUSTOMERS_TABLE)?;
        let mut customers = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            customers.push(from_bytes(value.value())?);
        }
        Ok(customers)
    }

    fn find_by_str_index(
        &self,
        index: TableDefinition<&'static str, i64>,
        table: TableDefinition<i64, &'static [u8]>,
        key: &str,
    ) -> StorageResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let index_table = txn.open_table(index)?;
        let Some(id) = index_table.get(key)?.map(|guard| guard.value()) else {
            return Ok(None);
        };
        drop(index_table);
        let records = txn.open_table(table)?;
        Ok(records.get(id)?.map(|guard| guard.value().to_vec()))
    }

    pub fn find_customer_by_phone(&self, phone: &str) -> StorageResult<Option<Customer>> {
        self.find_by_str_index(PHONE_INDEX, CUSTOMERS_TABLE, phone)?
            .map(|bytes| from_bytes(&bytes))
            .transpose()
    }

    pub fn find_customer_by_email(&self, email: &str) -> StorageResult<Option<Customer>> {
        self.find_by_str_index(EMAIL_INDEX, CUSTOMERS_TABLE, email)?
            .map(|bytes| from_bytes(&bytes))
            .transpose()
    }

    pub fn phone_owner_txn(
        &self,
        txn: &WriteTransaction,
        phone: &str,
    ) -> StorageResult<Option<i64>> {
        let index = txn.open_table(PHONE_INDEX)?;
        Ok(index.get(phone)?.map(|guard| guard.value()))
    }

    pub fn email_owner_txn(
        &self,
        txn: &WriteTransaction,
        email: &str,
    ) -> StorageResult<Option<i64>> {
        let index = txn.open_table(EMAIL_INDEX)?;
        Ok(index.get(email)?.map(|guard| guard.value()))
    }

    pub fn index_phone(
        &self,
        txn: &WriteTransaction,
        phone: &str,
        customer_id: i64,
    ) -> StorageResult<()> {
        let mut index = txn.open_table(PHONE_INDEX)?;
        index.insert(phone, customer_id)?;
        Ok(())
    }

    pub fn index_email(
        &self,
        txn: &WriteTransaction,
        email: &str,
        customer_id: i64,
    ) -> StorageResult<()> {
        let mut index = txn.open_table(EMAIL_INDEX)?;
        index.insert(email, customer_id)?;
        Ok(())
    }

    // ========== Users ==========

    pub fn put_user(&self, txn: &WriteTransaction, user: &User) -> StorageResult<()> {
        let mut table = txn.open_table(USERS_TABLE)?;
        table.insert(user.id, to_bytes(user)?.as_slice())?;
        Ok(())
    }

    pub fn get_user(&self, id: i64) -> StorageResult<Option<User>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USERS_TABLE)?;
        table
            .get(id)?
            .map(|guard| from_bytes(guard.value()))
            .transpose()
    }

    pub fn list_users(&self) -> StorageResult<Vec<User>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USERS_TABLE)?;
        let mut users = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            users.push(from_bytes(value.value())?);
        }
        Ok(users)
    }

    pub fn find_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        self.find_by_str_index(USERNAME_INDEX, USERS_TABLE, username)?
            .map(|bytes| from_bytes(&bytes))
            .transpose()
    }

    pub fn username_owner_txn(
        &self,
        txn: &WriteTransaction,
        username: &str,
    ) -> StorageResult<Option<i64>> {
        let index = txn.open_table(USERNAME_INDEX)?;
        Ok(index.get(username)?.map(|guard| guard.value()))
    }

    pub fn user_email_owner_txn(
        &self,
        txn: &WriteTransaction,
        email: &str,
    ) -> StorageResult<Option<i64>> {
        let index = txn.open_table(USER_EMAIL_INDEX)?;
        Ok(index.get(email)?.map(|guard| guard.value()))
    }

    pub fn index_username(
        &self,
        txn: &WriteTransaction,
        username: &str,
        user_id: i64,
    ) -> StorageResult<()> {
        let mut index = txn.open_table(USERNAME_INDEX)?;
        index.insert(username, user_id)?;
        Ok(())
    }

    pub fn index_user_email(
        &self,
        txn: &WriteTransaction,
        email: &str,
        user_id: i64,
    ) -> StorageResult<()> {
        let mut index = txn.open_table(USER_EMAIL_INDEX)?;
        index.insert(email, user_id)?;
        Ok(())
    }

    // ========== Sales ==========

    pub fn put_sale(&self, txn: &WriteTransaction, sale: &Sale) -> StorageResult<()> {
        let mut table = txn.open_table(SALES_TABLE)?;
        table.insert(sale.id, to_bytes(sale)?.as_slice())?;
        Ok(())
    }

    pub fn put_sale_item(
        &self,
        txn: &WriteTransaction,
        line_no: u32,
        item: &SaleItem,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SALE_ITEMS_TABLE)?;
        table.insert((item.sale_id, line_no), to_bytes(item)?.as_slice())?;
        Ok(())
    }

    pub fn get_sale(&self, id: i64) -> StorageResult<Option<Sale>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SALES_TABLE)?;
        table
            .get(id)?
            .map(|guard| from_bytes(guard.value()))
            .transpose()
    }

    /// Line items of a sale, in cart order
    pub fn get_sale_items(&self, sale_id: i64) -> StorageResult<Vec<SaleItem>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SALE_ITEMS_TABLE)?;
        let mut items = Vec::new();
        for entry in table.range((sale_id, 0u32)..(sale_id, u32::MAX))? {
            let (_, value) = entry?;
            items.push(from_bytes(value.value())?);
        }
        Ok(items)
    }

    pub fn list_sales(&self) -> StorageResult<Vec<Sale>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SALES_TABLE)?;
        let mut sales = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            sales.push(from_bytes(value.value())?);
        }
        Ok(sales)
    }

    /// Increment and return the invoice sequence (within transaction)
    pub fn next_invoice_seq(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table
            .get(INVOICE_SEQ_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(INVOICE_SEQ_KEY, next)?;
        Ok(next)
    }

    /// Current invoice sequence (read-only)
    pub fn current_invoice_seq(&self) -> StorageResult<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(COUNTERS_TABLE)?;
        Ok(table
            .get(INVOICE_SEQ_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }
}
