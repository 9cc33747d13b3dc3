//! Portable store export
//!
//! A JSON dump of every record, produced under one read transaction so the
//! result is a consistent point-in-time snapshot. Backups carry this next to
//! the raw database file for cross-version recovery; `import_snapshot`
//! rebuilds a store from it.

use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use shared::models::{Category, Customer, Product, Sale, SaleItem, User};
use shared::util::now_millis;

use super::storage::{
    BARCODE_INDEX, CATEGORIES_TABLE, COUNTERS_TABLE, CUSTOMERS_TABLE, EMAIL_INDEX,
    INVOICE_SEQ_KEY, PHONE_INDEX, PRODUCTS_TABLE, SALES_TABLE, SALE_ITEMS_TABLE, StoreStorage,
    StorageResult, USERNAME_INDEX, USERS_TABLE, USER_EMAIL_INDEX, from_bytes, to_bytes,
};

pub const EXPORT_VERSION: u32 = 1;

/// One exported sale with its ordered line items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleExport {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Complete portable dump of the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreExport {
    pub version: u32,
    pub exported_at: i64,
    pub invoice_seq: u64,
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub customers: Vec<Customer>,
    pub users: Vec<User>,
    pub sales: Vec<SaleExport>,
}

impl StoreStorage {
    /// Export every record under a single read transaction
    pub fn export_snapshot(&self) -> StorageResult<StoreExport> {
        let txn = self.db.begin_read()?;

        let mut categories: Vec<Category> = Vec::new();
        for entry in txn.open_table(CATEGORIES_TABLE)?.iter()? {
            let (_, value) = entry?;
            categories.push(from_bytes(value.value())?);
        }

        let mut products: Vec<Product> = Vec::new();
        for entry in txn.open_table(PRODUCTS_TABLE)?.iter()? {
            let (_, value) = entry?;
            products.push(from_bytes(value.value())?);
        }

        let mut customers: Vec<Customer> = Vec::new();
        for entry in txn.open_table(CUSTOMERS_TABLE)?.iter()? {
            let (_, value) = entry?;
            customers.push(from_bytes(value.value())?);
        }

        let mut users: Vec<User> = Vec::new();
        for entry in txn.open_table(USERS_TABLE)?.iter()? {
            let (_, value) = entry?;
            users.push(from_bytes(value.value())?);
        }

        let mut raw_sales: Vec<Sale> = Vec::new();
        for entry in txn.open_table(SALES_TABLE)?.iter()? {
            let (_, value) = entry?;
            raw_sales.push(from_bytes(value.value())?);
        }

        let items_table = txn.open_table(SALE_ITEMS_TABLE)?;
        let mut sales = Vec::with_capacity(raw_sales.len());
        for sale in raw_sales {
            let mut items = Vec::new();
            for entry in items_table.range((sale.id, 0u32)..(sale.id, u32::MAX))? {
                let (_, value) = entry?;
                items.push(from_bytes(value.value())?);
            }
            sales.push(SaleExport { sale, items });
        }

        let counters = txn.open_table(COUNTERS_TABLE)?;
        let invoice_seq = counters
            .get(INVOICE_SEQ_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);

        Ok(StoreExport {
            version: EXPORT_VERSION,
            exported_at: now_millis(),
            invoice_seq,
            categories,
            products,
            customers,
            users,
            sales,
        })
    }

    /// Replace the entire store content with an exported snapshot
    ///
    /// Everything happens in one write transaction: the store is either the
    /// old state or the imported state, never a mixture. Indexes are rebuilt
    /// from the records.
    pub fn import_snapshot(&self, export: &StoreExport) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            txn.delete_table(PRODUCTS_TABLE)?;
            txn.delete_table(CATEGORIES_TABLE)?;
            txn.delete_table(CUSTOMERS_TABLE)?;
            txn.delete_table(USERS_TABLE)?;
            txn.delete_table(SALES_TABLE)?;
            txn.delete_table(SALE_ITEMS_TABLE)?;
            txn.delete_table(BARCODE_INDEX)?;
            txn.delete_table(PHONE_INDEX)?;
            txn.delete_table(EMAIL_INDEX)?;
            txn.delete_table(USERNAME_INDEX)?;
            txn.delete_table(USER_EMAIL_INDEX)?;

            let mut categories = txn.open_table(CATEGORIES_TABLE)?;
            for category in &export.categories {
                categories.insert(category.id, to_bytes(category)?.as_slice())?;
            }
            drop(categories);

            let mut products = txn.open_table(PRODUCTS_TABLE)?;
            let mut barcodes = txn.open_table(BARCODE_INDEX)?;
            for product in &export.products {
                products.insert(product.id, to_bytes(product)?.as_slice())?;
                if let Some(barcode) = &product.barcode {
                    barcodes.insert(barcode.as_str(), product.id)?;
                }
            }
            drop(products);
            drop(barcodes);

            let mut customers = txn.open_table(CUSTOMERS_TABLE)?;
            let mut phones = txn.open_table(PHONE_INDEX)?;
            let mut emails = txn.open_table(EMAIL_INDEX)?;
            for customer in &export.customers {
                customers.insert(customer.id, to_bytes(customer)?.as_slice())?;
                phones.insert(customer.phone.as_str(), customer.id)?;
                if let Some(email) = &customer.email {
                    emails.insert(email.as_str(), customer.id)?;
                }
            }
            drop(customers);
            drop(phones);
            drop(emails);

            let mut users = txn.open_table(USERS_TABLE)?;
            let mut usernames = txn.open_table(USERNAME_INDEX)?;
            let mut user_emails = txn.open_table(USER_EMAIL_INDEX)?;
            for user in &export.users {
                users.insert(user.id, to_bytes(user)?.as_slice())?;
                usernames.insert(user.username.as_str(), user.id)?;
                if let Some(email) = &user.email {
                    user_emails.insert(email.as_str(), user.id)?;
                }
            }
            drop(users);
            drop(usernames);
            drop(user_emails);

            let mut sales = txn.open_table(SALES_TABLE)?;
            let mut items = txn.open_table(SALE_ITEMS_TABLE)?;
            for entry in &export.sales {
                sales.insert(entry.sale.id, to_bytes(&entry.sale)?.as_slice())?;
                for (line_no, item) in entry.items.iter().enumerate() {
                    items.insert((entry.sale.id, line_no as u32), to_bytes(item)?.as_slice())?;
                }
            }
            drop(sales);
            drop(items);

            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            counters.insert(INVOICE_SEQ_KEY, export.invoice_seq)?;
        }
        txn.commit()?;
        Ok(())
    }
}
