//! Catalog Store - product and category management
//!
//! Owns Product/Category semantics over [`StoreStorage`]: lookups, filtered
//! listing, stock adjustment with a never-negative guarantee, and
//! soft-deactivation (records are never deleted).

use crate::db::{StorageError, StoreStorage};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::PaginatedResponse;
use shared::models::{
    Category, CategoryCreate, CategoryUpdate, Product, ProductCreate, ProductFilter,
    ProductUpdate,
};
use shared::util::{now_millis, snowflake_id};
use thiserror::Error;
use validator::Validate;

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    #[error("Barcode already in use: {0}")]
    DuplicateBarcode(String),

    #[error("Category '{0}' already exists")]
    DuplicateCategory(String),

    #[error("Stock for product {product_id} cannot go negative: available {available}, delta {delta}")]
    StockUnderflow {
        product_id: i64,
        available: i32,
        delta: i32,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Quick figures for the dashboard page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_products: usize,
    pub low_stock_products: usize,
    pub today_sales: usize,
    pub today_revenue: f64,
}

/// Catalog service over the embedded store
#[derive(Clone)]
pub struct CatalogService {
    storage: StoreStorage,
}

impl CatalogService {
    pub fn new(storage: StoreStorage) -> Self {
        Self { storage }
    }

    // =========================================================================
    // Product - Read
    // =========================================================================

    /// Get product by ID
    pub fn get_product(&self, id: i64) -> CatalogResult<Option<Product>> {
        Ok(self.storage.get_product(id)?)
    }

    /// Lookup by barcode
    pub fn find_by_barcode(&self, barcode: &str) -> CatalogResult<Option<Product>> {
        Ok(self.storage.find_product_by_barcode(barcode)?)
    }

    /// Filtered, paginated listing of active products
    ///
    /// Search matches a case-insensitive substring of the name or an exact
    /// substring of the barcode. Stock filters partition active products:
    /// in-stock (> min_stock), low-stock (0 < qty <= min_stock),
    /// out-of-stock (qty == 0).
    pub fn list_products(
        &self,
        filter: &ProductFilter,
        page: u32,
        per_page: u32,
    ) -> CatalogResult<PaginatedResponse<Product>> {
        let needle = filter.search.as_deref().map(str::to_lowercase);

        let mut products: Vec<Product> = self
            .storage
            .list_products()?
            .into_iter()
            .filter(|p| p.is_active)
            .filter(|p| match &needle {
                Some(n) => {
                    p.name.to_lowercase().contains(n)
                        || p.barcode.as_deref().is_some_and(|b| b.contains(n.as_str()))
                }
                None => true,
            })
            .filter(|p| match filter.category_id {
                Some(category_id) => p.category_id == Some(category_id),
                None => true,
            })
            .filter(|p| match filter.stock {
                Some(state) => state.matches(p.stock_quantity, p.min_stock),
                None => true,
            })
            .collect();

        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let total = products.len() as u64;
        let page = page.max(1);
        let start = ((page - 1) * per_page) as usize;
        let data: Vec<Product> = products
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();

        Ok(PaginatedResponse::new(data, total, page, per_page))
    }

    // =========================================================================
    // Product - Write
    // =========================================================================

    /// Create a new product
    pub fn create_product(&self, data: ProductCreate) -> CatalogResult<Product> {
        data.validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let now = now_millis();
        let product = Product {
            id: snowflake_id(),
            name: data.name,
            barcode: data.barcode,
            price: data.price,
            cost_price: data.cost_price.unwrap_or(0.0),
            stock_quantity: data.stock_quantity.unwrap_or(0),
            min_stock: data.min_stock.unwrap_or(5),
            category_id: data.category_id,
            description: data.description,
            image: data.image,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let txn = self.storage.begin_write()?;
        if let Some(barcode) = &product.barcode {
            if self.storage.barcode_owner_txn(&txn, barcode)?.is_some() {
                return Err(CatalogError::DuplicateBarcode(barcode.clone()));
            }
            self.storage.index_barcode(&txn, barcode, product.id)?;
        }
        self.storage.put_product(&txn, &product)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(product_id = product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Update a product
    pub fn update_product(&self, id: i64, data: ProductUpdate) -> CatalogResult<Product> {
        let txn = self.storage.begin_write()?;
        let mut product = self
            .storage
            .get_product_txn(&txn, id)?
            .ok_or(CatalogError::ProductNotFound(id))?;

        if let Some(barcode) = &data.barcode
            && product.barcode.as_deref() != Some(barcode.as_str())
        {
            if let Some(owner) = self.storage.barcode_owner_txn(&txn, barcode)?
                && owner != id
            {
                return Err(CatalogError::DuplicateBarcode(barcode.clone()));
            }
            if let Some(old) = &product.barcode {
                self.storage.unindex_barcode(&txn, old)?;
            }
            self.storage.index_barcode(&txn, barcode, id)?;
            product.barcode = Some(barcode.clone());
        }

        if let Some(name) = data.name {
            product.name = name;
        }
        if let Some(price) = data.price {
            if price < 0.0 {
                return Err(CatalogError::Validation("price must be non-negative".into()));
            }
            product.price = price;
        }
        if let Some(cost_price) = data.cost_price {
            product.cost_price = cost_price;
        }
        if let Some(min_stock) = data.min_stock {
            product.min_stock = min_stock;
        }
        if let Some(category_id) = data.category_id {
            product.category_id = Some(category_id);
        }
        if let Some(description) = data.description {
            product.description = Some(description);
        }
        if let Some(image) = data.image {
            product.image = Some(image);
        }
        if let Some(is_active) = data.is_active {
            product.is_active = is_active;
        }
        product.updated_at = now_millis();

        self.storage.put_product(&txn, &product)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(product)
    }

    /// Deactivate a product (never deleted)
    pub fn deactivate_product(&self, id: i64) -> CatalogResult<Product> {
        self.update_product(
            id,
            ProductUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
    }

    /// Adjust stock by a signed delta, rejecting any result below zero
    ///
    /// Restocking entry point; the sale engine stages its decrements on its
    /// own transaction so the whole sale commits as one unit.
    pub fn adjust_stock(&self, product_id: i64, delta: i32) -> CatalogResult<Product> {
        let txn = self.storage.begin_write()?;
        let mut product = self
            .storage
            .get_product_txn(&txn, product_id)?
            .ok_or(CatalogError::ProductNotFound(product_id))?;

        let new_stock = product.stock_quantity + delta;
        if new_stock < 0 {
            return Err(CatalogError::StockUnderflow {
                product_id,
                available: product.stock_quantity,
                delta,
            });
        }
        product.stock_quantity = new_stock;
        product.updated_at = now_millis();

        self.storage.put_product(&txn, &product)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::debug!(product_id, delta, new_stock, "Stock adjusted");
        Ok(product)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Create a new category (name unique among active categories)
    pub fn create_category(&self, data: CategoryCreate) -> CatalogResult<Category> {
        data.validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let existing = self.storage.list_categories()?;
        if existing.iter().any(|c| c.is_active && c.name == data.name) {
            return Err(CatalogError::DuplicateCategory(data.name));
        }

        let category = Category {
            id: snowflake_id(),
            name: data.name,
            description: data.description,
            is_active: true,
            created_at: now_millis(),
        };

        let txn = self.storage.begin_write()?;
        self.storage.put_category(&txn, &category)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(category)
    }

    /// Update a category
    pub fn update_category(&self, id: i64, data: CategoryUpdate) -> CatalogResult<Category> {
        let txn = self.storage.begin_write()?;
        let mut category = match self.storage.get_category(id)? {
            Some(c) => c,
            None => return Err(CatalogError::CategoryNotFound(id)),
        };

        if let Some(name) = data.name {
            category.name = name;
        }
        if let Some(description) = data.description {
            category.description = Some(description);
        }
        if let Some(is_active) = data.is_active {
            category.is_active = is_active;
        }

        self.storage.put_category(&txn, &category)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(category)
    }

    /// Deactivate a category; products keep their stale reference
    pub fn deactivate_category(&self, id: i64) -> CatalogResult<Category> {
        self.update_category(
            id,
            CategoryUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
    }

    /// Active categories sorted by name
    pub fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .storage
            .list_categories()?
            .into_iter()
            .filter(|c| c.is_active)
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    // =========================================================================
    // Read accessors for reporting
    // =========================================================================

    /// Quick dashboard figures: product counts plus today's sales
    pub fn dashboard_stats(&self) -> CatalogResult<DashboardStats> {
        let products = self.storage.list_products()?;
        let total_products = products.iter().filter(|p| p.is_active).count();
        let low_stock_products = products
            .iter()
            .filter(|p| p.is_active && p.stock_quantity > 0 && p.stock_quantity <= p.min_stock)
            .count();

        let midnight = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or(0);

        let mut today_sales = 0usize;
        let mut today_revenue = 0.0f64;
        for sale in self.storage.list_sales()? {
            if sale.created_at >= midnight {
                today_sales += 1;
                today_revenue += sale.total_amount;
            }
        }

        Ok(DashboardStats {
            total_products,
            low_stock_products,
            today_sales,
            today_revenue,
        })
    }
}
