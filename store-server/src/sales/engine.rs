//! Sale Transaction Engine
//!
//! Commits a cart as one unit of work: every line is validated against the
//! current catalog state, then the Sale, its items, the stock decrements and
//! the loyalty accrual are staged on a single write transaction. Any failure
//! before `commit()` drops the transaction, so a partially applied sale
//! cannot exist.
//!
//! redb admits one writer at a time: a concurrent `complete_sale` for the
//! same product starts its transaction only after this one commits and sees
//! the decremented stock, so two sales can never both spend the last unit.

use crate::db::{StorageError, StoreStorage};
use crate::sales::money;
use shared::models::{
    CartLine, PaymentMethod, Product, Sale, SaleItem, SaleReceipt, SaleWithItems,
};
use shared::util::{now_millis, snowflake_id};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use thiserror::Error;

/// Sale errors
///
/// Each variant maps to one stable caller-facing failure; no mutation has
/// happened when any of these is returned.
#[derive(Debug, Error)]
pub enum SaleError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Unknown product: {0}")]
    UnknownProduct(i64),

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: i64, quantity: i32 },

    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: i64,
        available: i32,
        requested: i32,
    },

    #[error("Invalid adjustment: {0}")]
    InvalidAdjustment(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type SaleResult<T> = Result<T, SaleError>;

/// Caller-supplied discount/tax; the engine never computes these
#[derive(Debug, Clone, Copy, Default)]
pub struct SaleAdjustments {
    pub discount: f64,
    pub tax: f64,
}

struct StagedLine {
    product_id: i64,
    quantity: i32,
    unit_price: f64,
    line_total: f64,
}

/// Sale transaction engine over the embedded store
#[derive(Clone)]
pub struct SalesEngine {
    storage: StoreStorage,
}

impl SalesEngine {
    pub fn new(storage: StoreStorage) -> Self {
        Self { storage }
    }

    /// Commit a cart with zero discount and tax
    pub fn complete_sale(
        &self,
        cart: &[CartLine],
        payment_method: PaymentMethod,
        customer_id: Option<i64>,
        cashier_id: i64,
    ) -> SaleResult<SaleReceipt> {
        self.complete_sale_with(
            cart,
            payment_method,
            customer_id,
            cashier_id,
            SaleAdjustments::default(),
        )
    }

    /// Commit a cart with explicit discount/tax adjustments
    pub fn complete_sale_with(
        &self,
        cart: &[CartLine],
        payment_method: PaymentMethod,
        customer_id: Option<i64>,
        cashier_id: i64,
        adjustments: SaleAdjustments,
    ) -> SaleResult<SaleReceipt> {
        if cart.is_empty() {
            return Err(SaleError::EmptyCart);
        }
        validate_adjustments(&adjustments)?;

        let txn = self.storage.begin_write()?;

        // Working copies accumulate staged decrements, so a cart holding the
        // same product on two lines cannot oversell between them.
        let mut products: HashMap<i64, Product> = HashMap::new();
        let mut staged: Vec<StagedLine> = Vec::with_capacity(cart.len());

        for line in cart {
            let product = match products.entry(line.product_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(slot) => {
                    let product = self
                        .storage
                        .get_product_txn(&txn, line.product_id)?
                        .filter(|p| p.is_active)
                        .ok_or(SaleError::UnknownProduct(line.product_id))?;
                    slot.insert(product)
                }
            };

            if line.quantity <= 0 {
                return Err(SaleError::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                });
            }
            if product.stock_quantity < line.quantity {
                return Err(SaleError::InsufficientStock {
                    product_id: line.product_id,
                    available: product.stock_quantity,
                    requested: line.quantity,
                });
            }

            // Catalog price at commit time, never caller-supplied
            let line_total = money::line_total(product.price, line.quantity);
            product.stock_quantity -= line.quantity;
            staged.push(StagedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.price,
                line_total,
            });
        }

        let subtotal = staged
            .iter()
            .fold(0.0, |acc, line| money::add(acc, line.line_total));
        let total_amount = money::add(
            money::sub(subtotal, adjustments.discount),
            adjustments.tax,
        );
        if total_amount < 0.0 {
            return Err(SaleError::InvalidAdjustment(
                "discount exceeds cart subtotal".into(),
            ));
        }

        // All lines validated; stage the durable writes.
        let seq = self.storage.next_invoice_seq(&txn)?;
        let invoice_number = format!("INV-{seq:08}");
        let now = now_millis();
        let sale = Sale {
            id: snowflake_id(),
            invoice_number: invoice_number.clone(),
            total_amount,
            discount: adjustments.discount,
            tax: adjustments.tax,
            payment_method,
            cashier_id,
            customer_id,
            created_at: now,
        };
        self.storage.put_sale(&txn, &sale)?;

        for (line_no, line) in staged.iter().enumerate() {
            let item = SaleItem {
                id: snowflake_id(),
                sale_id: sale.id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total,
            };
            self.storage.put_sale_item(&txn, line_no as u32, &item)?;
        }

        for product in products.values_mut() {
            product.updated_at = now;
            self.storage.put_product(&txn, product)?;
        }

        // A supplied but unknown customer_id is silently ignored: the sale
        // still completes, no accrual happens.
        let mut points_earned = 0i64;
        if let Some(customer_id) = customer_id
            && let Some(mut customer) = self.storage.get_customer_txn(&txn, customer_id)?
        {
            points_earned = money::loyalty_points(total_amount);
            customer.loyalty_points += points_earned;
            customer.total_purchases = money::add(customer.total_purchases, total_amount);
            self.storage.put_customer(&txn, &customer)?;
        }

        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            sale_id = sale.id,
            invoice = %invoice_number,
            total = total_amount,
            lines = staged.len(),
            "Sale completed"
        );

        Ok(SaleReceipt {
            sale_id: sale.id,
            invoice_number,
            total_amount,
            points_earned,
        })
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// A sale with its ordered line items
    pub fn get_sale(&self, sale_id: i64) -> SaleResult<Option<SaleWithItems>> {
        let Some(sale) = self.storage.get_sale(sale_id)? else {
            return Ok(None);
        };
        let items = self.storage.get_sale_items(sale_id)?;
        Ok(Some(SaleWithItems { sale, items }))
    }

    /// All sales, newest first
    pub fn list_sales(&self) -> SaleResult<Vec<Sale>> {
        let mut sales = self.storage.list_sales()?;
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sales)
    }
}

fn validate_adjustments(adjustments: &SaleAdjustments) -> SaleResult<()> {
    for (name, value) in [
        ("discount", adjustments.discount),
        ("tax", adjustments.tax),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(SaleError::InvalidAdjustment(format!(
                "{name} must be a non-negative finite number, got {value}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogService;
    use crate::customers::CustomerLedger;
    use shared::models::{CustomerCreate, ProductCreate, ProductUpdate};

    struct Fixture {
        storage: StoreStorage,
        catalog: CatalogService,
        ledger: CustomerLedger,
        engine: SalesEngine,
    }

    fn fixture() -> Fixture {
        let storage = StoreStorage::open_in_memory().unwrap();
        Fixture {
            catalog: CatalogService::new(storage.clone()),
            ledger: CustomerLedger::new(storage.clone()),
            engine: SalesEngine::new(storage.clone()),
            storage,
        }
    }

    fn add_product(fixture: &Fixture, name: &str, price: f64, stock: i32) -> i64 {
        fixture
            .catalog
            .create_product(ProductCreate {
                name: name.to_string(),
                barcode: None,
                price,
                cost_price: None,
                stock_quantity: Some(stock),
                min_stock: Some(5),
                category_id: None,
                description: None,
                image: None,
            })
            .unwrap()
            .id
    }

    fn add_customer(fixture: &Fixture, phone: &str) -> i64 {
        fixture
            .ledger
            .create_customer(CustomerCreate {
                name: "Loyal".to_string(),
                phone: phone.to_string(),
                email: None,
                address: None,
                birth_date: None,
                customer_type: None,
                loyalty_points: None,
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_complete_sale_decrements_stock_and_totals() {
        let fixture = fixture();
        let rice = add_product(&fixture, "Rice", 15.5, 100);
        let cola = add_product(&fixture, "Cola", 3.5, 200);

        let receipt = fixture
            .engine
            .complete_sale(
                &[
                    CartLine { product_id: rice, quantity: 2 },
                    CartLine { product_id: cola, quantity: 3 },
                ],
                PaymentMethod::Cash,
                None,
                1,
            )
            .unwrap();

        // 2*15.5 + 3*3.5 = 41.5
        assert_eq!(receipt.total_amount, 41.5);
        assert_eq!(receipt.invoice_number, "INV-00000001");
        assert_eq!(receipt.points_earned, 0);

        assert_eq!(
            fixture.storage.get_product(rice).unwrap().unwrap().stock_quantity,
            98
        );
        assert_eq!(
            fixture.storage.get_product(cola).unwrap().unwrap().stock_quantity,
            197
        );

        let sale = fixture.engine.get_sale(receipt.sale_id).unwrap().unwrap();
        assert_eq!(sale.items.len(), 2);
        assert_eq!(sale.sale.total_amount, 41.5);
        let line_sum: f64 = sale.items.iter().map(|i| i.line_total).sum();
        assert_eq!(line_sum, 41.5);
    }

    #[test]
    fn test_insufficient_stock_aborts_whole_cart() {
        let fixture = fixture();
        let rice = add_product(&fixture, "Rice", 15.5, 100);
        let cola = add_product(&fixture, "Cola", 3.5, 2);

        let result = fixture.engine.complete_sale(
            &[
                CartLine { product_id: rice, quantity: 10 },
                CartLine { product_id: cola, quantity: 3 },
            ],
            PaymentMethod::Cash,
            None,
            1,
        );

        assert!(matches!(
            result,
            Err(SaleError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            })
        ));

        // No side effects at all: stock untouched, no sale recorded
        assert_eq!(
            fixture.storage.get_product(rice).unwrap().unwrap().stock_quantity,
            100
        );
        assert_eq!(
            fixture.storage.get_product(cola).unwrap().unwrap().stock_quantity,
            2
        );
        assert!(fixture.engine.list_sales().unwrap().is_empty());
        assert_eq!(fixture.storage.current_invoice_seq().unwrap(), 0);
    }

    #[test]
    fn test_unknown_and_inactive_products_rejected() {
        let fixture = fixture();
        let result = fixture.engine.complete_sale(
            &[CartLine { product_id: 404, quantity: 1 }],
            PaymentMethod::Cash,
            None,
            1,
        );
        assert!(matches!(result, Err(SaleError::UnknownProduct(404))));

        let retired = add_product(&fixture, "Retired", 1.0, 10);
        fixture.catalog.deactivate_product(retired).unwrap();
        let result = fixture.engine.complete_sale(
            &[CartLine { product_id: retired, quantity: 1 }],
            PaymentMethod::Cash,
            None,
            1,
        );
        assert!(matches!(result, Err(SaleError::UnknownProduct(_))));
    }

    #[test]
    fn test_invalid_quantity_rejected() {
        let fixture = fixture();
        let rice = add_product(&fixture, "Rice", 15.5, 100);

        for quantity in [0, -2] {
            let result = fixture.engine.complete_sale(
                &[CartLine { product_id: rice, quantity }],
                PaymentMethod::Cash,
                None,
                1,
            );
            assert!(matches!(result, Err(SaleError::InvalidQuantity { .. })));
        }
        assert_eq!(
            fixture.storage.get_product(rice).unwrap().unwrap().stock_quantity,
            100
        );
    }

    #[test]
    fn test_empty_cart_rejected() {
        let fixture = fixture();
        let result = fixture
            .engine
            .complete_sale(&[], PaymentMethod::Cash, None, 1);
        assert!(matches!(result, Err(SaleError::EmptyCart)));
    }

    #[test]
    fn test_duplicate_product_lines_cannot_oversell() {
        let fixture = fixture();
        let rice = add_product(&fixture, "Rice", 10.0, 5);

        let result = fixture.engine.complete_sale(
            &[
                CartLine { product_id: rice, quantity: 3 },
                CartLine { product_id: rice, quantity: 3 },
            ],
            PaymentMethod::Cash,
            None,
            1,
        );

        assert!(matches!(
            result,
            Err(SaleError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            })
        ));
        assert_eq!(
            fixture.storage.get_product(rice).unwrap().unwrap().stock_quantity,
            5
        );
    }

    #[test]
    fn test_unit_price_frozen_against_later_price_change() {
        let fixture = fixture();
        let rice = add_product(&fixture, "Rice", 15.5, 100);

        let receipt = fixture
            .engine
            .complete_sale(
                &[CartLine { product_id: rice, quantity: 1 }],
                PaymentMethod::Card,
                None,
                1,
            )
            .unwrap();

        fixture
            .catalog
            .update_product(
                rice,
                ProductUpdate {
                    price: Some(99.0),
                    ..Default::default()
                },
            )
            .unwrap();

        let sale = fixture.engine.get_sale(receipt.sale_id).unwrap().unwrap();
        assert_eq!(sale.items[0].unit_price, 15.5);
        assert_eq!(sale.sale.total_amount, 15.5);
    }

    #[test]
    fn test_loyalty_accrual_floor_rule() {
        let fixture = fixture();
        let item47 = add_product(&fixture, "Bundle", 47.0, 10);
        let item999 = add_product(&fixture, "Snack", 9.99, 10);
        let customer = add_customer(&fixture, "0101234567");

        let receipt = fixture
            .engine
            .complete_sale(
                &[CartLine { product_id: item47, quantity: 1 }],
                PaymentMethod::Cash,
                Some(customer),
                1,
            )
            .unwrap();
        assert_eq!(receipt.points_earned, 4);

        let receipt = fixture
            .engine
            .complete_sale(
                &[CartLine { product_id: item999, quantity: 1 }],
                PaymentMethod::Cash,
                Some(customer),
                1,
            )
            .unwrap();
        assert_eq!(receipt.points_earned, 0);

        let customer = fixture.storage.get_customer(customer).unwrap().unwrap();
        assert_eq!(customer.loyalty_points, 4);
        assert_eq!(customer.total_purchases, 56.99);
    }

    #[test]
    fn test_missing_customer_silently_ignored() {
        let fixture = fixture();
        let rice = add_product(&fixture, "Rice", 20.0, 10);

        let receipt = fixture
            .engine
            .complete_sale(
                &[CartLine { product_id: rice, quantity: 1 }],
                PaymentMethod::Cash,
                Some(987654),
                1,
            )
            .unwrap();

        // Sale completes, no accrual happened anywhere
        assert_eq!(receipt.points_earned, 0);
        assert_eq!(fixture.engine.list_sales().unwrap().len(), 1);
    }

    #[test]
    fn test_explicit_adjustments_affect_total_and_points() {
        let fixture = fixture();
        let rice = add_product(&fixture, "Rice", 30.0, 10);
        let customer = add_customer(&fixture, "0107654321");

        let receipt = fixture
            .engine
            .complete_sale_with(
                &[CartLine { product_id: rice, quantity: 1 }],
                PaymentMethod::Mixed,
                Some(customer),
                1,
                SaleAdjustments {
                    discount: 12.0,
                    tax: 3.0,
                },
            )
            .unwrap();

        // 30 - 12 + 3 = 21
        assert_eq!(receipt.total_amount, 21.0);
        assert_eq!(receipt.points_earned, 2);

        let sale = fixture.engine.get_sale(receipt.sale_id).unwrap().unwrap();
        assert_eq!(sale.sale.discount, 12.0);
        assert_eq!(sale.sale.tax, 3.0);
    }

    #[test]
    fn test_negative_adjustments_rejected() {
        let fixture = fixture();
        let rice = add_product(&fixture, "Rice", 30.0, 10);

        let result = fixture.engine.complete_sale_with(
            &[CartLine { product_id: rice, quantity: 1 }],
            PaymentMethod::Cash,
            None,
            1,
            SaleAdjustments {
                discount: -5.0,
                tax: 0.0,
            },
        );
        assert!(matches!(result, Err(SaleError::InvalidAdjustment(_))));
    }

    #[test]
    fn test_invoice_numbers_are_sequential() {
        let fixture = fixture();
        let rice = add_product(&fixture, "Rice", 1.0, 100);

        for expected in 1..=3u64 {
            let receipt = fixture
                .engine
                .complete_sale(
                    &[CartLine { product_id: rice, quantity: 1 }],
                    PaymentMethod::Cash,
                    None,
                    1,
                )
                .unwrap();
            assert_eq!(receipt.invoice_number, format!("INV-{expected:08}"));
        }
    }
}
