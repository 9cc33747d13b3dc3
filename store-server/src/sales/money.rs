//! Money calculation utilities using rust_decimal for precision
//!
//! Entity records store `f64`; every computation goes through `Decimal` and
//! monetary results are rounded to 2 decimal places, half away from zero.

use rust_decimal::prelude::*;

/// Rounding for monetary values (2 decimal places)
const DECIMAL_PLACES: u32 = 2;

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

fn round_money(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Line total for `quantity` units at `unit_price`, rounded to cents
pub fn line_total(unit_price: f64, quantity: i32) -> f64 {
    round_money(to_decimal(unit_price) * Decimal::from(quantity))
}

/// Precise monetary addition
pub fn add(a: f64, b: f64) -> f64 {
    round_money(to_decimal(a) + to_decimal(b))
}

/// Precise monetary subtraction
pub fn sub(a: f64, b: f64) -> f64 {
    round_money(to_decimal(a) - to_decimal(b))
}

/// Loyalty points for a sale total: one point per full 10 currency units
pub fn loyalty_points(total_amount: f64) -> i64 {
    (to_decimal(total_amount) / Decimal::from(10))
        .floor()
        .to_i64()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_rounds_half_up() {
        assert_eq!(line_total(10.0, 3), 30.0);
        // 1.115 * 3 = 3.345 -> 3.35
        assert_eq!(line_total(1.115, 3), 3.35);
    }

    #[test]
    fn test_add_avoids_float_drift() {
        assert_eq!(add(0.1, 0.2), 0.3);
        assert_eq!(sub(1.0, 0.9), 0.1);
    }

    #[test]
    fn test_loyalty_points_floor() {
        assert_eq!(loyalty_points(47.0), 4);
        assert_eq!(loyalty_points(9.99), 0);
        assert_eq!(loyalty_points(10.0), 1);
        assert_eq!(loyalty_points(0.0), 0);
    }
}
