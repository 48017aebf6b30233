//! Money calculation utilities using rust_decimal for precision
//!
//! Totals and fees are computed with `Decimal` and converted back to `f64`
//! without rounding; fees are exact fractions of the total, sub-cent values
//! included.

use rust_decimal::prelude::*;
use shared::order::OrderItem;

/// Platform fee share of the total (10%)
const PLATFORM_FEE_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Provider fee share of the total (80%)
const PROVIDER_FEE_RATE: Decimal = Decimal::from_parts(80, 0, 0, false, 2);

/// Item validation failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidAmount(pub String);

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), InvalidAmount> {
    if !value.is_finite() {
        return Err(InvalidAmount(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Price and quantity must be finite and non-negative
pub fn validate_item(item: &OrderItem) -> Result<(), InvalidAmount> {
    require_finite(item.price, "price")?;
    if item.price < 0.0 {
        return Err(InvalidAmount(format!(
            "price must be non-negative, got {}",
            item.price
        )));
    }
    require_finite(item.quantity, "quantity")?;
    if item.quantity < 0.0 {
        return Err(InvalidAmount(format!(
            "quantity must be non-negative, got {}",
            item.quantity
        )));
    }
    Ok(())
}

/// Convert f64 to Decimal
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal to f64 (no rounding)
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// Order totals derived at creation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub total_price: f64,
    pub platform_fee: f64,
    pub provider_fee: f64,
}

/// Σ(quantity × price) plus the derived platform and provider fees
pub fn compute_totals(items: &[OrderItem]) -> OrderTotals {
    let total: Decimal = items
        .iter()
        .map(|item| to_decimal(item.price) * to_decimal(item.quantity))
        .sum();

    OrderTotals {
        total_price: to_f64(total),
        platform_fee: to_f64(total * PLATFORM_FEE_RATE),
        provider_fee: to_f64(total * PROVIDER_FEE_RATE),
    }
}
