//! Money helpers
//!
//! Amounts are stored as `f64` in currency units; all arithmetic goes
//! through `Decimal` and is rounded back to 2 decimal places.
//!
//! 单价与数量在写入时限幅，合计使用 checked 运算，溢出返回 `ValidationFailed`。

use crate::error::{AppError, AppResult, ErrorCode};
use rust_decimal::prelude::*;

const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price (1,000,000,000 VND)
pub const MAX_PRICE: f64 = 1_000_000_000.0;
/// Maximum allowed quantity per order line
pub const MAX_QUANTITY: i32 = 9999;

/// Convert f64 to Decimal for precise calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(
            value = ?value,
            "Non-finite f64 in monetary calculation, defaulting to zero"
        );
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Unit price must be finite, non-negative and at most [`MAX_PRICE`]
pub fn validate_price(price: f64) -> AppResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation(format!(
            "price must be a non-negative number, got {}",
            price
        )));
    }
    if price > MAX_PRICE {
        return Err(AppError::validation(format!(
            "price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, price
        )));
    }
    Ok(())
}

/// Quantity must be within `1..=MAX_QUANTITY`
pub fn validate_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::with_message(
            ErrorCode::InvalidQuantity,
            format!("Quantity must be at least 1, got {}", quantity),
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::with_message(
            ErrorCode::InvalidQuantity,
            format!("Quantity exceeds maximum allowed ({}), got {}", MAX_QUANTITY, quantity),
        ));
    }
    Ok(())
}

fn overflow() -> AppError {
    AppError::validation("Amount exceeds the supported range")
}

/// unit price × quantity
pub fn line_total(unit_price: f64, quantity: i32) -> AppResult<Decimal> {
    Decimal::from_f64(unit_price)
        .and_then(|price| price.checked_mul(Decimal::from(quantity)))
        .ok_or_else(overflow)
}

/// Sum of line totals
pub fn checked_sum(amounts: impl IntoIterator<Item = AppResult<Decimal>>) -> AppResult<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount?).ok_or_else(overflow)
    })
}

/// Compare two stored amounts at 2dp precision
pub fn amounts_equal(a: f64, b: f64) -> bool {
    let round = |v: f64| {
        to_decimal(v).round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
    };
    round(a) == round(b)
}
