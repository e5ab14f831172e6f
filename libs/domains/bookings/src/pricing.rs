//! Booking price arithmetic.
//!
//! `total = inclusive days × rate per day × quantity`, in [`Decimal`], rounded
//! half-up to [`CURRENCY_SCALE`] places. The same inputs always produce the
//! same total, which is what lets a locked booking price be re-verified.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::date_range::DateRange;
use crate::error::{BookingError, BookingResult};

/// Decimal places of the smallest currency unit
pub const CURRENCY_SCALE: u32 = 2;

/// Reject a negative rate or a zero quantity
pub fn validate(unit_price_per_day: Decimal, quantity: u32) -> BookingResult<()> {
    if unit_price_per_day < Decimal::ZERO {
        return Err(BookingError::InvalidPricingInput(format!(
            "price per day must not be negative, got {}",
            unit_price_per_day
        )));
    }
    if quantity == 0 {
        return Err(BookingError::InvalidPricingInput(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Total price for renting `quantity` units over `range`
pub fn compute(
    range: &DateRange,
    unit_price_per_day: Decimal,
    quantity: u32,
) -> BookingResult<Decimal> {
    validate(unit_price_per_day, quantity)?;

    let total = Decimal::from(range.duration_days())
        .checked_mul(unit_price_per_day)
        .and_then(|subtotal| subtotal.checked_mul(Decimal::from(quantity)))
        .ok_or_else(|| {
            BookingError::InvalidPricingInput(format!(
                "total for {} days at {} x {} is out of range",
                range.duration_days(),
                unit_price_per_day,
                quantity
            ))
        })?;

    Ok(round_to_currency(total))
}

/// Round half-up (away from zero) to the smallest currency unit and pin the scale
pub fn round_to_currency(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}
