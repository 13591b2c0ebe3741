//! Fixed-Point Math for the Lever Strategy
//!
//! Amounts and prices carry 8 decimals, ratios are basis points.
//! Products are taken in u128 with checked arithmetic; results that grant
//! borrowing capacity round down, results that must be repaid round up.

use crate::constants::{ratios::BPS, token};
use crate::errors::{LeverError, LeverResult};

fn narrow(value: u128) -> LeverResult<u64> {
    u64::try_from(value).map_err(|_| LeverError::Overflow)
}

fn mul_div(a: u64, b: u64, denominator: u64) -> LeverResult<u64> {
    if denominator == 0 {
        return Err(LeverError::DivisionByZero);
    }
    let product = (a as u128)
        .checked_mul(b as u128)
        .ok_or(LeverError::Overflow)?;
    narrow(product / denominator as u128)
}

fn mul_div_up(a: u64, b: u64, denominator: u64) -> LeverResult<u64> {
    if denominator == 0 {
        return Err(LeverError::DivisionByZero);
    }
    let product = (a as u128)
        .checked_mul(b as u128)
        .ok_or(LeverError::Overflow)?;
    narrow(product.div_ceil(denominator as u128))
}

/// USD value of `amount` at `price`, rounded down
///
/// usd = amount * price / 1e8
pub fn to_usd(amount: u64, price: u64) -> LeverResult<u64> {
    mul_div(amount, price, token::ONE)
}

/// Token amount worth `usd` at `price`, rounded down
pub fn from_usd(usd: u64, price: u64) -> LeverResult<u64> {
    if price == 0 {
        return Err(LeverError::InvalidPrice);
    }
    mul_div(usd, token::ONE, price)
}

/// Token amount worth `usd` at `price`, rounded up
pub fn from_usd_up(usd: u64, price: u64) -> LeverResult<u64> {
    if price == 0 {
        return Err(LeverError::InvalidPrice);
    }
    mul_div_up(usd, token::ONE, price)
}

/// Convert `amount` of one asset into the other through their USD prices
pub fn convert(amount: u64, from_price: u64, to_price: u64) -> LeverResult<u64> {
    if to_price == 0 {
        return Err(LeverError::InvalidPrice);
    }
    mul_div(amount, from_price, to_price)
}

/// Apply a basis-point fraction, rounded down
pub fn mul_bps(value: u64, bps: u64) -> LeverResult<u64> {
    mul_div(value, bps, BPS)
}

/// Apply a basis-point fraction, rounded up
pub fn mul_bps_up(value: u64, bps: u64) -> LeverResult<u64> {
    mul_div_up(value, bps, BPS)
}

/// Divide by a basis-point fraction, rounded down
///
/// value / (bps / 10_000)
pub fn div_bps(value: u64, bps: u64) -> LeverResult<u64> {
    mul_div(value, BPS, bps)
}

/// Divide by a basis-point fraction, rounded up
pub fn div_bps_up(value: u64, bps: u64) -> LeverResult<u64> {
    mul_div_up(value, BPS, bps)
}

/// Loan-to-value in basis points, rounded up
///
/// Zero debt is LTV 0; debt against zero collateral is `u64::MAX`.
pub fn ltv_bps(debt_usd: u64, collateral_usd: u64) -> LeverResult<u64> {
    if debt_usd == 0 {
        return Ok(0);
    }
    if collateral_usd == 0 {
        return Ok(u64::MAX);
    }
    mul_div_up(debt_usd, BPS, collateral_usd)
}

/// Collateral ratio in basis points (collateral value over debt), rounded down
///
/// Zero debt is an infinite ratio.
pub fn collateral_ratio_bps(collateral: u64, debt: u64, price: u64) -> LeverResult<u64> {
    if debt == 0 {
        return Ok(u64::MAX);
    }
    let value = (collateral as u128)
        .checked_mul(price as u128)
        .ok_or(LeverError::Overflow)?
        .checked_mul(BPS as u128)
        .ok_or(LeverError::Overflow)?;
    let denominator = (debt as u128)
        .checked_mul(token::ONE as u128)
        .ok_or(LeverError::Overflow)?;
    Ok((value / denominator).min(u64::MAX as u128) as u64)
}

/// Safe addition with overflow check
pub fn safe_add(a: u64, b: u64) -> LeverResult<u64> {
    a.checked_add(b).ok_or(LeverError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u64, b: u64) -> LeverResult<u64> {
    a.checked_sub(b).ok_or(LeverError::Underflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICE_2K: u64 = 2_000_00000000; // $2,000
    const ONE: u64 = token::ONE;

    #[test]
    fn test_usd_conversions() {
        assert_eq!(to_usd(ONE, PRICE_2K).unwrap(), PRICE_2K);
        assert_eq!(from_usd(PRICE_2K, PRICE_2K).unwrap(), ONE);
        // $1 of a $3 asset: floor vs ceil differ by one unit
        let third_price = 3 * ONE;
        assert_eq!(from_usd(ONE, third_price).unwrap(), 33_333_333);
        assert_eq!(from_usd_up(ONE, third_price).unwrap(), 33_333_334);
    }

    #[test]
    fn test_zero_price_rejected() {
        assert_eq!(from_usd(ONE, 0), Err(LeverError::InvalidPrice));
        assert_eq!(convert(ONE, ONE, 0), Err(LeverError::InvalidPrice));
    }

    #[test]
    fn test_ltv_bps() {
        assert_eq!(ltv_bps(0, 0).unwrap(), 0);
        assert_eq!(ltv_bps(1, 0).unwrap(), u64::MAX);
        assert_eq!(ltv_bps(50 * ONE, 100 * ONE).unwrap(), 5_000);
        // 1/3 rounds up
        assert_eq!(ltv_bps(ONE, 3 * ONE).unwrap(), 3_334);
    }

    #[test]
    fn test_collateral_ratio() {
        // 1.5 units at $2,000 backing $2,000 = 150%
        let cr = collateral_ratio_bps(150_000_000, PRICE_2K, PRICE_2K).unwrap();
        assert_eq!(cr, 15_000);
        assert_eq!(collateral_ratio_bps(ONE, 0, PRICE_2K).unwrap(), u64::MAX);
    }

    #[test]
    fn test_bps_helpers() {
        assert_eq!(mul_bps(10_000, 7_000).unwrap(), 7_000);
        assert_eq!(mul_bps_up(3, 5_000).unwrap(), 2);
        assert_eq!(div_bps(7_000, 7_000).unwrap(), 10_000);
        assert_eq!(div_bps(1, 0), Err(LeverError::DivisionByZero));
    }

    #[test]
    fn test_overflow_surfaces() {
        assert_eq!(to_usd(u64::MAX, u64::MAX), Err(LeverError::Overflow));
        assert_eq!(safe_add(u64::MAX, 1), Err(LeverError::Overflow));
        assert_eq!(safe_sub(0, 1), Err(LeverError::Underflow));
    }
}
