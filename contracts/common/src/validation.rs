//! Validation Helpers
//!
//! Reusable precondition checks shared by the engine and the strategy.
//!
//! ```rust,ignore
//! use lever_common::check;
//!
//! check!(amount > 0, LeverError::ZeroAmount);
//! ```

use crate::{
    errors::{LeverError, LeverResult},
    types::PositionStatus,
};

// ============ Validation Macro ============

/// Check a condition and return an error if it fails.
#[macro_export]
macro_rules! check {
    ($condition:expr, $error:expr) => {
        if !($condition) {
            return Err($error);
        }
    };
}

// ============ Common Validation Helpers ============

/// Require a value to be positive (non-zero).
pub fn require_positive(value: u64) -> LeverResult<()> {
    check!(value > 0, LeverError::ZeroAmount);
    Ok(())
}

/// Require sufficient balance for an operation.
pub fn require_sufficient_balance(available: u64, requested: u64) -> LeverResult<()> {
    check!(
        available >= requested,
        LeverError::InsufficientBalance {
            available,
            requested,
        }
    );
    Ok(())
}

/// Require a swap to have returned at least `min_out`.
pub fn require_min_out(actual: u64, min_out: u64) -> LeverResult<()> {
    check!(actual >= min_out, LeverError::SlippageExceeded { min_out, actual });
    Ok(())
}

/// Require the ledger entry to be in `expected` status.
pub fn require_status(actual: PositionStatus, expected: PositionStatus) -> LeverResult<()> {
    if actual == PositionStatus::None && expected != PositionStatus::None {
        return Err(LeverError::PositionNotFound);
    }
    check!(
        actual == expected,
        LeverError::InvalidStatus { expected, actual }
    );
    Ok(())
}

/// Require debt to respect the ledger floor (zero is a full close).
pub fn require_debt_floor(debt: u64, min_debt: u64) -> LeverResult<()> {
    check!(
        debt == 0 || debt >= min_debt,
        LeverError::BelowMinDebt { debt, min_debt }
    );
    Ok(())
}
