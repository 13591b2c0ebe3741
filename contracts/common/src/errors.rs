//! Error Types for the Lever Strategy
//!
//! Typed errors carry the offending values so a failed operation can be
//! diagnosed from the error alone. Every variant maps onto one category of
//! the failure taxonomy via [`LeverError::category`]; every category aborts
//! the whole top-level operation.

use thiserror::Error;

use crate::access_control::Role;
use crate::types::{Address, PositionId, PositionStatus};

/// Result type alias for strategy operations
pub type LeverResult<T> = Result<T, LeverError>;

/// Main error enum for all strategy errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeverError {
    // ============ Authorization Errors ============
    /// Caller does not hold the role the action requires
    #[error("caller {caller:?} lacks role {required:?}")]
    Unauthorized { required: Role, caller: Address },

    /// Caller is not on the allow-list guarding this action
    #[error("caller {caller:?} is not allow-listed")]
    NotAllowListed { caller: Address },

    // ============ State Errors ============
    /// No ledger entry has been opened yet
    #[error("no debt position has been opened")]
    PositionNotFound,

    /// Open was called twice
    #[error("debt position {id:?} already exists")]
    PositionAlreadyExists { id: PositionId },

    /// Operation invalid for the entry's current status
    #[error("position status is {actual:?}, expected {expected:?}")]
    InvalidStatus {
        expected: PositionStatus,
        actual: PositionStatus,
    },

    /// A top-level operation was entered while another was running
    #[error("re-entrant call into the strategy")]
    Reentrancy,

    /// Sweep targeted an asset the strategy manages
    #[error("asset is managed by the strategy and cannot be swept")]
    ProtectedAsset,

    // ============ Threshold Errors ============
    /// Zero amount not allowed
    #[error("amount must be non-zero")]
    ZeroAmount,

    /// Parameter above its allowed maximum
    #[error("{param} = {value} exceeds maximum {maximum}")]
    ExceedsMaximum {
        param: &'static str,
        value: u64,
        maximum: u64,
    },

    /// Parameter below its allowed minimum
    #[error("{param} = {value} is below minimum {minimum}")]
    BelowMinimum {
        param: &'static str,
        value: u64,
        minimum: u64,
    },

    /// Target/warning multipliers out of order
    #[error("invalid LTV multipliers: target {target} warning {warning}")]
    InvalidLtvMultipliers { target: u64, warning: u64 },

    /// Debt would fall below (or start below) the ledger floor
    #[error("debt {debt} below ledger minimum {min_debt}")]
    BelowMinDebt { debt: u64, min_debt: u64 },

    // ============ Liquidity Errors ============
    /// Strategy does not hold enough of an asset
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u64, requested: u64 },

    /// An adapter cannot satisfy the requested amount
    #[error("{adapter} cannot satisfy {requested} (available {available})")]
    InsufficientLiquidity {
        adapter: &'static str,
        available: u64,
        requested: u64,
    },

    /// Supply or borrow is paused on the ledger
    #[error("{adapter} is paused")]
    AdapterPaused { adapter: &'static str },

    /// An adapter call failed outright
    #[error("{adapter} call failed: {reason}")]
    AdapterFailure {
        adapter: &'static str,
        reason: &'static str,
    },

    // ============ Solvency Guard Errors ============
    /// Branch-wide ratio is below the critical ratio
    #[error("branch ratio {branch_ratio_bps} bps below critical ratio {critical_ratio_bps} bps")]
    BranchBelowCriticalRatio {
        branch_ratio_bps: u64,
        critical_ratio_bps: u64,
    },

    // ============ Slippage Errors ============
    /// Realised swap output below the minimum
    #[error("swap returned {actual}, minimum was {min_out}")]
    SlippageExceeded { min_out: u64, actual: u64 },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow occurred
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Price source returned zero
    #[error("price source returned zero")]
    InvalidPrice,
}

/// Failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wrong caller for a privileged action
    Authorization,
    /// Operation invalid for the current status
    State,
    /// Parameter outside an allowed bound
    Threshold,
    /// An adapter cannot satisfy the requested amount
    Liquidity,
    /// Branch-wide ratio forbids the transition
    SolvencyGuard,
    /// Realised swap output below the minimum
    Slippage,
    /// Checked arithmetic failed
    Arithmetic,
}

impl LeverError {
    /// Returns a human-readable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "E001_UNAUTHORIZED",
            Self::NotAllowListed { .. } => "E002_NOT_ALLOW_LISTED",
            Self::PositionNotFound => "E010_POSITION_NOT_FOUND",
            Self::PositionAlreadyExists { .. } => "E011_POSITION_EXISTS",
            Self::InvalidStatus { .. } => "E012_INVALID_STATUS",
            Self::Reentrancy => "E013_REENTRANCY",
            Self::ProtectedAsset => "E014_PROTECTED_ASSET",
            Self::ZeroAmount => "E020_ZERO_AMOUNT",
            Self::ExceedsMaximum { .. } => "E021_EXCEEDS_MAXIMUM",
            Self::BelowMinimum { .. } => "E022_BELOW_MINIMUM",
            Self::InvalidLtvMultipliers { .. } => "E023_INVALID_LTV",
            Self::BelowMinDebt { .. } => "E024_BELOW_MIN_DEBT",
            Self::InsufficientBalance { .. } => "E030_INSUFFICIENT_BALANCE",
            Self::InsufficientLiquidity { .. } => "E031_INSUFFICIENT_LIQUIDITY",
            Self::AdapterPaused { .. } => "E032_ADAPTER_PAUSED",
            Self::AdapterFailure { .. } => "E033_ADAPTER_FAILURE",
            Self::BranchBelowCriticalRatio { .. } => "E040_BRANCH_BELOW_CR",
            Self::SlippageExceeded { .. } => "E050_SLIPPAGE",
            Self::Overflow => "E080_OVERFLOW",
            Self::Underflow => "E081_UNDERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
            Self::InvalidPrice => "E083_INVALID_PRICE",
        }
    }

    /// Taxonomy bucket of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized { .. } | Self::NotAllowListed { .. } => ErrorCategory::Authorization,
            Self::PositionNotFound
            | Self::PositionAlreadyExists { .. }
            | Self::InvalidStatus { .. }
            | Self::Reentrancy
            | Self::ProtectedAsset => ErrorCategory::State,
            Self::ZeroAmount
            | Self::ExceedsMaximum { .. }
            | Self::BelowMinimum { .. }
            | Self::InvalidLtvMultipliers { .. }
            | Self::BelowMinDebt { .. } => ErrorCategory::Threshold,
            Self::InsufficientBalance { .. }
            | Self::InsufficientLiquidity { .. }
            | Self::AdapterPaused { .. }
            | Self::AdapterFailure { .. } => ErrorCategory::Liquidity,
            Self::BranchBelowCriticalRatio { .. } => ErrorCategory::SolvencyGuard,
            Self::SlippageExceeded { .. } => ErrorCategory::Slippage,
            Self::Overflow | Self::Underflow | Self::DivisionByZero | Self::InvalidPrice => {
                ErrorCategory::Arithmetic
            }
        }
    }

    /// Returns true if the same call may succeed on the next cycle against
    /// fresh state. Solvency-guard and authorization failures need a change
    /// in branch conditions or in the caller first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Liquidity | ErrorCategory::Slippage
        )
    }

    /// Returns true if the caller can fix it with different parameters
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InsufficientBalance { .. } => true, // Fund the strategy
            Self::BelowMinimum { .. } => true,        // Increase amount
            Self::ExceedsMaximum { .. } => true,      // Decrease amount
            Self::BelowMinDebt { .. } => true,        // Post more collateral
            _ => false,
        }
    }
}
