//! Strategy Configuration
//!
//! One explicit configuration value, constructed at initialization and
//! passed by reference. Setters on the strategy validate a candidate copy
//! before swapping it in.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::check;
use crate::constants::{bounds, defaults, ratios::BPS};
use crate::errors::{LeverError, LeverResult};

/// Tunable strategy parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StrategyConfig {
    /// Target LTV as a fraction of the liquidation factor
    pub target_ltv_multiplier_bps: u64,
    /// Warning LTV as a fraction of the liquidation factor
    pub warning_ltv_multiplier_bps: u64,
    /// Swap slippage tolerance
    pub slippage_bps: u64,
    /// Absolute surplus floor in borrowed-asset units
    pub min_surplus_absolute: u64,
    /// Surplus floor relative to outstanding debt
    pub min_surplus_relative_bps: u64,
    /// Swaps below this size are skipped
    pub min_amount_to_sell: u64,
    /// Under-target LTV gap that justifies a lever-up tend
    pub min_lever_gap_bps: u64,
    /// Network fee above which non-critical maintenance is deferred
    pub max_network_fee: u64,
    /// Correction applied to the ledger LTV in the liquidation test
    pub liquidation_correction_bps: u64,
    /// Treat every borrow as profitable
    pub force_profitable_borrow: bool,
    /// Free funds without touching lent balance beyond the repay need
    pub leave_debt_behind: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            target_ltv_multiplier_bps: defaults::TARGET_LTV_MULTIPLIER_BPS,
            warning_ltv_multiplier_bps: defaults::WARNING_LTV_MULTIPLIER_BPS,
            slippage_bps: defaults::SLIPPAGE_BPS,
            min_surplus_absolute: defaults::MIN_SURPLUS_ABSOLUTE,
            min_surplus_relative_bps: defaults::MIN_SURPLUS_RELATIVE_BPS,
            min_amount_to_sell: defaults::MIN_AMOUNT_TO_SELL,
            min_lever_gap_bps: defaults::MIN_LEVER_GAP_BPS,
            max_network_fee: defaults::MAX_NETWORK_FEE,
            liquidation_correction_bps: defaults::LIQUIDATION_CORRECTION_BPS,
            force_profitable_borrow: false,
            leave_debt_behind: false,
        }
    }
}

impl StrategyConfig {
    /// Check every bound; the first violation is returned
    pub fn validate(&self) -> LeverResult<()> {
        validate_ltv_multipliers(self.target_ltv_multiplier_bps, self.warning_ltv_multiplier_bps)?;
        check!(
            self.slippage_bps <= bounds::MAX_SLIPPAGE_BPS,
            LeverError::ExceedsMaximum {
                param: "slippage_bps",
                value: self.slippage_bps,
                maximum: bounds::MAX_SLIPPAGE_BPS,
            }
        );
        check!(
            self.min_surplus_relative_bps <= bounds::MAX_RELATIVE_SURPLUS_BPS,
            LeverError::ExceedsMaximum {
                param: "min_surplus_relative_bps",
                value: self.min_surplus_relative_bps,
                maximum: bounds::MAX_RELATIVE_SURPLUS_BPS,
            }
        );
        check!(
            self.liquidation_correction_bps >= bounds::MIN_LIQUIDATION_CORRECTION_BPS,
            LeverError::BelowMinimum {
                param: "liquidation_correction_bps",
                value: self.liquidation_correction_bps,
                minimum: bounds::MIN_LIQUIDATION_CORRECTION_BPS,
            }
        );
        check!(
            self.liquidation_correction_bps <= bounds::MAX_LIQUIDATION_CORRECTION_BPS,
            LeverError::ExceedsMaximum {
                param: "liquidation_correction_bps",
                value: self.liquidation_correction_bps,
                maximum: bounds::MAX_LIQUIDATION_CORRECTION_BPS,
            }
        );
        check!(
            self.min_lever_gap_bps < self.target_ltv_multiplier_bps,
            LeverError::ExceedsMaximum {
                param: "min_lever_gap_bps",
                value: self.min_lever_gap_bps,
                maximum: self.target_ltv_multiplier_bps,
            }
        );
        Ok(())
    }
}

/// target < warning <= 100%, with a minimum gap between them
pub fn validate_ltv_multipliers(target: u64, warning: u64) -> LeverResult<()> {
    check!(
        target > 0 && target < warning && warning <= BPS,
        LeverError::InvalidLtvMultipliers { target, warning }
    );
    check!(
        warning - target >= bounds::MIN_LTV_GAP_BPS,
        LeverError::InvalidLtvMultipliers { target, warning }
    );
    Ok(())
}
