//! Ledger Policy
//!
//! The seam between the generic leverage loop and a concrete debt ledger.
//! A ledger that can redeem debt or freeze borrowing supplies its own
//! liquidation test and borrow gate here; the engine consults it before
//! every decision.

use lever_common::{
    config::StrategyConfig,
    errors::LeverResult,
    types::{LtvTargets, MaxFee, PositionSnapshot, PositionStatus},
};

use crate::current_ltv;

/// Ledger-specific rules the engine defers to
pub trait LedgerPolicy {
    /// Returns true if the ledger would liquidate the position as read.
    /// Evaluated before any other maintenance check.
    fn is_liquidatable(
        &self,
        snapshot: &PositionSnapshot,
        targets: &LtvTargets,
        config: &StrategyConfig,
    ) -> LeverResult<bool>;

    /// Returns true if new debt may be drawn in this status
    fn can_borrow(&self, status: PositionStatus) -> bool {
        status == PositionStatus::Active
    }

    /// Upfront-fee bound passed with every engine-driven borrow
    fn borrow_fee_bound(&self) -> MaxFee {
        MaxFee::Any
    }
}

/// Plain ledger: liquidated once LTV reaches the liquidation factor
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLedgerPolicy;

impl LedgerPolicy for DefaultLedgerPolicy {
    fn is_liquidatable(
        &self,
        snapshot: &PositionSnapshot,
        targets: &LtvTargets,
        _config: &StrategyConfig,
    ) -> LeverResult<bool> {
        if snapshot.debt == 0 {
            return Ok(false);
        }
        Ok(current_ltv(snapshot)? >= targets.liquidation_bps)
    }
}
