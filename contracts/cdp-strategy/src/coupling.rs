//! Debt-Position Coupling
//!
//! Rules of a ledger that can redeem debt at par, freeze an entry as Zombie
//! when its debt falls under the floor, and guard every debt-increasing
//! transition with a branch-wide solvency check.
//!
//! ## State Machine
//!
//! ```text
//! None --open--> Active --redemption below floor--> Zombie --exit (guarded)--> Active
//!                  |                                   |
//!                  +--liquidation--> ClosedByLiquidation
//!                  +--full exit----> ClosedByOwner  <--+
//! ```

use lever_common::{
    adapters::Collaborators,
    check,
    config::StrategyConfig,
    errors::{LeverError, LeverResult},
    math,
    types::{Asset, BranchState, LtvTargets, PositionSnapshot},
};
use lever_engine::{current_ltv, LedgerPolicy};

/// Ledger policy for a redeemable CDP
#[derive(Debug, Clone, Copy, Default)]
pub struct DebtPositionCoupling;

impl LedgerPolicy for DebtPositionCoupling {
    /// Liquidatable once the corrected ledger LTV reaches the liquidation factor.
    /// The correction trips slightly ahead of the ledger's own check.
    fn is_liquidatable(
        &self,
        snapshot: &PositionSnapshot,
        targets: &LtvTargets,
        config: &StrategyConfig,
    ) -> LeverResult<bool> {
        if snapshot.debt == 0 || !snapshot.status.is_open() {
            return Ok(false);
        }
        if snapshot.collateral == 0 {
            return Ok(true);
        }
        let corrected = math::mul_bps(current_ltv(snapshot)?, config.liquidation_correction_bps)?;
        Ok(corrected >= targets.liquidation_bps)
    }
}

/// Read the branch-wide aggregates from the ledger
pub fn branch_state(adapters: &Collaborators) -> LeverResult<BranchState> {
    Ok(BranchState {
        aggregate_collateral: adapters.position.branch_aggregate_collateral()?,
        aggregate_debt: adapters.position.branch_aggregate_debt()?,
        critical_ratio_bps: adapters.position.critical_ratio_bps()?,
    })
}

/// Refuse a debt-increasing transition while
/// `aggregate_collateral * price < critical_ratio * aggregate_debt`
pub fn require_branch_solvent(branch: &BranchState, collateral_price: u64) -> LeverResult<()> {
    let branch_ratio_bps =
        math::collateral_ratio_bps(branch.aggregate_collateral, branch.aggregate_debt, collateral_price)?;
    check!(
        branch_ratio_bps >= branch.critical_ratio_bps,
        LeverError::BranchBelowCriticalRatio {
            branch_ratio_bps,
            critical_ratio_bps: branch.critical_ratio_bps,
        }
    );
    Ok(())
}

/// Branch solvency check against live ledger and price readings
pub fn check_branch_solvency(adapters: &Collaborators) -> LeverResult<()> {
    let branch = branch_state(adapters)?;
    let price = adapters.prices.price(Asset::Collateral)?;
    require_branch_solvent(&branch, price)
}
