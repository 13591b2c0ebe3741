//! Zombie Recovery
//!
//! A redemption that leaves debt under the ledger floor freezes the entry.
//! Borrowing resumes only after an allow-listed caller re-borrows at least
//! up to the floor, and only while the branch is above its critical ratio.

use tracing::info;

use lever_common::{
    check,
    errors::{LeverError, LeverResult},
    events::StrategyEvent,
    math,
    types::{Address, Hints, MaxFee, PositionStatus},
    validation::{require_debt_floor, require_positive, require_status},
};

use crate::{coupling::check_branch_solvency, CdpStrategy};

impl CdpStrategy {
    /// Borrow `borrow_amount` on the Zombie entry to return it to Active.
    ///
    /// Fails with `BranchBelowCriticalRatio` while the branch is under its
    /// critical ratio, leaving debt and collateral untouched.
    pub fn exit_zombie(&mut self, caller: &Address, borrow_amount: u64, hints: Hints) -> LeverResult<()> {
        self.atomically(|s| {
            s.zombie_exit.require(caller)?;
            require_positive(borrow_amount)?;
            let id = s.require_position()?;

            let snapshot = s.position()?;
            require_status(snapshot.status, PositionStatus::Zombie)?;
            check_branch_solvency(&s.adapters)?;

            let min_debt = s.adapters.position.min_debt()?;
            let fee = math::mul_bps(borrow_amount, s.adapters.position.upfront_fee_bps()?)?;
            let new_debt = math::safe_add(snapshot.debt, math::safe_add(borrow_amount, fee)?)?;
            require_debt_floor(new_debt, min_debt)?;

            let targets = s.ltv_targets()?;
            let collateral_usd = math::to_usd(snapshot.collateral, snapshot.collateral_price)?;
            let max_debt = math::from_usd(
                math::mul_bps(collateral_usd, targets.target_bps)?,
                snapshot.borrowed_price,
            )?;
            check!(
                new_debt <= max_debt,
                LeverError::ExceedsMaximum {
                    param: "zombie_exit_debt",
                    value: new_debt,
                    maximum: max_debt,
                }
            );

            s.adapters.position.exit_zombie(id, borrow_amount, hints, MaxFee::Any)?;
            s.engine().lend_idle()?;

            info!(borrowed = borrow_amount, debt = new_debt, "zombie exited");
            s.events.emit(StrategyEvent::ZombieExited {
                borrowed: borrow_amount,
                debt: new_debt,
            });
            Ok(())
        })
    }
}
