//! Withdrawal and Deposit Ceilings
//!
//! Every ceiling is derived through an LTV bound (target unless stated
//! otherwise) and never looser than the tightest adapter capacity.
//! Required collateral rounds up, releasable collateral rounds down.

use lever_common::{
    errors::{LeverError, LeverResult},
    math,
    types::{Asset, PositionSnapshot, PositionStatus},
};

use crate::{EngineView, LedgerPolicy};

/// Collateral needed to carry `debt` at `bound_bps` LTV
pub fn required_collateral(debt: u64, snapshot: &PositionSnapshot, bound_bps: u64) -> LeverResult<u64> {
    if debt == 0 {
        return Ok(0);
    }
    let debt_usd = math::to_usd(debt, snapshot.borrowed_price)?;
    let collateral_usd = math::div_bps_up(debt_usd, bound_bps)?;
    math::from_usd_up(collateral_usd, snapshot.collateral_price)
}

/// Collateral withdrawable while current debt stays within `bound_bps`
pub fn max_withdrawal_at(snapshot: &PositionSnapshot, bound_bps: u64) -> LeverResult<u64> {
    let required = required_collateral(snapshot.debt, snapshot, bound_bps)?;
    Ok(snapshot.collateral.saturating_sub(required))
}

/// Debt to retire before withdrawing `amount` so the rest stays within `bound_bps`
pub fn amount_to_repay_at(snapshot: &PositionSnapshot, amount: u64, bound_bps: u64) -> LeverResult<u64> {
    let remaining = snapshot.collateral.saturating_sub(amount);
    let remaining_usd = math::to_usd(remaining, snapshot.collateral_price)?;
    let allowed_usd = math::mul_bps(remaining_usd, bound_bps)?;
    let allowed_debt = math::from_usd(allowed_usd, snapshot.borrowed_price)?;
    Ok(snapshot.debt.saturating_sub(allowed_debt))
}

/// Collateral whose `bound_bps` borrowing power equals `borrowed` units
fn collateral_backing(borrowed: u64, snapshot: &PositionSnapshot, bound_bps: u64) -> LeverResult<u64> {
    let usd = math::to_usd(borrowed, snapshot.borrowed_price)?;
    let collateral_usd = math::div_bps(usd, bound_bps)?;
    math::from_usd(collateral_usd, snapshot.collateral_price)
}

/// Capacities far beyond any reachable balance saturate instead of failing
fn saturating(result: LeverResult<u64>) -> LeverResult<u64> {
    match result {
        Err(LeverError::Overflow) => Ok(u64::MAX),
        other => other,
    }
}

impl<'a, P: LedgerPolicy + ?Sized> EngineView<'a, P> {
    /// Collateral withdrawable without repaying, keeping debt within target
    pub fn max_withdrawal(&self) -> LeverResult<u64> {
        let snapshot = self.snapshot()?;
        let targets = self.ltv_targets()?;
        max_withdrawal_at(&snapshot, targets.target_bps)
    }

    /// Debt to retire before withdrawing `amount`; 0 if target holds anyway
    pub fn calculate_amount_to_repay(&self, amount: u64) -> LeverResult<u64> {
        let snapshot = self.snapshot()?;
        let targets = self.ltv_targets()?;
        amount_to_repay_at(&snapshot, amount, targets.target_bps)
    }

    fn is_paused(&self) -> LeverResult<bool> {
        Ok(self.adapters.position.is_supply_paused()? || self.adapters.position.is_borrow_paused()?)
    }

    /// More collateral the strategy can take: the tightest of ledger deposit,
    /// lender and borrow capacity, net of collateral already waiting loose
    pub fn available_deposit_limit(&self) -> LeverResult<u64> {
        if self.is_paused()? {
            return Ok(0);
        }
        let snapshot = self.snapshot()?;
        let targets = self.ltv_targets()?;

        let ledger_cap = self.adapters.position.max_collateral_deposit()?;
        let lender_cap = saturating(collateral_backing(
            self.adapters.lender.max_deposit()?,
            &snapshot,
            targets.target_bps,
        ))?;
        let borrow_cap = match self.id {
            Some(id) => saturating(collateral_backing(
                self.adapters.position.max_borrow(id)?,
                &snapshot,
                targets.target_bps,
            ))?,
            None => u64::MAX,
        };

        let limit = ledger_cap.min(lender_cap).min(borrow_cap);
        Ok(limit.saturating_sub(self.loose(Asset::Collateral)?))
    }

    /// Collateral a withdrawal can get now: loose collateral plus what the
    /// position releases after repaying with loose and withdrawable funds.
    ///
    /// A partial withdrawal can retire debt only down to the ledger floor,
    /// so the collateral carrying the floor is never counted. Taking it too
    /// means withdrawing all posted collateral, which closes the entry.
    pub fn available_withdraw_limit(&self) -> LeverResult<u64> {
        let idle = self.loose(Asset::Collateral)?;
        let snapshot = self.snapshot()?;
        if snapshot.status != PositionStatus::Active || self.is_paused()? {
            return Ok(idle);
        }

        let funds = math::safe_add(self.loose(Asset::Borrowed)?, self.adapters.lender.max_withdraw()?)?;
        let floor = self.adapters.position.min_debt()?.min(snapshot.debt);
        let remaining_debt = snapshot.debt.saturating_sub(funds).max(floor);
        let targets = self.ltv_targets()?;
        let required = required_collateral(remaining_debt, &snapshot, self.withdraw_bound(&targets))?;
        Ok(idle.saturating_add(snapshot.collateral.saturating_sub(required)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lever_common::{
        config::StrategyConfig,
        constants::token::ONE,
        mock::MockWorld,
    };

    use crate::{test_support::opened, DefaultLedgerPolicy};

    fn view<'a>(
        adapters: &'a lever_common::adapters::Collaborators,
        config: &'a StrategyConfig,
        id: Option<lever_common::types::PositionId>,
    ) -> EngineView<'a, DefaultLedgerPolicy> {
        EngineView {
            adapters,
            config,
            policy: &DefaultLedgerPolicy,
            id,
        }
    }

    fn snapshot(collateral: u64, debt: u64) -> PositionSnapshot {
        PositionSnapshot {
            collateral,
            debt,
            status: PositionStatus::Active,
            collateral_price: 2_000 * ONE,
            borrowed_price: ONE,
        }
    }

    #[test]
    fn test_max_withdrawal_bounds() {
        // $20,000 collateral, 6,000 debt at 60% needs $10,000
        assert_eq!(max_withdrawal_at(&snapshot(10 * ONE, 6_000 * ONE), 6_000).unwrap(), 5 * ONE);
        // already past the bound
        assert_eq!(max_withdrawal_at(&snapshot(10 * ONE, 13_000 * ONE), 6_000).unwrap(), 0);
        assert_eq!(max_withdrawal_at(&snapshot(10 * ONE, 0), 6_000).unwrap(), 10 * ONE);
    }

    #[test]
    fn test_max_withdrawal_monotonic() {
        let mut last = u64::MAX;
        for debt in [0, 1_000, 4_000, 8_000, 12_000, 16_000] {
            let value = max_withdrawal_at(&snapshot(10 * ONE, debt * ONE), 6_000).unwrap();
            assert!(value <= last, "non-increasing in debt");
            last = value;
        }
        let mut last = 0;
        for collateral in [1, 3, 5, 8, 13] {
            let value = max_withdrawal_at(&snapshot(collateral * ONE, 6_000 * ONE), 6_000).unwrap();
            assert!(value >= last, "non-decreasing in collateral");
            last = value;
        }
    }

    #[test]
    fn test_amount_to_repay() {
        // withdrawing 5 of 10 leaves $10,000, which carries 6,000 at 60%
        assert_eq!(amount_to_repay_at(&snapshot(10 * ONE, 6_000 * ONE), 5 * ONE, 6_000).unwrap(), 0);
        assert_eq!(
            amount_to_repay_at(&snapshot(10 * ONE, 8_000 * ONE), 5 * ONE, 6_000).unwrap(),
            2_000 * ONE
        );
        // withdrawing everything retires everything
        assert_eq!(
            amount_to_repay_at(&snapshot(10 * ONE, 8_000 * ONE), 10 * ONE, 6_000).unwrap(),
            8_000 * ONE
        );
    }

    #[test]
    fn test_deposit_limit_tightest_capacity() {
        let (world, adapters, id) = opened();
        world.update(|s| {
            s.max_collateral_deposit = 50 * ONE;
            s.lender_deposit_cap = 6_363 * ONE;
        });
        let config = StrategyConfig::default();
        let engine = view(&adapters, &config, Some(id));

        // 6,363 lendable at 63.63% target backs $10,000 = 5 collateral
        assert_eq!(engine.available_deposit_limit().unwrap(), 5 * ONE);

        world.fund(Asset::Collateral, 2 * ONE);
        assert_eq!(engine.available_deposit_limit().unwrap(), 3 * ONE);

        world.update(|s| s.borrow_paused = true);
        assert_eq!(engine.available_deposit_limit().unwrap(), 0);
    }

    #[test]
    fn test_withdraw_limit_counts_idle_and_releasable() {
        let (world, adapters, id) = opened();
        let config = StrategyConfig::default();
        let engine = view(&adapters, &config, Some(id));

        // open proceeds retire everything above the floor; 10 debt at
        // 63.63% stays backed by 0.00785793 collateral
        assert_eq!(engine.available_withdraw_limit().unwrap(), 10 * ONE - 785_793);

        world.update(|s| {
            s.balances.insert(Asset::Borrowed, 0);
            s.supply_paused = true;
        });
        world.fund(Asset::Collateral, ONE);
        assert_eq!(engine.available_withdraw_limit().unwrap(), ONE);
    }

    #[test]
    fn test_limits_without_position() {
        let world = MockWorld::default();
        world.fund(Asset::Collateral, 3 * ONE);
        let adapters = world.collaborators();
        let config = StrategyConfig::default();
        let engine = view(&adapters, &config, None);

        assert_eq!(engine.available_withdraw_limit().unwrap(), 3 * ONE);
        assert_eq!(engine.max_withdrawal().unwrap(), 0);
    }
}
