//! Leverage Engine
//!
//! Decides and executes the leverage loop for one collateralized position:
//! supply collateral, borrow against it up to a target LTV, lend the
//! borrowed asset, and pull back when LTV drifts past a warning level.
//!
//! ## Core Operations
//!
//! - **lever_up**: supply collateral, borrow to target if profitable, lend
//! - **delever**: repay down to target once LTV exceeds warning
//! - **free_funds**: repay what a withdrawal needs, release collateral
//! - **tend_trigger**: ordered maintenance checks, liquidation first
//! - **limits**: withdrawal and deposit ceilings through target LTV
//!
//! ## Context Model
//!
//! The engine owns nothing. A [`LeverageEngine`] borrows the collaborators,
//! configuration and event log for the duration of one operation, and
//! reads collateral, debt and prices fresh from the adapters every time.
//! Ledger-specific behavior (liquidation test, when borrowing is allowed)
//! comes from a [`LedgerPolicy`].

pub mod policy;
pub mod lever;
pub mod limits;
pub mod trigger;

pub use policy::{DefaultLedgerPolicy, LedgerPolicy};

use lever_common::{
    adapters::Collaborators,
    config::StrategyConfig,
    constants::ratios::BPS,
    errors::LeverResult,
    events::EventLog,
    math,
    types::{Asset, LtvTargets, PositionId, PositionSnapshot, PositionStatus},
};

// ============ Engine Context ============

/// Everything one mutating engine operation needs
pub struct LeverageEngine<'a, P: LedgerPolicy + ?Sized> {
    /// External collaborators
    pub adapters: &'a mut Collaborators,
    /// Strategy configuration
    pub config: &'a StrategyConfig,
    /// Ledger-specific rules
    pub policy: &'a P,
    /// Ledger entry, `None` until opened
    pub id: Option<PositionId>,
    /// Event sink
    pub events: &'a mut EventLog,
}

/// Read-only half of the engine, for views and the maintenance trigger
pub struct EngineView<'a, P: LedgerPolicy + ?Sized> {
    pub adapters: &'a Collaborators,
    pub config: &'a StrategyConfig,
    pub policy: &'a P,
    pub id: Option<PositionId>,
}

impl<'a, P: LedgerPolicy + ?Sized> LeverageEngine<'a, P> {
    pub fn new(
        adapters: &'a mut Collaborators,
        config: &'a StrategyConfig,
        policy: &'a P,
        id: Option<PositionId>,
        events: &'a mut EventLog,
    ) -> Self {
        Self {
            adapters,
            config,
            policy,
            id,
            events,
        }
    }

    /// Borrow the read-only half
    pub fn view(&self) -> EngineView<'_, P> {
        EngineView {
            adapters: &*self.adapters,
            config: self.config,
            policy: self.policy,
            id: self.id,
        }
    }

    pub fn snapshot(&self) -> LeverResult<PositionSnapshot> {
        self.view().snapshot()
    }

    pub fn ltv_targets(&self) -> LeverResult<LtvTargets> {
        self.view().ltv_targets()
    }

    pub fn current_ltv(&self) -> LeverResult<u64> {
        self.view().current_ltv()
    }

    pub fn is_borrow_profitable(&self, additional: u64) -> LeverResult<bool> {
        self.view().is_borrow_profitable(additional)
    }

    pub(crate) fn active_id(&self, snapshot: &PositionSnapshot) -> Option<PositionId> {
        self.view().active_id(snapshot)
    }

    pub(crate) fn loose(&self, asset: Asset) -> LeverResult<u64> {
        self.adapters.balances.balance_of(asset)
    }
}

impl<'a, P: LedgerPolicy + ?Sized> EngineView<'a, P> {
    /// Read collateral, debt, status and both prices from the collaborators
    pub fn snapshot(&self) -> LeverResult<PositionSnapshot> {
        let (collateral, debt, status) = match self.id {
            Some(id) => (
                self.adapters.position.collateral(id)?,
                self.adapters.position.debt(id)?,
                self.adapters.position.status(id)?,
            ),
            None => (0, 0, PositionStatus::None),
        };
        Ok(PositionSnapshot {
            collateral,
            debt,
            status,
            collateral_price: self.adapters.prices.price(Asset::Collateral)?,
            borrowed_price: self.adapters.prices.price(Asset::Borrowed)?,
        })
    }

    /// Target and warning LTV as fractions of the ledger's liquidation factor
    pub fn ltv_targets(&self) -> LeverResult<LtvTargets> {
        let liquidation_bps = self.adapters.position.liquidation_factor_bps()?;
        Ok(LtvTargets {
            liquidation_bps,
            target_bps: math::mul_bps(liquidation_bps, self.config.target_ltv_multiplier_bps)?,
            warning_bps: math::mul_bps(liquidation_bps, self.config.warning_ltv_multiplier_bps)?,
        })
    }

    /// Current LTV in bps
    pub fn current_ltv(&self) -> LeverResult<u64> {
        current_ltv(&self.snapshot()?)
    }

    /// Entry id of an Active position, or `None` if nothing can be adjusted
    pub fn active_id(&self, snapshot: &PositionSnapshot) -> Option<PositionId> {
        match (self.id, snapshot.status) {
            (Some(id), PositionStatus::Active) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn loose(&self, asset: Asset) -> LeverResult<u64> {
        self.adapters.balances.balance_of(asset)
    }

    /// Returns true if borrowing `additional` costs no more than lending it earns
    pub fn is_borrow_profitable(&self, additional: u64) -> LeverResult<bool> {
        if self.config.force_profitable_borrow {
            return Ok(true);
        }
        let Some(id) = self.id else {
            return Ok(false);
        };
        let borrow_rate = self.adapters.position.borrow_rate_bps(id, additional)?;
        let supply_rate = self.adapters.lender.supply_rate_bps(additional)?;
        Ok(borrow_rate <= supply_rate)
    }

    /// Borrowed-asset units that would bring the position to target LTV once
    /// the ledger's upfront fee is added, capped by lender and borrow
    /// capacity. Zero if borrowing is not allowed.
    pub fn borrow_capacity(&self, snapshot: &PositionSnapshot, targets: &LtvTargets) -> LeverResult<u64> {
        let Some(id) = self.active_id(snapshot) else {
            return Ok(0);
        };
        if !self.policy.can_borrow(snapshot.status) || self.adapters.position.is_borrow_paused()? {
            return Ok(0);
        }

        let (debt_usd, collateral_usd) = usd_values(snapshot)?;
        let target_debt_usd = math::mul_bps(collateral_usd, targets.target_bps)?;
        if target_debt_usd <= debt_usd {
            return Ok(0);
        }
        let gap = math::from_usd(target_debt_usd - debt_usd, snapshot.borrowed_price)?;
        let wanted = net_of_upfront_fee(gap, self.adapters.position.upfront_fee_bps()?)?;

        let lender_cap = self.adapters.lender.max_deposit()?;
        let borrow_cap = self.adapters.position.max_borrow(id)?;
        Ok(wanted.min(lender_cap).min(borrow_cap))
    }

    /// LTV a withdrawal must respect: warning when debt may stay behind, else target
    pub fn withdraw_bound(&self, targets: &LtvTargets) -> u64 {
        if self.config.leave_debt_behind {
            targets.warning_bps
        } else {
            targets.target_bps
        }
    }
}

/// USD value of the position's debt and collateral
pub fn usd_values(snapshot: &PositionSnapshot) -> LeverResult<(u64, u64)> {
    let debt_usd = math::to_usd(snapshot.debt, snapshot.borrowed_price)?;
    let collateral_usd = math::to_usd(snapshot.collateral, snapshot.collateral_price)?;
    Ok((debt_usd, collateral_usd))
}

/// Largest draw whose amount plus upfront fee fits in `debt_room`
pub fn net_of_upfront_fee(debt_room: u64, fee_bps: u64) -> LeverResult<u64> {
    math::div_bps(debt_room, math::safe_add(BPS, fee_bps)?)
}

/// LTV of a snapshot in bps
pub fn current_ltv(snapshot: &PositionSnapshot) -> LeverResult<u64> {
    let (debt_usd, collateral_usd) = usd_values(snapshot)?;
    math::ltv_bps(debt_usd, collateral_usd)
}


#[cfg(test)]
mod tests {
    use super::*;
    use lever_common::constants::{ratios, token::ONE};

    #[test]
    fn test_targets_scale_liquidation_factor() {
        let (_world, mut adapters, id) = test_support::opened();
        let config = StrategyConfig::default();
        let mut events = EventLog::new();
        let engine = LeverageEngine::new(&mut adapters, &config, &DefaultLedgerPolicy, Some(id), &mut events);

        let targets = engine.ltv_targets().unwrap();
        assert_eq!(targets.liquidation_bps, ratios::LIQUIDATION_FACTOR_BPS);
        assert_eq!(targets.target_bps, ratios::LIQUIDATION_FACTOR_BPS * 7 / 10);
        assert_eq!(targets.warning_bps, ratios::LIQUIDATION_FACTOR_BPS * 8 / 10);
    }

    #[test]
    fn test_snapshot_reads_live_values() {
        let (world, mut adapters, id) = test_support::opened();
        let config = StrategyConfig::default();
        let mut events = EventLog::new();
        let engine = LeverageEngine::new(&mut adapters, &config, &DefaultLedgerPolicy, Some(id), &mut events);

        // $20,000 collateral against $5,000 debt
        assert_eq!(engine.current_ltv().unwrap(), 2_500);
        world.set_price(Asset::Collateral, 1_000 * ONE);
        assert_eq!(engine.current_ltv().unwrap(), 5_000);
    }

    #[test]
    fn test_draw_net_of_upfront_fee() {
        assert_eq!(net_of_upfront_fee(1_000 * ONE, 0).unwrap(), 1_000 * ONE);
        // a 0.5% fee on the draw still fits in 1,000
        let draw = net_of_upfront_fee(1_000 * ONE, 50).unwrap();
        assert_eq!(draw, 99_502_487_562);
        assert!(draw + math::mul_bps(draw, 50).unwrap() <= 1_000 * ONE);
    }

    #[test]
    fn test_no_position_reads_empty() {
        let world = lever_common::mock::MockWorld::default();
        let mut adapters = world.collaborators();
        let config = StrategyConfig::default();
        let mut events = EventLog::new();
        let engine = LeverageEngine::new(&mut adapters, &config, &DefaultLedgerPolicy, None, &mut events);

        let snapshot = engine.snapshot().unwrap();
        assert_eq!(snapshot.status, PositionStatus::None);
        assert_eq!(current_ltv(&snapshot).unwrap(), 0);
        assert!(!engine.is_borrow_profitable(ONE).unwrap());
    }
}
