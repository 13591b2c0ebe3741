//! Position Lifecycle
//!
//! Open, deposit, withdraw, maintenance and the emergency exit.
//!
//! ## Maintenance Order
//!
//! 1. Liquidated: claim leftover collateral, sell residual borrowed asset
//! 2. LTV at risk (liquidation test or above warning): delever
//! 3. Redemption surplus: sell it, and do nothing else this call
//! 4. Otherwise: rebalance (unwind unprofitable debt or lever up)

use tracing::{debug, info, warn};

use lever_common::{
    access_control::Role,
    check,
    constants::bounds,
    errors::{LeverError, LeverResult},
    events::StrategyEvent,
    math,
    types::{Address, Asset, Hints, MaxFee, PositionStatus},
    validation::{require_positive, require_sufficient_balance},
};
use lever_engine::{current_ltv, LedgerPolicy};

use crate::{CdpStrategy, DebtPositionCoupling};

impl CdpStrategy {
    // ============ Open ============

    /// Open the ledger entry with `collateral` from the loose balance and
    /// lever to target. One-time; the stipend must already be held.
    pub fn open_position(
        &mut self,
        caller: &Address,
        collateral: u64,
        interest_rate_bps: u64,
        max_fee: MaxFee,
    ) -> LeverResult<()> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Management)?;
            if let Some(id) = s.position_id {
                return Err(LeverError::PositionAlreadyExists { id });
            }
            require_positive(collateral)?;
            s.require_interest_rate(interest_rate_bps)?;

            let stipend = s.adapters.position.stipend()?;
            require_sufficient_balance(s.adapters.balances.balance_of(Asset::Stipend)?, stipend)?;
            require_sufficient_balance(s.adapters.balances.balance_of(Asset::Collateral)?, collateral)?;

            // the collateral must carry the floor debt at target LTV
            let min_debt = s.adapters.position.min_debt()?;
            let targets = s.ltv_targets()?;
            let collateral_usd = math::to_usd(collateral, s.adapters.prices.price(Asset::Collateral)?)?;
            let debt_at_target = math::from_usd(
                math::mul_bps(collateral_usd, targets.target_bps)?,
                s.adapters.prices.price(Asset::Borrowed)?,
            )?;
            check!(
                debt_at_target >= min_debt,
                LeverError::BelowMinDebt {
                    debt: debt_at_target,
                    min_debt,
                }
            );

            let id = s
                .adapters
                .position
                .open(collateral, min_debt, interest_rate_bps, Hints::default(), max_fee)?;
            s.position_id = Some(id);

            info!(collateral, debt = min_debt, stipend, "position opened");
            s.events.emit(StrategyEvent::PositionOpened {
                id,
                collateral,
                debt: min_debt,
                stipend,
            });

            s.engine().lever_up(0)?;
            Ok(())
        })
    }

    pub(crate) fn require_interest_rate(&self, rate_bps: u64) -> LeverResult<()> {
        check!(
            rate_bps >= bounds::MIN_INTEREST_RATE_BPS,
            LeverError::BelowMinimum {
                param: "interest_rate_bps",
                value: rate_bps,
                minimum: bounds::MIN_INTEREST_RATE_BPS,
            }
        );
        check!(
            rate_bps <= bounds::MAX_INTEREST_RATE_BPS,
            LeverError::ExceedsMaximum {
                param: "interest_rate_bps",
                value: rate_bps,
                maximum: bounds::MAX_INTEREST_RATE_BPS,
            }
        );
        Ok(())
    }

    // ============ Vault Flows ============

    /// Put `amount` of loose collateral to work. Outside Active it stays loose.
    pub fn deploy_funds(&mut self, caller: &Address, amount: u64) -> LeverResult<()> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Vault)?;
            require_sufficient_balance(s.adapters.balances.balance_of(Asset::Collateral)?, amount)?;
            s.engine().lever_up(amount)?;
            Ok(())
        })
    }

    /// Release `amount` collateral to the vault: loose collateral first, then
    /// repay and withdraw from the position
    pub fn free_funds(&mut self, caller: &Address, amount: u64) -> LeverResult<u64> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Vault)?;
            require_positive(amount)?;

            let idle = s.adapters.balances.balance_of(Asset::Collateral)?;
            if amount > idle {
                s.engine().free_funds(amount - idle)?;
            }
            s.adapters.balances.transfer(Asset::Collateral, *caller, amount)?;
            debug!(amount, "collateral sent to vault");
            Ok(amount)
        })
    }

    // ============ Maintenance ============

    /// Keeper maintenance
    pub fn tend(&mut self, caller: &Address) -> LeverResult<()> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Keeper)?;

            let snapshot = s.position()?;
            match snapshot.status {
                PositionStatus::ClosedByLiquidation => return s.clean_up_liquidation(),
                PositionStatus::None | PositionStatus::ClosedByOwner => return Ok(()),
                PositionStatus::Active | PositionStatus::Zombie => {}
            }

            let targets = s.ltv_targets()?;
            let at_risk = DebtPositionCoupling.is_liquidatable(&snapshot, &targets, &s.config)?
                || current_ltv(&snapshot)? > targets.warning_bps;
            if at_risk && snapshot.status == PositionStatus::Zombie {
                // a frozen entry cannot be delevered until it exits zombie
                warn!(
                    collateral = snapshot.collateral,
                    debt = snapshot.debt,
                    "zombie position at risk, needs exit_zombie"
                );
            }

            if !at_risk && s.has_surplus()? {
                s.sell_surplus()?;
                return Ok(());
            }
            s.engine().rebalance()
        })
    }

    /// Returns true if `tend` has work to do now
    pub fn tend_trigger(&self) -> LeverResult<bool> {
        if self.view().tend_trigger()? {
            return Ok(true);
        }
        match self.status()? {
            PositionStatus::ClosedByLiquidation => {
                let leftovers = self.adapters.held_borrowed()? >= self.config.min_amount_to_sell
                    || self.adapters.position.claimable_collateral()? > 0;
                Ok(leftovers && self.view().network_fee_acceptable()?)
            }
            PositionStatus::Active | PositionStatus::Zombie => {
                Ok(self.has_surplus()? && self.view().network_fee_acceptable()?)
            }
            PositionStatus::None | PositionStatus::ClosedByOwner => Ok(false),
        }
    }

    /// Collect what a liquidation left behind
    fn clean_up_liquidation(&mut self) -> LeverResult<()> {
        self.claim_if_claimable()?;
        self.sell_residual()?;
        Ok(())
    }

    pub(crate) fn claim_if_claimable(&mut self) -> LeverResult<u64> {
        if self.adapters.position.claimable_collateral()? == 0 {
            return Ok(0);
        }
        let amount = self.adapters.position.claim_collateral()?;
        info!(amount, "collateral claimed");
        self.events.emit(StrategyEvent::CollateralClaimed { amount });
        Ok(amount)
    }

    /// Claim collateral left over after a liquidation. No-op when nothing is owed.
    pub fn claim_collateral(&mut self, caller: &Address) -> LeverResult<u64> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Keeper)?;
            s.claim_if_claimable()
        })
    }

    // ============ Emergency ============

    /// Withdraw everything lent, repay all debt and close; after a
    /// liquidation, claim the collateral surplus instead. The stipend goes
    /// to the caller.
    pub fn emergency_withdraw(&mut self, caller: &Address) -> LeverResult<()> {
        self.atomically(|s| {
            s.roles.require(caller, Role::EmergencyAdmin)?;
            let id = s.require_position()?;
            let snapshot = s.position()?;

            let lent = s.adapters.lender.max_withdraw()?;
            if lent > 0 {
                s.adapters.lender.withdraw(lent)?;
            }

            let mut repaid = 0;
            let mut recovered = 0;
            match snapshot.status {
                PositionStatus::Active | PositionStatus::Zombie => {
                    let loose = s.adapters.balances.balance_of(Asset::Borrowed)?;
                    require_sufficient_balance(loose, snapshot.debt)?;
                    s.adapters.position.close(id)?;
                    repaid = snapshot.debt;
                    recovered = snapshot.collateral;

                    let stipend = s
                        .adapters
                        .position
                        .stipend()?
                        .min(s.adapters.balances.balance_of(Asset::Stipend)?);
                    if stipend > 0 {
                        s.adapters.balances.transfer(Asset::Stipend, *caller, stipend)?;
                    }
                }
                PositionStatus::ClosedByLiquidation => {
                    recovered = s.claim_if_claimable()?;
                }
                PositionStatus::None | PositionStatus::ClosedByOwner => {
                    warn!(status = ?snapshot.status, "nothing to unwind on the ledger");
                }
            }

            info!(prior_status = ?snapshot.status, repaid, recovered, "emergency unwind");
            s.events.emit(StrategyEvent::EmergencyUnwound {
                prior_status: snapshot.status,
                repaid,
                collateral_recovered: recovered,
            });
            Ok(())
        })
    }
}
