//! Lever Up / Delever
//!
//! The mutating half of the engine. Every operation re-reads the position,
//! issues ordered adapter calls and leaves the position at or under target
//! LTV (up to one bps of rounding).
//!
//! ## Lever Up
//!
//! 1. Supply collateral (capped by the ledger's deposit capacity)
//! 2. If LTV is under target, borrow the USD gap in borrowed-asset units,
//!    capped by lender and borrow capacity
//! 3. Skip the borrow (never the supply) when it would cost more than
//!    lending it earns
//! 4. Lend every loose unit of the borrowed asset
//!
//! ## Delever
//!
//! Above warning LTV, repay down to target using loose funds first and the
//! lender second, never below the ledger's minimum debt.

use tracing::{debug, info, warn};

use lever_common::{
    check,
    errors::{LeverError, LeverResult},
    events::StrategyEvent,
    math,
    types::{Asset, PositionId, PositionSnapshot, PositionStatus},
    validation::require_status,
};

use crate::{current_ltv, limits, usd_values, LedgerPolicy, LeverageEngine};

impl<'a, P: LedgerPolicy + ?Sized> LeverageEngine<'a, P> {
    // ============ Lever Up ============

    /// Supply `amount` collateral, borrow up to target if profitable, lend.
    /// Outside Active the collateral stays loose. Returns the amount borrowed.
    pub fn lever_up(&mut self, amount: u64) -> LeverResult<u64> {
        let snapshot = self.snapshot()?;
        let Some(id) = self.active_id(&snapshot) else {
            debug!(status = ?snapshot.status, amount, "position not active, collateral stays loose");
            return Ok(0);
        };

        let supplied = self.supply(id, amount)?;

        let snapshot = self.snapshot()?;
        let targets = self.ltv_targets()?;
        let capacity = self.view().borrow_capacity(&snapshot, &targets)?;

        let mut borrowed = 0;
        if capacity > 0 {
            if self.is_borrow_profitable(capacity)? {
                self.adapters
                    .position
                    .borrow(id, capacity, self.policy.borrow_fee_bound())?;
                borrowed = capacity;
            } else {
                let borrow_rate_bps = self.adapters.position.borrow_rate_bps(id, capacity)?;
                let supply_rate_bps = self.adapters.lender.supply_rate_bps(capacity)?;
                warn!(
                    amount = capacity,
                    borrow_rate_bps, supply_rate_bps, "borrow skipped, cost exceeds yield"
                );
                self.events.emit(StrategyEvent::BorrowSkipped {
                    amount: capacity,
                    borrow_rate_bps,
                    supply_rate_bps,
                });
            }
        }

        self.lend_idle()?;

        if supplied > 0 || borrowed > 0 {
            let ltv_bps = self.current_ltv()?;
            info!(supplied, borrowed, ltv_bps, "levered up");
            self.events.emit(StrategyEvent::LeveredUp {
                supplied,
                borrowed,
                ltv_bps,
            });
        }
        Ok(borrowed)
    }

    fn supply(&mut self, id: PositionId, amount: u64) -> LeverResult<u64> {
        if amount == 0 {
            return Ok(0);
        }
        if self.adapters.position.is_supply_paused()? {
            warn!(amount, "supply paused, collateral stays loose");
            return Ok(0);
        }
        let amount = amount.min(self.adapters.position.max_collateral_deposit()?);
        if amount > 0 {
            self.adapters.position.add_collateral(id, amount)?;
        }
        Ok(amount)
    }

    /// Deposit loose borrowed asset into the lender, up to its capacity
    pub fn lend_idle(&mut self) -> LeverResult<u64> {
        let loose = self.loose(Asset::Borrowed)?;
        let amount = loose.min(self.adapters.lender.max_deposit()?);
        if amount == 0 {
            return Ok(0);
        }
        self.adapters.lender.deposit(amount)?;
        debug!(amount, "lent idle borrowed asset");
        Ok(amount)
    }

    // ============ Delever ============

    /// Repay down to target once LTV is above warning. Returns the amount repaid.
    pub fn delever(&mut self) -> LeverResult<u64> {
        let snapshot = self.snapshot()?;
        let Some(id) = self.active_id(&snapshot) else {
            return Ok(0);
        };
        let targets = self.ltv_targets()?;
        if current_ltv(&snapshot)? <= targets.warning_bps {
            return Ok(0);
        }

        let (debt_usd, collateral_usd) = usd_values(&snapshot)?;
        let target_debt_usd = math::mul_bps(collateral_usd, targets.target_bps)?;
        let shortfall = math::from_usd_up(debt_usd.saturating_sub(target_debt_usd), snapshot.borrowed_price)?;

        let repaid = self.repay_debt(id, &snapshot, shortfall)?;
        self.record_delever(repaid)?;
        Ok(repaid)
    }

    /// Repay as much debt as loose and lent funds allow when borrowing no
    /// longer pays for itself. Returns the amount repaid.
    pub fn unwind_unprofitable(&mut self) -> LeverResult<u64> {
        let snapshot = self.snapshot()?;
        let Some(id) = self.active_id(&snapshot) else {
            return Ok(0);
        };
        if snapshot.debt == 0 || self.is_borrow_profitable(0)? {
            return Ok(0);
        }
        let repaid = self.repay_debt(id, &snapshot, snapshot.debt)?;
        self.record_delever(repaid)?;
        Ok(repaid)
    }

    fn record_delever(&mut self, repaid: u64) -> LeverResult<()> {
        if repaid == 0 {
            return Ok(());
        }
        let ltv_bps = self.current_ltv()?;
        info!(repaid, ltv_bps, "delevered");
        self.events.emit(StrategyEvent::Delevered { repaid, ltv_bps });
        Ok(())
    }

    /// Repay up to `wanted`, never below the ledger floor. Partial repayment
    /// when funds run short.
    pub(crate) fn repay_debt(&mut self, id: PositionId, snapshot: &PositionSnapshot, wanted: u64) -> LeverResult<u64> {
        let min_debt = self.adapters.position.min_debt()?;
        let wanted = wanted.min(snapshot.debt.saturating_sub(min_debt));
        if wanted == 0 {
            return Ok(0);
        }
        let available = self.gather_borrowed(wanted)?;
        let amount = wanted.min(available);
        if amount == 0 {
            warn!(wanted, "no borrowed asset available to repay");
            return Ok(0);
        }
        if amount < wanted {
            warn!(wanted, amount, "partial repayment, lender short");
        }
        self.adapters.position.repay(id, amount)?;
        Ok(amount)
    }

    /// Withdraw from the lender until `needed` borrowed asset is loose, or
    /// the lender runs dry. Returns the loose balance afterwards.
    pub fn gather_borrowed(&mut self, needed: u64) -> LeverResult<u64> {
        let loose = self.loose(Asset::Borrowed)?;
        if loose >= needed {
            return Ok(loose);
        }
        let take = (needed - loose).min(self.adapters.lender.max_withdraw()?);
        if take > 0 {
            let received = self.adapters.lender.withdraw(take)?;
            debug!(requested = take, received, "withdrew from lender");
        }
        self.loose(Asset::Borrowed)
    }

    // ============ Rebalance ============

    /// Keeper maintenance: delever above warning, unwind unprofitable debt,
    /// otherwise lever idle collateral up to target
    pub fn rebalance(&mut self) -> LeverResult<()> {
        let snapshot = self.snapshot()?;
        if self.active_id(&snapshot).is_none() {
            return Ok(());
        }
        let targets = self.ltv_targets()?;
        if current_ltv(&snapshot)? > targets.warning_bps {
            self.delever()?;
            return Ok(());
        }
        if self.unwind_unprofitable()? > 0 {
            return Ok(());
        }
        let idle = self.loose(Asset::Collateral)?;
        self.lever_up(idle)?;
        Ok(())
    }

    // ============ Free Funds ============

    /// Release `amount` collateral to the loose balance, repaying first what
    /// the withdrawal needs. Withdrawing all posted collateral closes the
    /// entry. Fails rather than leave LTV above warning.
    pub fn free_funds(&mut self, amount: u64) -> LeverResult<u64> {
        if amount == 0 {
            return Ok(0);
        }
        let snapshot = self.snapshot()?;
        require_status(snapshot.status, PositionStatus::Active)?;
        let id = self.id.ok_or(LeverError::PositionNotFound)?;
        check!(
            amount <= snapshot.collateral,
            LeverError::InsufficientBalance {
                available: snapshot.collateral,
                requested: amount,
            }
        );

        if amount == snapshot.collateral {
            return self.close_out(id, &snapshot);
        }

        let targets = self.ltv_targets()?;
        let bound = self.view().withdraw_bound(&targets);
        let needed = limits::amount_to_repay_at(&snapshot, amount, bound)?;
        let repaid = self.repay_debt(id, &snapshot, needed)?;

        let after = PositionSnapshot {
            collateral: snapshot.collateral - amount,
            debt: snapshot.debt - repaid,
            ..snapshot
        };
        let ltv_after = current_ltv(&after)?;
        if ltv_after > targets.warning_bps {
            let min_debt = self.adapters.position.min_debt()?;
            if snapshot.debt.saturating_sub(needed) < min_debt {
                return Err(LeverError::BelowMinDebt {
                    debt: snapshot.debt.saturating_sub(needed),
                    min_debt,
                });
            }
            if repaid < needed {
                return Err(LeverError::InsufficientLiquidity {
                    adapter: "lender",
                    available: repaid,
                    requested: needed,
                });
            }
            return Err(LeverError::ExceedsMaximum {
                param: "ltv_bps",
                value: ltv_after,
                maximum: targets.warning_bps,
            });
        }

        self.adapters.position.remove_collateral(id, amount)?;
        info!(collateral = amount, repaid, ltv_bps = ltv_after, "funds freed");
        self.events.emit(StrategyEvent::FundsFreed {
            collateral: amount,
            repaid,
        });
        Ok(amount)
    }

    /// Repay everything and close. Collateral and stipend come back loose.
    fn close_out(&mut self, id: PositionId, snapshot: &PositionSnapshot) -> LeverResult<u64> {
        let available = self.gather_borrowed(snapshot.debt)?;
        check!(
            available >= snapshot.debt,
            LeverError::InsufficientBalance {
                available,
                requested: snapshot.debt,
            }
        );
        self.adapters.position.close(id)?;
        info!(collateral = snapshot.collateral, repaid = snapshot.debt, "position closed by owner");
        self.events.emit(StrategyEvent::FundsFreed {
            collateral: snapshot.collateral,
            repaid: snapshot.debt,
        });
        Ok(snapshot.collateral)
    }
}
