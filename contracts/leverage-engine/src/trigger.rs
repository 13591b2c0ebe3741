//! Maintenance Trigger
//!
//! Ordered checks, first match wins:
//!
//! 1. Ledger liquidation test (never masked, ignores the fee gate)
//! 2. Nothing deployed or waiting: no maintenance
//! 3. LTV above warning (ignores the fee gate)
//! 4. Levered while borrowing costs more than lending earns (fee-gated)
//! 5. LTV under target by more than the lever gap and a new borrow would
//!    still pay for itself (fee-gated)

use tracing::debug;

use lever_common::{errors::LeverResult, types::{Asset, PositionSnapshot}};

use crate::{current_ltv, EngineView, LedgerPolicy};

impl<'a, P: LedgerPolicy + ?Sized> EngineView<'a, P> {
    /// Returns true if a keeper should call maintenance now
    pub fn tend_trigger(&self) -> LeverResult<bool> {
        let snapshot = self.snapshot()?;
        let targets = self.ltv_targets()?;

        if self.policy.is_liquidatable(&snapshot, &targets, self.config)? {
            debug!(debt = snapshot.debt, collateral = snapshot.collateral, "liquidation test tripped");
            return Ok(true);
        }

        if snapshot.collateral == 0 && snapshot.debt == 0 && self.loose(Asset::Collateral)? == 0 {
            return Ok(false);
        }

        if self.active_id(&snapshot).is_none() {
            return Ok(false);
        }

        let ltv = current_ltv(&snapshot)?;
        if ltv > targets.warning_bps {
            debug!(ltv_bps = ltv, warning_bps = targets.warning_bps, "above warning");
            return Ok(true);
        }

        if self.is_levered_unprofitably(&snapshot)? {
            debug!("borrow cost exceeds yield");
            return self.network_fee_acceptable();
        }

        if targets.target_bps.saturating_sub(ltv) > self.config.min_lever_gap_bps {
            let capacity = self.borrow_capacity(&snapshot, &targets)?;
            if capacity > 0 && self.is_borrow_profitable(capacity)? {
                debug!(ltv_bps = ltv, capacity, "under target");
                return self.network_fee_acceptable();
            }
        }

        Ok(false)
    }

    /// Returns true if debt above the floor could be repaid from the lender
    /// and borrowing no longer pays for itself
    fn is_levered_unprofitably(&self, snapshot: &PositionSnapshot) -> LeverResult<bool> {
        if snapshot.debt <= self.adapters.position.min_debt()? {
            return Ok(false);
        }
        if self.adapters.lender.balance()? == 0 && self.loose(Asset::Borrowed)? == 0 {
            return Ok(false);
        }
        Ok(!self.is_borrow_profitable(0)?)
    }

    /// Network-fee gate for non-critical maintenance
    pub fn network_fee_acceptable(&self) -> LeverResult<bool> {
        Ok(self.adapters.network_fee.current_fee()? <= self.config.max_network_fee)
    }
}
