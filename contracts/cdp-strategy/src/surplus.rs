//! Redemption Surplus
//!
//! A redemption retires debt and collateral at par while the borrowed asset
//! the strategy lent out stays put, so the strategy ends up holding more
//! borrowed asset than it owes. Maintenance sells that excess back into
//! collateral before it re-levers anything.

use tracing::{debug, info};

use lever_common::{
    errors::LeverResult,
    events::StrategyEvent,
    math,
    types::{Asset, SwapDirection},
    validation::require_min_out,
};

use crate::CdpStrategy;

impl CdpStrategy {
    /// Debt owed on the ledger, zero before open or after close
    fn owed(&self) -> LeverResult<u64> {
        Ok(self.position()?.debt)
    }

    /// Borrowed asset held (loose plus lent) in excess of debt
    pub fn surplus(&self) -> LeverResult<u64> {
        let held = self.adapters.held_borrowed()?;
        Ok(held.saturating_sub(self.owed()?))
    }

    /// The larger of the absolute floor and the debt-relative floor
    pub fn surplus_floor(&self, debt: u64) -> LeverResult<u64> {
        let relative = math::mul_bps(debt, self.config.min_surplus_relative_bps)?;
        Ok(self.config.min_surplus_absolute.max(relative))
    }

    /// `held - debt > max(absolute floor, relative floor * debt)`
    pub fn has_surplus(&self) -> LeverResult<bool> {
        let held = self.adapters.held_borrowed()?;
        let debt = self.owed()?;
        if held <= debt {
            return Ok(false);
        }
        Ok(held - debt > self.surplus_floor(debt)?)
    }

    /// Minimum acceptable output for selling `amount` in `direction`
    pub(crate) fn min_out(&self, amount: u64, direction: SwapDirection) -> LeverResult<u64> {
        let (sold, bought) = direction.assets();
        let expected = math::convert(
            amount,
            self.adapters.prices.price(sold)?,
            self.adapters.prices.price(bought)?,
        )?;
        let tolerance = math::mul_bps_up(expected, self.config.slippage_bps)?;
        Ok(expected.saturating_sub(tolerance))
    }

    /// Swap with the configured slippage bound
    pub(crate) fn swap(&mut self, amount: u64, direction: SwapDirection) -> LeverResult<u64> {
        let min_out = self.min_out(amount, direction)?;
        let received = self.adapters.exchange.swap(amount, min_out, direction)?;
        require_min_out(received, min_out)?;
        debug!(amount, received, min_out, ?direction, "swapped");
        Ok(received)
    }

    /// Sell `min(surplus, available)` of the borrowed asset into collateral.
    /// Dust below the sell floor is left alone. Returns the amount sold.
    pub(crate) fn sell_surplus(&mut self) -> LeverResult<u64> {
        let surplus = self.surplus()?;
        let available = self.engine().gather_borrowed(surplus)?;
        let amount = surplus.min(available);
        if amount < self.config.min_amount_to_sell {
            debug!(amount, "surplus below sell floor");
            return Ok(0);
        }

        let received = self.swap(amount, SwapDirection::BorrowedToCollateral)?;
        info!(sold = amount, received, "surplus sold");
        self.events.emit(StrategyEvent::SurplusSold {
            sold: amount,
            received,
        });
        Ok(amount)
    }

    /// Sell every unit of borrowed asset held once nothing is owed
    pub(crate) fn sell_residual(&mut self) -> LeverResult<u64> {
        let lent = self.adapters.lender.max_withdraw()?;
        if lent > 0 {
            self.adapters.lender.withdraw(lent)?;
        }
        let loose = self.adapters.balances.balance_of(Asset::Borrowed)?;
        let residual = loose.saturating_sub(self.owed()?);
        if residual < self.config.min_amount_to_sell {
            return Ok(0);
        }
        let received = self.swap(residual, SwapDirection::BorrowedToCollateral)?;
        info!(sold = residual, received, "residual borrowed asset sold");
        self.events.emit(StrategyEvent::SurplusSold {
            sold: residual,
            received,
        });
        Ok(residual)
    }
}
