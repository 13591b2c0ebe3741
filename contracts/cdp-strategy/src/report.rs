//! Harvest and Report
//!
//! Total assets are counted in collateral units: loose collateral, posted
//! collateral, and the borrowed asset held net of debt converted at current
//! prices. The first report sets the baseline.

use tracing::{info, warn};

use lever_common::{
    access_control::Role,
    errors::LeverResult,
    events::StrategyEvent,
    math,
    types::{Address, Asset, PositionStatus, Report},
};

use crate::CdpStrategy;

impl CdpStrategy {
    /// Everything the strategy owns, in collateral units
    pub fn total_assets(&self) -> LeverResult<u64> {
        let snapshot = self.position()?;
        let loose = self.adapters.balances.balance_of(Asset::Collateral)?;
        let gross = math::safe_add(loose, snapshot.collateral)?;

        let held = self.adapters.held_borrowed()?;
        let borrowed_price = self.adapters.prices.price(Asset::Borrowed)?;
        let collateral_price = self.adapters.prices.price(Asset::Collateral)?;

        if held >= snapshot.debt {
            let net = math::convert(held - snapshot.debt, borrowed_price, collateral_price)?;
            math::safe_add(gross, net)
        } else {
            let shortfall = math::convert(snapshot.debt - held, borrowed_price, collateral_price)?;
            Ok(gross.saturating_sub(shortfall))
        }
    }

    /// Claim rewards, clean up after a close, and report profit or loss
    /// since the previous report
    pub fn harvest_and_report(&mut self, caller: &Address) -> LeverResult<Report> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Keeper)?;

            // rewards are best-effort; a failing lender must not block reporting
            match s.adapters.lender.claim_rewards() {
                Ok(rewards) if rewards > 0 => info!(rewards, "rewards claimed"),
                Ok(_) => {}
                Err(err) => warn!(code = err.code(), error = %err, "reward claim failed"),
            }

            match s.status()? {
                PositionStatus::ClosedByLiquidation | PositionStatus::ClosedByOwner => {
                    s.claim_if_claimable()?;
                    s.sell_residual()?;
                }
                PositionStatus::None | PositionStatus::Active | PositionStatus::Zombie => {}
            }

            let total_assets = s.total_assets()?;
            let report = match s.last_report {
                Some(previous) => Report {
                    total_assets,
                    profit: total_assets.saturating_sub(previous.total_assets),
                    loss: previous.total_assets.saturating_sub(total_assets),
                },
                None => Report {
                    total_assets,
                    profit: 0,
                    loss: 0,
                },
            };

            info!(total_assets, profit = report.profit, loss = report.loss, "reported");
            s.events.emit(StrategyEvent::Reported(report));
            s.last_report = Some(report);
            Ok(report)
        })
    }
}
