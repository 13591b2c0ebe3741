//! Operator Surface
//!
//! Privileged configuration, manual swaps, terms adjustment and sweeps.
//! Every setter validates a candidate copy of the configuration before it
//! replaces the live one.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::info;

use lever_common::{
    access_control::Role,
    check,
    config::{validate_ltv_multipliers, StrategyConfig},
    errors::{LeverError, LeverResult},
    events::{AllowListKind, StrategyEvent},
    types::{Address, Asset, Hints, MaxFee, PositionStatus, SwapDirection},
    validation::{require_positive, require_status, require_sufficient_balance},
};

use crate::CdpStrategy;

/// Operational knobs set together by management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct StrategyParams {
    pub slippage_bps: u64,
    pub min_amount_to_sell: u64,
    pub min_lever_gap_bps: u64,
    pub max_network_fee: u64,
    pub liquidation_correction_bps: u64,
    pub force_profitable_borrow: bool,
    pub leave_debt_behind: bool,
}

impl From<&StrategyConfig> for StrategyParams {
    fn from(config: &StrategyConfig) -> Self {
        Self {
            slippage_bps: config.slippage_bps,
            min_amount_to_sell: config.min_amount_to_sell,
            min_lever_gap_bps: config.min_lever_gap_bps,
            max_network_fee: config.max_network_fee,
            liquidation_correction_bps: config.liquidation_correction_bps,
            force_profitable_borrow: config.force_profitable_borrow,
            leave_debt_behind: config.leave_debt_behind,
        }
    }
}

impl CdpStrategy {
    // ============ Configuration ============

    fn reconfigure(&mut self, caller: &Address, edit: impl FnOnce(&mut StrategyConfig)) -> LeverResult<()> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Management)?;
            let mut candidate = s.config.clone();
            edit(&mut candidate);
            candidate.validate()?;
            s.config = candidate;
            info!("configuration updated");
            s.events.emit(StrategyEvent::ConfigUpdated { by: *caller });
            Ok(())
        })
    }

    /// Set target and warning LTV as fractions of the liquidation factor
    pub fn set_ltv_multipliers(&mut self, caller: &Address, target_bps: u64, warning_bps: u64) -> LeverResult<()> {
        validate_ltv_multipliers(target_bps, warning_bps)?;
        self.reconfigure(caller, |config| {
            config.target_ltv_multiplier_bps = target_bps;
            config.warning_ltv_multiplier_bps = warning_bps;
        })
    }

    pub fn set_surplus_floors(&mut self, caller: &Address, absolute: u64, relative_bps: u64) -> LeverResult<()> {
        self.reconfigure(caller, |config| {
            config.min_surplus_absolute = absolute;
            config.min_surplus_relative_bps = relative_bps;
        })
    }

    pub fn set_strategy_params(&mut self, caller: &Address, params: StrategyParams) -> LeverResult<()> {
        self.reconfigure(caller, |config| {
            config.slippage_bps = params.slippage_bps;
            config.min_amount_to_sell = params.min_amount_to_sell;
            config.min_lever_gap_bps = params.min_lever_gap_bps;
            config.max_network_fee = params.max_network_fee;
            config.liquidation_correction_bps = params.liquidation_correction_bps;
            config.force_profitable_borrow = params.force_profitable_borrow;
            config.leave_debt_behind = params.leave_debt_behind;
        })
    }

    // ============ Allow-Lists and Roles ============

    pub fn set_zombie_exit_allowed(&mut self, caller: &Address, address: Address, allowed: bool) -> LeverResult<()> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Management)?;
            s.zombie_exit.set(address, allowed);
            s.events.emit(StrategyEvent::AllowListChanged {
                list: AllowListKind::ZombieExit,
                address,
                allowed,
            });
            Ok(())
        })
    }

    pub fn set_depositor_allowed(&mut self, caller: &Address, address: Address, allowed: bool) -> LeverResult<()> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Management)?;
            s.depositors.set(address, allowed);
            s.events.emit(StrategyEvent::AllowListChanged {
                list: AllowListKind::Depositor,
                address,
                allowed,
            });
            Ok(())
        })
    }

    /// Enforce (or stop enforcing) the depositor allow-list
    pub fn set_deposits_open(&mut self, caller: &Address, open: bool) -> LeverResult<()> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Management)?;
            s.depositors.set_open(open);
            s.events.emit(StrategyEvent::ConfigUpdated { by: *caller });
            Ok(())
        })
    }

    pub fn grant_role(&mut self, caller: &Address, address: Address, role: Role) -> LeverResult<()> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Management)?;
            s.roles.grant(address, role)
        })
    }

    pub fn revoke_role(&mut self, caller: &Address, address: Address, role: Role) -> LeverResult<()> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Management)?;
            s.roles.revoke(address, role);
            Ok(())
        })
    }

    // ============ Terms ============

    /// Change the entry's annual interest rate. `MaxFee::Any` accepts
    /// whatever upfront fee the ledger charges.
    pub fn adjust_terms(&mut self, caller: &Address, rate_bps: u64, max_fee: MaxFee) -> LeverResult<()> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Management)?;
            s.require_interest_rate(rate_bps)?;
            let id = s.require_position()?;
            require_status(s.status()?, PositionStatus::Active)?;

            s.adapters
                .position
                .adjust_interest_rate(id, rate_bps, Hints::default(), max_fee)?;
            info!(rate_bps, "terms adjusted");
            s.events.emit(StrategyEvent::TermsAdjusted { rate_bps });
            Ok(())
        })
    }

    // ============ Manual Swaps ============

    /// Sell loose collateral for borrowed asset, e.g. to cover debt before
    /// an emergency unwind. Returns the borrowed asset received.
    pub fn buy_borrowed_asset(&mut self, caller: &Address, collateral_amount: u64) -> LeverResult<u64> {
        self.atomically(|s| {
            s.roles.require(caller, Role::EmergencyAdmin)?;
            require_positive(collateral_amount)?;
            require_sufficient_balance(s.adapters.balances.balance_of(Asset::Collateral)?, collateral_amount)?;

            let received = s.swap(collateral_amount, SwapDirection::CollateralToBorrowed)?;
            info!(spent = collateral_amount, received, "borrowed asset bought");
            s.events.emit(StrategyEvent::BorrowedAssetBought {
                spent: collateral_amount,
                received,
            });
            Ok(received)
        })
    }

    /// Sell borrowed asset (loose, then lent) for collateral. Returns the
    /// collateral received.
    pub fn sell_borrowed_asset(&mut self, caller: &Address, amount: u64) -> LeverResult<u64> {
        self.atomically(|s| {
            s.roles.require(caller, Role::EmergencyAdmin)?;
            require_positive(amount)?;
            let available = s.engine().gather_borrowed(amount)?;
            require_sufficient_balance(available, amount)?;

            let received = s.swap(amount, SwapDirection::BorrowedToCollateral)?;
            info!(sold = amount, received, "borrowed asset sold");
            s.events.emit(StrategyEvent::BorrowedAssetSold { sold: amount, received });
            Ok(received)
        })
    }

    // ============ Sweep ============

    /// Send a stray token's whole balance to `to`
    pub fn sweep(&mut self, caller: &Address, asset: Asset, to: Address) -> LeverResult<u64> {
        self.atomically(|s| {
            s.roles.require(caller, Role::Governance)?;
            check!(!asset.is_protected(), LeverError::ProtectedAsset);
            let amount = s.adapters.balances.balance_of(asset)?;
            require_positive(amount)?;

            s.adapters.balances.transfer(asset, to, amount)?;
            info!(?asset, amount, "swept");
            s.events.emit(StrategyEvent::Swept { asset, to, amount });
            Ok(amount)
        })
    }
}
