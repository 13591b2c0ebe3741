//! Collaborator Interfaces
//!
//! The engine depends only on these capability traits; concrete ledgers,
//! lenders, venues and oracles are injected through [`Collaborators`].
//! Every call is synchronous and either completes or returns an error that
//! aborts the surrounding top-level operation.

use crate::errors::LeverResult;
use crate::types::{Address, Asset, Hints, MaxFee, PositionId, PositionStatus, SwapDirection};

/// The debt ledger holding the collateralized position
pub trait PositionAdapter {
    /// Open the entry, posting `collateral` and borrowing `debt`. The ledger
    /// pulls the stipend from the strategy's balance.
    fn open(
        &mut self,
        collateral: u64,
        debt: u64,
        interest_rate_bps: u64,
        hints: Hints,
        max_fee: MaxFee,
    ) -> LeverResult<PositionId>;
    fn add_collateral(&mut self, id: PositionId, amount: u64) -> LeverResult<()>;
    fn remove_collateral(&mut self, id: PositionId, amount: u64) -> LeverResult<()>;
    fn borrow(&mut self, id: PositionId, amount: u64, max_fee: MaxFee) -> LeverResult<()>;
    fn repay(&mut self, id: PositionId, amount: u64) -> LeverResult<()>;
    /// Repay all debt and release all collateral plus the stipend
    fn close(&mut self, id: PositionId) -> LeverResult<()>;
    /// Borrow `amount` on a Zombie entry, returning it to Active
    fn exit_zombie(&mut self, id: PositionId, amount: u64, hints: Hints, max_fee: MaxFee) -> LeverResult<()>;
    fn adjust_interest_rate(&mut self, id: PositionId, rate_bps: u64, hints: Hints, max_fee: MaxFee) -> LeverResult<()>;
    /// Claim collateral left over after a liquidation; returns the amount
    fn claim_collateral(&mut self) -> LeverResult<u64>;

    fn collateral(&self, id: PositionId) -> LeverResult<u64>;
    fn debt(&self, id: PositionId) -> LeverResult<u64>;
    fn status(&self, id: PositionId) -> LeverResult<PositionStatus>;
    fn interest_rate_bps(&self, id: PositionId) -> LeverResult<u64>;
    /// Annual borrow cost if debt grew by `additional`
    fn borrow_rate_bps(&self, id: PositionId, additional: u64) -> LeverResult<u64>;
    /// Upfront fee on new debt, in bps of the amount drawn; the ledger adds
    /// it to the debt on top of the amount
    fn upfront_fee_bps(&self) -> LeverResult<u64>;
    fn claimable_collateral(&self) -> LeverResult<u64>;

    /// LTV at or above which the ledger liquidates
    fn liquidation_factor_bps(&self) -> LeverResult<u64>;
    fn min_debt(&self) -> LeverResult<u64>;
    fn stipend(&self) -> LeverResult<u64>;
    fn branch_aggregate_collateral(&self) -> LeverResult<u64>;
    fn branch_aggregate_debt(&self) -> LeverResult<u64>;
    fn critical_ratio_bps(&self) -> LeverResult<u64>;

    fn max_collateral_deposit(&self) -> LeverResult<u64>;
    fn max_borrow(&self, id: PositionId) -> LeverResult<u64>;
    fn is_supply_paused(&self) -> LeverResult<bool>;
    fn is_borrow_paused(&self) -> LeverResult<bool>;
}

/// Yield source for the borrowed asset
pub trait LenderAdapter {
    fn deposit(&mut self, amount: u64) -> LeverResult<()>;
    /// Withdraw to the strategy's loose balance; returns the amount received
    fn withdraw(&mut self, amount: u64) -> LeverResult<u64>;
    /// Claim accrued rewards into the loose borrowed balance (best-effort)
    fn claim_rewards(&mut self) -> LeverResult<u64>;
    fn max_deposit(&self) -> LeverResult<u64>;
    fn max_withdraw(&self) -> LeverResult<u64>;
    fn balance(&self) -> LeverResult<u64>;
    /// Annual yield if `additional` more were deposited
    fn supply_rate_bps(&self, additional: u64) -> LeverResult<u64>;
}

/// Swap venue between collateral and borrowed asset
pub trait ExchangeAdapter {
    /// Sell `amount`; the venue must return at least `min_out`
    fn swap(&mut self, amount: u64, min_out: u64, direction: SwapDirection) -> LeverResult<u64>;
}

/// USD price feed
pub trait PriceSource {
    /// Price of one whole token in USD, 8 decimals
    fn price(&self, asset: Asset) -> LeverResult<u64>;
}

/// The strategy's own loose token balances
pub trait TokenBalances {
    fn balance_of(&self, asset: Asset) -> LeverResult<u64>;
    fn transfer(&mut self, asset: Asset, to: Address, amount: u64) -> LeverResult<()>;
}

/// Current network fee, for deferring non-critical maintenance
pub trait NetworkFeeGauge {
    fn current_fee(&self) -> LeverResult<u64>;
}

/// Transactional boundary around one top-level operation
pub trait Substrate {
    fn begin(&mut self);
    fn commit(&mut self);
    /// Discard every effect since the matching `begin`
    fn rollback(&mut self);
}

/// Every collaborator the strategy talks to
pub struct Collaborators {
    pub position: Box<dyn PositionAdapter>,
    pub lender: Box<dyn LenderAdapter>,
    pub exchange: Box<dyn ExchangeAdapter>,
    pub prices: Box<dyn PriceSource>,
    pub balances: Box<dyn TokenBalances>,
    pub network_fee: Box<dyn NetworkFeeGauge>,
    pub substrate: Box<dyn Substrate>,
}

impl Collaborators {
    /// Loose plus lent borrowed asset
    pub fn held_borrowed(&self) -> LeverResult<u64> {
        let loose = self.balances.balance_of(Asset::Borrowed)?;
        let lent = self.lender.balance()?;
        crate::math::safe_add(loose, lent)
    }
}
