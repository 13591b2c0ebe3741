//! In-Memory Collaborators
//!
//! A single [`WorldState`] shared by every mock adapter, so that a borrow on
//! the ledger shows up in the strategy's loose balance and a swap moves both
//! sides. [`MockWorld`] also acts as the transactional substrate by
//! snapshotting the whole state on `begin`.
//!
//! Test helpers simulate the actors the strategy does not control:
//! redemptions, liquidations, price moves and other branch borrowers.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::adapters::{
    Collaborators, ExchangeAdapter, LenderAdapter, NetworkFeeGauge, PositionAdapter, PriceSource,
    Substrate, TokenBalances,
};
use crate::constants::{limits, ratios, token};
use crate::errors::{LeverError, LeverResult};
use crate::math;
use crate::types::{
    derive_position_id, Address, Asset, Hints, MaxFee, PositionId, PositionStatus, SwapDirection,
};

/// Capacity used where a mock imposes no practical limit
pub const UNBOUNDED: u64 = 1_000_000_000 * token::ONE;

/// Owner under which the mock ledger derives entry ids
pub const STRATEGY_ADDRESS: Address = [0xAA; 32];

/// Every piece of state the mock collaborators read and write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldState {
    // ---- ledger ----
    pub position_id: Option<PositionId>,
    pub owner_index: u64,
    pub collateral: u64,
    pub debt: u64,
    pub status: PositionStatus,
    pub interest_rate_bps: u64,
    pub upfront_fee_bps: u64,
    pub min_debt: u64,
    pub stipend: u64,
    pub liquidation_factor_bps: u64,
    pub critical_ratio_bps: u64,
    pub other_branch_collateral: u64,
    pub other_branch_debt: u64,
    pub max_collateral_deposit: u64,
    pub max_borrow: u64,
    pub supply_paused: bool,
    pub borrow_paused: bool,
    pub claimable_collateral: u64,

    // ---- lender ----
    pub lent: u64,
    pub lender_deposit_cap: u64,
    pub lender_liquidity: u64,
    pub lender_pool_size: u64,
    pub supply_rate_bps: u64,
    pub pending_rewards: u64,

    // ---- exchange ----
    pub swap_haircut_bps: u64,

    // ---- prices, balances, network ----
    pub prices: BTreeMap<Asset, u64>,
    pub balances: BTreeMap<Asset, u64>,
    pub network_fee: u64,
    pub transfers: Vec<(Asset, Address, u64)>,

    /// Adapter name whose next mutating call fails
    pub fail_next: Option<&'static str>,
}

impl Default for WorldState {
    fn default() -> Self {
        let mut prices = BTreeMap::new();
        prices.insert(Asset::Collateral, 2_000 * token::ONE);
        prices.insert(Asset::Borrowed, token::ONE);

        Self {
            position_id: None,
            owner_index: 0,
            collateral: 0,
            debt: 0,
            status: PositionStatus::None,
            interest_rate_bps: 300,
            upfront_fee_bps: 0,
            min_debt: limits::MIN_DEBT,
            stipend: limits::STIPEND,
            liquidation_factor_bps: ratios::LIQUIDATION_FACTOR_BPS,
            critical_ratio_bps: ratios::DEFAULT_CRITICAL_RATIO_BPS,
            other_branch_collateral: 1_000 * token::ONE,
            other_branch_debt: 500_000 * token::ONE,
            max_collateral_deposit: UNBOUNDED,
            max_borrow: UNBOUNDED,
            supply_paused: false,
            borrow_paused: false,
            claimable_collateral: 0,
            lent: 0,
            lender_deposit_cap: UNBOUNDED,
            lender_liquidity: UNBOUNDED,
            lender_pool_size: 0,
            supply_rate_bps: 800,
            pending_rewards: 0,
            swap_haircut_bps: 0,
            prices,
            balances: BTreeMap::new(),
            network_fee: 10,
            transfers: Vec::new(),
            fail_next: None,
        }
    }
}

impl WorldState {
    fn balance(&self, asset: Asset) -> u64 {
        self.balances.get(&asset).copied().unwrap_or(0)
    }

    fn credit(&mut self, asset: Asset, amount: u64) {
        *self.balances.entry(asset).or_insert(0) += amount;
    }

    fn debit(&mut self, asset: Asset, amount: u64) -> LeverResult<()> {
        let available = self.balance(asset);
        if available < amount {
            return Err(LeverError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        self.balances.insert(asset, available - amount);
        Ok(())
    }

    fn price(&self, asset: Asset) -> LeverResult<u64> {
        match self.prices.get(&asset).copied() {
            Some(price) if price > 0 => Ok(price),
            _ => Err(LeverError::InvalidPrice),
        }
    }

    fn take_failure(&mut self, adapter: &'static str) -> LeverResult<()> {
        if self.fail_next == Some(adapter) {
            self.fail_next = None;
            return Err(LeverError::AdapterFailure {
                adapter,
                reason: "injected failure",
            });
        }
        Ok(())
    }

    fn require_entry(&self, id: PositionId) -> LeverResult<()> {
        if self.position_id != Some(id) {
            return Err(LeverError::PositionNotFound);
        }
        Ok(())
    }

    fn require_status(&self, id: PositionId, allowed: &[PositionStatus]) -> LeverResult<()> {
        self.require_entry(id)?;
        if !allowed.contains(&self.status) {
            return Err(LeverError::InvalidStatus {
                expected: allowed[0],
                actual: self.status,
            });
        }
        Ok(())
    }

    /// The ledger refuses any change leaving LTV at or above the liquidation factor
    fn require_healthy(&self, collateral: u64, debt: u64) -> LeverResult<()> {
        let collateral_usd = math::to_usd(collateral, self.price(Asset::Collateral)?)?;
        let debt_usd = math::to_usd(debt, self.price(Asset::Borrowed)?)?;
        if math::ltv_bps(debt_usd, collateral_usd)? >= self.liquidation_factor_bps {
            return Err(LeverError::AdapterFailure {
                adapter: "position",
                reason: "would be undercollateralized",
            });
        }
        Ok(())
    }

    fn upfront_fee(&self, amount: u64, max_fee: MaxFee) -> LeverResult<u64> {
        let fee = math::mul_bps(amount, self.upfront_fee_bps)?;
        if !max_fee.allows(fee) {
            return Err(LeverError::AdapterFailure {
                adapter: "position",
                reason: "upfront fee above maximum",
            });
        }
        Ok(fee)
    }

    fn branch_ratio_below_critical(&self) -> LeverResult<bool> {
        let collateral = self.other_branch_collateral + self.collateral;
        let debt = self.other_branch_debt + self.debt;
        let ratio = math::collateral_ratio_bps(collateral, debt, self.price(Asset::Collateral)?)?;
        Ok(ratio < self.critical_ratio_bps)
    }
}

/// Shared handle to the world plus the transactional snapshot stack
#[derive(Debug, Clone, Default)]
pub struct MockWorld {
    state: Rc<RefCell<WorldState>>,
    checkpoints: Rc<RefCell<Vec<WorldState>>>,
}

impl MockWorld {
    pub fn new(state: WorldState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
            checkpoints: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Build a full collaborator set sharing this world
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            position: Box::new(MockPosition(self.clone())),
            lender: Box::new(MockLender(self.clone())),
            exchange: Box::new(MockExchange(self.clone())),
            prices: Box::new(MockPrices(self.clone())),
            balances: Box::new(MockBalances(self.clone())),
            network_fee: Box::new(MockNetworkFee(self.clone())),
            substrate: Box::new(self.clone()),
        }
    }

    /// Read the state
    pub fn state(&self) -> WorldState {
        self.state.borrow().clone()
    }

    /// Mutate the state directly (external actors, test setup)
    pub fn update<R>(&self, f: impl FnOnce(&mut WorldState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    /// Give the strategy loose tokens
    pub fn fund(&self, asset: Asset, amount: u64) {
        self.update(|s| s.credit(asset, amount));
    }

    pub fn balance(&self, asset: Asset) -> u64 {
        self.state.borrow().balance(asset)
    }

    pub fn set_price(&self, asset: Asset, price: u64) {
        self.update(|s| {
            s.prices.insert(asset, price);
        });
    }

    /// External redemption: retire `debt` at par against collateral.
    /// Debt left under the floor turns the entry into a Zombie.
    pub fn redeem(&self, debt: u64) -> LeverResult<()> {
        self.update(|s| {
            let debt = debt.min(s.debt);
            let collateral = math::convert(debt, s.price(Asset::Borrowed)?, s.price(Asset::Collateral)?)?
                .min(s.collateral);
            s.debt -= debt;
            s.collateral -= collateral;
            if s.debt < s.min_debt {
                s.status = PositionStatus::Zombie;
            }
            Ok(())
        })
    }

    /// Ledger liquidation: collateral and debt zeroed atomically, leaving
    /// `surplus` collateral claimable
    pub fn liquidate(&self, surplus: u64) {
        self.update(|s| {
            s.collateral = 0;
            s.debt = 0;
            s.status = PositionStatus::ClosedByLiquidation;
            s.claimable_collateral = surplus;
        });
    }
}

impl Substrate for MockWorld {
    fn begin(&mut self) {
        let snapshot = self.state.borrow().clone();
        self.checkpoints.borrow_mut().push(snapshot);
    }

    fn commit(&mut self) {
        self.checkpoints.borrow_mut().pop();
    }

    fn rollback(&mut self) {
        if let Some(snapshot) = self.checkpoints.borrow_mut().pop() {
            *self.state.borrow_mut() = snapshot;
        }
    }
}

// ============ Position ============

pub struct MockPosition(MockWorld);

impl PositionAdapter for MockPosition {
    fn open(
        &mut self,
        collateral: u64,
        debt: u64,
        interest_rate_bps: u64,
        _hints: Hints,
        max_fee: MaxFee,
    ) -> LeverResult<PositionId> {
        self.0.update(|s| {
            s.take_failure("position")?;
            if s.status.is_open() {
                return Err(LeverError::PositionAlreadyExists {
                    id: s.position_id.unwrap_or_default(),
                });
            }
            if debt < s.min_debt {
                return Err(LeverError::BelowMinDebt {
                    debt,
                    min_debt: s.min_debt,
                });
            }
            let fee = s.upfront_fee(debt, max_fee)?;
            s.require_healthy(collateral, debt + fee)?;
            s.debit(Asset::Collateral, collateral)?;
            s.debit(Asset::Stipend, s.stipend)?;

            let id = derive_position_id(&STRATEGY_ADDRESS, s.owner_index);
            s.owner_index += 1;
            s.position_id = Some(id);
            s.collateral = collateral;
            s.debt = debt + fee;
            s.status = PositionStatus::Active;
            s.interest_rate_bps = interest_rate_bps;
            s.credit(Asset::Borrowed, debt);
            Ok(id)
        })
    }

    fn add_collateral(&mut self, id: PositionId, amount: u64) -> LeverResult<()> {
        self.0.update(|s| {
            s.take_failure("position")?;
            s.require_status(id, &[PositionStatus::Active])?;
            if s.supply_paused {
                return Err(LeverError::AdapterPaused { adapter: "position" });
            }
            s.debit(Asset::Collateral, amount)?;
            s.collateral += amount;
            Ok(())
        })
    }

    fn remove_collateral(&mut self, id: PositionId, amount: u64) -> LeverResult<()> {
        self.0.update(|s| {
            s.take_failure("position")?;
            s.require_status(id, &[PositionStatus::Active])?;
            let remaining = math::safe_sub(s.collateral, amount)?;
            if s.debt > 0 {
                s.require_healthy(remaining, s.debt)?;
            }
            s.collateral = remaining;
            s.credit(Asset::Collateral, amount);
            Ok(())
        })
    }

    fn borrow(&mut self, id: PositionId, amount: u64, max_fee: MaxFee) -> LeverResult<()> {
        self.0.update(|s| {
            s.take_failure("position")?;
            s.require_status(id, &[PositionStatus::Active])?;
            if s.borrow_paused {
                return Err(LeverError::AdapterPaused { adapter: "position" });
            }
            if amount > s.max_borrow {
                return Err(LeverError::InsufficientLiquidity {
                    adapter: "position",
                    available: s.max_borrow,
                    requested: amount,
                });
            }
            let fee = s.upfront_fee(amount, max_fee)?;
            let new_debt = s.debt + amount + fee;
            s.require_healthy(s.collateral, new_debt)?;
            s.debt = new_debt;
            s.credit(Asset::Borrowed, amount);
            Ok(())
        })
    }

    fn repay(&mut self, id: PositionId, amount: u64) -> LeverResult<()> {
        self.0.update(|s| {
            s.take_failure("position")?;
            s.require_status(id, &[PositionStatus::Active])?;
            let new_debt = math::safe_sub(s.debt, amount)?;
            if new_debt < s.min_debt {
                return Err(LeverError::BelowMinDebt {
                    debt: new_debt,
                    min_debt: s.min_debt,
                });
            }
            s.debit(Asset::Borrowed, amount)?;
            s.debt = new_debt;
            Ok(())
        })
    }

    fn close(&mut self, id: PositionId) -> LeverResult<()> {
        self.0.update(|s| {
            s.take_failure("position")?;
            s.require_status(id, &[PositionStatus::Active, PositionStatus::Zombie])?;
            s.debit(Asset::Borrowed, s.debt)?;
            let collateral = s.collateral;
            s.credit(Asset::Collateral, collateral);
            let stipend = s.stipend;
            s.credit(Asset::Stipend, stipend);
            s.collateral = 0;
            s.debt = 0;
            s.status = PositionStatus::ClosedByOwner;
            Ok(())
        })
    }

    fn exit_zombie(&mut self, id: PositionId, amount: u64, _hints: Hints, max_fee: MaxFee) -> LeverResult<()> {
        self.0.update(|s| {
            s.take_failure("position")?;
            s.require_status(id, &[PositionStatus::Zombie])?;
            if s.branch_ratio_below_critical()? {
                return Err(LeverError::AdapterFailure {
                    adapter: "position",
                    reason: "branch below critical ratio",
                });
            }
            let fee = s.upfront_fee(amount, max_fee)?;
            let new_debt = s.debt + amount + fee;
            if new_debt < s.min_debt {
                return Err(LeverError::BelowMinDebt {
                    debt: new_debt,
                    min_debt: s.min_debt,
                });
            }
            s.require_healthy(s.collateral, new_debt)?;
            s.debt = new_debt;
            s.status = PositionStatus::Active;
            s.credit(Asset::Borrowed, amount);
            Ok(())
        })
    }

    fn adjust_interest_rate(&mut self, id: PositionId, rate_bps: u64, _hints: Hints, max_fee: MaxFee) -> LeverResult<()> {
        self.0.update(|s| {
            s.take_failure("position")?;
            s.require_status(id, &[PositionStatus::Active])?;
            let fee = s.upfront_fee(s.debt, max_fee)?;
            s.require_healthy(s.collateral, s.debt + fee)?;
            s.debt += fee;
            s.interest_rate_bps = rate_bps;
            Ok(())
        })
    }

    fn claim_collateral(&mut self) -> LeverResult<u64> {
        self.0.update(|s| {
            s.take_failure("position")?;
            let amount = s.claimable_collateral;
            if amount == 0 {
                return Err(LeverError::AdapterFailure {
                    adapter: "position",
                    reason: "no collateral to claim",
                });
            }
            s.claimable_collateral = 0;
            s.credit(Asset::Collateral, amount);
            Ok(amount)
        })
    }

    fn collateral(&self, id: PositionId) -> LeverResult<u64> {
        let s = self.0.state.borrow();
        s.require_entry(id)?;
        Ok(s.collateral)
    }

    fn debt(&self, id: PositionId) -> LeverResult<u64> {
        let s = self.0.state.borrow();
        s.require_entry(id)?;
        Ok(s.debt)
    }

    fn status(&self, id: PositionId) -> LeverResult<PositionStatus> {
        let s = self.0.state.borrow();
        if s.position_id != Some(id) {
            return Ok(PositionStatus::None);
        }
        Ok(s.status)
    }

    fn interest_rate_bps(&self, id: PositionId) -> LeverResult<u64> {
        let s = self.0.state.borrow();
        s.require_entry(id)?;
        Ok(s.interest_rate_bps)
    }

    fn borrow_rate_bps(&self, id: PositionId, _additional: u64) -> LeverResult<u64> {
        // fixed-rate ledger: projected cost does not depend on size
        self.interest_rate_bps(id)
    }

    fn upfront_fee_bps(&self) -> LeverResult<u64> {
        Ok(self.0.state.borrow().upfront_fee_bps)
    }

    fn claimable_collateral(&self) -> LeverResult<u64> {
        Ok(self.0.state.borrow().claimable_collateral)
    }

    fn liquidation_factor_bps(&self) -> LeverResult<u64> {
        Ok(self.0.state.borrow().liquidation_factor_bps)
    }

    fn min_debt(&self) -> LeverResult<u64> {
        Ok(self.0.state.borrow().min_debt)
    }

    fn stipend(&self) -> LeverResult<u64> {
        Ok(self.0.state.borrow().stipend)
    }

    fn branch_aggregate_collateral(&self) -> LeverResult<u64> {
        let s = self.0.state.borrow();
        math::safe_add(s.other_branch_collateral, s.collateral)
    }

    fn branch_aggregate_debt(&self) -> LeverResult<u64> {
        let s = self.0.state.borrow();
        math::safe_add(s.other_branch_debt, s.debt)
    }

    fn critical_ratio_bps(&self) -> LeverResult<u64> {
        Ok(self.0.state.borrow().critical_ratio_bps)
    }

    fn max_collateral_deposit(&self) -> LeverResult<u64> {
        Ok(self.0.state.borrow().max_collateral_deposit)
    }

    fn max_borrow(&self, _id: PositionId) -> LeverResult<u64> {
        Ok(self.0.state.borrow().max_borrow)
    }

    fn is_supply_paused(&self) -> LeverResult<bool> {
        Ok(self.0.state.borrow().supply_paused)
    }

    fn is_borrow_paused(&self) -> LeverResult<bool> {
        Ok(self.0.state.borrow().borrow_paused)
    }
}

// ============ Lender ============

pub struct MockLender(MockWorld);

impl LenderAdapter for MockLender {
    fn deposit(&mut self, amount: u64) -> LeverResult<()> {
        self.0.update(|s| {
            s.take_failure("lender")?;
            if amount > s.lender_deposit_cap {
                return Err(LeverError::InsufficientLiquidity {
                    adapter: "lender",
                    available: s.lender_deposit_cap,
                    requested: amount,
                });
            }
            s.debit(Asset::Borrowed, amount)?;
            s.lender_deposit_cap -= amount;
            s.lent += amount;
            s.lender_liquidity = s.lender_liquidity.saturating_add(amount);
            Ok(())
        })
    }

    fn withdraw(&mut self, amount: u64) -> LeverResult<u64> {
        self.0.update(|s| {
            s.take_failure("lender")?;
            let available = s.lent.min(s.lender_liquidity);
            if amount > available {
                return Err(LeverError::InsufficientLiquidity {
                    adapter: "lender",
                    available,
                    requested: amount,
                });
            }
            s.lent -= amount;
            s.lender_liquidity -= amount;
            s.lender_deposit_cap = s.lender_deposit_cap.saturating_add(amount);
            s.credit(Asset::Borrowed, amount);
            Ok(amount)
        })
    }

    fn claim_rewards(&mut self) -> LeverResult<u64> {
        self.0.update(|s| {
            s.take_failure("lender")?;
            let rewards = s.pending_rewards;
            s.pending_rewards = 0;
            s.credit(Asset::Borrowed, rewards);
            Ok(rewards)
        })
    }

    fn max_deposit(&self) -> LeverResult<u64> {
        Ok(self.0.state.borrow().lender_deposit_cap)
    }

    fn max_withdraw(&self) -> LeverResult<u64> {
        let s = self.0.state.borrow();
        Ok(s.lent.min(s.lender_liquidity))
    }

    fn balance(&self) -> LeverResult<u64> {
        Ok(self.0.state.borrow().lent)
    }

    fn supply_rate_bps(&self, additional: u64) -> LeverResult<u64> {
        let s = self.0.state.borrow();
        if s.lender_pool_size == 0 {
            return Ok(s.supply_rate_bps);
        }
        // yield dilutes as the pool grows
        let diluted = (s.supply_rate_bps as u128) * (s.lender_pool_size as u128)
            / (s.lender_pool_size as u128 + additional as u128);
        Ok(diluted as u64)
    }
}

// ============ Exchange ============

pub struct MockExchange(MockWorld);

impl ExchangeAdapter for MockExchange {
    fn swap(&mut self, amount: u64, min_out: u64, direction: SwapDirection) -> LeverResult<u64> {
        self.0.update(|s| {
            s.take_failure("exchange")?;
            let (sold, bought) = direction.assets();
            let fair = math::convert(amount, s.price(sold)?, s.price(bought)?)?;
            let out = fair - math::mul_bps(fair, s.swap_haircut_bps)?;
            if out < min_out {
                return Err(LeverError::SlippageExceeded { min_out, actual: out });
            }
            s.debit(sold, amount)?;
            s.credit(bought, out);
            Ok(out)
        })
    }
}

// ============ Prices, balances, network ============

pub struct MockPrices(MockWorld);

impl PriceSource for MockPrices {
    fn price(&self, asset: Asset) -> LeverResult<u64> {
        self.0.state.borrow().price(asset)
    }
}

pub struct MockBalances(MockWorld);

impl TokenBalances for MockBalances {
    fn balance_of(&self, asset: Asset) -> LeverResult<u64> {
        Ok(self.0.balance(asset))
    }

    fn transfer(&mut self, asset: Asset, to: Address, amount: u64) -> LeverResult<()> {
        self.0.update(|s| {
            s.take_failure("balances")?;
            s.debit(asset, amount)?;
            s.transfers.push((asset, to, amount));
            Ok(())
        })
    }
}

pub struct MockNetworkFee(MockWorld);

impl NetworkFeeGauge for MockNetworkFee {
    fn current_fee(&self) -> LeverResult<u64> {
        Ok(self.0.state.borrow().network_fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: u64 = token::ONE;

    fn opened_world() -> (MockWorld, Collaborators, PositionId) {
        let world = MockWorld::default();
        world.fund(Asset::Collateral, 10 * ONE);
        world.fund(Asset::Stipend, limits::STIPEND);
        let mut c = world.collaborators();
        let id = c
            .position
            .open(10 * ONE, 5_000 * ONE, 500, Hints::default(), MaxFee::Any)
            .unwrap();
        (world, c, id)
    }

    #[test]
    fn test_open_moves_balances() {
        let (world, c, id) = opened_world();
        assert_eq!(c.position.collateral(id).unwrap(), 10 * ONE);
        assert_eq!(c.position.debt(id).unwrap(), 5_000 * ONE);
        assert_eq!(world.balance(Asset::Borrowed), 5_000 * ONE);
        assert_eq!(world.balance(Asset::Collateral), 0);
        assert_eq!(world.balance(Asset::Stipend), 0);
    }

    #[test]
    fn test_rollback_restores_state() {
        let (world, mut c, id) = opened_world();
        c.substrate.begin();
        c.position.borrow(id, 1_000 * ONE, MaxFee::Any).unwrap();
        c.substrate.rollback();
        assert_eq!(world.state().debt, 5_000 * ONE);
        assert_eq!(world.balance(Asset::Borrowed), 5_000 * ONE);
    }

    #[test]
    fn test_redemption_creates_zombie() {
        let (world, c, id) = opened_world();
        world.redeem(4_995 * ONE).unwrap();
        assert_eq!(c.position.status(id).unwrap(), PositionStatus::Zombie);
        assert_eq!(c.position.debt(id).unwrap(), 5 * ONE);
    }

    #[test]
    fn test_repay_respects_floor() {
        let (_world, mut c, id) = opened_world();
        let result = c.position.repay(id, 4_995 * ONE);
        assert!(matches!(result, Err(LeverError::BelowMinDebt { .. })));
    }

    #[test]
    fn test_swap_enforces_min_out() {
        let world = MockWorld::default();
        world.fund(Asset::Borrowed, 2_000 * ONE);
        world.update(|s| s.swap_haircut_bps = 100);
        let mut c = world.collaborators();
        let err = c
            .exchange
            .swap(2_000 * ONE, ONE, SwapDirection::BorrowedToCollateral)
            .unwrap_err();
        assert!(matches!(err, LeverError::SlippageExceeded { .. }));
        let out = c
            .exchange
            .swap(2_000 * ONE, 98 * ONE / 100, SwapDirection::BorrowedToCollateral)
            .unwrap();
        assert_eq!(out, 99 * ONE / 100);
    }
}
