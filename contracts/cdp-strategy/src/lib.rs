//! CDP Strategy
//!
//! A leveraged strategy over a debt ledger that can redeem the position's
//! debt at par, freeze it as Zombie below the minimum debt, and block
//! debt-increasing transitions while its branch is under the critical ratio.
//!
//! ## Core Operations
//!
//! - **open_position**: one-time open with stipend, then lever to target
//! - **deploy_funds / free_funds**: the wrapping vault's deposit and withdraw
//! - **tend**: sell redemption surplus, otherwise rebalance
//! - **exit_zombie**: allow-listed re-borrow, behind the solvency guard
//! - **emergency_withdraw**: repay everything and close, or claim after liquidation
//! - **harvest_and_report**: total assets and profit/loss since the last report
//!
//! ## Atomicity
//!
//! Every mutating operation runs inside [`CdpStrategy::atomically`]: the
//! substrate opens a transaction, the strategy's own state is checkpointed,
//! and any error rolls both back. Events emitted by a reverted operation
//! are dropped with it.

pub mod coupling;
pub mod lifecycle;
pub mod operator;
pub mod report;
pub mod surplus;
pub mod zombie;

#[cfg(test)]
mod integration_tests;

pub use coupling::DebtPositionCoupling;
pub use operator::StrategyParams;

use tracing::warn;

use lever_common::{
    access_control::{AllowList, RoleRegistry},
    adapters::Collaborators,
    check,
    config::StrategyConfig,
    errors::{LeverError, LeverResult},
    events::EventLog,
    types::{Address, LtvTargets, PositionId, PositionSnapshot, PositionStatus, Report},
};
use lever_engine::{EngineView, LeverageEngine};

// ============ Strategy State ============

/// The strategy and everything it owns
pub struct CdpStrategy {
    /// External collaborators
    pub(crate) adapters: Collaborators,
    /// Current configuration
    pub(crate) config: StrategyConfig,
    /// Role assignments
    pub(crate) roles: RoleRegistry,
    /// Callers allowed to exit the Zombie state
    pub(crate) zombie_exit: AllowList,
    /// Owners allowed to deposit
    pub(crate) depositors: AllowList,
    /// Ledger entry, set once by open
    pub(crate) position_id: Option<PositionId>,
    /// Outcome of the previous report
    pub(crate) last_report: Option<Report>,
    /// Emitted events
    pub(crate) events: EventLog,
    /// Set while a top-level operation runs
    in_operation: bool,
}

/// In-memory state restored when an operation reverts
struct Checkpoint {
    config: StrategyConfig,
    roles: RoleRegistry,
    zombie_exit: AllowList,
    depositors: AllowList,
    position_id: Option<PositionId>,
    last_report: Option<Report>,
    event_count: usize,
}

impl CdpStrategy {
    /// Create a strategy managed by `management`. Deposits are open to
    /// everyone, zombie exit to no one, until configured.
    pub fn new(adapters: Collaborators, management: Address, config: StrategyConfig) -> LeverResult<Self> {
        config.validate()?;
        Ok(Self {
            adapters,
            config,
            roles: RoleRegistry::new(management)?,
            zombie_exit: AllowList::default(),
            depositors: AllowList::open(),
            position_id: None,
            last_report: None,
            events: EventLog::new(),
            in_operation: false,
        })
    }

    // ============ Transactional Boundary ============

    /// Run `op` to completion or not at all
    pub(crate) fn atomically<T>(&mut self, op: impl FnOnce(&mut Self) -> LeverResult<T>) -> LeverResult<T> {
        check!(!self.in_operation, LeverError::Reentrancy);
        self.in_operation = true;

        let checkpoint = self.checkpoint();
        self.adapters.substrate.begin();

        let result = op(self);
        match &result {
            Ok(_) => self.adapters.substrate.commit(),
            Err(err) => {
                self.adapters.substrate.rollback();
                self.restore(checkpoint);
                warn!(
                    code = err.code(),
                    recoverable = err.is_recoverable(),
                    error = %err,
                    "operation reverted"
                );
            }
        }

        self.in_operation = false;
        result
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            config: self.config.clone(),
            roles: self.roles.clone(),
            zombie_exit: self.zombie_exit.clone(),
            depositors: self.depositors.clone(),
            position_id: self.position_id,
            last_report: self.last_report,
            event_count: self.events.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.config = checkpoint.config;
        self.roles = checkpoint.roles;
        self.zombie_exit = checkpoint.zombie_exit;
        self.depositors = checkpoint.depositors;
        self.position_id = checkpoint.position_id;
        self.last_report = checkpoint.last_report;
        self.events.truncate(checkpoint.event_count);
    }

    // ============ Engine Access ============

    pub(crate) fn engine(&mut self) -> LeverageEngine<'_, DebtPositionCoupling> {
        LeverageEngine::new(
            &mut self.adapters,
            &self.config,
            &DebtPositionCoupling,
            self.position_id,
            &mut self.events,
        )
    }

    pub(crate) fn view(&self) -> EngineView<'_, DebtPositionCoupling> {
        EngineView {
            adapters: &self.adapters,
            config: &self.config,
            policy: &DebtPositionCoupling,
            id: self.position_id,
        }
    }

    pub(crate) fn require_position(&self) -> LeverResult<PositionId> {
        self.position_id.ok_or(LeverError::PositionNotFound)
    }

    // ============ Views ============

    /// Live position reading
    pub fn position(&self) -> LeverResult<PositionSnapshot> {
        self.view().snapshot()
    }

    /// Ledger status, `None` before open
    pub fn status(&self) -> LeverResult<PositionStatus> {
        Ok(self.position()?.status)
    }

    pub fn current_ltv(&self) -> LeverResult<u64> {
        self.view().current_ltv()
    }

    pub fn ltv_targets(&self) -> LeverResult<LtvTargets> {
        self.view().ltv_targets()
    }

    /// Coupling liquidation test against the live reading
    pub fn is_liquidatable(&self) -> LeverResult<bool> {
        let view = self.view();
        let snapshot = view.snapshot()?;
        let targets = view.ltv_targets()?;
        lever_engine::LedgerPolicy::is_liquidatable(&DebtPositionCoupling, &snapshot, &targets, &self.config)
    }

    pub fn max_withdrawal(&self) -> LeverResult<u64> {
        self.view().max_withdrawal()
    }

    pub fn calculate_amount_to_repay(&self, amount: u64) -> LeverResult<u64> {
        self.view().calculate_amount_to_repay(amount)
    }

    /// Collateral `owner` may still deposit; zero for owners off the allow-list
    pub fn available_deposit_limit(&self, owner: &Address) -> LeverResult<u64> {
        if !self.depositors.contains(owner) {
            return Ok(0);
        }
        if self.status()?.is_closed() {
            return Ok(0);
        }
        self.view().available_deposit_limit()
    }

    pub fn available_withdraw_limit(&self) -> LeverResult<u64> {
        self.view().available_withdraw_limit()
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn position_id(&self) -> Option<PositionId> {
        self.position_id
    }

    pub fn last_report(&self) -> Option<Report> {
        self.last_report
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }
}
