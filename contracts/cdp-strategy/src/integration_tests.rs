//! Integration Tests
//!
//! End-to-end runs of the strategy against the in-memory ledger, lender and
//! exchange: open, redemption, zombie recovery, liquidation and the
//! operator surface.

use lever_common::{
    access_control::Role,
    config::StrategyConfig,
    constants::{limits, token::ONE},
    errors::{ErrorCategory, LeverError},
    events::EventType,
    mock::MockWorld,
    types::{Asset, Hints, MaxFee, PositionStatus},
};

use crate::{CdpStrategy, StrategyParams};

const MANAGEMENT: [u8; 32] = [1u8; 32];
const KEEPER: [u8; 32] = [2u8; 32];
const VAULT: [u8; 32] = [3u8; 32];
const EMERGENCY: [u8; 32] = [4u8; 32];
const GOVERNANCE: [u8; 32] = [5u8; 32];
const STRANGER: [u8; 32] = [9u8; 32];

// 70% and 80% of the 90.90% liquidation factor
const TARGET_LTV: u64 = 6_363;
const WARNING_LTV: u64 = 7_272;

fn setup() -> (MockWorld, CdpStrategy) {
    let world = MockWorld::default();
    let mut strategy = CdpStrategy::new(world.collaborators(), MANAGEMENT, StrategyConfig::default()).unwrap();
    strategy.grant_role(&MANAGEMENT, KEEPER, Role::Keeper).unwrap();
    strategy.grant_role(&MANAGEMENT, VAULT, Role::Vault).unwrap();
    strategy.grant_role(&MANAGEMENT, EMERGENCY, Role::EmergencyAdmin).unwrap();
    strategy.grant_role(&MANAGEMENT, GOVERNANCE, Role::Governance).unwrap();
    strategy.set_zombie_exit_allowed(&MANAGEMENT, KEEPER, true).unwrap();
    (world, strategy)
}

/// Open with 10 collateral at 5% interest, levered to target
fn opened() -> (MockWorld, CdpStrategy) {
    let (world, mut strategy) = setup();
    world.fund(Asset::Stipend, limits::STIPEND);
    world.fund(Asset::Collateral, 10 * ONE);
    strategy.open_position(&MANAGEMENT, 10 * ONE, 500, MaxFee::Any).unwrap();
    (world, strategy)
}

// ============================================================================
// Open and lever to target
// ============================================================================

#[test]
fn test_open_levers_to_target() {
    let (world, strategy) = opened();

    // 10 * 2,000 * 0.70 * 0.909
    let position = strategy.position().unwrap();
    assert_eq!(position.status, PositionStatus::Active);
    assert_eq!(position.collateral, 10 * ONE);
    assert_eq!(position.debt, 12_726 * ONE);
    assert_eq!(strategy.current_ltv().unwrap(), TARGET_LTV);

    // every borrowed unit is lent
    let state = world.state();
    assert_eq!(state.lent, 12_726 * ONE);
    assert_eq!(world.balance(Asset::Borrowed), 0);
    assert_eq!(world.balance(Asset::Stipend), 0);

    let events = strategy.events();
    assert_eq!(events.filter_by_type(EventType::PositionOpened).len(), 1);
    assert_eq!(events.filter_by_type(EventType::LeveredUp).len(), 1);
}

#[test]
fn test_open_with_upfront_fee_stays_at_target() {
    let (world, mut strategy) = setup();
    world.update(|s| s.upfront_fee_bps = 50);
    world.fund(Asset::Stipend, limits::STIPEND);
    world.fund(Asset::Collateral, 10 * ONE);
    strategy.open_position(&MANAGEMENT, 10 * ONE, 500, MaxFee::Any).unwrap();

    // 10.05 at open, then 12,652.69 drawn with its own 0.5% on top
    let position = strategy.position().unwrap();
    assert_eq!(position.debt, 1_272_599_999_999);
    assert_eq!(world.state().lent, 10 * ONE + 1_265_268_656_716);
    assert!(strategy.current_ltv().unwrap() <= TARGET_LTV + 1);
    assert!(!strategy.tend_trigger().unwrap());
}

#[test]
fn test_open_twice_fails() {
    let (world, mut strategy) = opened();
    world.fund(Asset::Stipend, limits::STIPEND);
    world.fund(Asset::Collateral, 10 * ONE);

    let err = strategy.open_position(&MANAGEMENT, 10 * ONE, 500, MaxFee::Any).unwrap_err();
    assert!(matches!(err, LeverError::PositionAlreadyExists { .. }));
    assert_eq!(world.balance(Asset::Collateral), 10 * ONE);
}

#[test]
fn test_open_requires_stipend() {
    let (world, mut strategy) = setup();
    world.fund(Asset::Collateral, 10 * ONE);

    let err = strategy.open_position(&MANAGEMENT, 10 * ONE, 500, MaxFee::Any).unwrap_err();
    assert!(matches!(err, LeverError::InsufficientBalance { .. }));
    assert_eq!(strategy.position_id(), None);
}

// ============================================================================
// Redemption surplus
// ============================================================================

#[test]
fn test_redemption_surplus_sold_before_relever() {
    let (world, mut strategy) = opened();

    // 2,000 debt retired against 1 collateral
    world.redeem(2_000 * ONE).unwrap();
    assert_eq!(strategy.position().unwrap().collateral, 9 * ONE);
    assert_eq!(strategy.surplus().unwrap(), 2_000 * ONE);
    assert!(strategy.has_surplus().unwrap());
    assert!(strategy.tend_trigger().unwrap());

    strategy.tend(&KEEPER).unwrap();

    // surplus back in collateral, nothing re-levered this call
    assert!(!strategy.has_surplus().unwrap());
    assert_eq!(world.balance(Asset::Collateral), ONE);
    let position = strategy.position().unwrap();
    assert_eq!(position.collateral, 9 * ONE);
    assert_eq!(position.debt, 10_726 * ONE);
    assert_eq!(strategy.events().filter_by_type(EventType::SurplusSold).len(), 1);

    // the next call levers the loose collateral back to target
    strategy.tend(&KEEPER).unwrap();
    let position = strategy.position().unwrap();
    assert_eq!(position.collateral, 10 * ONE);
    assert_eq!(position.debt, 12_726 * ONE);
    assert!(strategy.current_ltv().unwrap() <= TARGET_LTV + 1);
}

#[test]
fn test_surplus_boundary() {
    let (world, strategy) = opened();
    // 0.5% of 12,726
    let floor = strategy.surplus_floor(12_726 * ONE).unwrap();
    assert_eq!(floor, 6_363_000_000);

    world.fund(Asset::Borrowed, floor);
    assert!(!strategy.has_surplus().unwrap());

    world.fund(Asset::Borrowed, 1);
    assert!(strategy.has_surplus().unwrap());
}

// ============================================================================
// Zombie exit behind the solvency guard
// ============================================================================

#[test]
fn test_zombie_exit_blocked_below_critical_ratio() {
    let (world, mut strategy) = opened();
    world.redeem(12_720 * ONE).unwrap();
    assert_eq!(strategy.status().unwrap(), PositionStatus::Zombie);

    // other borrowers drag the branch under 150%
    world.update(|s| s.other_branch_debt = 2_000_000 * ONE);
    let before = strategy.position().unwrap();
    let events = strategy.events().len();

    let err = strategy.exit_zombie(&KEEPER, 10 * ONE, Hints::default()).unwrap_err();
    assert!(matches!(err, LeverError::BranchBelowCriticalRatio { .. }));
    assert_eq!(err.category(), ErrorCategory::SolvencyGuard);
    assert!(!err.is_retryable());
    assert_eq!(strategy.position().unwrap(), before);
    assert_eq!(strategy.events().len(), events);

    // branch recovers
    world.update(|s| s.other_branch_debt = 500_000 * ONE);
    strategy.exit_zombie(&KEEPER, 10 * ONE, Hints::default()).unwrap();
    let position = strategy.position().unwrap();
    assert_eq!(position.status, PositionStatus::Active);
    assert_eq!(position.debt, 16 * ONE);
    assert_eq!(strategy.events().filter_by_type(EventType::ZombieExited).len(), 1);
}

#[test]
fn test_zombie_exit_requires_allow_list() {
    let (world, mut strategy) = opened();
    world.redeem(12_720 * ONE).unwrap();

    let err = strategy.exit_zombie(&STRANGER, 10 * ONE, Hints::default()).unwrap_err();
    assert_eq!(err, LeverError::NotAllowListed { caller: STRANGER });

    // debt must reach the floor
    let err = strategy.exit_zombie(&KEEPER, ONE, Hints::default()).unwrap_err();
    assert!(matches!(err, LeverError::BelowMinDebt { .. }));
}

#[test]
fn test_zombie_at_risk_waits_for_exit() {
    let (world, mut strategy) = opened();
    world.redeem(12_720 * ONE).unwrap();
    // 3.64 collateral at $1 against 6 debt
    world.set_price(Asset::Collateral, ONE);
    assert!(strategy.is_liquidatable().unwrap());
    assert!(strategy.tend_trigger().unwrap());

    let state = world.state();
    let events = strategy.events().len();
    strategy.tend(&KEEPER).unwrap();
    assert_eq!(world.state(), state);
    assert_eq!(strategy.events().len(), events);
    assert_eq!(strategy.status().unwrap(), PositionStatus::Zombie);
}

#[test]
fn test_zombie_blocks_borrowing() {
    let (world, mut strategy) = opened();
    world.redeem(12_720 * ONE).unwrap();
    world.fund(Asset::Collateral, ONE);

    strategy.deploy_funds(&VAULT, ONE).unwrap();
    // collateral stays loose, no new debt
    assert_eq!(world.balance(Asset::Collateral), ONE);
    assert_eq!(strategy.position().unwrap().debt, 6 * ONE);
}

// ============================================================================
// Liquidation cleanup
// ============================================================================

#[test]
fn test_liquidation_cleanup_reports_loss() {
    let (world, mut strategy) = opened();
    let baseline = strategy.harvest_and_report(&KEEPER).unwrap();
    assert_eq!(baseline.total_assets, 10 * ONE);

    world.liquidate(ONE / 2);
    assert!(strategy.tend_trigger().unwrap());

    strategy.tend(&KEEPER).unwrap();
    assert_eq!(world.state().lent, 0);
    assert_eq!(world.balance(Asset::Borrowed), 0);
    // 0.5 claimed plus 12,726 sold at $2,000
    assert_eq!(world.balance(Asset::Collateral), ONE / 2 + 636_300_000);
    assert!(!strategy.tend_trigger().unwrap());

    let report = strategy.harvest_and_report(&KEEPER).unwrap();
    assert_eq!(report.profit, 0);
    assert_eq!(report.loss, 10 * ONE - (ONE / 2 + 636_300_000));
}

// ============================================================================
// Maintenance properties
// ============================================================================

#[test]
fn test_tend_is_idempotent() {
    let (world, mut strategy) = opened();
    assert!(!strategy.tend_trigger().unwrap());

    world.set_price(Asset::Collateral, 2_500 * ONE);
    assert!(strategy.tend_trigger().unwrap());

    strategy.tend(&KEEPER).unwrap();
    assert!(strategy.current_ltv().unwrap() <= TARGET_LTV + 1);
    assert!(!strategy.tend_trigger().unwrap());

    let state = world.state();
    let events = strategy.events().len();
    strategy.tend(&KEEPER).unwrap();
    assert_eq!(world.state(), state);
    assert_eq!(strategy.events().len(), events);
}

#[test]
fn test_liquidation_precedence_ignores_overrides() {
    let (world, mut strategy) = opened();
    let mut params = StrategyParams::from(strategy.config());
    params.force_profitable_borrow = true;
    strategy.set_strategy_params(&MANAGEMENT, params).unwrap();
    world.update(|s| s.network_fee = 1_000_000);

    world.set_price(Asset::Collateral, 1_400 * ONE);
    assert!(strategy.is_liquidatable().unwrap());
    assert!(strategy.tend_trigger().unwrap());

    strategy.tend(&KEEPER).unwrap();
    assert!(!strategy.is_liquidatable().unwrap());
    assert!(strategy.current_ltv().unwrap() <= TARGET_LTV + 1);
    assert_eq!(strategy.events().filter_by_type(EventType::Delevered).len(), 1);
}

#[test]
fn test_price_drop_delevers_above_warning() {
    let (world, mut strategy) = opened();
    world.set_price(Asset::Collateral, 1_700 * ONE);
    assert!(strategy.current_ltv().unwrap() > WARNING_LTV);
    assert!(strategy.tend_trigger().unwrap());

    strategy.tend(&KEEPER).unwrap();
    assert!(strategy.current_ltv().unwrap() <= TARGET_LTV + 1);
    assert!(strategy.position().unwrap().debt >= limits::MIN_DEBT);
}

#[test]
fn test_max_withdrawal_monotonic() {
    let (world, strategy) = opened();
    world.set_price(Asset::Collateral, 2_500 * ONE);
    let base = strategy.max_withdrawal().unwrap();
    assert!(base > 0);

    world.update(|s| s.debt += 1_000 * ONE);
    let more_debt = strategy.max_withdrawal().unwrap();
    assert!(more_debt <= base);

    world.update(|s| s.collateral += ONE);
    assert!(strategy.max_withdrawal().unwrap() >= more_debt);
}

// ============================================================================
// Vault flows
// ============================================================================

#[test]
fn test_free_funds_repays_then_withdraws() {
    let (world, mut strategy) = opened();

    assert_eq!(strategy.free_funds(&VAULT, ONE).unwrap(), ONE);
    assert_eq!(world.state().transfers, vec![(Asset::Collateral, VAULT, ONE)]);
    let position = strategy.position().unwrap();
    assert_eq!(position.collateral, 9 * ONE);
    assert!(position.debt < 12_726 * ONE);
    assert!(strategy.current_ltv().unwrap() <= TARGET_LTV + 1);
}

#[test]
fn test_withdraw_limit_is_honoured_below_full_close() {
    let (_world, strategy) = opened();
    // everything but the collateral backing the 10 debt floor at target
    let limit = strategy.available_withdraw_limit().unwrap();
    assert_eq!(limit, 10 * ONE - 785_793);

    for amount in [limit - 1, limit] {
        let (world, mut strategy) = opened();
        assert_eq!(strategy.free_funds(&VAULT, amount).unwrap(), amount);
        assert_eq!(world.state().transfers, vec![(Asset::Collateral, VAULT, amount)]);

        let position = strategy.position().unwrap();
        assert_eq!(position.status, PositionStatus::Active);
        assert!(position.debt >= limits::MIN_DEBT);
        assert!(strategy.current_ltv().unwrap() <= TARGET_LTV + 1);
    }

    // all posted collateral still closes the entry
    let (world, mut strategy) = opened();
    assert_eq!(strategy.free_funds(&VAULT, 10 * ONE).unwrap(), 10 * ONE);
    assert_eq!(strategy.status().unwrap(), PositionStatus::ClosedByOwner);
    assert_eq!(world.state().debt, 0);
}

#[test]
fn test_deploy_requires_loose_collateral() {
    let (_world, mut strategy) = opened();
    let err = strategy.deploy_funds(&VAULT, ONE).unwrap_err();
    assert!(matches!(err, LeverError::InsufficientBalance { .. }));
}

// ============================================================================
// Atomicity and authorization
// ============================================================================

#[test]
fn test_failed_operation_rolls_back_everything() {
    let (world, mut strategy) = opened();
    world.fund(Asset::Collateral, ONE);
    world.update(|s| s.fail_next = Some("lender"));
    let state = world.state();
    let events = strategy.events().len();

    let err = strategy.deploy_funds(&VAULT, ONE).unwrap_err();
    assert!(matches!(err, LeverError::AdapterFailure { adapter: "lender", .. }));
    assert_eq!(world.state(), state);
    assert_eq!(strategy.events().len(), events);
}

#[test]
fn test_nested_operation_rejected() {
    let (_world, mut strategy) = opened();
    let result = strategy.atomically(|s| s.tend(&KEEPER));
    assert_eq!(result, Err(LeverError::Reentrancy));

    // the flag is cleared once the outer call returns
    assert!(strategy.tend(&KEEPER).is_ok());
}

#[test]
fn test_roles_enforced() {
    let (world, mut strategy) = opened();

    for err in [
        strategy.tend(&STRANGER).unwrap_err(),
        strategy.harvest_and_report(&VAULT).unwrap_err(),
        strategy.free_funds(&KEEPER, ONE).unwrap_err(),
        strategy.emergency_withdraw(&KEEPER).unwrap_err(),
        strategy.adjust_terms(&KEEPER, 600, MaxFee::Any).unwrap_err(),
        strategy.sweep(&MANAGEMENT, Asset::Other([7u8; 32]), STRANGER).unwrap_err(),
    ] {
        assert_eq!(err.category(), ErrorCategory::Authorization);
    }

    world.fund(Asset::Collateral, ONE);
    assert_eq!(
        strategy.sweep(&GOVERNANCE, Asset::Collateral, STRANGER),
        Err(LeverError::ProtectedAsset)
    );
}

#[test]
fn test_adjust_terms() {
    let (world, mut strategy) = opened();
    strategy.adjust_terms(&MANAGEMENT, 700, MaxFee::Any).unwrap();
    assert_eq!(world.state().interest_rate_bps, 700);

    let err = strategy.adjust_terms(&MANAGEMENT, 10, MaxFee::Any).unwrap_err();
    assert!(matches!(err, LeverError::BelowMinimum { .. }));
}

#[test]
fn test_unprofitable_debt_unwound_to_floor() {
    let (world, mut strategy) = opened();
    world.update(|s| s.supply_rate_bps = 100);
    assert!(strategy.tend_trigger().unwrap());

    strategy.tend(&KEEPER).unwrap();
    assert_eq!(strategy.position().unwrap().debt, limits::MIN_DEBT);
}

// ============================================================================
// Emergency
// ============================================================================

#[test]
fn test_emergency_withdraw_closes_position() {
    let (world, mut strategy) = opened();
    strategy.emergency_withdraw(&EMERGENCY).unwrap();

    assert_eq!(strategy.status().unwrap(), PositionStatus::ClosedByOwner);
    assert_eq!(world.balance(Asset::Collateral), 10 * ONE);
    assert_eq!(world.state().lent, 0);
    assert!(world
        .state()
        .transfers
        .contains(&(Asset::Stipend, EMERGENCY, limits::STIPEND)));
    assert_eq!(strategy.events().filter_by_type(EventType::EmergencyUnwound).len(), 1);
}

#[test]
fn test_emergency_withdraw_fails_when_lender_short() {
    let (world, mut strategy) = opened();
    world.update(|s| s.lender_liquidity = 1_000 * ONE);
    let state = world.state();
    let events = strategy.events().len();

    let err = strategy.emergency_withdraw(&EMERGENCY).unwrap_err();
    assert_eq!(
        err,
        LeverError::InsufficientBalance {
            available: 1_000 * ONE,
            requested: 12_726 * ONE,
        }
    );
    assert_eq!(world.state(), state);
    assert_eq!(strategy.events().len(), events);
    assert_eq!(strategy.status().unwrap(), PositionStatus::Active);
}

#[test]
fn test_emergency_withdraw_after_liquidation_claims() {
    let (world, mut strategy) = opened();
    world.liquidate(ONE);

    strategy.emergency_withdraw(&EMERGENCY).unwrap();
    assert_eq!(world.balance(Asset::Collateral), ONE);
    assert_eq!(world.balance(Asset::Borrowed), 12_726 * ONE);
    assert_eq!(strategy.events().filter_by_type(EventType::CollateralClaimed).len(), 1);
}

#[test]
fn test_claim_collateral_after_liquidation() {
    let (world, mut strategy) = opened();
    assert_eq!(strategy.claim_collateral(&KEEPER).unwrap(), 0);

    world.liquidate(2 * ONE);
    assert!(strategy.claim_collateral(&VAULT).is_err());
    assert_eq!(strategy.claim_collateral(&KEEPER).unwrap(), 2 * ONE);
    assert_eq!(world.balance(Asset::Collateral), 2 * ONE);
    assert_eq!(world.state().claimable_collateral, 0);
}

#[test]
fn test_manual_swaps() {
    let (world, mut strategy) = opened();
    world.fund(Asset::Collateral, ONE);

    let received = strategy.buy_borrowed_asset(&EMERGENCY, ONE).unwrap();
    assert_eq!(received, 2_000 * ONE);

    // draws on the lender once loose balance runs out
    let received = strategy.sell_borrowed_asset(&EMERGENCY, 4_000 * ONE).unwrap();
    assert_eq!(received, 2 * ONE);
    assert_eq!(world.state().lent, 12_726 * ONE - 2_000 * ONE);

    world.update(|s| s.swap_haircut_bps = 200);
    let err = strategy.buy_borrowed_asset(&EMERGENCY, ONE).unwrap_err();
    assert!(matches!(err, LeverError::SlippageExceeded { .. }));
}
