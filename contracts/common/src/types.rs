//! Core Types for the Lever Strategy
//!
//! Data structures shared by the leverage engine and the debt-position
//! coupling. Balances are never cached in these types across operations;
//! a [`PositionSnapshot`] is read fresh at the start of each one.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Type alias for addresses (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for debt-ledger entry identifiers
pub type PositionId = [u8; 32];

/// Zero address, never a valid caller or recipient
pub const ZERO_ADDRESS: Address = [0u8; 32];

// ============ Ledger Entry Types ============

/// Status of the debt-ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum PositionStatus {
    /// No entry has been opened
    #[default]
    None,
    /// Entry is open and can borrow
    Active,
    /// Owner repaid everything and closed the entry
    ClosedByOwner,
    /// Ledger liquidated the entry
    ClosedByLiquidation,
    /// Debt fell below the minimum floor, borrowing frozen until topped up
    Zombie,
}

impl PositionStatus {
    /// Returns true for the two terminal closed states
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ClosedByOwner | Self::ClosedByLiquidation)
    }

    /// Returns true if the entry holds collateral/debt on the ledger
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Active | Self::Zombie)
    }
}

/// Assets the strategy can hold loosely
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Asset {
    /// The asset posted as collateral (the vault's underlying)
    Collateral,
    /// The asset borrowed against collateral and re-lent
    Borrowed,
    /// The asset the ledger takes as opening stipend
    Stipend,
    /// Anything else that lands on the strategy
    Other([u8; 32]),
}

impl Asset {
    /// Returns true for assets the strategy manages and must never sweep
    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// Swap direction on the exchange adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum SwapDirection {
    /// Sell collateral, receive borrowed asset
    CollateralToBorrowed,
    /// Sell borrowed asset, receive collateral
    BorrowedToCollateral,
}

impl SwapDirection {
    /// (asset sold, asset received)
    pub fn assets(&self) -> (Asset, Asset) {
        match self {
            Self::CollateralToBorrowed => (Asset::Collateral, Asset::Borrowed),
            Self::BorrowedToCollateral => (Asset::Borrowed, Asset::Collateral),
        }
    }
}

/// Upfront fee bound accepted on debt adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum MaxFee {
    /// Revert if the fee exceeds this many borrowed-asset units
    Capped(u64),
    /// Accept any fee the ledger charges
    Any,
}

impl MaxFee {
    /// Returns true if `fee` is acceptable under this bound
    pub fn allows(&self, fee: u64) -> bool {
        match self {
            Self::Capped(cap) => fee <= *cap,
            Self::Any => true,
        }
    }
}

/// Sorted-list insertion hints for ledger operations that re-position the entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Hints {
    /// Neighbour with higher interest rate
    pub upper: PositionId,
    /// Neighbour with lower interest rate
    pub lower: PositionId,
}

// ============ Derived Views ============

/// Fresh reading of the position and prices taken at the start of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionSnapshot {
    /// Collateral posted on the ledger
    pub collateral: u64,
    /// Debt owed to the ledger
    pub debt: u64,
    /// Ledger status
    pub status: PositionStatus,
    /// Collateral price (USD, 8 decimals)
    pub collateral_price: u64,
    /// Borrowed-asset price (USD, 8 decimals)
    pub borrowed_price: u64,
}

/// LTV thresholds in basis points, derived from the ledger's liquidation factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LtvTargets {
    /// LTV at which the ledger liquidates
    pub liquidation_bps: u64,
    /// LTV the engine steers towards
    pub target_bps: u64,
    /// LTV above which the engine delevers
    pub warning_bps: u64,
}

/// Branch-wide solvency reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BranchState {
    /// Collateral across every position of the branch
    pub aggregate_collateral: u64,
    /// Debt across every position of the branch
    pub aggregate_debt: u64,
    /// Ratio below which the branch blocks debt-increasing transitions
    pub critical_ratio_bps: u64,
}

/// Outcome of a harvest-and-report cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Report {
    /// Total assets in collateral units
    pub total_assets: u64,
    /// Gain since the previous report
    pub profit: u64,
    /// Loss since the previous report
    pub loss: u64,
}

/// Generate a deterministic position ID from the owner and its entry index
pub fn derive_position_id(owner: &Address, owner_index: u64) -> PositionId {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(owner);
    hasher.update(owner_index.to_le_bytes());
    let result = hasher.finalize();
    let mut id = [0u8; 32];
    id.copy_from_slice(&result);
    id
}
