//! Strategy Constants
//!
//! All magic numbers and default configuration values for the leveraged
//! CDP strategy. Ledger-imposed values follow the Liquity V2 parameters
//! the debt ledger is modelled on.
//!
//! # Network Configuration
//!
//! Use feature flags to compile for different networks:
//! - `mainnet` - Production values (real minimum debt and stipend)
//! - Default (no feature) - Testnet values (lower minimums for testing)
//!
//! ```toml
//! # For mainnet deployment:
//! lever-common = { path = "...", features = ["mainnet"] }
//! ```

/// Token precision shared by collateral, borrowed asset and USD prices
pub mod token {
    /// One unit with decimals (1 token = 100_000_000 base units)
    pub const ONE: u64 = 100_000_000;
}

/// Ratio precision (basis points, 10_000 = 100%)
pub mod ratios {
    /// Basis points denominator
    pub const BPS: u64 = 10_000;

    /// Rounding epsilon for LTV post-conditions (1 bps)
    pub const LTV_EPSILON_BPS: u64 = 1;

    /// Default critical ratio of a branch (150%)
    pub const DEFAULT_CRITICAL_RATIO_BPS: u64 = 15_000;

    /// Minimum collateral ratio of a position (110%)
    pub const MCR_BPS: u64 = 11_000;

    /// Liquidation factor implied by MCR: LTV = 1 / MCR (~90.9%)
    pub const LIQUIDATION_FACTOR_BPS: u64 = BPS * BPS / MCR_BPS;
}

/// Ledger limits
///
/// Values differ between mainnet and testnet to allow easier testing.
pub mod limits {
    use super::token::ONE;

    /// Minimum debt a position may carry unless fully closed
    /// - Mainnet: 2,000 units
    /// - Testnet: 10 units
    #[cfg(feature = "mainnet")]
    pub const MIN_DEBT: u64 = 2_000 * ONE;
    #[cfg(not(feature = "mainnet"))]
    pub const MIN_DEBT: u64 = 10 * ONE;

    /// Stipend locked by the ledger when a position is opened, returned on close
    /// - Mainnet: 0.0375 units (liquidation gas compensation)
    /// - Testnet: 0.01 units
    #[cfg(feature = "mainnet")]
    pub const STIPEND: u64 = 3_750_000;
    #[cfg(not(feature = "mainnet"))]
    pub const STIPEND: u64 = 1_000_000;
}

/// Default configuration values
pub mod defaults {
    /// Target LTV as a fraction of the liquidation factor (70%)
    pub const TARGET_LTV_MULTIPLIER_BPS: u64 = 7_000;

    /// Warning LTV as a fraction of the liquidation factor (80%)
    pub const WARNING_LTV_MULTIPLIER_BPS: u64 = 8_000;

    /// Swap slippage tolerance (0.5%)
    pub const SLIPPAGE_BPS: u64 = 50;

    /// Absolute surplus floor (1 base unit)
    pub const MIN_SURPLUS_ABSOLUTE: u64 = 1;

    /// Surplus floor relative to debt (0.5%)
    pub const MIN_SURPLUS_RELATIVE_BPS: u64 = 50;

    /// Swaps below this size are skipped as dust
    pub const MIN_AMOUNT_TO_SELL: u64 = 1_000;

    /// Under-target gap (in LTV bps) before a lever-up is worth a tend
    pub const MIN_LEVER_GAP_BPS: u64 = 50;

    /// Network fee above which non-critical maintenance is deferred
    pub const MAX_NETWORK_FEE: u64 = 100;

    /// Correction applied to the ledger LTV before comparing with the
    /// liquidation factor (100.5%, trips slightly before the ledger does)
    pub const LIQUIDATION_CORRECTION_BPS: u64 = 10_050;
}

/// Bounds enforced by the threshold setters
pub mod bounds {
    /// Slippage cap (10%)
    pub const MAX_SLIPPAGE_BPS: u64 = 1_000;

    /// Relative surplus cap (10% of debt)
    pub const MAX_RELATIVE_SURPLUS_BPS: u64 = 1_000;

    /// Minimum gap between target and warning multipliers
    pub const MIN_LTV_GAP_BPS: u64 = 100;

    /// Correction factor may not be set below 100%
    pub const MIN_LIQUIDATION_CORRECTION_BPS: u64 = 10_000;

    /// Correction factor cap (120%)
    pub const MAX_LIQUIDATION_CORRECTION_BPS: u64 = 12_000;

    /// Annual interest rate bounds accepted by the ledger (0.5% - 250%)
    pub const MIN_INTEREST_RATE_BPS: u64 = 50;
    pub const MAX_INTEREST_RATE_BPS: u64 = 25_000;
}
