//! Lever Strategy Common Library
//!
//! Shared types, constants, and utilities for the leveraged CDP strategy.
//! This crate is the foundation both the leverage engine and the
//! debt-position coupling build on.
//!
//! ## Model
//!
//! The strategy posts the vault's collateral into a debt ledger, borrows a
//! second asset against it and lends that asset to a yield source. The
//! carry is the spread between the supply yield and the borrow rate.
//! Every external system is reached through a capability trait in
//! [`adapters`], so the engine never names a concrete ledger or venue.
//!
//! ## Contents
//!
//! - **Constants**: precision, ledger limits, default thresholds
//! - **Errors**: one typed enum with a failure taxonomy
//! - **Math**: checked fixed-point helpers with explicit rounding direction
//! - **Events**: indexable strategy events and the per-strategy log
//! - **Access Control**: roles and allow-lists
//! - **Config**: the single explicit configuration value
//! - **Mock**: in-memory collaborators (behind the `mock` feature)

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod access_control;
pub mod config;
pub mod validation;
pub mod adapters;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use types::*;
pub use events::*;
pub use access_control::*;
pub use config::*;
pub use adapters::*;
