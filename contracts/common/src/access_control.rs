//! Access Control Module
//!
//! Role-based authorization for the strategy's operator surface, plus
//! the explicit allow-lists (zombie-exit callers, depositors).
//!
//! ## Roles
//!
//! - **Management**: configuration, open, terms adjustment; also satisfies
//!   Keeper and EmergencyAdmin checks
//! - **Keeper**: maintenance (tend, report, claim)
//! - **EmergencyAdmin**: emergency unwind and manual swaps
//! - **Governance**: stray-token sweep only
//! - **Vault**: the wrapping vault, deploys and frees funds

use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{LeverError, LeverResult};
use crate::types::{Address, ZERO_ADDRESS};

/// Strategy roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Role {
    /// Strategy management
    Management,
    /// Maintenance bot
    Keeper,
    /// Emergency operator
    EmergencyAdmin,
    /// Governance (sweeps)
    Governance,
    /// Wrapping vault
    Vault,
}

impl Role {
    /// Returns true if holding `self` satisfies a check for `required`
    pub fn grants(&self, required: Role) -> bool {
        if *self == required {
            return true;
        }
        matches!(
            (self, required),
            (Role::Management, Role::Keeper) | (Role::Management, Role::EmergencyAdmin)
        )
    }
}

/// Role assignments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RoleRegistry {
    assignments: BTreeSet<(Address, Role)>,
}

impl RoleRegistry {
    /// Create a registry with a single management address
    pub fn new(management: Address) -> LeverResult<Self> {
        let mut registry = Self::default();
        registry.grant(management, Role::Management)?;
        Ok(registry)
    }

    /// Assign `role` to `address`
    pub fn grant(&mut self, address: Address, role: Role) -> LeverResult<()> {
        if address == ZERO_ADDRESS {
            return Err(LeverError::Unauthorized {
                required: role,
                caller: address,
            });
        }
        if self.assignments.insert((address, role)) {
            debug!(?role, "role granted");
        }
        Ok(())
    }

    /// Remove `role` from `address`
    pub fn revoke(&mut self, address: Address, role: Role) {
        if self.assignments.remove(&(address, role)) {
            debug!(?role, "role revoked");
        }
    }

    /// Check if address satisfies `required`
    pub fn has_role(&self, address: &Address, required: Role) -> bool {
        self.assignments
            .iter()
            .any(|(holder, role)| holder == address && role.grants(required))
    }

    /// Fail with `Unauthorized` unless `caller` satisfies `required`
    pub fn require(&self, caller: &Address, required: Role) -> LeverResult<()> {
        if self.has_role(caller, required) {
            Ok(())
        } else {
            Err(LeverError::Unauthorized {
                required,
                caller: *caller,
            })
        }
    }
}

/// Set-membership allow-list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AllowList {
    members: BTreeSet<Address>,
    /// When true every address passes
    open: bool,
}

impl AllowList {
    /// An allow-list every caller passes
    pub fn open() -> Self {
        Self {
            members: BTreeSet::new(),
            open: true,
        }
    }

    /// Add or remove an address
    pub fn set(&mut self, address: Address, allowed: bool) {
        if allowed {
            self.members.insert(address);
        } else {
            self.members.remove(&address);
        }
    }

    /// Toggle whether the list is enforced
    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Check membership
    pub fn contains(&self, address: &Address) -> bool {
        self.open || self.members.contains(address)
    }

    /// Fail with `NotAllowListed` unless `caller` is a member
    pub fn require(&self, caller: &Address) -> LeverResult<()> {
        if self.contains(caller) {
            Ok(())
        } else {
            Err(LeverError::NotAllowListed { caller: *caller })
        }
    }
}
