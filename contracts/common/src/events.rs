//! Strategy Events
//!
//! Events are emitted during operation execution and can be indexed
//! off-chain. Events pushed by an operation that later reverts are
//! truncated away together with the rest of its effects.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Address, Asset, PositionId, PositionStatus, Report};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Position Events (0x01 - 0x1F)
    PositionOpened = 0x01,
    LeveredUp = 0x02,
    Delevered = 0x03,
    BorrowSkipped = 0x04,
    FundsFreed = 0x05,
    ZombieExited = 0x06,
    EmergencyUnwound = 0x07,
    CollateralClaimed = 0x08,
    TermsAdjusted = 0x09,

    // Surplus and Swap Events (0x20 - 0x3F)
    SurplusSold = 0x20,
    BorrowedAssetBought = 0x21,
    BorrowedAssetSold = 0x22,

    // Reporting Events (0x40 - 0x5F)
    Reported = 0x40,

    // Operator Events (0x80 - 0x9F)
    ConfigUpdated = 0x80,
    AllowListChanged = 0x81,
    Swept = 0x82,
}

/// Main event enum containing all strategy events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum StrategyEvent {
    /// Ledger entry opened
    PositionOpened {
        id: PositionId,
        collateral: u64,
        debt: u64,
        stipend: u64,
    },

    /// Collateral supplied and (optionally) debt borrowed and lent
    LeveredUp {
        supplied: u64,
        borrowed: u64,
        ltv_bps: u64,
    },

    /// Debt repaid to bring LTV back to target
    Delevered {
        repaid: u64,
        ltv_bps: u64,
    },

    /// Borrow step skipped because it would cost more than it earns
    BorrowSkipped {
        amount: u64,
        borrow_rate_bps: u64,
        supply_rate_bps: u64,
    },

    /// Collateral released to the vault
    FundsFreed {
        collateral: u64,
        repaid: u64,
    },

    /// Zombie entry topped back up to Active
    ZombieExited {
        borrowed: u64,
        debt: u64,
    },

    /// Everything unwound after an emergency
    EmergencyUnwound {
        prior_status: PositionStatus,
        repaid: u64,
        collateral_recovered: u64,
    },

    /// Post-liquidation collateral surplus claimed
    CollateralClaimed { amount: u64 },

    /// Interest rate (terms) adjusted
    TermsAdjusted { rate_bps: u64 },

    /// Surplus borrowed asset sold back to collateral
    SurplusSold {
        sold: u64,
        received: u64,
    },

    /// Manual collateral -> borrowed swap
    BorrowedAssetBought {
        spent: u64,
        received: u64,
    },

    /// Manual borrowed -> collateral swap
    BorrowedAssetSold {
        sold: u64,
        received: u64,
    },

    /// Harvest-and-report outcome
    Reported(Report),

    /// Configuration changed
    ConfigUpdated { by: Address },

    /// Allow-list membership changed
    AllowListChanged {
        list: AllowListKind,
        address: Address,
        allowed: bool,
    },

    /// Stray token swept
    Swept {
        asset: Asset,
        to: Address,
        amount: u64,
    },
}

/// Which allow-list changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum AllowListKind {
    /// Callers allowed to exit the Zombie state
    ZombieExit,
    /// Owners allowed to deposit into the strategy
    Depositor,
}

impl StrategyEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::PositionOpened { .. } => EventType::PositionOpened,
            Self::LeveredUp { .. } => EventType::LeveredUp,
            Self::Delevered { .. } => EventType::Delevered,
            Self::BorrowSkipped { .. } => EventType::BorrowSkipped,
            Self::FundsFreed { .. } => EventType::FundsFreed,
            Self::ZombieExited { .. } => EventType::ZombieExited,
            Self::EmergencyUnwound { .. } => EventType::EmergencyUnwound,
            Self::CollateralClaimed { .. } => EventType::CollateralClaimed,
            Self::TermsAdjusted { .. } => EventType::TermsAdjusted,
            Self::SurplusSold { .. } => EventType::SurplusSold,
            Self::BorrowedAssetBought { .. } => EventType::BorrowedAssetBought,
            Self::BorrowedAssetSold { .. } => EventType::BorrowedAssetSold,
            Self::Reported(_) => EventType::Reported,
            Self::ConfigUpdated { .. } => EventType::ConfigUpdated,
            Self::AllowListChanged { .. } => EventType::AllowListChanged,
            Self::Swept { .. } => EventType::Swept,
        }
    }

    /// Serialize event to bytes (Borsh)
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log collected during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<StrategyEvent>,
}

impl EventLog {
    /// Create new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: StrategyEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[StrategyEvent] {
        &self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&StrategyEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if no events were emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every event after the first `len`
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = StrategyEvent::SurplusSold {
            sold: 1_000,
            received: 990,
        };

        let bytes = event.to_bytes();
        let restored = StrategyEvent::from_bytes(&bytes).unwrap();

        assert_eq!(event, restored);
    }

    #[test]
    fn test_event_log_truncate() {
        let mut log = EventLog::new();
        log.emit(StrategyEvent::TermsAdjusted { rate_bps: 500 });
        let mark = log.len();
        log.emit(StrategyEvent::Delevered { repaid: 1, ltv_bps: 2 });
        log.emit(StrategyEvent::Delevered { repaid: 3, ltv_bps: 4 });

        assert_eq!(log.filter_by_type(EventType::Delevered).len(), 2);
        log.truncate(mark);
        assert_eq!(log.len(), 1);
        assert!(log.filter_by_type(EventType::Delevered).is_empty());
    }
}
