//! Error types for the governance layer.
//!
//! [`GovernanceError`] covers failures while a turn is running. Some of them
//! are expected during play ([`GovernanceError::InsufficientFunds`],
//! [`GovernanceError::InvalidState`]) and the turn sequencer records them and
//! carries on. The rest indicate misuse of the API and abort the turn.
//!
//! [`SetupError`] is returned while building a
//! [`GovernanceContext`](crate::GovernanceContext), before any turn runs.

use iigo_ledger::LedgerError;
use iigo_types::{ClientId, Role};
use rust_decimal::Decimal;

use crate::election::ElectionError;

/// Errors raised while running governance actions.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    /// The common pool could not cover the service charge for an action.
    /// The action was skipped and no balance changed.
    #[error("insufficient funds for {action}: cost {cost}, common pool {available}")]
    InsufficientFunds {
        /// The action that was refused.
        action: &'static str,
        /// The charge that could not be paid.
        cost: Decimal,
        /// The common pool balance at the time.
        available: Decimal,
    },

    /// A role-holder was addressed but the seat is empty.
    #[error("invalid state: no {role:?} is loaded")]
    InvalidState {
        /// The role whose holder is missing.
        role: Role,
    },

    /// A turn was saved into history twice.
    #[error("history for turn {turn} has already been recorded")]
    TurnAlreadyRecorded {
        /// The turn that was reused.
        turn: u64,
    },

    /// Turns must be run in increasing order.
    #[error("turn {turn} is not after the last completed turn {last}")]
    TurnOutOfOrder {
        /// The turn that was requested.
        turn: u64,
        /// The last turn that completed.
        last: u64,
    },

    /// An election was driven through an invalid transition.
    #[error("election error: {source}")]
    Election {
        /// The underlying election error.
        #[from]
        source: ElectionError,
    },

    /// A treasury operation failed for a reason other than funds.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        source: LedgerError,
    },
}

impl GovernanceError {
    /// Whether the sequencer may record this error and continue the turn.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientFunds { .. } | Self::InvalidState { .. })
    }

    /// Convert a ledger error raised while performing `action`.
    ///
    /// A shortfall in the common pool becomes
    /// [`GovernanceError::InsufficientFunds`]; anything else is wrapped as
    /// [`GovernanceError::Ledger`].
    pub fn from_ledger(action: &'static str, source: LedgerError) -> Self {
        match source {
            LedgerError::InsufficientFunds {
                requested,
                available,
                ..
            } => Self::InsufficientFunds {
                action,
                cost: requested,
                available,
            },
            other => Self::Ledger { source: other },
        }
    }
}

/// Errors raised while constructing the governance context.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The simulation has no islands.
    #[error("at least one island is required")]
    NoIslands,

    /// A role has no holder.
    #[error("no holder given for {role:?}")]
    MissingRoleHolder {
        /// The role left empty.
        role: Role,
    },

    /// A role holder is not one of the participating islands.
    #[error("{client} holds {role:?} but is not a participating island")]
    UnknownRoleHolder {
        /// The role.
        role: Role,
        /// The unknown holder.
        client: ClientId,
    },

    /// A configuration value is outside its valid range.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Initial funding could not be recorded.
    #[error("initial funding failed: {source}")]
    Funding {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortfall_maps_to_insufficient_funds() {
        let err = GovernanceError::from_ledger(
            "PAY_SPEAKER",
            LedgerError::InsufficientFunds {
                party: iigo_types::Party::CommonPool,
                requested: Decimal::TEN,
                available: Decimal::ONE,
            },
        );
        assert!(matches!(
            err,
            GovernanceError::InsufficientFunds { action: "PAY_SPEAKER", .. }
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn other_ledger_errors_are_fatal() {
        let err = GovernanceError::from_ledger("PAY_SPEAKER", LedgerError::ZeroQuantity);
        assert!(matches!(err, GovernanceError::Ledger { .. }));
        assert!(!err.is_recoverable());
    }
}
