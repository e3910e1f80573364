//! Treasury ledger and common-pool bookkeeping for the IIGO simulation.
//!
//! Every resource unit that the governance layer moves is recorded here:
//! taxes flowing into the common pool, allocations and salaries flowing out
//! of it, and the service charges institutions burn to act. Balances are
//! never adjusted without a matching ledger entry, so the ledger can always
//! be reconciled against the live balances.
//!
//! # Architecture
//!
//! - [`ledger`] -- The [`Ledger`] struct: append-only log with recording methods.
//! - [`transaction`] -- The [`TransactionBuilder`] for validated entry construction.
//! - [`conservation`] -- Per-turn balance checks and balance reconciliation.
//! - [`treasury`] -- The [`Treasury`]: common pool, role budgets, private pools.
//!
//! # Flows
//!
//! | Type | From (debit) | To (credit) |
//! |------|-------------|-------------|
//! | Endowment | World | `CommonPool` |
//! | Income | World | Client |
//! | Taxation | Client | `CommonPool` |
//! | Allocation | `CommonPool` | Client |
//! | Salary | `CommonPool` | Client |
//! | `ServiceCharge` | `CommonPool` | Void |
//!
//! # Usage
//!
//! ```
//! use iigo_ledger::Treasury;
//! use iigo_types::{ClientId, Role};
//! use rust_decimal::Decimal;
//!
//! let mut treasury = Treasury::new();
//! treasury.fund_common_pool(0, Decimal::new(100, 0)).ok();
//!
//! // A service charge succeeds while the pool can cover it.
//! assert!(treasury.charge_service(1, Role::President, Decimal::new(10, 0), "BROADCAST_TAXATION").is_ok());
//! assert_eq!(treasury.common_pool(), Decimal::new(90, 0));
//!
//! // A salary larger than the pool is refused and nothing moves.
//! assert!(treasury.pay_salary(1, ClientId(2), Decimal::new(500, 0)).is_err());
//! assert_eq!(treasury.common_pool(), Decimal::new(90, 0));
//! ```

pub mod conservation;
pub mod ledger;
pub mod transaction;
pub mod treasury;

// Re-export primary types at crate root.
pub use conservation::ConservationResult;
pub use ledger::{Ledger, TransferParams};
pub use transaction::TransactionBuilder;
pub use treasury::Treasury;

use rust_decimal::Decimal;

use iigo_types::{LedgerEntryType, Party};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when moving or recording resources.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Quantity must be strictly positive.
    #[error("ledger entry quantity must be non-zero")]
    ZeroQuantity,

    /// Quantity must not be negative.
    #[error("ledger entry quantity must be positive, got {quantity}")]
    NegativeQuantity {
        /// The invalid quantity.
        quantity: Decimal,
    },

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The from/to parties do not match the expected kinds for the entry
    /// type.
    #[error("invalid party for {entry_type:?} {side}: expected {expected}, got {actual}")]
    InvalidEntityType {
        /// The entry type being validated.
        entry_type: LedgerEntryType,
        /// Which side of the entry ("from" or "to").
        side: &'static str,
        /// The expected entity type.
        expected: String,
        /// The actual entity type.
        actual: String,
    },

    /// The paying party does not hold enough resources.
    #[error("insufficient funds in {party:?}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// The party that would have paid.
        party: Party,
        /// The amount requested.
        requested: Decimal,
        /// The amount the party holds.
        available: Decimal,
    },

    /// A balance computation overflowed.
    #[error("arithmetic overflow while updating {0}")]
    Overflow(&'static str),
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A bookkeeping violation detected by a conservation or reconciliation
/// check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnomaly {
    /// The turn the anomaly was detected for, if the check was per-turn.
    pub turn: Option<u64>,
    /// Per-party mismatch: (expected, actual).
    pub mismatches: Vec<(Party, Decimal, Decimal)>,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
