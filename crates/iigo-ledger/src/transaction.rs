//! Transaction builders and validation for the treasury ledger.
//!
//! Provides a [`TransactionBuilder`] that enforces the double-entry invariant:
//! every movement names a debit party and a credit party whose kinds match
//! the entry type. Builders validate inputs before producing a
//! [`LedgerEntry`].

use chrono::Utc;
use rust_decimal::Decimal;

use iigo_types::{EntityType, LedgerEntry, LedgerEntryId, LedgerEntryType, Party};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Transaction builder
// ---------------------------------------------------------------------------

/// Builder for constructing validated [`LedgerEntry`] values.
///
/// # Examples
///
/// ```
/// use iigo_ledger::TransactionBuilder;
/// use iigo_types::{ClientId, LedgerEntryType, Party};
/// use rust_decimal::Decimal;
///
/// let entry = TransactionBuilder::new(1, LedgerEntryType::Taxation)
///     .from(Party::Client(ClientId(3)))
///     .to(Party::CommonPool)
///     .quantity(Decimal::new(5, 0))
///     .reason("TAX".to_owned())
///     .build();
///
/// assert!(entry.is_ok());
/// ```
#[derive(Debug)]
pub struct TransactionBuilder {
    turn: u64,
    entry_type: LedgerEntryType,
    from: Option<Party>,
    to: Option<Party>,
    quantity: Option<Decimal>,
    reason: Option<String>,
}

impl TransactionBuilder {
    /// Start building a ledger entry for the given turn and entry type.
    pub const fn new(turn: u64, entry_type: LedgerEntryType) -> Self {
        Self {
            turn,
            entry_type,
            from: None,
            to: None,
            quantity: None,
            reason: None,
        }
    }

    /// Set the debit party.
    #[must_use]
    pub const fn from(mut self, party: Party) -> Self {
        self.from = Some(party);
        self
    }

    /// Set the credit party.
    #[must_use]
    pub const fn to(mut self, party: Party) -> Self {
        self.to = Some(party);
        self
    }

    /// Set the quantity moved.
    #[must_use]
    pub const fn quantity(mut self, qty: Decimal) -> Self {
        self.quantity = Some(qty);
        self
    }

    /// Set the human-readable reason for the movement.
    #[must_use]
    pub fn reason(mut self, reason: String) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Validate inputs and produce a [`LedgerEntry`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroQuantity`] if the quantity is zero.
    /// Returns [`LedgerError::NegativeQuantity`] if the quantity is negative.
    /// Returns [`LedgerError::MissingField`] if required fields are not set.
    /// Returns [`LedgerError::InvalidEntityType`] if the parties do not match
    /// the expected kinds for the entry type.
    pub fn build(self) -> Result<LedgerEntry, LedgerError> {
        let from = self.from.ok_or(LedgerError::MissingField("from"))?;
        let to = self.to.ok_or(LedgerError::MissingField("to"))?;
        let quantity = self.quantity.ok_or(LedgerError::MissingField("quantity"))?;
        let reason = self.reason.ok_or(LedgerError::MissingField("reason"))?;

        if quantity.is_zero() {
            return Err(LedgerError::ZeroQuantity);
        }
        if quantity.is_sign_negative() {
            return Err(LedgerError::NegativeQuantity { quantity });
        }

        validate_entity_types(self.entry_type, from.entity_type(), to.entity_type())?;

        Ok(LedgerEntry {
            id: LedgerEntryId::new(),
            turn: self.turn,
            entry_type: self.entry_type,
            from,
            to,
            quantity,
            reason,
            created_at: Utc::now(),
        })
    }
}

/// Validate that the from/to kinds match the contract for the given
/// [`LedgerEntryType`].
fn validate_entity_types(
    entry_type: LedgerEntryType,
    from_type: EntityType,
    to_type: EntityType,
) -> Result<(), LedgerError> {
    let (expected_from, expected_to) = expected_entity_types(entry_type);

    if from_type != expected_from {
        return Err(LedgerError::InvalidEntityType {
            entry_type,
            side: "from",
            expected: format!("{expected_from:?}"),
            actual: format!("{from_type:?}"),
        });
    }

    if to_type != expected_to {
        return Err(LedgerError::InvalidEntityType {
            entry_type,
            side: "to",
            expected: format!("{expected_to:?}"),
            actual: format!("{to_type:?}"),
        });
    }

    Ok(())
}

/// Return the expected (from, to) kinds for each [`LedgerEntryType`].
const fn expected_entity_types(entry_type: LedgerEntryType) -> (EntityType, EntityType) {
    match entry_type {
        LedgerEntryType::Endowment => (EntityType::World, EntityType::CommonPool),
        LedgerEntryType::Income => (EntityType::World, EntityType::Client),
        LedgerEntryType::Taxation => (EntityType::Client, EntityType::CommonPool),
        LedgerEntryType::Allocation | LedgerEntryType::Salary => {
            (EntityType::CommonPool, EntityType::Client)
        }
        LedgerEntryType::ServiceCharge => (EntityType::CommonPool, EntityType::Void),
    }
}
