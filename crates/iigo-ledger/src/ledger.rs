//! The treasury ledger: an append-only log of all resource movements.
//!
//! # Design
//!
//! - **Append-only**: entries are never modified or deleted.
//! - **Double-entry**: every movement has a debit (from) and credit (to).
//! - **Precision**: all quantities use [`Decimal`] -- no floating point.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use iigo_types::{LedgerEntry, LedgerEntryType, Party};

use crate::conservation::{ConservationResult, verify_conservation};
use crate::{LedgerError, TransactionBuilder};

/// Parameters for recording a general ledger movement.
pub struct TransferParams {
    /// The turn number.
    pub turn: u64,
    /// The category of movement.
    pub entry_type: LedgerEntryType,
    /// Quantity moved.
    pub quantity: Decimal,
    /// Debit party.
    pub from: Party,
    /// Credit party.
    pub to: Party,
    /// Human-readable reason.
    pub reason: String,
}

/// The append-only log of every movement the treasury performed.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    /// All entries, in insertion order.
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Create a new empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Return the number of entries in the ledger.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the ledger has no entries.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a movement between two parties.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_transfer(&mut self, params: TransferParams) -> Result<&LedgerEntry, LedgerError> {
        let entry = TransactionBuilder::new(params.turn, params.entry_type)
            .from(params.from)
            .to(params.to)
            .quantity(params.quantity)
            .reason(params.reason)
            .build()?;
        self.entries.push(entry);

        self.entries
            .last()
            .ok_or(LedgerError::MissingField("entry after append"))
    }

    /// Verify that every movement in the given turn balances.
    pub fn verify_conservation(&self, turn: u64) -> ConservationResult {
        verify_conservation(turn, &self.entries)
    }

    /// Return all entries for a given turn.
    pub fn entries_for_turn(&self, turn: u64) -> Vec<&LedgerEntry> {
        self.entries.iter().filter(|e| e.turn == turn).collect()
    }

    /// Return all entries, in insertion order.
    pub fn all_entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Net balance of a party derived purely from the ledger.
    ///
    /// Positive means the party has received more than it has paid out.
    pub fn party_balance(&self, party: Party) -> Decimal {
        let mut balance = Decimal::ZERO;

        for entry in &self.entries {
            if entry.to == party {
                balance = balance.saturating_add(entry.quantity);
            }
            if entry.from == party {
                balance = balance.saturating_sub(entry.quantity);
            }
        }

        balance
    }

    /// Total quantity per entry type recorded in the given turn.
    pub fn totals_for_turn(&self, turn: u64) -> BTreeMap<LedgerEntryType, Decimal> {
        let mut totals: BTreeMap<LedgerEntryType, Decimal> = BTreeMap::new();

        for entry in self.entries.iter().filter(|e| e.turn == turn) {
            let total = totals.entry(entry.entry_type).or_insert(Decimal::ZERO);
            *total = total.saturating_add(entry.quantity);
        }

        totals
    }
}

#[cfg(test)]
mod tests {
    use iigo_types::ClientId;
    use rust_decimal_macros::dec;

    use super::*;

    fn movement(
        turn: u64,
        entry_type: LedgerEntryType,
        quantity: Decimal,
        from: Party,
        to: Party,
    ) -> TransferParams {
        TransferParams {
            turn,
            entry_type,
            quantity,
            from,
            to,
            reason: format!("{entry_type:?}"),
        }
    }

    #[test]
    fn new_ledger_is_empty() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn record_transfer_appends_entry() {
        let mut ledger = Ledger::new();
        let result = ledger.record_transfer(movement(
            1,
            LedgerEntryType::Endowment,
            dec!(100),
            Party::World,
            Party::CommonPool,
        ));
        assert!(result.is_ok());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn invalid_entry_is_not_appended() {
        let mut ledger = Ledger::new();
        let result = ledger.record_transfer(movement(
            1,
            LedgerEntryType::Salary,
            Decimal::ZERO,
            Party::CommonPool,
            Party::Client(ClientId(1)),
        ));
        assert!(result.is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn party_balance_tracks_both_sides() {
        let mut ledger = Ledger::new();
        let island = Party::Client(ClientId(2));

        let _ = ledger.record_transfer(movement(
            1,
            LedgerEntryType::Endowment,
            dec!(50),
            Party::World,
            Party::CommonPool,
        ));
        let _ = ledger.record_transfer(movement(
            1,
            LedgerEntryType::Allocation,
            dec!(15),
            Party::CommonPool,
            island,
        ));
        let _ = ledger.record_transfer(movement(
            2,
            LedgerEntryType::Taxation,
            dec!(5),
            island,
            Party::CommonPool,
        ));

        assert_eq!(ledger.party_balance(Party::CommonPool), dec!(40));
        assert_eq!(ledger.party_balance(island), dec!(10));
    }

    #[test]
    fn entries_and_totals_filter_by_turn() {
        let mut ledger = Ledger::new();
        let _ = ledger.record_transfer(movement(
            1,
            LedgerEntryType::ServiceCharge,
            dec!(3),
            Party::CommonPool,
            Party::Void,
        ));
        let _ = ledger.record_transfer(movement(
            1,
            LedgerEntryType::ServiceCharge,
            dec!(4),
            Party::CommonPool,
            Party::Void,
        ));
        let _ = ledger.record_transfer(movement(
            2,
            LedgerEntryType::ServiceCharge,
            dec!(1),
            Party::CommonPool,
            Party::Void,
        ));

        assert_eq!(ledger.entries_for_turn(1).len(), 2);
        assert_eq!(ledger.entries_for_turn(3).len(), 0);
        assert_eq!(
            ledger.totals_for_turn(1).get(&LedgerEntryType::ServiceCharge),
            Some(&dec!(7))
        );
    }
}
