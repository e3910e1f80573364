//! Conservation checks for the treasury ledger.
//!
//! Two checks are provided:
//!
//! - [`verify_conservation`] enforces, for a single turn, that internal
//!   movements (`Taxation`, `Allocation`, `Salary`) balance: what the common
//!   pool gains from islands and what islands gain from the common pool is
//!   exactly what the other side lost. Endowments, income and service charges
//!   are source/sink flows and are excluded. Each well-formed entry adds its
//!   quantity to both sides, so this holds by construction for valid entries.
//! - [`reconcile`] compares live balances held elsewhere against the balances
//!   derived from the full ledger. Any difference means a balance was changed
//!   without a matching entry.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use iigo_types::{LedgerEntry, LedgerEntryType, Party};

use crate::LedgerAnomaly;

/// The result of a conservation or reconciliation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// The books balance.
    Balanced,
    /// One or more parties do not balance.
    Anomaly(LedgerAnomaly),
}

/// Returns `true` if the entry type moves resources between the common pool
/// and an island without creating or destroying them.
const fn is_internal(entry_type: LedgerEntryType) -> bool {
    matches!(
        entry_type,
        LedgerEntryType::Taxation | LedgerEntryType::Allocation | LedgerEntryType::Salary
    )
}

/// Verify that internal movements in one turn balance.
pub fn verify_conservation(turn: u64, entries: &[LedgerEntry]) -> ConservationResult {
    let mut credit = Decimal::ZERO;
    let mut debit = Decimal::ZERO;

    for entry in entries.iter().filter(|e| e.turn == turn) {
        if !is_internal(entry.entry_type) {
            continue;
        }
        credit = match credit.checked_add(entry.quantity) {
            Some(val) => val,
            None => return overflow_anomaly(turn, entry.to),
        };
        debit = match debit.checked_add(entry.quantity) {
            Some(val) => val,
            None => return overflow_anomaly(turn, entry.from),
        };
    }

    if credit == debit {
        ConservationResult::Balanced
    } else {
        ConservationResult::Anomaly(LedgerAnomaly {
            turn: Some(turn),
            mismatches: vec![(Party::CommonPool, debit, credit)],
            message: format!(
                "LEDGER_ANOMALY at turn {turn}: internal credits {credit} != debits {debit}",
            ),
        })
    }
}

/// Compare live balances against the balances derived from the ledger.
///
/// `live` maps each party to the balance currently held for it. Parties that
/// appear in the ledger but not in `live` are expected to hold zero.
/// `World` and `Void` are excluded: they are unbounded source and sink.
pub fn reconcile(entries: &[LedgerEntry], live: &BTreeMap<Party, Decimal>) -> ConservationResult {
    let mut derived: BTreeMap<Party, Decimal> = BTreeMap::new();

    for entry in entries {
        let to = derived.entry(entry.to).or_insert(Decimal::ZERO);
        *to = to.saturating_add(entry.quantity);
        let from = derived.entry(entry.from).or_insert(Decimal::ZERO);
        *from = from.saturating_sub(entry.quantity);
    }

    let parties: BTreeSet<Party> = derived.keys().chain(live.keys()).copied().collect();
    let mut mismatches = Vec::new();

    for party in parties {
        if matches!(party, Party::World | Party::Void) {
            continue;
        }
        let expected = derived.get(&party).copied().unwrap_or(Decimal::ZERO);
        let actual = live.get(&party).copied().unwrap_or(Decimal::ZERO);
        if expected != actual {
            mismatches.push((party, expected, actual));
        }
    }

    if mismatches.is_empty() {
        ConservationResult::Balanced
    } else {
        let count = mismatches.len();
        ConservationResult::Anomaly(LedgerAnomaly {
            turn: None,
            mismatches,
            message: format!("LEDGER_ANOMALY: {count} balance(s) disagree with the ledger"),
        })
    }
}

/// Construct an anomaly result for arithmetic overflow during summation.
fn overflow_anomaly(turn: u64, party: Party) -> ConservationResult {
    ConservationResult::Anomaly(LedgerAnomaly {
        turn: Some(turn),
        mismatches: vec![(party, Decimal::ZERO, Decimal::ZERO)],
        message: format!("LEDGER_ANOMALY at turn {turn}: arithmetic overflow while summing {party:?}"),
    })
}
