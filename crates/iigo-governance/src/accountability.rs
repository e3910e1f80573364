//! Accountability records, lie detection and the per-turn history store.
//!
//! # Architecture
//!
//! - [`AccountabilityLedger`] keeps the raw [`Accountability`] records each
//!   turn and derives lie counts from them by comparing what an island
//!   claimed with the reference values recorded alongside.
//! - [`build_history_info`] folds one island's pairs for one turn into a
//!   [`HistoryInfo`], or rejects the set when a required field is missing.
//! - [`HistoryStore`] is the append-only `turn -> island -> HistoryInfo`
//!   map. A recorded turn is never modified or replaced.
//!
//! Records come from islands and are untrusted. Incomplete records are
//! dropped with a debug log; they never abort the turn.

use std::collections::{BTreeMap, BTreeSet};

use iigo_types::{Accountability, ClientId, VariableFieldName, VariableValuePair};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::GovernanceError;

// ---------------------------------------------------------------------------
// History info
// ---------------------------------------------------------------------------

/// A claimed value next to the value it is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuePair {
    /// What the island reported or did.
    pub claimed: Decimal,
    /// The reference value derived by the governance layer.
    pub actual: Decimal,
}

/// One island's accountability summary for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryInfo {
    /// Reported vs. actual private resources.
    pub resources: ValuePair,
    /// Tax paid vs. tax expected.
    pub tax: ValuePair,
    /// Allocation taken vs. allocation granted, when both were recorded.
    pub allocation: Option<ValuePair>,
    /// Lies accumulated by the island up to and including this turn.
    pub lied: u32,
}

/// Fields extracted from an unordered pair list. Later pairs overwrite
/// earlier ones.
#[derive(Debug, Default)]
struct ExtractedFields {
    reported_resources: Option<Decimal>,
    actual_resources: Option<Decimal>,
    tax_paid: Option<Decimal>,
    tax_expected: Option<Decimal>,
    allocation_taken: Option<Decimal>,
    allocation_expected: Option<Decimal>,
}

impl ExtractedFields {
    fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a VariableValuePair>) -> Self {
        let mut fields = Self::default();
        for pair in pairs {
            let slot = match pair.name {
                VariableFieldName::IslandReportedPrivateResources => &mut fields.reported_resources,
                VariableFieldName::IslandActualPrivateResources => &mut fields.actual_resources,
                VariableFieldName::IslandTaxContribution => &mut fields.tax_paid,
                VariableFieldName::ExpectedTaxContribution => &mut fields.tax_expected,
                VariableFieldName::IslandAllocation => &mut fields.allocation_taken,
                VariableFieldName::ExpectedAllocation => &mut fields.allocation_expected,
                _ => continue,
            };
            *slot = Some(pair.value);
        }
        fields
    }

    fn allocation(&self) -> Option<ValuePair> {
        Some(ValuePair {
            claimed: self.allocation_taken?,
            actual: self.allocation_expected?,
        })
    }

    fn history_info(&self) -> Option<HistoryInfo> {
        Some(HistoryInfo {
            resources: ValuePair {
                claimed: self.reported_resources?,
                actual: self.actual_resources?,
            },
            tax: ValuePair {
                claimed: self.tax_paid?,
                actual: self.tax_expected?,
            },
            allocation: self.allocation(),
            lied: 0,
        })
    }

    /// Count the discrepancies visible in these fields.
    fn lies(&self) -> u32 {
        let mut lies = 0_u32;
        if let (Some(reported), Some(actual)) = (self.reported_resources, self.actual_resources)
            && reported != actual
        {
            lies = lies.saturating_add(1);
        }
        if let (Some(paid), Some(expected)) = (self.tax_paid, self.tax_expected)
            && paid < expected
        {
            lies = lies.saturating_add(1);
        }
        if let Some(allocation) = self.allocation()
            && allocation.claimed > allocation.actual
        {
            lies = lies.saturating_add(1);
        }
        lies
    }
}

/// Build a [`HistoryInfo`] from one island's pairs for one turn.
///
/// Unknown names are ignored and the last value wins for duplicates.
/// Returns `None` unless reported and actual private resources, tax paid
/// and expected tax are all present. The allocation pair is kept only when
/// both halves are present. The `lied` counter starts at zero.
pub fn build_history_info(pairs: &[VariableValuePair]) -> Option<HistoryInfo> {
    ExtractedFields::from_pairs(pairs).history_info()
}

/// Concatenate the pairs of every record, grouped by island, in record
/// order.
fn group_by_client(records: &[Accountability]) -> BTreeMap<ClientId, Vec<VariableValuePair>> {
    let mut grouped: BTreeMap<ClientId, Vec<VariableValuePair>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.client_id)
            .or_default()
            .extend(record.pairs.iter().copied());
    }
    grouped
}

// ---------------------------------------------------------------------------
// Accountability ledger
// ---------------------------------------------------------------------------

/// Raw accountability records per turn, plus accumulated lie counts.
#[derive(Debug, Clone, Default)]
pub struct AccountabilityLedger {
    records: BTreeMap<u64, Vec<Accountability>>,
    lie_totals: BTreeMap<ClientId, u32>,
    accumulated_turns: BTreeSet<u64>,
}

impl AccountabilityLedger {
    /// Create an empty ledger.
    pub const fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            lie_totals: BTreeMap::new(),
            accumulated_turns: BTreeSet::new(),
        }
    }

    /// Append a record for the given turn.
    pub fn record(&mut self, turn: u64, record: Accountability) {
        self.records.entry(turn).or_default().push(record);
    }

    /// Records for a turn, in the order they were appended.
    pub fn records_for_turn(&self, turn: u64) -> &[Accountability] {
        self.records.get(&turn).map(Vec::as_slice).unwrap_or_default()
    }

    /// Lies detected in a single turn, per island. Islands with no lies are
    /// omitted.
    ///
    /// Each of these counts as one lie: reported resources differing from
    /// actual resources, tax paid below tax expected, and allocation taken
    /// above allocation granted.
    pub fn detect_lies(&self, turn: u64) -> BTreeMap<ClientId, u32> {
        group_by_client(self.records_for_turn(turn))
            .into_iter()
            .filter_map(|(client, pairs)| {
                let lies = ExtractedFields::from_pairs(&pairs).lies();
                (lies > 0).then_some((client, lies))
            })
            .collect()
    }

    /// Fold a turn's lies into the running totals and return the totals.
    ///
    /// A turn is only folded in once; repeating the call returns the
    /// totals unchanged.
    pub fn accumulate(&mut self, turn: u64) -> &BTreeMap<ClientId, u32> {
        if self.accumulated_turns.insert(turn) {
            for (client, lies) in self.detect_lies(turn) {
                let total = self.lie_totals.entry(client).or_insert(0);
                *total = total.saturating_add(lies);
            }
        }
        &self.lie_totals
    }

    /// Accumulated lie counts across every folded turn.
    pub const fn lie_totals(&self) -> &BTreeMap<ClientId, u32> {
        &self.lie_totals
    }
}

// ---------------------------------------------------------------------------
// History store
// ---------------------------------------------------------------------------

/// Cross-turn summary of one island's history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistorySummary {
    /// Number of turns with an accepted entry.
    pub turns_recorded: u32,
    /// Most recent turn with an accepted entry.
    pub last_turn: u64,
    /// Accumulated lie count as of `last_turn`.
    pub lied: u32,
    /// Sum of `|reported - actual|` private resources over all turns.
    pub total_resource_gap: Decimal,
    /// Sum of unpaid tax over all turns.
    pub total_tax_shortfall: Decimal,
}

/// Append-only `turn -> island -> HistoryInfo` storage.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    saved: BTreeMap<u64, BTreeMap<ClientId, HistoryInfo>>,
}

impl HistoryStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            saved: BTreeMap::new(),
        }
    }

    /// Build and store the history entries for one turn.
    ///
    /// Records are grouped by island with their pairs concatenated in
    /// record order. Islands whose pairs fail [`build_history_info`] get no
    /// entry. Each accepted entry carries the island's count from
    /// `lie_counts`, or zero if absent. The turn key is written even when
    /// no island was accepted.
    ///
    /// Returns the number of accepted entries.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::TurnAlreadyRecorded`] if `turn` is already
    /// present. The store is left untouched in that case.
    pub fn save_history_info(
        &mut self,
        records: &[Accountability],
        lie_counts: &BTreeMap<ClientId, u32>,
        turn: u64,
    ) -> Result<usize, GovernanceError> {
        if self.saved.contains_key(&turn) {
            return Err(GovernanceError::TurnAlreadyRecorded { turn });
        }

        let mut entries = BTreeMap::new();
        for (client, pairs) in group_by_client(records) {
            match build_history_info(&pairs) {
                Some(mut info) => {
                    info.lied = lie_counts.get(&client).copied().unwrap_or(0);
                    entries.insert(client, info);
                }
                None => {
                    debug!(turn, client = %client, pairs = pairs.len(), "Dropped incomplete accountability record");
                }
            }
        }

        let accepted = entries.len();
        self.saved.insert(turn, entries);
        info!(turn, accepted, "History saved");
        Ok(accepted)
    }

    /// Entries for one turn. `None` means the turn was never saved; an
    /// empty map means it was saved with no accepted entries.
    pub fn turn(&self, turn: u64) -> Option<&BTreeMap<ClientId, HistoryInfo>> {
        self.saved.get(&turn)
    }

    /// The whole store.
    pub const fn saved(&self) -> &BTreeMap<u64, BTreeMap<ClientId, HistoryInfo>> {
        &self.saved
    }

    /// Number of saved turns.
    pub fn len(&self) -> usize {
        self.saved.len()
    }

    /// Whether no turn has been saved.
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }

    /// The most recent saved turn.
    pub fn latest_turn(&self) -> Option<u64> {
        self.saved.keys().next_back().copied()
    }

    /// Fold every saved turn into a per-island summary.
    pub fn summary(&self) -> BTreeMap<ClientId, HistorySummary> {
        let mut summaries: BTreeMap<ClientId, HistorySummary> = BTreeMap::new();

        for (&turn, entries) in &self.saved {
            for (&client, info) in entries {
                let summary = summaries.entry(client).or_default();
                summary.turns_recorded = summary.turns_recorded.saturating_add(1);
                summary.last_turn = turn;
                summary.lied = info.lied;

                let gap = info.resources.claimed.saturating_sub(info.resources.actual).abs();
                summary.total_resource_gap = summary.total_resource_gap.saturating_add(gap);

                let shortfall = info.tax.actual.saturating_sub(info.tax.claimed);
                if shortfall.is_sign_positive() {
                    summary.total_tax_shortfall =
                        summary.total_tax_shortfall.saturating_add(shortfall);
                }
            }
        }

        summaries
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn pair(name: VariableFieldName, value: Decimal) -> VariableValuePair {
        VariableValuePair::new(name, value)
    }

    fn complete_pairs(reported: Decimal, actual: Decimal, paid: Decimal) -> Vec<VariableValuePair> {
        vec![
            pair(VariableFieldName::IslandReportedPrivateResources, reported),
            pair(VariableFieldName::IslandActualPrivateResources, actual),
            pair(VariableFieldName::IslandTaxContribution, paid),
            pair(VariableFieldName::ExpectedTaxContribution, dec!(10)),
        ]
    }

    fn record(client: u32, pairs: Vec<VariableValuePair>) -> Accountability {
        Accountability {
            client_id: ClientId(client),
            pairs,
        }
    }

    #[test]
    fn build_accepts_complete_pairs() {
        let info = build_history_info(&complete_pairs(dec!(50), dec!(60), dec!(10)));
        assert_eq!(
            info.map(|i| (i.resources, i.tax, i.allocation, i.lied)),
            Some((
                ValuePair { claimed: dec!(50), actual: dec!(60) },
                ValuePair { claimed: dec!(10), actual: dec!(10) },
                None,
                0,
            ))
        );
    }

    #[test]
    fn build_rejects_each_missing_required_field() {
        let full = complete_pairs(dec!(1), dec!(1), dec!(1));
        for skip in 0..full.len() {
            let mut pairs: Vec<_> = full
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != skip)
                .map(|(_, p)| *p)
                .collect();
            // Unknown extras never make an incomplete set valid.
            pairs.push(pair(VariableFieldName::SanctionPaid, dec!(3)));
            pairs.push(pair(VariableFieldName::AllocationMade, dec!(1)));
            assert!(build_history_info(&pairs).is_none(), "field {skip} missing");
        }
    }

    #[test]
    fn build_uses_last_duplicate_and_ignores_unknown() {
        let mut pairs = complete_pairs(dec!(5), dec!(5), dec!(10));
        pairs.push(pair(VariableFieldName::ConstSanctionAmount, dec!(99)));
        pairs.push(pair(VariableFieldName::IslandReportedPrivateResources, dec!(7)));

        let info = build_history_info(&pairs);
        assert_eq!(info.map(|i| i.resources.claimed), Some(dec!(7)));
    }

    #[test]
    fn allocation_kept_only_when_both_halves_present() {
        let mut half = complete_pairs(dec!(5), dec!(5), dec!(10));
        half.push(pair(VariableFieldName::IslandAllocation, dec!(4)));
        assert_eq!(build_history_info(&half).and_then(|i| i.allocation), None);

        half.push(pair(VariableFieldName::ExpectedAllocation, dec!(3)));
        assert_eq!(
            build_history_info(&half).and_then(|i| i.allocation),
            Some(ValuePair { claimed: dec!(4), actual: dec!(3) })
        );
    }

    #[test]
    fn save_merges_split_records_per_client() {
        let full = complete_pairs(dec!(20), dec!(20), dec!(10));
        let records = vec![
            record(1, full[..2].to_vec()),
            record(2, complete_pairs(dec!(1), dec!(1), dec!(1))),
            record(1, full[2..].to_vec()),
        ];
        let mut lies = BTreeMap::new();
        lies.insert(ClientId(1), 3);

        let mut store = HistoryStore::new();
        assert_eq!(store.save_history_info(&records, &lies, 4).ok(), Some(2));

        let turn = store.turn(4);
        assert_eq!(turn.and_then(|t| t.get(&ClientId(1))).map(|i| i.lied), Some(3));
        assert_eq!(turn.and_then(|t| t.get(&ClientId(2))).map(|i| i.lied), Some(0));
    }

    #[test]
    fn incomplete_clients_contribute_nothing() {
        let records = vec![
            record(0, complete_pairs(dec!(1), dec!(1), dec!(1))),
            record(3, vec![pair(VariableFieldName::IslandTaxContribution, dec!(2))]),
        ];
        let mut store = HistoryStore::new();
        let _ = store.save_history_info(&records, &BTreeMap::new(), 1);

        let turn = store.turn(1);
        assert_eq!(turn.map(BTreeMap::len), Some(1));
        assert!(turn.is_some_and(|t| !t.contains_key(&ClientId(3))));
    }

    #[test]
    fn empty_turn_is_recorded_as_empty_not_absent() {
        let mut store = HistoryStore::new();
        assert_eq!(store.save_history_info(&[], &BTreeMap::new(), 2).ok(), Some(0));
        assert_eq!(store.turn(2).map(BTreeMap::is_empty), Some(true));
        assert!(store.turn(3).is_none());
    }

    #[test]
    fn reused_turn_is_rejected_and_store_untouched() {
        let mut store = HistoryStore::new();
        let first = vec![record(1, complete_pairs(dec!(1), dec!(1), dec!(1)))];
        let _ = store.save_history_info(&first, &BTreeMap::new(), 1);
        let before = store.saved().clone();

        let second = vec![record(2, complete_pairs(dec!(9), dec!(9), dec!(9)))];
        let result = store.save_history_info(&second, &BTreeMap::new(), 1);

        assert!(matches!(result, Err(GovernanceError::TurnAlreadyRecorded { turn: 1 })));
        assert_eq!(store.saved(), &before);
    }

    #[test]
    fn lies_detected_per_discrepancy() {
        let mut ledger = AccountabilityLedger::new();
        let mut pairs = complete_pairs(dec!(10), dec!(30), dec!(4));
        pairs.push(pair(VariableFieldName::IslandAllocation, dec!(8)));
        pairs.push(pair(VariableFieldName::ExpectedAllocation, dec!(5)));
        ledger.record(1, record(0, pairs));
        ledger.record(1, record(1, complete_pairs(dec!(30), dec!(30), dec!(10))));

        let lies = ledger.detect_lies(1);
        assert_eq!(lies.get(&ClientId(0)), Some(&3));
        assert!(!lies.contains_key(&ClientId(1)));
    }

    #[test]
    fn accumulate_folds_each_turn_once() {
        let mut ledger = AccountabilityLedger::new();
        ledger.record(1, record(0, complete_pairs(dec!(1), dec!(2), dec!(10))));
        ledger.record(2, record(0, complete_pairs(dec!(1), dec!(2), dec!(0))));

        let _ = ledger.accumulate(1);
        let _ = ledger.accumulate(1);
        assert_eq!(ledger.lie_totals().get(&ClientId(0)), Some(&1));

        let totals = ledger.accumulate(2);
        assert_eq!(totals.get(&ClientId(0)), Some(&3));
    }

    #[test]
    fn summary_folds_turns() {
        let mut store = HistoryStore::new();
        let mut lies = BTreeMap::new();
        lies.insert(ClientId(5), 1);
        let _ = store.save_history_info(
            &[record(5, complete_pairs(dec!(10), dec!(14), dec!(6)))],
            &lies,
            1,
        );
        lies.insert(ClientId(5), 2);
        let _ = store.save_history_info(
            &[record(5, complete_pairs(dec!(20), dec!(18), dec!(12)))],
            &lies,
            3,
        );

        let summary = store.summary();
        let island = summary.get(&ClientId(5)).copied().unwrap_or_default();
        assert_eq!(island.turns_recorded, 2);
        assert_eq!(island.last_turn, 3);
        assert_eq!(island.lied, 2);
        assert_eq!(island.total_resource_gap, dec!(6));
        assert_eq!(island.total_tax_shortfall, dec!(4));
        assert_eq!(store.latest_turn(), Some(3));
    }
}
