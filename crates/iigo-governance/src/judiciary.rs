//! The judiciary: history inspection, sanctions, pardons and election
//! triggers.
//!
//! # Architecture
//!
//! - [`Judiciary::call_election`] decides whether a role-holder must face an
//!   election this turn, from monitoring and the term-limit rule.
//! - [`get_pardoned_islands`] decides, round by round, which sanctions are
//!   forgiven. Trust comes from a [`TrustProvider`].
//! - [`Judiciary::decide_sanctions`] maps lies not yet sanctioned onto
//!   sanction tiers. Each lie is punished once; a sanction that expires or
//!   is pardoned is not issued again for the same lies.
//! - [`SanctionSchedule`] holds the sanctions in force, keyed by the
//!   monitoring round that issued them.
//!
//! Rounds are sparse. A round key that is absent means the round issued
//! nothing; the schedule never stores an empty round.

use std::collections::BTreeMap;

use iigo_types::{Accountability, ClientId, MonitorResult, Role, Sanction, SanctionTier, VotingMethod};
use tracing::{debug, info};

use crate::accountability::{HistoryStore, HistorySummary};
use crate::config::{JudiciaryConfig, PardonPolicy, RulesConfig};
use crate::error::GovernanceError;

// ---------------------------------------------------------------------------
// Election trigger
// ---------------------------------------------------------------------------

/// The judiciary's ruling on whether to hold an election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionSettings {
    /// The role concerned.
    pub role: Role,
    /// Whether an election must be held.
    pub hold_election: bool,
    /// Rule the election should use.
    pub voting_method: VotingMethod,
    /// Candidates for the election.
    pub candidates: Vec<ClientId>,
}

// ---------------------------------------------------------------------------
// Trust
// ---------------------------------------------------------------------------

/// Source of trust scores for pardon decisions.
///
/// Scores lie in `[0, 1]`. `None` means no score is known, which makes the
/// sanction ineligible for a pardon.
pub trait TrustProvider {
    /// Trust for the island whose sanction sits at `position` in `round`.
    fn trust(&self, round: u32, position: usize, client: ClientId) -> Option<f64>;
}

/// Positional trust: the score at index `i` applies to the `i`-th sanction
/// of every round.
impl TrustProvider for [f64] {
    fn trust(&self, _round: u32, position: usize, _client: ClientId) -> Option<f64> {
        self.get(position).copied()
    }
}

impl TrustProvider for Vec<f64> {
    fn trust(&self, round: u32, position: usize, client: ClientId) -> Option<f64> {
        self.as_slice().trust(round, position, client)
    }
}

/// Per-island trust.
impl TrustProvider for BTreeMap<ClientId, f64> {
    fn trust(&self, _round: u32, _position: usize, client: ClientId) -> Option<f64> {
        self.get(&client).copied()
    }
}

// ---------------------------------------------------------------------------
// Pardons
// ---------------------------------------------------------------------------

/// Decide which sanctions to pardon.
///
/// For every round with at least one sanction, returns one flag per
/// sanction in the same order. A sanction is pardoned when all of these
/// hold:
///
/// - its tier is a real sanction and below `policy.disqualifying_tier`;
/// - its trust is strictly above `policy.trust_threshold`;
/// - no other sanction in the same round is at or above
///   `policy.blocking_tier`.
///
/// Rounds with no sanctions are left out, so an input with nothing to
/// judge yields an empty map.
pub fn get_pardoned_islands<T: TrustProvider + ?Sized>(
    sanctions: &BTreeMap<u32, Vec<Sanction>>,
    trust: &T,
    policy: &PardonPolicy,
) -> BTreeMap<u32, Vec<bool>> {
    let mut pardons = BTreeMap::new();

    for (&round, list) in sanctions {
        if list.is_empty() {
            continue;
        }
        let blockers = list
            .iter()
            .filter(|s| s.tier >= policy.blocking_tier)
            .count();

        let decisions = list
            .iter()
            .enumerate()
            .map(|(position, sanction)| {
                let own_blocks = usize::from(sanction.tier >= policy.blocking_tier);
                let blocked = blockers > own_blocks;
                let eligible_tier = sanction.tier != SanctionTier::NoSanction
                    && sanction.tier < policy.disqualifying_tier;
                let trusted = trust
                    .trust(round, position, sanction.client_id)
                    .is_some_and(|t| t > policy.trust_threshold);
                eligible_tier && trusted && !blocked
            })
            .collect();

        pardons.insert(round, decisions);
    }

    pardons
}

// ---------------------------------------------------------------------------
// Sanction schedule
// ---------------------------------------------------------------------------

/// Sanctions in force, keyed by the monitoring round that issued them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanctionSchedule {
    rounds: BTreeMap<u32, Vec<Sanction>>,
}

impl SanctionSchedule {
    /// Create an empty schedule.
    pub const fn new() -> Self {
        Self {
            rounds: BTreeMap::new(),
        }
    }

    /// Record the sanctions issued in `round`. `NoSanction` entries are
    /// dropped and an empty round is not stored.
    pub fn record_round(&mut self, round: u32, sanctions: Vec<Sanction>) {
        let sanctions: Vec<Sanction> = sanctions
            .into_iter()
            .filter(|s| s.tier != SanctionTier::NoSanction && s.turns_left > 0)
            .collect();
        if sanctions.is_empty() {
            self.rounds.remove(&round);
        } else {
            self.rounds.insert(round, sanctions);
        }
    }

    /// All rounds still holding sanctions.
    pub const fn rounds(&self) -> &BTreeMap<u32, Vec<Sanction>> {
        &self.rounds
    }

    /// Remove every sanction flagged in `pardons`. Returns how many were
    /// removed.
    ///
    /// Flags are matched by position. Rounds that end up empty are removed.
    pub fn apply_pardons(&mut self, pardons: &BTreeMap<u32, Vec<bool>>) -> usize {
        let mut removed = 0_usize;
        for (round, flags) in pardons {
            let Some(list) = self.rounds.get_mut(round) else {
                continue;
            };
            let before = list.len();
            let mut position = 0_usize;
            list.retain(|_| {
                let pardoned = flags.get(position).copied().unwrap_or(false);
                position = position.saturating_add(1);
                !pardoned
            });
            removed = removed.saturating_add(before.saturating_sub(list.len()));
        }
        self.rounds.retain(|_, list| !list.is_empty());
        removed
    }

    /// Count one turn off every sanction, dropping those that expire.
    /// Returns the number that expired.
    pub fn advance(&mut self) -> usize {
        let mut expired = 0_usize;
        for list in self.rounds.values_mut() {
            for sanction in list.iter_mut() {
                sanction.turns_left = sanction.turns_left.saturating_sub(1);
            }
            let before = list.len();
            list.retain(|s| s.turns_left > 0);
            expired = expired.saturating_add(before.saturating_sub(list.len()));
        }
        self.rounds.retain(|_, list| !list.is_empty());
        expired
    }

    /// The most severe tier currently in force against `client`.
    pub fn active_tier(&self, client: ClientId) -> SanctionTier {
        self.rounds
            .values()
            .flatten()
            .filter(|s| s.client_id == client)
            .map(|s| s.tier)
            .max()
            .unwrap_or(SanctionTier::NoSanction)
    }

    /// Whether no sanction is in force.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Judiciary
// ---------------------------------------------------------------------------

/// What the judiciary did in one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JudiciaryOutcome {
    /// History entries accepted for the turn.
    pub history_entries: usize,
    /// Round index used for this turn's sanctions.
    pub round: u32,
    /// Sanctions issued this turn.
    pub issued: Vec<Sanction>,
    /// Pardon decisions over every round in force.
    pub pardons: BTreeMap<u32, Vec<bool>>,
    /// Number of sanctions removed by pardon.
    pub pardoned: usize,
    /// Number of sanctions that expired.
    pub expired: usize,
}

/// History, sanction and pardon state plus the policies that drive them.
#[derive(Debug, Clone)]
pub struct Judiciary {
    config: JudiciaryConfig,
    rules: RulesConfig,
    history: HistoryStore,
    sanctions: SanctionSchedule,
    pardons: BTreeMap<u32, Vec<bool>>,
    sanctioned_lies: BTreeMap<ClientId, u32>,
    next_round: u32,
}

impl Judiciary {
    /// Create a judiciary with empty history.
    pub const fn new(config: JudiciaryConfig, rules: RulesConfig) -> Self {
        Self {
            config,
            rules,
            history: HistoryStore::new(),
            sanctions: SanctionSchedule::new(),
            pardons: BTreeMap::new(),
            sanctioned_lies: BTreeMap::new(),
            next_round: 0,
        }
    }

    /// Decide whether `role` must face an election.
    ///
    /// In order of precedence:
    ///
    /// 1. monitoring performed and non-compliant: hold an election;
    /// 2. monitoring performed and compliant: do not;
    /// 3. otherwise hold one only if the term-limit rule is in force and
    ///    `turns_in_power` is strictly greater than the role's term length.
    pub fn call_election(
        &self,
        role: Role,
        monitoring: MonitorResult,
        turns_in_power: u64,
        candidates: &[ClientId],
    ) -> ElectionSettings {
        let hold_election = if monitoring.performed {
            !monitoring.result
        } else {
            self.rules.election_rule_in_play
                && turns_in_power > self.rules.term_lengths.for_role(role)
        };

        ElectionSettings {
            role,
            hold_election,
            voting_method: self.rules.voting_method,
            candidates: candidates.to_vec(),
        }
    }

    /// [`call_election`](Self::call_election) for the president.
    pub fn call_president_election(
        &self,
        monitoring: MonitorResult,
        turns_in_power: u64,
        candidates: &[ClientId],
    ) -> ElectionSettings {
        self.call_election(Role::President, monitoring, turns_in_power, candidates)
    }

    /// [`get_pardoned_islands`] under this judiciary's pardon policy.
    pub fn get_pardoned_islands<T: TrustProvider + ?Sized>(
        &self,
        sanctions: &BTreeMap<u32, Vec<Sanction>>,
        trust: &T,
    ) -> BTreeMap<u32, Vec<bool>> {
        get_pardoned_islands(sanctions, trust, &self.config.pardon)
    }

    /// Sanctions earned by the lies each island told since it was last
    /// sanctioned, ascending by island. Islands below the first threshold
    /// are left out.
    pub fn decide_sanctions(&self, summary: &BTreeMap<ClientId, HistorySummary>) -> Vec<Sanction> {
        summary
            .iter()
            .filter_map(|(&client_id, island)| {
                let already = self.sanctioned_lies.get(&client_id).copied().unwrap_or(0);
                let tier = self
                    .config
                    .sanction_thresholds
                    .tier_for(island.lied.saturating_sub(already));
                (tier != SanctionTier::NoSanction).then_some(Sanction {
                    client_id,
                    tier,
                    turns_left: self.config.sanction_length,
                })
            })
            .collect()
    }

    /// Run the judiciary's part of a turn.
    ///
    /// Saves the turn's history, counts down existing sanctions, issues new
    /// ones for lies not yet sanctioned, decides pardons over every round in
    /// force and removes the pardoned sanctions.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::TurnAlreadyRecorded`] if the turn's
    /// history was already saved. Nothing changes in that case.
    pub fn inspect_turn<T: TrustProvider + ?Sized>(
        &mut self,
        turn: u64,
        records: &[Accountability],
        lie_counts: &BTreeMap<ClientId, u32>,
        trust: &T,
    ) -> Result<JudiciaryOutcome, GovernanceError> {
        let history_entries = self.history.save_history_info(records, lie_counts, turn)?;
        let expired = self.sanctions.advance();

        let round = self.next_round;
        self.next_round = self.next_round.saturating_add(1);
        let summary = self.history.summary();
        let issued = self.decide_sanctions(&summary);
        self.sanctions.record_round(round, issued.clone());
        for (client, island) in &summary {
            let seen = self.sanctioned_lies.entry(*client).or_default();
            *seen = (*seen).max(island.lied);
        }

        let pardons = self.get_pardoned_islands(self.sanctions.rounds(), trust);
        let pardoned = self.sanctions.apply_pardons(&pardons);
        self.pardons.clone_from(&pardons);

        for sanction in &issued {
            debug!(turn, round, client = %sanction.client_id, tier = ?sanction.tier, "Sanction issued");
        }
        info!(turn, round, issued = issued.len(), pardoned, expired, "Judiciary inspection complete");

        Ok(JudiciaryOutcome {
            history_entries,
            round,
            issued,
            pardons,
            pardoned,
            expired,
        })
    }

    /// The history store.
    pub const fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Sanctions in force.
    pub const fn sanctions(&self) -> &SanctionSchedule {
        &self.sanctions
    }

    /// The latest pardon decisions, keyed by round.
    pub const fn pardons(&self) -> &BTreeMap<u32, Vec<bool>> {
        &self.pardons
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use iigo_types::{VariableFieldName, VariableValuePair};
    use rust_decimal::Decimal;

    use super::*;

    fn sanction(client: u32, tier: SanctionTier) -> Sanction {
        Sanction {
            client_id: ClientId(client),
            tier,
            turns_left: 2,
        }
    }

    fn judiciary(rule_in_play: bool) -> Judiciary {
        let mut rules = RulesConfig::default();
        rules.election_rule_in_play = rule_in_play;
        rules.term_lengths.president = 5;
        Judiciary::new(JudiciaryConfig::default(), rules)
    }

    const NOT_MONITORED: MonitorResult = MonitorResult {
        performed: false,
        result: false,
    };

    #[test]
    fn serving_exactly_the_term_does_not_trigger() {
        let settings = judiciary(true).call_president_election(NOT_MONITORED, 5, &[]);
        assert!(!settings.hold_election);
    }

    #[test]
    fn exceeding_the_term_triggers() {
        let settings = judiciary(true).call_president_election(NOT_MONITORED, 7, &[ClientId(1)]);
        assert!(settings.hold_election);
        assert_eq!(settings.role, Role::President);
        assert_eq!(settings.candidates, vec![ClientId(1)]);
    }

    #[test]
    fn failed_monitoring_triggers_without_rule() {
        let caught = MonitorResult {
            performed: true,
            result: false,
        };
        for turns in [0, 5, 100] {
            assert!(judiciary(false).call_president_election(caught, turns, &[]).hold_election);
        }
    }

    #[test]
    fn passed_monitoring_never_triggers() {
        let passed = MonitorResult {
            performed: true,
            result: true,
        };
        assert!(!judiciary(true).call_president_election(passed, 100, &[]).hold_election);
    }

    #[test]
    fn no_rule_no_monitoring_never_triggers() {
        assert!(!judiciary(false).call_president_election(NOT_MONITORED, 100, &[]).hold_election);
    }

    #[test]
    fn term_limit_applies_per_role() {
        let mut rules = RulesConfig::default();
        rules.term_lengths.judge = 2;
        let judiciary = Judiciary::new(JudiciaryConfig::default(), rules);
        assert!(judiciary.call_election(Role::Judge, NOT_MONITORED, 3, &[]).hold_election);
        assert!(!judiciary.call_election(Role::Speaker, NOT_MONITORED, 3, &[]).hold_election);
    }

    #[test]
    fn no_sanctions_no_pardons() {
        let policy = PardonPolicy::default();
        assert!(get_pardoned_islands(&BTreeMap::new(), &vec![1.0], &policy).is_empty());

        let mut empty_rounds = BTreeMap::new();
        empty_rounds.insert(0, Vec::new());
        empty_rounds.insert(3, Vec::new());
        assert!(get_pardoned_islands(&empty_rounds, &vec![1.0], &policy).is_empty());
    }

    #[test]
    fn no_sanction_is_never_pardoned() {
        let mut sanctions = BTreeMap::new();
        sanctions.insert(0, vec![sanction(1, SanctionTier::NoSanction)]);
        let pardons = get_pardoned_islands(&sanctions, &vec![1.0], &PardonPolicy::default());
        assert_eq!(pardons.get(&0), Some(&vec![false]));
    }

    #[test]
    fn severe_co_sanction_blocks_pardon() {
        let mut sanctions = BTreeMap::new();
        sanctions.insert(
            0,
            vec![sanction(1, SanctionTier::Tier1), sanction(2, SanctionTier::Tier4)],
        );
        let pardons = get_pardoned_islands(&sanctions, &vec![0.9, 0.9], &PardonPolicy::default());
        assert_eq!(pardons.get(&0), Some(&vec![false, false]));
    }

    #[test]
    fn lone_light_sanction_is_pardoned() {
        let mut sanctions = BTreeMap::new();
        sanctions.insert(0, vec![sanction(1, SanctionTier::Tier1)]);
        let pardons = get_pardoned_islands(&sanctions, &vec![0.9], &PardonPolicy::default());
        assert_eq!(pardons.get(&0), Some(&vec![true]));
    }

    #[test]
    fn blocking_is_confined_to_its_round() {
        let mut sanctions = BTreeMap::new();
        sanctions.insert(0, vec![sanction(1, SanctionTier::Tier2)]);
        sanctions.insert(1, vec![sanction(2, SanctionTier::Tier5)]);
        let pardons = get_pardoned_islands(&sanctions, &vec![0.9], &PardonPolicy::default());
        assert_eq!(pardons.get(&0), Some(&vec![true]));
        assert_eq!(pardons.get(&1), Some(&vec![false]));
    }

    #[test]
    fn low_or_missing_trust_is_not_pardoned() {
        let mut sanctions = BTreeMap::new();
        sanctions.insert(
            2,
            vec![
                sanction(1, SanctionTier::Tier1),
                sanction(2, SanctionTier::Tier1),
                sanction(3, SanctionTier::Tier1),
            ],
        );
        // Third sanction has no trust score at all.
        let pardons = get_pardoned_islands(&sanctions, &vec![0.6, 0.61], &PardonPolicy::default());
        assert_eq!(pardons.get(&2), Some(&vec![false, true, false]));
    }

    #[test]
    fn trust_by_client_reads_the_map() {
        let mut sanctions = BTreeMap::new();
        sanctions.insert(0, vec![sanction(4, SanctionTier::Tier2)]);
        let mut trust = BTreeMap::new();
        trust.insert(ClientId(4), 0.95);
        let pardons = get_pardoned_islands(&sanctions, &trust, &PardonPolicy::default());
        assert_eq!(pardons.get(&0), Some(&vec![true]));
    }

    #[test]
    fn schedule_applies_pardons_and_drops_empty_rounds() {
        let mut schedule = SanctionSchedule::new();
        schedule.record_round(0, vec![sanction(1, SanctionTier::Tier1)]);
        schedule.record_round(
            1,
            vec![sanction(2, SanctionTier::Tier1), sanction(3, SanctionTier::Tier3)],
        );

        let mut pardons = BTreeMap::new();
        pardons.insert(0, vec![true]);
        pardons.insert(1, vec![false, true]);

        assert_eq!(schedule.apply_pardons(&pardons), 2);
        assert!(!schedule.rounds().contains_key(&0));
        assert_eq!(schedule.rounds().get(&1).map(Vec::len), Some(1));
        assert_eq!(schedule.active_tier(ClientId(2)), SanctionTier::Tier1);
        assert_eq!(schedule.active_tier(ClientId(3)), SanctionTier::NoSanction);
    }

    #[test]
    fn schedule_expires_sanctions() {
        let mut schedule = SanctionSchedule::new();
        schedule.record_round(0, vec![sanction(1, SanctionTier::Tier2)]);
        schedule.record_round(0, vec![sanction(1, SanctionTier::NoSanction)]);
        assert!(schedule.is_empty());

        schedule.record_round(4, vec![sanction(1, SanctionTier::Tier2)]);
        assert_eq!(schedule.advance(), 0);
        assert_eq!(schedule.advance(), 1);
        assert!(schedule.is_empty());
    }

    #[test]
    fn lies_map_onto_tiers() {
        let judiciary = judiciary(true);
        let mut summary = BTreeMap::new();
        summary.insert(ClientId(0), HistorySummary::default());
        summary.insert(
            ClientId(1),
            HistorySummary {
                lied: 6,
                ..HistorySummary::default()
            },
        );

        let sanctions = judiciary.decide_sanctions(&summary);
        assert_eq!(sanctions, vec![Sanction {
            client_id: ClientId(1),
            tier: SanctionTier::Tier2,
            turns_left: 2,
        }]);
    }

    fn lying_record(client: u32) -> Accountability {
        Accountability {
            client_id: ClientId(client),
            pairs: vec![
                VariableValuePair::new(VariableFieldName::IslandReportedPrivateResources, Decimal::ONE),
                VariableValuePair::new(VariableFieldName::IslandActualPrivateResources, Decimal::TEN),
                VariableValuePair::new(VariableFieldName::IslandTaxContribution, Decimal::ZERO),
                VariableValuePair::new(VariableFieldName::ExpectedTaxContribution, Decimal::ONE),
            ],
        }
    }

    #[test]
    fn one_time_liar_is_sanctioned_once() {
        let mut judiciary = judiciary(true);
        let trust: Vec<f64> = Vec::new();
        let mut totals = BTreeMap::new();
        totals.insert(ClientId(0), 5);

        let first = judiciary.inspect_turn(1, &[lying_record(0)], &totals, &trust).unwrap();
        assert_eq!(first.issued.len(), 1);
        assert_eq!(judiciary.sanctions().active_tier(ClientId(0)), SanctionTier::Tier2);

        // No further records; the running total stays at 5.
        let mut issued = Vec::new();
        let mut expired = 0_usize;
        for turn in 2..=10 {
            let outcome = judiciary.inspect_turn(turn, &[], &totals, &trust).unwrap();
            issued.push(outcome.issued.len());
            expired = expired.saturating_add(outcome.expired);
        }

        assert_eq!(issued, vec![0; 9]);
        assert_eq!(expired, 1);
        assert!(judiciary.sanctions().is_empty());
    }

    #[test]
    fn new_lies_after_a_sanction_are_punished_on_their_own() {
        let mut judiciary = judiciary(true);
        let trust: Vec<f64> = Vec::new();
        let mut totals = BTreeMap::new();
        totals.insert(ClientId(0), 5);
        judiciary.inspect_turn(1, &[lying_record(0)], &totals, &trust).unwrap();

        totals.insert(ClientId(0), 6);
        let outcome = judiciary.inspect_turn(2, &[lying_record(0)], &totals, &trust).unwrap();

        assert_eq!(outcome.issued, vec![Sanction {
            client_id: ClientId(0),
            tier: SanctionTier::Tier1,
            turns_left: 2,
        }]);
    }

    #[test]
    fn inspect_turn_refuses_a_reused_turn() {
        let mut judiciary = judiciary(true);
        let trust: Vec<f64> = Vec::new();
        assert!(judiciary.inspect_turn(1, &[], &BTreeMap::new(), &trust).is_ok());
        let again = judiciary.inspect_turn(1, &[], &BTreeMap::new(), &trust);
        assert!(matches!(again, Err(GovernanceError::TurnAlreadyRecorded { turn: 1 })));
        assert_eq!(judiciary.history().len(), 1);
    }
}
