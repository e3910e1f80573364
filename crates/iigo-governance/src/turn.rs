//! Governance turn: the four-phase sequence run once per simulation turn.
//!
//! 1. **Collection** -- the executive gathers rule proposals and allocation
//!    requests from living islands and has the president pick a rule.
//!
//! 2. **Judiciary** -- the turn's accountability records are folded into lie
//!    totals and saved to history; sanctions are counted down, issued and
//!    pardoned.
//!
//! 3. **Elections** -- the judiciary rules on every role. Where it calls an
//!    election one is run immediately and the winner takes office.
//!
//! 4. **Broadcast** -- the president sets taxes and answers allocation
//!    requests, and the speaker is paid.
//!
//! Executive actions that cannot be paid for, or that find the seat
//! vacant, are recorded in [`TurnSummary::skipped`] and the turn carries on.
//! Any other error aborts the turn.

use std::collections::BTreeMap;

use iigo_ledger::ConservationResult;
use iigo_types::{ClientId, MonitorResult, PresidentPayload, Resources, Role};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::client::{ClientDirectory, IslandClient, living_islands};
use crate::context::GovernanceContext;
use crate::election::Election;
use crate::error::GovernanceError;
use crate::judiciary::{ElectionSettings, JudiciaryOutcome, TrustProvider};

/// A role that changed hands during the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectionOutcome {
    /// The contested role.
    pub role: Role,
    /// Holder before the election.
    pub previous: Option<ClientId>,
    /// The winner, now in office.
    pub winner: ClientId,
}

/// An executive action that did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAction {
    /// Which action.
    pub action: &'static str,
    /// Why it was skipped.
    pub reason: String,
}

/// Summary of a single governance turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnSummary {
    /// The turn that ran.
    pub turn: u64,
    /// Rule proposals collected.
    pub rule_proposals: usize,
    /// Allocation requests collected.
    pub allocation_requests: usize,
    /// Rule the president picked for the speaker.
    pub rule_picked: Option<String>,
    /// Lies detected in this turn's records.
    pub lies: BTreeMap<ClientId, u32>,
    /// What the judiciary did.
    pub judiciary: JudiciaryOutcome,
    /// Elections held this turn.
    pub elections: Vec<ElectionOutcome>,
    /// Tax per island, if taxation was broadcast.
    pub taxation: BTreeMap<ClientId, Resources>,
    /// Grant per island, if allocations were broadcast.
    pub allocations: BTreeMap<ClientId, Resources>,
    /// Salary paid to the speaker.
    pub speaker_salary: Resources,
    /// Actions skipped for lack of funds or a role-holder.
    pub skipped: Vec<SkippedAction>,
    /// Common pool balance at the end of the turn.
    pub common_pool: Resources,
    /// Whether the treasury reconciled against its ledger.
    pub ledger_balanced: bool,
}

/// Keep a recoverable failure as a skipped action; propagate the rest.
fn tolerate<T>(
    result: Result<T, GovernanceError>,
    action: &'static str,
    skipped: &mut Vec<SkippedAction>,
) -> Result<Option<T>, GovernanceError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_recoverable() => {
            debug!(action, error = %err, "Action skipped");
            skipped.push(SkippedAction {
                action,
                reason: err.to_string(),
            });
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Run the election for `turn` described by `settings`.
///
/// # Errors
///
/// Returns [`GovernanceError::Election`] if `settings` has no candidates.
pub fn hold_election<C: IslandClient>(
    turn: u64,
    settings: &ElectionSettings,
    directory: &mut ClientDirectory<C>,
) -> Result<ClientId, GovernanceError> {
    let mut election = Election::propose(turn, settings.role, settings.voting_method);
    election.open_ballot(&settings.candidates)?;
    election.vote(directory)?;
    Ok(election.close_ballot()?)
}

/// Run one governance turn.
///
/// `monitoring` is the outcome of monitoring the president this turn.
/// Other roles are judged on the term-limit rule alone. `trust` supplies
/// the scores used for pardons.
///
/// # Errors
///
/// Returns [`GovernanceError::TurnOutOfOrder`] if `turn` is not after the
/// last completed turn, and propagates any non-recoverable error from the
/// phases.
#[allow(clippy::too_many_lines)]
pub fn run_governance_turn<C: IslandClient, T: TrustProvider + ?Sized>(
    ctx: &mut GovernanceContext,
    directory: &mut ClientDirectory<C>,
    turn: u64,
    monitoring: MonitorResult,
    trust: &T,
) -> Result<TurnSummary, GovernanceError> {
    if let Some(last) = ctx.last_turn
        && turn <= last
    {
        return Err(GovernanceError::TurnOutOfOrder { turn, last });
    }

    let mut summary = TurnSummary {
        turn,
        ..TurnSummary::default()
    };

    // Phase 1: collection.
    summary.rule_proposals = tolerate(
        ctx.executive.request_rule_proposal(turn, &mut ctx.treasury, directory),
        "REQUEST_RULE_PROPOSALS",
        &mut summary.skipped,
    )?
    .unwrap_or(0);
    summary.allocation_requests = tolerate(
        ctx.executive.request_allocation_request(turn, &mut ctx.treasury, directory),
        "REQUEST_ALLOCATION_REQUESTS",
        &mut summary.skipped,
    )?
    .unwrap_or(0);
    let picked = tolerate(
        ctx.executive.get_rule_for_speaker(turn, &mut ctx.treasury),
        "PICK_RULE",
        &mut summary.skipped,
    )?;
    if let Some(content) = picked
        && content.action_taken
        && let PresidentPayload::RuleProposal(rule) = content.payload
    {
        summary.rule_picked = Some(rule);
    }

    // Phase 2: judiciary.
    summary.lies = ctx.accountability.detect_lies(turn);
    let lie_totals = ctx.accountability.accumulate(turn).clone();
    summary.judiciary = ctx.judiciary.inspect_turn(
        turn,
        ctx.accountability.records_for_turn(turn),
        &lie_totals,
        trust,
    )?;

    // Phase 3: elections.
    let living = living_islands(directory);
    for role in Role::ALL {
        let role_monitoring = if role == Role::President {
            monitoring
        } else {
            MonitorResult::default()
        };
        let settings = ctx.judiciary.call_election(
            role,
            role_monitoring,
            ctx.turns_in_power.get(&role).copied().unwrap_or(0),
            &living,
        );
        if !settings.hold_election || living.is_empty() {
            continue;
        }

        let winner = if role == Role::Speaker {
            tolerate(
                ctx.executive
                    .appoint_next_speaker(turn, &mut ctx.treasury, directory, &settings.candidates),
                "APPOINT_NEXT_SPEAKER",
                &mut summary.skipped,
            )?
        } else {
            Some(hold_election(turn, &settings, directory)?)
        };

        if let Some(winner) = winner {
            let previous = ctx.role_holders.insert(role, winner);
            ctx.turns_in_power.insert(role, 0);
            if role == Role::President {
                ctx.executive.load_president(winner);
            }
            info!(turn, ?role, winner = %winner, "Role changed hands");
            summary.elections.push(ElectionOutcome {
                role,
                previous,
                winner,
            });
        }
    }

    // Phase 4: broadcast.
    let taxation = tolerate(
        ctx.executive.broadcast_taxation(turn, &mut ctx.treasury, directory),
        "BROADCAST_TAXATION",
        &mut summary.skipped,
    )?;
    if let Some(content) = taxation
        && content.action_taken
        && let PresidentPayload::Taxation(taxes) = content.payload
    {
        summary.taxation = taxes;
    }

    let allocation = tolerate(
        ctx.executive.reply_allocation_request(turn, &mut ctx.treasury, directory),
        "REPLY_ALLOCATION_REQUESTS",
        &mut summary.skipped,
    )?;
    if let Some(content) = allocation
        && content.action_taken
        && let PresidentPayload::Allocation(grants) = content.payload
    {
        summary.allocations = grants;
    }

    if let Some(speaker) = ctx.role_holders.get(&Role::Speaker).copied() {
        summary.speaker_salary = tolerate(
            ctx.executive.send_speaker_salary(turn, &mut ctx.treasury, speaker),
            "PAY_SPEAKER",
            &mut summary.skipped,
        )?
        .unwrap_or(Decimal::ZERO);
    }

    // Close the turn.
    for served in ctx.turns_in_power.values_mut() {
        *served = served.saturating_add(1);
    }
    ctx.last_turn = Some(turn);

    summary.common_pool = ctx.treasury.common_pool();
    summary.ledger_balanced = match ctx.treasury.verify() {
        ConservationResult::Balanced => true,
        ConservationResult::Anomaly(anomaly) => {
            warn!(turn, %anomaly, "Treasury does not reconcile with its ledger");
            false
        }
    };

    info!(
        turn,
        proposals = summary.rule_proposals,
        lies = summary.lies.len(),
        sanctions = summary.judiciary.issued.len(),
        elections = summary.elections.len(),
        skipped = summary.skipped.len(),
        common_pool = %summary.common_pool,
        "Governance turn complete"
    );

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use iigo_types::{
        Accountability, Ballot, Communication, ResourcesReport, SanctionTier, VariableFieldName,
        VariableValuePair,
    };
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::SimulationConfig;

    /// Always votes for a fixed candidate; asks for a fixed grant.
    struct Loyal {
        favourite: ClientId,
    }

    impl IslandClient for Loyal {
        fn vote_for_election(&mut self, _: Role, _: &[ClientId]) -> Option<Ballot> {
            Some(Ballot::single(self.favourite))
        }
        fn rule_proposal(&mut self) -> Option<String> {
            Some("share_fish".into())
        }
        fn common_pool_resource_request(&mut self) -> Option<Resources> {
            Some(dec!(10))
        }
        fn resource_report(&mut self) -> ResourcesReport {
            ResourcesReport {
                reported: true,
                amount: dec!(100),
            }
        }
        fn receive_communication(&mut self, _: &Communication) {}
    }

    fn setup(config: SimulationConfig) -> (GovernanceContext, ClientDirectory<Loyal>) {
        let islands: Vec<ClientId> = (0..3).map(ClientId).collect();
        let roles = [
            (Role::President, ClientId(0)),
            (Role::Judge, ClientId(1)),
            (Role::Speaker, ClientId(2)),
        ]
        .into();
        let directory = islands
            .iter()
            .map(|&id| (id, Loyal { favourite: ClientId(1) }))
            .collect();
        (GovernanceContext::new(config, &islands, roles).unwrap(), directory)
    }

    const NO_TRUST: &[f64] = &[];

    const UNMONITORED: MonitorResult = MonitorResult {
        performed: false,
        result: false,
    };

    #[test]
    fn turn_runs_every_phase() {
        let (mut ctx, mut islands) = setup(SimulationConfig::default());
        let summary = run_governance_turn(&mut ctx, &mut islands, 1, UNMONITORED, NO_TRUST).unwrap();

        assert_eq!(summary.turn, 1);
        assert_eq!(summary.rule_proposals, 3);
        assert_eq!(summary.allocation_requests, 3);
        assert_eq!(summary.rule_picked.as_deref(), Some("share_fish"));
        assert_eq!(summary.taxation.get(&ClientId(2)), Some(&dec!(10)));
        assert_eq!(summary.allocations.get(&ClientId(0)), Some(&dec!(10)));
        assert_eq!(summary.speaker_salary, dec!(50));
        assert!(summary.skipped.is_empty());
        assert!(summary.ledger_balanced);
        // 1000 - 6 charges of 10 - salary 50.
        assert_eq!(summary.common_pool, dec!(890));
        assert_eq!(ctx.turns_in_power(Role::President), 1);
        assert!(ctx.judiciary().history().turn(1).is_some());
    }

    #[test]
    fn failed_monitoring_replaces_the_president() {
        let (mut ctx, mut islands) = setup(SimulationConfig::default());
        let caught = MonitorResult {
            performed: true,
            result: false,
        };

        let summary = run_governance_turn(&mut ctx, &mut islands, 1, caught, NO_TRUST).unwrap();

        assert_eq!(summary.elections, vec![ElectionOutcome {
            role: Role::President,
            previous: Some(ClientId(0)),
            winner: ClientId(1),
        }]);
        assert_eq!(ctx.role_holder(Role::President), Some(ClientId(1)));
        assert_eq!(ctx.executive().seat().holder(), Some(ClientId(1)));
        assert_eq!(ctx.turns_in_power(Role::President), 1);
    }

    #[test]
    fn empty_pool_skips_actions_but_finishes_turn() {
        let mut config = SimulationConfig::default();
        config.treasury.initial_common_pool = Decimal::ZERO;
        let (mut ctx, mut islands) = setup(config);

        let summary = run_governance_turn(&mut ctx, &mut islands, 1, UNMONITORED, NO_TRUST).unwrap();

        assert_eq!(summary.skipped.len(), 6);
        assert!(summary.taxation.is_empty());
        assert_eq!(summary.common_pool, Decimal::ZERO);
        assert_eq!(ctx.last_turn(), Some(1));
    }

    #[test]
    fn turns_must_increase() {
        let (mut ctx, mut islands) = setup(SimulationConfig::default());
        assert!(run_governance_turn(&mut ctx, &mut islands, 2, UNMONITORED, NO_TRUST).is_ok());
        let again = run_governance_turn(&mut ctx, &mut islands, 2, UNMONITORED, NO_TRUST);
        assert!(matches!(again, Err(GovernanceError::TurnOutOfOrder { turn: 2, last: 2 })));
    }

    #[test]
    fn liars_are_sanctioned() {
        let (mut ctx, mut islands) = setup(SimulationConfig::default());
        ctx.record_accountability(
            1,
            Accountability {
                client_id: ClientId(2),
                pairs: vec![
                    VariableValuePair::new(VariableFieldName::IslandReportedPrivateResources, dec!(10)),
                    VariableValuePair::new(VariableFieldName::IslandActualPrivateResources, dec!(90)),
                    VariableValuePair::new(VariableFieldName::IslandTaxContribution, dec!(1)),
                    VariableValuePair::new(VariableFieldName::ExpectedTaxContribution, dec!(9)),
                ],
            },
        );

        let summary = run_governance_turn(&mut ctx, &mut islands, 1, UNMONITORED, NO_TRUST).unwrap();

        assert_eq!(summary.lies.get(&ClientId(2)), Some(&2));
        assert_eq!(summary.judiciary.issued.len(), 1);
        assert_eq!(ctx.judiciary().sanctions().active_tier(ClientId(2)), SanctionTier::Tier1);
    }
}
