//! The simulation loop: island economy plus one governance turn per turn.
//!
//! Each turn runs in two halves:
//!
//! 1. **Economy** -- every island earns its income, pays the tax it was
//!    told to pay last turn, takes the allocation it was granted, and an
//!    accountability record comparing what it did with what it was told is
//!    filed for the turn.
//! 2. **Governance** -- the president may be audited, trust scores are
//!    derived from each island's lie record, and
//!    [`run_governance_turn`] runs the institutions.
//!
//! Randomness comes from generators seeded from the run seed, so the same
//! configuration always produces the same run.

use std::collections::BTreeMap;

use iigo_governance::{
    ClientDirectory, GovernanceContext, SimulationConfig, TurnSummary, run_governance_turn,
};
use iigo_types::{
    Accountability, ClientId, MonitorResult, Resources, Role, VariableFieldName,
    VariableValuePair,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::spawner::{ScriptedIsland, Settlement, SpawnerConfig, spawn_islands};

/// Totals over a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    /// Turns completed.
    pub turns: u64,
    /// Elections held.
    pub elections: usize,
    /// Sanctions issued.
    pub sanctions: usize,
    /// Sanctions removed by pardon.
    pub pardons: usize,
    /// Executive actions skipped.
    pub skipped_actions: usize,
    /// Turns whose treasury failed to reconcile.
    pub unbalanced_turns: u64,
    /// Common pool at the end of the run.
    pub final_common_pool: Resources,
    /// President at the end of the run.
    pub president: Option<ClientId>,
}

/// A running simulation.
#[derive(Debug)]
pub struct Simulation {
    context: GovernanceContext,
    islands: ClientDirectory<ScriptedIsland>,
    rng: StdRng,
    monitoring_probability: f64,
}

impl Simulation {
    /// Spawn the islands and build the governance context.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if spawning or context setup fails.
    pub fn new(config: SimulationConfig, spawner: &SpawnerConfig) -> Result<Self, EngineError> {
        let seed = config.simulation.seed;
        let spawned = spawn_islands(config.simulation.islands, seed, spawner)?;
        let ids: Vec<ClientId> = spawned.directory.keys().copied().collect();
        let context = GovernanceContext::new(config, &ids, spawned.role_holders)?;

        let mut simulation = Self {
            context,
            islands: spawned.directory,
            rng: StdRng::seed_from_u64(seed.rotate_left(17)),
            monitoring_probability: spawner.monitoring_probability,
        };
        simulation.observe_pools();
        Ok(simulation)
    }

    /// The governance state.
    pub const fn context(&self) -> &GovernanceContext {
        &self.context
    }

    /// The islands.
    pub const fn islands(&self) -> &ClientDirectory<ScriptedIsland> {
        &self.islands
    }

    /// Run every configured turn and report the totals.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on the first turn that fails.
    pub fn run(&mut self) -> Result<SimulationReport, EngineError> {
        let turns = self.context.config().simulation.turns;
        let mut report = SimulationReport::default();

        for turn in 1..=turns {
            let summary = self.step(turn)?;
            report.turns = turn;
            report.elections = report.elections.saturating_add(summary.elections.len());
            report.sanctions = report.sanctions.saturating_add(summary.judiciary.issued.len());
            report.pardons = report.pardons.saturating_add(summary.judiciary.pardoned);
            report.skipped_actions = report.skipped_actions.saturating_add(summary.skipped.len());
            if !summary.ledger_balanced {
                report.unbalanced_turns = report.unbalanced_turns.saturating_add(1);
            }
        }

        report.final_common_pool = self.context.treasury().common_pool();
        report.president = self.context.role_holder(Role::President);
        Ok(report)
    }

    /// Run one turn: the island economy, then governance.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if a resource movement or the governance
    /// turn fails.
    pub fn step(&mut self, turn: u64) -> Result<TurnSummary, EngineError> {
        self.settle_economy(turn)?;

        let monitoring = self.monitor_president();
        let trust = self.trust_scores(turn);
        let summary = run_governance_turn(
            &mut self.context,
            &mut self.islands,
            turn,
            monitoring,
            &trust,
        )?;
        self.observe_pools();

        debug!(
            turn,
            rule = summary.rule_picked.as_deref().unwrap_or("-"),
            taxed = summary.taxation.len(),
            granted = summary.allocations.len(),
            "Turn finished"
        );
        Ok(summary)
    }

    fn settle_economy(&mut self, turn: u64) -> Result<(), EngineError> {
        let income = self.context.config().treasury.income_per_turn;

        for (&id, island) in &mut self.islands {
            let treasury = self.context.treasury_mut();
            if income > Decimal::ZERO {
                treasury.credit_private_pool(turn, id, income)?;
            }

            let tax_paid = island.tax_due().min(treasury.private_pool(id));
            if tax_paid > Decimal::ZERO {
                treasury.collect_tax(turn, id, tax_paid)?;
            }

            let taken = island.allocation_to_take().min(treasury.common_pool());
            if taken > Decimal::ZERO {
                treasury.allocate(turn, id, taken)?;
            }

            island.observe(treasury.private_pool(id));
            let settlement = island.settle();
            if let Some(record) = accountability_record(id, &settlement, tax_paid, taken) {
                self.context.record_accountability(turn, record);
            }
        }
        Ok(())
    }

    fn monitor_president(&mut self) -> MonitorResult {
        if !self.rng.random_bool(self.monitoring_probability) {
            return MonitorResult::default();
        }
        let compliant = self
            .context
            .role_holder(Role::President)
            .and_then(|president| self.islands.get(&president))
            .is_some_and(ScriptedIsland::is_honest);
        if !compliant {
            warn!(president = ?self.context.role_holder(Role::President), "President failed audit");
        }
        MonitorResult {
            performed: true,
            result: compliant,
        }
    }

    /// Share of turns so far in which each island told no lie.
    fn trust_scores(&self, turn: u64) -> BTreeMap<ClientId, f64> {
        let turns = f64::from(u32::try_from(turn).unwrap_or(u32::MAX).max(1));
        let lies = self.context.accountability().lie_totals();
        self.islands
            .keys()
            .map(|id| {
                let lied = f64::from(lies.get(id).copied().unwrap_or(0));
                (*id, (1.0 - lied / turns).clamp(0.0, 1.0))
            })
            .collect()
    }

    fn observe_pools(&mut self) {
        let treasury = self.context.treasury();
        for (id, island) in &mut self.islands {
            island.observe(treasury.private_pool(*id));
        }
    }
}

/// Build the accountability record for one island's settlement. Islands
/// that were asked for nothing last turn produce no record.
fn accountability_record(
    id: ClientId,
    settlement: &Settlement,
    tax_paid: Resources,
    taken: Resources,
) -> Option<Accountability> {
    let report = settlement.report?;
    let mut pairs = vec![VariableValuePair::new(
        VariableFieldName::HasIslandReportPrivateResources,
        if report.reported { Decimal::ONE } else { Decimal::ZERO },
    )];
    if report.reported {
        pairs.push(VariableValuePair::new(
            VariableFieldName::IslandReportedPrivateResources,
            report.amount,
        ));
        pairs.push(VariableValuePair::new(
            VariableFieldName::IslandActualPrivateResources,
            settlement.resources_at_report,
        ));
    }
    pairs.extend([
        VariableValuePair::new(VariableFieldName::IslandTaxContribution, tax_paid),
        VariableValuePair::new(VariableFieldName::ExpectedTaxContribution, settlement.expected_tax),
        VariableValuePair::new(VariableFieldName::IslandAllocation, taken),
        VariableValuePair::new(VariableFieldName::ExpectedAllocation, settlement.expected_allocation),
    ]);
    Some(Accountability {
        client_id: id,
        pairs,
    })
}

/// Log the outcome of a run.
pub fn log_simulation_end(report: &SimulationReport) {
    info!(
        turns = report.turns,
        elections = report.elections,
        sanctions = report.sanctions,
        pardons = report.pardons,
        skipped_actions = report.skipped_actions,
        final_common_pool = %report.final_common_pool,
        president = ?report.president,
        "Simulation complete"
    );
    if report.unbalanced_turns > 0 {
        warn!(unbalanced_turns = report.unbalanced_turns, "Treasury failed to reconcile");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use iigo_types::ResourcesReport;
    use rust_decimal_macros::dec;

    use super::*;

    fn config(turns: u64) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.simulation.turns = turns;
        config.simulation.islands = 5;
        config
    }

    #[test]
    fn run_completes_with_balanced_books() {
        let mut simulation = Simulation::new(config(8), &SpawnerConfig::default()).unwrap();
        let report = simulation.run().unwrap();

        assert_eq!(report.turns, 8);
        assert_eq!(report.unbalanced_turns, 0);
        assert_eq!(simulation.context().last_turn(), Some(8));
        assert_eq!(simulation.context().judiciary().history().len(), 8);
    }

    #[test]
    fn same_seed_same_run() {
        let first = Simulation::new(config(6), &SpawnerConfig::default()).unwrap().run().unwrap();
        let second = Simulation::new(config(6), &SpawnerConfig::default()).unwrap().run().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn honest_islands_are_never_sanctioned() {
        let spawner = SpawnerConfig {
            dishonest_share: 0.0,
            ..SpawnerConfig::default()
        };
        let mut simulation = Simulation::new(config(6), &spawner).unwrap();
        let report = simulation.run().unwrap();

        assert_eq!(report.sanctions, 0);
        assert!(simulation.context().accountability().lie_totals().is_empty());
    }

    #[test]
    fn dishonest_islands_accumulate_lies() {
        let spawner = SpawnerConfig {
            dishonest_share: 1.0,
            monitoring_probability: 0.0,
            ..SpawnerConfig::default()
        };
        let mut simulation = Simulation::new(config(4), &spawner).unwrap();
        simulation.run().unwrap();

        let totals = simulation.context().accountability().lie_totals();
        assert_eq!(totals.len(), 5);
        assert!(totals.values().all(|&lies| lies >= 2));
    }

    #[test]
    fn first_turn_files_no_records() {
        let mut simulation = Simulation::new(config(1), &SpawnerConfig::default()).unwrap();
        simulation.step(1).unwrap();
        assert!(simulation.context().accountability().records_for_turn(1).is_empty());
    }

    #[test]
    fn record_compares_instruction_with_action() {
        let settlement = Settlement {
            report: Some(ResourcesReport {
                reported: true,
                amount: dec!(40),
            }),
            resources_at_report: dec!(80),
            expected_tax: dec!(8),
            expected_allocation: dec!(10),
        };
        let record = accountability_record(ClientId(3), &settlement, dec!(4), dec!(15)).unwrap();
        assert_eq!(record.client_id, ClientId(3));
        assert_eq!(record.pairs.len(), 7);

        let unreported = Settlement {
            report: Some(ResourcesReport::default()),
            ..settlement
        };
        let record = accountability_record(ClientId(3), &unreported, dec!(4), dec!(15)).unwrap();
        assert_eq!(record.pairs.len(), 5);

        let silent = Settlement {
            report: None,
            ..settlement
        };
        assert!(accountability_record(ClientId(3), &silent, dec!(4), dec!(15)).is_none());
    }
}
