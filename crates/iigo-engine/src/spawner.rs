//! Scripted islands for driving the governance layer.
//!
//! At simulation start the spawner creates one [`ScriptedIsland`] per
//! configured island. Each island is either honest or dishonest, decided by
//! a seeded draw, and answers the governance layer's questions from its own
//! seeded generator so that a run is reproducible from its seed.
//!
//! Honest islands report their full private pool, pay the tax they are told
//! to pay and take exactly the allocation they are granted. Dishonest
//! islands under-report or withhold their report, pay half their tax and
//! take more than they were granted.

use std::collections::BTreeMap;

use iigo_governance::{ClientDirectory, IslandClient};
use iigo_types::{
    Ballot, ClientId, Communication, CommunicationContent, CommunicationFieldName, Resources,
    ResourcesReport, Role,
};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use tracing::info;

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Configuration for the island spawner, loaded from the `spawner`
/// section of `iigo-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpawnerConfig {
    /// Probability that a spawned island is dishonest.
    #[serde(default = "default_dishonest_share")]
    pub dishonest_share: f64,

    /// Amount each island asks of the common pool per turn.
    #[serde(default = "default_request_amount")]
    pub request_amount: Decimal,

    /// Probability that an island proposes a rule in a given turn.
    #[serde(default = "default_proposal_probability")]
    pub proposal_probability: f64,

    /// Probability that the president is audited in a given turn.
    #[serde(default = "default_monitoring_probability")]
    pub monitoring_probability: f64,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            dishonest_share: default_dishonest_share(),
            request_amount: default_request_amount(),
            proposal_probability: default_proposal_probability(),
            monitoring_probability: default_monitoring_probability(),
        }
    }
}

impl SpawnerConfig {
    /// Check that every probability lies in `[0, 1]` and the request is
    /// not negative.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Spawner`] naming the first bad field.
    pub fn validate(&self) -> Result<(), EngineError> {
        let probabilities = [
            ("dishonest_share", self.dishonest_share),
            ("proposal_probability", self.proposal_probability),
            ("monitoring_probability", self.monitoring_probability),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::Spawner {
                    message: format!("{field} must be within [0, 1], got {value}"),
                });
            }
        }
        if self.request_amount.is_sign_negative() {
            return Err(EngineError::Spawner {
                message: format!("request_amount must not be negative, got {}", self.request_amount),
            });
        }
        Ok(())
    }
}

const fn default_dishonest_share() -> f64 {
    0.25
}

const fn default_request_amount() -> Decimal {
    Decimal::from_parts(20, 0, 0, false, 0)
}

const fn default_proposal_probability() -> f64 {
    0.75
}

const fn default_monitoring_probability() -> f64 {
    0.2
}

// -----------------------------------------------------------------------
// Rule pool
// -----------------------------------------------------------------------

/// Rules islands draw their proposals from.
const RULE_POOL: &[&str] = &[
    "fishing_quota",
    "shared_granary",
    "disaster_relief_fund",
    "forest_rotation",
    "harbour_maintenance",
    "tax_holiday",
    "foraging_limits",
    "emergency_rationing",
];

/// Factor by which a dishonest island over-takes its allocation.
const OVERTAKE_FACTOR: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

// -----------------------------------------------------------------------
// Scripted island
// -----------------------------------------------------------------------

/// An island with a fixed honesty and seeded behaviour.
#[derive(Debug)]
pub struct ScriptedIsland {
    id: ClientId,
    honest: bool,
    rng: StdRng,
    request_amount: Resources,
    proposal_probability: f64,
    private_resources: Resources,
    last_report: Option<ResourcesReport>,
    resources_at_report: Resources,
    expected_tax: Resources,
    expected_allocation: Resources,
}

/// What an island was told, what it reported, and what it did, for one
/// turn's accountability record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// The report handed to the president, if any was requested.
    pub report: Option<ResourcesReport>,
    /// Private pool at the time of the report.
    pub resources_at_report: Resources,
    /// Tax the president set.
    pub expected_tax: Resources,
    /// Allocation the president granted.
    pub expected_allocation: Resources,
}

impl ScriptedIsland {
    /// Create an island. `seed` drives all of its choices.
    pub fn new(id: ClientId, honest: bool, seed: u64, config: &SpawnerConfig) -> Self {
        Self {
            id,
            honest,
            rng: StdRng::seed_from_u64(seed),
            request_amount: config.request_amount,
            proposal_probability: config.proposal_probability,
            private_resources: Decimal::ZERO,
            last_report: None,
            resources_at_report: Decimal::ZERO,
            expected_tax: Decimal::ZERO,
            expected_allocation: Decimal::ZERO,
        }
    }

    /// Whether the island plays straight.
    pub const fn is_honest(&self) -> bool {
        self.honest
    }

    /// Update the island's view of its private pool.
    pub const fn observe(&mut self, private_resources: Resources) {
        self.private_resources = private_resources;
    }

    /// Tax the island intends to pay against its expected tax.
    pub fn tax_due(&self) -> Resources {
        if self.honest {
            self.expected_tax
        } else {
            halve(self.expected_tax)
        }
    }

    /// Allocation the island intends to take against its grant.
    pub fn allocation_to_take(&self) -> Resources {
        if self.honest {
            self.expected_allocation
        } else {
            self.expected_allocation
                .saturating_mul(OVERTAKE_FACTOR)
                .round_dp_with_strategy(2, RoundingStrategy::ToZero)
        }
    }

    /// Hand over this turn's expectations and report, and clear them.
    pub fn settle(&mut self) -> Settlement {
        let settlement = Settlement {
            report: self.last_report.take(),
            resources_at_report: self.resources_at_report,
            expected_tax: self.expected_tax,
            expected_allocation: self.expected_allocation,
        };
        self.expected_tax = Decimal::ZERO;
        self.expected_allocation = Decimal::ZERO;
        settlement
    }
}

fn halve(amount: Resources) -> Resources {
    amount
        .checked_div(Decimal::TWO)
        .unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

impl IslandClient for ScriptedIsland {
    fn vote_for_election(&mut self, _role: Role, candidates: &[ClientId]) -> Option<Ballot> {
        let mut ranking = candidates.to_vec();
        ranking.shuffle(&mut self.rng);
        if !self.honest
            && let Some(position) = ranking.iter().position(|&c| c == self.id)
        {
            ranking.swap(0, position);
        }
        Some(Ballot::ranked(ranking))
    }

    fn rule_proposal(&mut self) -> Option<String> {
        if !self.rng.random_bool(self.proposal_probability) {
            return None;
        }
        RULE_POOL.choose(&mut self.rng).map(|&rule| rule.to_owned())
    }

    fn common_pool_resource_request(&mut self) -> Option<Resources> {
        let amount = if self.honest {
            self.request_amount
        } else {
            self.request_amount.saturating_mul(Decimal::TWO)
        };
        (amount > Decimal::ZERO).then_some(amount)
    }

    fn resource_report(&mut self) -> ResourcesReport {
        let report = if self.honest {
            ResourcesReport {
                reported: true,
                amount: self.private_resources,
            }
        } else if self.rng.random_bool(0.5) {
            ResourcesReport::default()
        } else {
            ResourcesReport {
                reported: true,
                amount: halve(self.private_resources),
            }
        };
        self.last_report = Some(report);
        self.resources_at_report = self.private_resources;
        report
    }

    fn receive_communication(&mut self, communication: &Communication) {
        for (field, content) in &communication.content {
            let CommunicationContent::Amount(amount) = content else {
                continue;
            };
            match field {
                CommunicationFieldName::TaxAmount => self.expected_tax = *amount,
                CommunicationFieldName::AllocationAmount => self.expected_allocation = *amount,
                CommunicationFieldName::RuleName => {}
            }
        }
    }
}

// -----------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------

/// The islands and the initial holder of each role.
#[derive(Debug)]
pub struct SpawnResult {
    /// Every island, keyed by identifier.
    pub directory: ClientDirectory<ScriptedIsland>,
    /// Initial role-holders.
    pub role_holders: BTreeMap<Role, ClientId>,
}

/// Spawn `count` islands from `seed`.
///
/// Island `i` gets identifier `i`. The president, judge and speaker start
/// as islands 0, 1 and 2, wrapping around when there are fewer islands.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if `count` is zero or the
/// configuration is out of range.
pub fn spawn_islands(
    count: u32,
    seed: u64,
    config: &SpawnerConfig,
) -> Result<SpawnResult, EngineError> {
    config.validate()?;
    if count == 0 {
        return Err(EngineError::Spawner {
            message: String::from("at least one island is required"),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut directory: ClientDirectory<ScriptedIsland> = BTreeMap::new();
    for index in 0..count {
        let id = ClientId(index);
        let honest = !rng.random_bool(config.dishonest_share);
        let island_seed = seed.wrapping_add(u64::from(index)).wrapping_add(1);
        directory.insert(id, ScriptedIsland::new(id, honest, island_seed, config));
    }

    let role_holders = Role::ALL
        .iter()
        .zip(0_u32..)
        .map(|(&role, offset)| (role, ClientId(offset.checked_rem(count).unwrap_or(0))))
        .collect();

    let dishonest = directory.values().filter(|island| !island.is_honest()).count();
    info!(islands = count, dishonest, "Islands spawned");

    Ok(SpawnResult {
        directory,
        role_holders,
    })
}
