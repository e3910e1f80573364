//! Configuration loading and typed config structures for the governance
//! simulation.
//!
//! The canonical configuration lives in `iigo-config.yaml` at the project
//! root. Every field has a default, so a partial file (or none at all) is
//! valid. Range checks run in [`SimulationConfig::validate`], which the
//! [`GovernanceContext`](crate::GovernanceContext) calls before the first
//! turn.

use std::collections::BTreeMap;
use std::path::Path;

use iigo_types::{Role, SanctionTier, VotingMethod};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::SetupError;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `iigo-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Run length, island count and seed.
    #[serde(default)]
    pub simulation: RunConfig,

    /// Starting balances and per-turn income.
    #[serde(default)]
    pub treasury: TreasuryConfig,

    /// Service charge for each executive action.
    #[serde(default)]
    pub action_costs: ActionCostsConfig,

    /// Term limits and election settings.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Sanction and pardon policy.
    #[serde(default)]
    pub judiciary: JudiciaryConfig,

    /// Presidential strategy and amounts.
    #[serde(default)]
    pub president: PresidentConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Check every value that has a restricted range.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.simulation.islands == 0 {
            return Err(invalid("simulation.islands", "must be at least 1"));
        }

        for (field, amount) in [
            ("treasury.initial_common_pool", self.treasury.initial_common_pool),
            ("treasury.initial_private_resources", self.treasury.initial_private_resources),
            ("treasury.income_per_turn", self.treasury.income_per_turn),
            ("president.speaker_salary", self.president.speaker_salary),
            ("president.unreported_tax", self.president.unreported_tax),
        ] {
            if amount.is_sign_negative() {
                return Err(invalid(field, "must not be negative"));
            }
        }

        if self.action_costs.all().iter().any(Decimal::is_sign_negative) {
            return Err(invalid("action_costs", "costs must not be negative"));
        }

        self.judiciary.sanction_thresholds.validate()?;

        let trust = self.judiciary.pardon.trust_threshold;
        if !(0.0..=1.0).contains(&trust) {
            return Err(invalid("judiciary.pardon.trust_threshold", "must lie within [0, 1]"));
        }
        if self.judiciary.pardon.disqualifying_tier == SanctionTier::NoSanction {
            return Err(invalid(
                "judiciary.pardon.disqualifying_tier",
                "must be a punishable tier",
            ));
        }
        if self.judiciary.pardon.blocking_tier == SanctionTier::NoSanction {
            return Err(invalid("judiciary.pardon.blocking_tier", "must be a punishable tier"));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> SetupError {
    SetupError::InvalidConfig {
        field,
        reason: reason.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Number of islands taking part.
    #[serde(default = "default_islands")]
    pub islands: u32,

    /// Number of turns to run.
    #[serde(default = "default_turns")]
    pub turns: u64,

    /// Random seed for scripted island behaviour.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            islands: default_islands(),
            turns: default_turns(),
            seed: default_seed(),
        }
    }
}

const fn default_islands() -> u32 {
    6
}

const fn default_turns() -> u64 {
    20
}

const fn default_seed() -> u64 {
    42
}

// ---------------------------------------------------------------------------
// Treasury
// ---------------------------------------------------------------------------

/// Starting balances.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreasuryConfig {
    /// Common pool balance before the first turn.
    #[serde(default = "default_initial_common_pool")]
    pub initial_common_pool: Decimal,

    /// Private pool each island starts with.
    #[serde(default = "default_initial_private_resources")]
    pub initial_private_resources: Decimal,

    /// Income credited to each island's private pool every turn.
    #[serde(default = "default_income_per_turn")]
    pub income_per_turn: Decimal,

    /// Starting budget figure per role.
    #[serde(default = "default_role_budgets")]
    pub role_budgets: BTreeMap<Role, Decimal>,
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            initial_common_pool: default_initial_common_pool(),
            initial_private_resources: default_initial_private_resources(),
            income_per_turn: default_income_per_turn(),
            role_budgets: default_role_budgets(),
        }
    }
}

const fn default_initial_common_pool() -> Decimal {
    Decimal::from_parts(1000, 0, 0, false, 0)
}

const fn default_initial_private_resources() -> Decimal {
    Decimal::from_parts(100, 0, 0, false, 0)
}

const fn default_income_per_turn() -> Decimal {
    Decimal::from_parts(20, 0, 0, false, 0)
}

fn default_role_budgets() -> BTreeMap<Role, Decimal> {
    Role::ALL
        .iter()
        .map(|&role| (role, Decimal::ONE_HUNDRED))
        .collect()
}

// ---------------------------------------------------------------------------
// Action costs
// ---------------------------------------------------------------------------

/// Service charge burned from the common pool for each executive action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionCostsConfig {
    /// Asking islands for rule proposals.
    #[serde(default = "default_action_cost")]
    pub request_rule_proposals: Decimal,

    /// Asking islands for allocation requests.
    #[serde(default = "default_action_cost")]
    pub request_allocation_requests: Decimal,

    /// Picking a rule for the speaker.
    #[serde(default = "default_action_cost")]
    pub pick_rule: Decimal,

    /// Broadcasting the tax map.
    #[serde(default = "default_action_cost")]
    pub broadcast_taxation: Decimal,

    /// Answering allocation requests.
    #[serde(default = "default_action_cost")]
    pub reply_allocation_requests: Decimal,

    /// Running the speaker election.
    #[serde(default = "default_action_cost")]
    pub appoint_next_speaker: Decimal,

    /// Paying the speaker.
    #[serde(default = "default_action_cost")]
    pub pay_speaker: Decimal,
}

impl ActionCostsConfig {
    /// Every configured cost, in declaration order.
    pub const fn all(&self) -> [Decimal; 7] {
        [
            self.request_rule_proposals,
            self.request_allocation_requests,
            self.pick_rule,
            self.broadcast_taxation,
            self.reply_allocation_requests,
            self.appoint_next_speaker,
            self.pay_speaker,
        ]
    }
}

impl Default for ActionCostsConfig {
    fn default() -> Self {
        Self {
            request_rule_proposals: default_action_cost(),
            request_allocation_requests: default_action_cost(),
            pick_rule: default_action_cost(),
            broadcast_taxation: default_action_cost(),
            reply_allocation_requests: default_action_cost(),
            appoint_next_speaker: default_action_cost(),
            pay_speaker: default_action_cost(),
        }
    }
}

const fn default_action_cost() -> Decimal {
    Decimal::TEN
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Term limits and election settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RulesConfig {
    /// Whether the term-limit election rule is in force.
    #[serde(default = "default_true")]
    pub election_rule_in_play: bool,

    /// Turns each role may serve before the term-limit rule calls an
    /// election.
    #[serde(default)]
    pub term_lengths: TermLengths,

    /// Aggregation rule for role elections.
    #[serde(default)]
    pub voting_method: VotingMethod,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            election_rule_in_play: true,
            term_lengths: TermLengths::default(),
            voting_method: VotingMethod::default(),
        }
    }
}

/// Term length per role, in turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TermLengths {
    /// President term length.
    #[serde(default = "default_term_length")]
    pub president: u64,
    /// Judge term length.
    #[serde(default = "default_term_length")]
    pub judge: u64,
    /// Speaker term length.
    #[serde(default = "default_term_length")]
    pub speaker: u64,
}

impl TermLengths {
    /// Term length for the given role.
    pub const fn for_role(&self, role: Role) -> u64 {
        match role {
            Role::President => self.president,
            Role::Judge => self.judge,
            Role::Speaker => self.speaker,
        }
    }
}

impl Default for TermLengths {
    fn default() -> Self {
        Self {
            president: default_term_length(),
            judge: default_term_length(),
            speaker: default_term_length(),
        }
    }
}

const fn default_term_length() -> u64 {
    5
}

const fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Judiciary
// ---------------------------------------------------------------------------

/// Sanction and pardon policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JudiciaryConfig {
    /// Lie-count thresholds for each sanction tier.
    #[serde(default)]
    pub sanction_thresholds: SanctionThresholds,

    /// Turns a newly issued sanction stays in force.
    #[serde(default = "default_sanction_length")]
    pub sanction_length: u32,

    /// Pardon eligibility policy.
    #[serde(default)]
    pub pardon: PardonPolicy,
}

impl Default for JudiciaryConfig {
    fn default() -> Self {
        Self {
            sanction_thresholds: SanctionThresholds::default(),
            sanction_length: default_sanction_length(),
            pardon: PardonPolicy::default(),
        }
    }
}

const fn default_sanction_length() -> u32 {
    2
}

/// Minimum accumulated lie count for each punishable tier.
///
/// Thresholds must be strictly ascending from `tier1` to `tier5`, and
/// `tier1` must be at least 1 so that honest islands are never sanctioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SanctionThresholds {
    /// Lies needed for [`SanctionTier::Tier1`].
    #[serde(default = "default_tier1")]
    pub tier1: u32,
    /// Lies needed for [`SanctionTier::Tier2`].
    #[serde(default = "default_tier2")]
    pub tier2: u32,
    /// Lies needed for [`SanctionTier::Tier3`].
    #[serde(default = "default_tier3")]
    pub tier3: u32,
    /// Lies needed for [`SanctionTier::Tier4`].
    #[serde(default = "default_tier4")]
    pub tier4: u32,
    /// Lies needed for [`SanctionTier::Tier5`].
    #[serde(default = "default_tier5")]
    pub tier5: u32,
}

impl SanctionThresholds {
    /// Map an accumulated lie count onto a tier.
    pub const fn tier_for(&self, lies: u32) -> SanctionTier {
        if lies >= self.tier5 {
            SanctionTier::Tier5
        } else if lies >= self.tier4 {
            SanctionTier::Tier4
        } else if lies >= self.tier3 {
            SanctionTier::Tier3
        } else if lies >= self.tier2 {
            SanctionTier::Tier2
        } else if lies >= self.tier1 {
            SanctionTier::Tier1
        } else {
            SanctionTier::NoSanction
        }
    }

    fn validate(&self) -> Result<(), SetupError> {
        if self.tier1 == 0 {
            return Err(invalid("judiciary.sanction_thresholds.tier1", "must be at least 1"));
        }
        let ascending = self.tier1 < self.tier2
            && self.tier2 < self.tier3
            && self.tier3 < self.tier4
            && self.tier4 < self.tier5;
        if !ascending {
            return Err(invalid(
                "judiciary.sanction_thresholds",
                "thresholds must be strictly ascending",
            ));
        }
        Ok(())
    }
}

impl Default for SanctionThresholds {
    fn default() -> Self {
        Self {
            tier1: default_tier1(),
            tier2: default_tier2(),
            tier3: default_tier3(),
            tier4: default_tier4(),
            tier5: default_tier5(),
        }
    }
}

const fn default_tier1() -> u32 {
    1
}

const fn default_tier2() -> u32 {
    5
}

const fn default_tier3() -> u32 {
    10
}

const fn default_tier4() -> u32 {
    20
}

const fn default_tier5() -> u32 {
    30
}

/// Who may be pardoned.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PardonPolicy {
    /// Trust must be strictly greater than this to qualify.
    #[serde(default = "default_trust_threshold")]
    pub trust_threshold: f64,

    /// Sanctions at or above this tier are never pardoned.
    #[serde(default = "default_severe_tier")]
    pub disqualifying_tier: SanctionTier,

    /// A sanction at or above this tier blocks every other pardon in the
    /// same round.
    #[serde(default = "default_severe_tier")]
    pub blocking_tier: SanctionTier,
}

impl Default for PardonPolicy {
    fn default() -> Self {
        Self {
            trust_threshold: default_trust_threshold(),
            disqualifying_tier: default_severe_tier(),
            blocking_tier: default_severe_tier(),
        }
    }
}

const fn default_trust_threshold() -> f64 {
    0.6
}

const fn default_severe_tier() -> SanctionTier {
    SanctionTier::Tier4
}

// ---------------------------------------------------------------------------
// President
// ---------------------------------------------------------------------------

/// Which presidential strategy the seat is filled with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresidentStrategy {
    /// Generous allocations, light taxation.
    #[default]
    Base,
    /// Tight allocations, heavier taxation, reduced salary.
    Austerity,
}

/// Presidential amounts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresidentConfig {
    /// Strategy used for every elected president.
    #[serde(default)]
    pub strategy: PresidentStrategy,

    /// Salary the president pays the speaker each turn.
    #[serde(default = "default_speaker_salary")]
    pub speaker_salary: Decimal,

    /// Tax charged to islands that did not report their resources.
    #[serde(default = "default_unreported_tax")]
    pub unreported_tax: Decimal,
}

impl Default for PresidentConfig {
    fn default() -> Self {
        Self {
            strategy: PresidentStrategy::default(),
            speaker_salary: default_speaker_salary(),
            unreported_tax: default_unreported_tax(),
        }
    }
}

const fn default_speaker_salary() -> Decimal {
    Decimal::from_parts(50, 0, 0, false, 0)
}

const fn default_unreported_tax() -> Decimal {
    Decimal::from_parts(15, 0, 0, false, 0)
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = SimulationConfig::parse("{}").ok();
        assert_eq!(config, Some(SimulationConfig::default()));
    }

    #[test]
    fn defaults_are_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = r"
rules:
  election_rule_in_play: false
  term_lengths:
    president: 3
  voting_method: borda_count
judiciary:
  pardon:
    trust_threshold: 0.8
    blocking_tier: tier5
president:
  strategy: austerity
  speaker_salary: 20
";
        let config = SimulationConfig::parse(yaml).unwrap_or_default();
        assert!(!config.rules.election_rule_in_play);
        assert_eq!(config.rules.term_lengths.president, 3);
        assert_eq!(config.rules.term_lengths.judge, 5);
        assert_eq!(config.rules.voting_method, VotingMethod::BordaCount);
        assert!((config.judiciary.pardon.trust_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.judiciary.pardon.blocking_tier, SanctionTier::Tier5);
        assert_eq!(config.judiciary.pardon.disqualifying_tier, SanctionTier::Tier4);
        assert_eq!(config.president.strategy, PresidentStrategy::Austerity);
        assert_eq!(config.president.speaker_salary, dec!(20));
        assert_eq!(config.action_costs.pay_speaker, dec!(10));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(SimulationConfig::parse("rules: [not, a, map").is_err());
    }

    #[test]
    fn thresholds_map_lies_to_tiers() {
        let thresholds = SanctionThresholds::default();
        assert_eq!(thresholds.tier_for(0), SanctionTier::NoSanction);
        assert_eq!(thresholds.tier_for(1), SanctionTier::Tier1);
        assert_eq!(thresholds.tier_for(5), SanctionTier::Tier2);
        assert_eq!(thresholds.tier_for(19), SanctionTier::Tier3);
        assert_eq!(thresholds.tier_for(20), SanctionTier::Tier4);
        assert_eq!(thresholds.tier_for(500), SanctionTier::Tier5);
    }

    #[test]
    fn non_ascending_thresholds_rejected() {
        let mut config = SimulationConfig::default();
        config.judiciary.sanction_thresholds.tier3 = 4;
        assert!(matches!(
            config.validate(),
            Err(SetupError::InvalidConfig { field: "judiciary.sanction_thresholds", .. })
        ));
    }

    #[test]
    fn out_of_range_trust_rejected() {
        let mut config = SimulationConfig::default();
        config.judiciary.pardon.trust_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_cost_rejected() {
        let mut config = SimulationConfig::default();
        config.action_costs.pick_rule = dec!(-1);
        assert!(config.validate().is_err());
    }
}
