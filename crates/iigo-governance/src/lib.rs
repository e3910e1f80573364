//! The IIGO governance layer: legislative, executive and judicial
//! institutions sharing a common pool of resources.
//!
//! Each turn the executive collects proposals and requests from the
//! islands, the judiciary turns accountability records into history,
//! sanctions and pardons, elections are called where monitoring or term
//! limits demand them, and the president broadcasts taxes, allocations and
//! the speaker's salary. Every institutional action is paid for from the
//! common pool through the treasury in `iigo-ledger`.
//!
//! # Architecture
//!
//! - [`accountability`] -- Accountability records, lie detection, and the history store
//! - [`client`] -- The [`IslandClient`] trait islands implement to take part
//! - [`config`] -- YAML configuration ([`SimulationConfig`])
//! - [`context`] -- [`GovernanceContext`], the owned state of one run
//! - [`election`] -- Election lifecycle and vote counting ([`Election`], [`tally`])
//! - [`error`] -- [`GovernanceError`] and [`SetupError`]
//! - [`executive`] -- Charged executive actions ([`Executive`])
//! - [`judiciary`] -- Election calls, sanctions, and pardons ([`Judiciary`])
//! - [`roles`] -- Presidential strategies ([`President`])
//! - [`turn`] -- The per-turn sequence ([`run_governance_turn`])

pub mod accountability;
pub mod client;
pub mod config;
pub mod context;
pub mod election;
pub mod error;
pub mod executive;
pub mod judiciary;
pub mod roles;
pub mod turn;

// Re-export primary types at crate root for convenience.
pub use accountability::{
    AccountabilityLedger, HistoryInfo, HistoryStore, HistorySummary, ValuePair, build_history_info,
};
pub use client::{ClientDirectory, IslandClient, PassiveIsland, living_islands};
pub use config::{ConfigError, PresidentStrategy, SimulationConfig};
pub use context::GovernanceContext;
pub use election::{Election, ElectionError, ElectionPhase, tally};
pub use error::{GovernanceError, SetupError};
pub use executive::{Executive, ExecutiveAction};
pub use judiciary::{
    ElectionSettings, Judiciary, JudiciaryOutcome, SanctionSchedule, TrustProvider,
    get_pardoned_islands,
};
pub use roles::{AusterityPresident, BasePresident, President, PresidentSeat, build_president};
pub use turn::{ElectionOutcome, SkippedAction, TurnSummary, hold_election, run_governance_turn};
