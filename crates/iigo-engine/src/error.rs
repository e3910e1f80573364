//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and simulation execution.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: iigo_governance::ConfigError,
    },

    /// The governance context could not be built.
    #[error("setup error: {source}")]
    Setup {
        /// The underlying setup error.
        #[from]
        source: iigo_governance::SetupError,
    },

    /// A governance turn failed.
    #[error("governance error: {source}")]
    Governance {
        /// The underlying governance error.
        #[from]
        source: iigo_governance::GovernanceError,
    },

    /// Moving resources outside governance failed.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: iigo_ledger::LedgerError,
    },

    /// Island spawning failed.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },
}
