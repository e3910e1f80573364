//! Engine binary for the IIGO governance simulation.
//!
//! Wires scripted islands to the governance layer and runs the configured
//! number of turns.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `iigo-config.yaml` (or the path given as the
//!    first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Spawn scripted islands and build the governance context
//! 4. Run the simulation loop
//! 5. Log the result

mod error;
mod simulation;
mod spawner;

use std::path::{Path, PathBuf};

use iigo_governance::SimulationConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::simulation::Simulation;
use crate::spawner::SpawnerConfig;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "iigo-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    // 1. Load configuration.
    let config = load_config(&config_path)?;
    let spawner_config = load_spawner_config(&config_path)?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        path = %config_path.display(),
        found = config_path.exists(),
        islands = config.simulation.islands,
        turns = config.simulation.turns,
        seed = config.simulation.seed,
        "Configuration loaded"
    );
    info!(
        dishonest_share = spawner_config.dishonest_share,
        monitoring_probability = spawner_config.monitoring_probability,
        "Spawner configuration loaded"
    );

    // 3. Spawn islands and build the governance context.
    let mut simulation = Simulation::new(config, &spawner_config)?;
    info!(
        islands = simulation.islands().len(),
        common_pool = %simulation.context().treasury().common_pool(),
        "Simulation state assembled, entering turn loop"
    );

    // 4. Run the simulation.
    let report = simulation.run()?;

    // 5. Log results.
    simulation::log_simulation_end(&report);
    info!("iigo-engine shutdown complete");

    Ok(())
}

/// Load the simulation configuration from `path`, or the defaults if the
/// file does not exist.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        Ok(SimulationConfig::default())
    }
}

/// Load the `spawner` section of the config file at `path`.
///
/// If the file does not exist or lacks the `spawner` key, defaults are used.
fn load_spawner_config(path: &Path) -> Result<SpawnerConfig, EngineError> {
    if !path.exists() {
        return Ok(SpawnerConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Spawner {
        message: format!("failed to read config file: {e}"),
    })?;

    // Parse the full YAML and extract just the "spawner" section.
    let raw: serde_yml::Value = serde_yml::from_str(&contents).map_err(|e| EngineError::Spawner {
        message: format!("failed to parse config YAML: {e}"),
    })?;

    match raw.get("spawner") {
        Some(section) => {
            serde_yml::from_value(section.clone()).map_err(|e| EngineError::Spawner {
                message: format!("failed to parse spawner config: {e}"),
            })
        }
        None => Ok(SpawnerConfig::default()),
    }
}
