use crate::sim_params::{SimulationParameters, DEFAULT_COLUMNS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Reasons a set of construction parameters is rejected before an engine exists.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("missing required value: {0}")]
    Missing(&'static str),
    #[error("population size must be at least 1")]
    EmptyPopulation,
    #[error("grid must have at least one column")]
    ZeroColumns,
    #[error("tick interval must be a positive number of seconds, got {0}")]
    InvalidTickInterval(f64),
    #[error("initial sick index {index} is outside a population of {population_size}")]
    InitialSickOutOfRange { index: usize, population_size: usize },
}

// Population size and layout
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PopulationConfig {
    pub size: usize,
    #[serde(default = "default_columns")]
    pub columns: usize,
}

// Spreading rule
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SpreadConfig {
    pub infection_spread_factor: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

// Clock settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub tick_interval_secs: f64,
    /// Stop the command-line run after this many ticks. Runs to saturation when absent.
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

// Cells infected before the clock starts, standing in for user taps
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct InitialConditions {
    #[serde(default)]
    pub initial_sick: Vec<usize>,
}

/// Main simulation configuration structure, loaded from a TOML file.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub population: PopulationConfig,
    pub spread: SpreadConfig,
    pub timing: TimingConfig,
    #[serde(default)]
    pub initial_conditions: InitialConditions,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file '{}'", path_ref.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file '{}'", path_ref.display()))
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig =
            toml::from_str(text).context("Failed to parse simulation config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field that `sim_params` would reject, plus the initial sick list.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let params = self.sim_params()?;
        if let Some(&index) = self
            .initial_conditions
            .initial_sick
            .iter()
            .find(|&&index| index >= params.population_size())
        {
            return Err(ConfigurationError::InitialSickOutOfRange {
                index,
                population_size: params.population_size(),
            });
        }
        Ok(())
    }

    /// Converts the configuration into the parameters an engine is built from.
    pub fn sim_params(&self) -> Result<SimulationParameters, ConfigurationError> {
        let params = SimulationParameters::new(
            self.population.size,
            self.spread.infection_spread_factor,
            self.timing.tick_interval_secs,
        )?
        .with_columns(self.population.columns)?;

        Ok(match self.spread.seed {
            Some(seed) => params.with_seed(seed),
            None => params,
        })
    }
}

fn default_columns() -> usize {
    DEFAULT_COLUMNS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const FULL: &str = r#"
        [population]
        size = 40
        columns = 8

        [spread]
        infection_spread_factor = 3
        seed = 7

        [timing]
        tick_interval_secs = 0.25
        max_ticks = 12

        [initial_conditions]
        initial_sick = [0, 39]
    "#;

    #[test]
    fn parses_full_config() {
        let config = SimulationConfig::from_toml_str(FULL).unwrap();
        let params = config.sim_params().unwrap();
        assert_eq!(params.population_size(), 40);
        assert_eq!(params.columns(), 8);
        assert_eq!(params.infection_spread_factor(), 3);
        assert_eq!(params.seed(), Some(7));
        assert_eq!(params.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.timing.max_ticks, Some(12));
        assert_eq!(config.initial_conditions.initial_sick, vec![0, 39]);
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [population]
            size = 5
            [spread]
            infection_spread_factor = 0
            [timing]
            tick_interval_secs = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(config.population.columns, DEFAULT_COLUMNS);
        assert_eq!(config.spread.seed, None);
        assert_eq!(config.timing.max_ticks, None);
        assert!(config.initial_conditions.initial_sick.is_empty());
    }

    #[test]
    fn rejects_out_of_range_initial_sick() {
        let text = FULL.replace("[0, 39]", "[0, 40]");
        let err = SimulationConfig::from_toml_str(&text).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::InitialSickOutOfRange {
                index: 40,
                population_size: 40
            })
        );
    }

    #[test]
    fn rejects_zero_population() {
        let text = FULL.replace("size = 40", "size = 0");
        let err = SimulationConfig::from_toml_str(&text).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::EmptyPopulation)
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SimulationConfig::load("definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("definitely/not/here.toml"));
    }
}
