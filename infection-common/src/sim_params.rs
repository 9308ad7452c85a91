use crate::config::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of grid columns the population is laid out on unless configured otherwise.
pub const DEFAULT_COLUMNS: usize = 10;

/// Validated, immutable parameters an infection engine is constructed from.
///
/// Fields are private so a value can only exist once every invariant holds:
/// at least one cell, at least one column and a positive tick interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    population_size: usize,
    infection_spread_factor: usize,
    tick_interval: Duration,
    columns: usize,
    seed: Option<u64>,
}

impl SimulationParameters {
    /// Validates the three user-supplied values and lays the population out on
    /// [`DEFAULT_COLUMNS`] columns.
    pub fn new(
        population_size: usize,
        infection_spread_factor: usize,
        tick_interval_secs: f64,
    ) -> Result<Self, ConfigurationError> {
        if population_size == 0 {
            return Err(ConfigurationError::EmptyPopulation);
        }
        if !tick_interval_secs.is_finite() || tick_interval_secs <= 0.0 {
            return Err(ConfigurationError::InvalidTickInterval(tick_interval_secs));
        }
        // Durations below one nanosecond round to zero.
        let tick_interval = Duration::try_from_secs_f64(tick_interval_secs)
            .map_err(|_| ConfigurationError::InvalidTickInterval(tick_interval_secs))?;
        if tick_interval.is_zero() {
            return Err(ConfigurationError::InvalidTickInterval(tick_interval_secs));
        }

        Ok(Self {
            population_size,
            infection_spread_factor,
            tick_interval,
            columns: DEFAULT_COLUMNS,
            seed: None,
        })
    }

    /// Overrides the grid column count.
    pub fn with_columns(mut self, columns: usize) -> Result<Self, ConfigurationError> {
        if columns == 0 {
            return Err(ConfigurationError::ZeroColumns);
        }
        self.columns = columns;
        Ok(self)
    }

    /// Pins the random seed so runs are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// Cap on the neighbor candidates gathered per sick cell per tick.
    pub fn infection_spread_factor(&self) -> usize {
        self.infection_spread_factor
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}
