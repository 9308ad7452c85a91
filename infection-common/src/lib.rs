pub mod config;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{
    ConfigurationError, InitialConditions, PopulationConfig, SimulationConfig, SpreadConfig,
    TimingConfig,
};
pub use sim_params::{SimulationParameters, DEFAULT_COLUMNS};
pub use snapshot::{AggregateCounts, CellsChanged};
