//! Stochastic nearest-neighbor infection spreading on a fixed grid population.

pub mod clock;
pub mod error;
pub mod grid;
pub mod observer;
pub mod population;
pub mod session;
pub mod simulation;

pub use clock::SimulationClock;
pub use error::EngineError;
pub use grid::GridLayout;
pub use observer::{JsonLinesObserver, PresentationContext, StateObserver};
pub use population::{Health, Population};
pub use session::SimulationSession;
pub use simulation::{InfectionSpreadEngine, TickOutcome};

pub use infection_common::{
    AggregateCounts, CellsChanged, ConfigurationError, SimulationConfig, SimulationParameters,
};
