use crate::clock::SimulationClock;
use crate::error::EngineError;
use crate::observer::StateObserver;
use crate::simulation::InfectionSpreadEngine;
use infection_common::{AggregateCounts, SimulationParameters};
use log::info;
use std::sync::Arc;

/// One simulation run: an engine plus the clock driving it.
///
/// Ending the session (or dropping it) stops the clock; nothing outlives it.
pub struct SimulationSession {
    engine: Arc<InfectionSpreadEngine>,
    clock: SimulationClock,
}

impl SimulationSession {
    /// Builds the engine, publishes the initial counts and prepares a stopped clock.
    pub fn new<O>(params: SimulationParameters, observer: O) -> Result<Self, EngineError>
    where
        O: StateObserver + 'static,
    {
        let engine = Arc::new(InfectionSpreadEngine::new(params, observer)?);
        engine.announce();
        let clock = SimulationClock::new(Arc::clone(&engine));
        Ok(Self { engine, clock })
    }

    /// Ends the run by itself after `limit` ticks; see [`SimulationClock::with_tick_limit`].
    /// Must be called before [`start`](Self::start).
    pub fn with_tick_limit(self, limit: u64) -> Self {
        let Self { engine, clock } = self;
        Self {
            engine,
            clock: clock.with_tick_limit(limit),
        }
    }

    /// True once a tick-limited clock has run all of its ticks.
    pub fn has_finished(&self) -> bool {
        self.clock.has_finished()
    }

    /// Starts the clock. Calling it again while running has no effect.
    pub fn start(&self) -> Result<(), EngineError> {
        self.clock.start()
    }

    pub fn engine(&self) -> &Arc<InfectionSpreadEngine> {
        &self.engine
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn toggle_cell(&self, index: usize) -> Result<bool, EngineError> {
        self.engine.toggle_cell(index)
    }

    /// Stops the clock, waits for the observer to catch up and returns the final counts.
    pub fn end(self) -> AggregateCounts {
        self.clock.stop();
        self.engine.flush_observer();
        let counts = self.engine.counts();
        info!(
            "Session ended after {} ticks | healthy {} | sick {}",
            self.engine.tick_count(),
            counts.healthy,
            counts.sick
        );
        counts
    }
}
