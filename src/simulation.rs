use crate::error::EngineError;
use crate::grid::GridLayout;
use crate::observer::{PresentationContext, StateObserver};
use crate::population::{Health, Population};
use infection_common::{AggregateCounts, CellsChanged, SimulationParameters};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::{Mutex, MutexGuard, PoisonError};

// Per-cell RNG streams are derived from the engine seed, the cell and the tick.
const SEED_INDEX_STRIDE: u64 = 0x1F3A;
const SEED_TICK_STRIDE: u64 = 0x58C7;

/// Result of one call to [`InfectionSpreadEngine::advance_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No healthy cell was left; nothing ran and nothing was published.
    Saturated,
    Advanced {
        /// Tick number, starting at 1.
        tick: u64,
        /// Cells infected by this tick, in the order they were applied.
        changed: Vec<usize>,
        counts: AggregateCounts,
    },
}

/// Everything guarded by the engine's mutation lock.
#[derive(Debug)]
struct EngineState {
    population: Population,
    ticks: u64,
}

/// Owns a population and spreads infection through it one tick at a time.
///
/// Mutations from the clock (`advance_tick`) and from user interaction
/// (`toggle_cell`) are serialized by one lock. Changes are queued to the
/// presentation context while that lock is held, so observers see them in
/// the order they were applied.
pub struct InfectionSpreadEngine {
    params: SimulationParameters,
    layout: GridLayout,
    seed: u64,
    state: Mutex<EngineState>,
    presentation: PresentationContext,
}

impl InfectionSpreadEngine {
    /// Creates an all-healthy population and starts the presentation context for `observer`.
    pub fn new<O>(params: SimulationParameters, observer: O) -> Result<Self, EngineError>
    where
        O: StateObserver + 'static,
    {
        let seed = params.seed().unwrap_or_else(|| rand::rng().random());
        let layout = GridLayout::new(params.columns(), params.population_size());
        let presentation = PresentationContext::spawn(observer)?;

        info!(
            "Infection engine ready: {} cells on a {}x{} grid, spread factor {}, seed {}.",
            params.population_size(),
            layout.columns(),
            layout.rows(),
            params.infection_spread_factor(),
            seed
        );

        Ok(Self {
            state: Mutex::new(EngineState {
                population: Population::new(params.population_size()),
                ticks: 0,
            }),
            params,
            layout,
            seed,
            presentation,
        })
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Seed actually in use, drawn at construction when none was configured.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    // A panic inside a critical section cannot leave a half-applied cell,
    // so a poisoned lock still guards a consistent population.
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Infects a single cell on behalf of the user.
    ///
    /// Returns `Ok(true)` when the cell became sick and an event was published,
    /// `Ok(false)` when it already was sick (nothing is published).
    pub fn toggle_cell(&self, index: usize) -> Result<bool, EngineError> {
        let mut state = self.lock_state();
        let population_size = state.population.len();
        if index >= population_size {
            warn!(
                "Ignoring toggle of cell {} outside a population of {}.",
                index, population_size
            );
            return Err(EngineError::InvalidIndex {
                index,
                population_size,
            });
        }
        if !state.population.infect(index) {
            trace!("Cell {} is already sick; toggle ignored.", index);
            return Ok(false);
        }

        let counts = state.population.counts();
        self.presentation.publish(CellsChanged {
            changed: vec![index],
            counts,
        });
        debug!(
            "Cell {} infected by user | healthy {} | sick {}",
            index, counts.healthy, counts.sick
        );
        Ok(true)
    }

    /// Infects every cell a drag gesture passed over, publishing one event for the batch.
    ///
    /// Invalid indices are skipped with a warning. Returns the cells that changed.
    pub fn toggle_cells(&self, indices: &[usize]) -> Vec<usize> {
        let mut state = self.lock_state();
        let mut changed = Vec::new();
        for &index in indices {
            if index >= state.population.len() {
                warn!(
                    "Ignoring toggle of cell {} outside a population of {}.",
                    index,
                    state.population.len()
                );
                continue;
            }
            if state.population.infect(index) {
                changed.push(index);
            }
        }

        if !changed.is_empty() {
            let counts = state.population.counts();
            debug!(
                "{} cells infected by user | healthy {} | sick {}",
                changed.len(),
                counts.healthy,
                counts.sick
            );
            self.presentation.publish(CellsChanged {
                changed: changed.clone(),
                counts,
            });
        }
        changed
    }

    /// Advances the simulation by one tick.
    ///
    /// Every sick cell searches up to `infection_spread_factor` neighbors, keeps the
    /// healthy ones and infects a uniformly random number of them, chosen without
    /// replacement. Searches run in parallel against a snapshot taken under the
    /// lock; the union of all picks is then applied in one critical section.
    pub fn advance_tick(&self) -> TickOutcome {
        let (snapshot, tick) = {
            let state = self.lock_state();
            if !state.population.has_healthy() {
                trace!("Population saturated; tick skipped.");
                return TickOutcome::Saturated;
            }
            (state.population.clone(), state.ticks + 1)
        };

        let sick = snapshot.sick_indices();
        let max_candidates = self.params.infection_spread_factor();
        let picks: Vec<Vec<usize>> = sick
            .par_iter()
            .map(|&index| {
                let mut rng = StdRng::seed_from_u64(cell_seed(self.seed, index, tick));
                let targets =
                    select_targets(&snapshot, self.layout, index, max_candidates, &mut rng);
                trace!("Tick {}: sick cell {} picked {:?}", tick, index, targets);
                targets
            })
            .collect();

        let mut state = self.lock_state();
        let mut changed = Vec::new();
        for target in picks.into_iter().flatten() {
            if state.population.infect(target) {
                changed.push(target);
            }
        }
        state.ticks += 1;
        let tick = state.ticks;
        let counts = state.population.counts();
        self.presentation.publish(CellsChanged {
            changed: changed.clone(),
            counts,
        });
        drop(state);

        debug!(
            "Tick {} | spreaders {} | newly sick {} | healthy {} | sick {}",
            tick,
            sick.len(),
            changed.len(),
            counts.healthy,
            counts.sick
        );
        if counts.is_saturated() {
            info!("Population saturated after {} ticks.", tick);
        }

        TickOutcome::Advanced {
            tick,
            changed,
            counts,
        }
    }

    /// Publishes the current counts with no changed cells, for an initial display refresh.
    pub fn announce(&self) -> AggregateCounts {
        let state = self.lock_state();
        let counts = state.population.counts();
        self.presentation.publish(CellsChanged {
            changed: Vec::new(),
            counts,
        });
        counts
    }

    /// Blocks until every change published so far has reached the observer.
    pub fn flush_observer(&self) {
        self.presentation.flush();
    }

    pub fn counts(&self) -> AggregateCounts {
        self.lock_state().population.counts()
    }

    pub fn is_saturated(&self) -> bool {
        !self.lock_state().population.has_healthy()
    }

    /// Number of ticks that have advanced the population.
    pub fn tick_count(&self) -> u64 {
        self.lock_state().ticks
    }

    pub fn is_sick(&self, index: usize) -> Result<bool, EngineError> {
        let state = self.lock_state();
        match state.population.get(index) {
            Some(health) => Ok(health == Health::Sick),
            None => Err(EngineError::InvalidIndex {
                index,
                population_size: state.population.len(),
            }),
        }
    }
}

/// Seed of the RNG stream a sick cell uses during one tick.
fn cell_seed(seed: u64, index: usize, tick: u64) -> u64 {
    seed.wrapping_add((index as u64).wrapping_mul(SEED_INDEX_STRIDE))
        .wrapping_add(tick.wrapping_mul(SEED_TICK_STRIDE))
}

/// Picks the neighbors one sick cell infects this tick.
///
/// The number infected is itself uniform over `0..=healthy candidates`, so the
/// spread factor only bounds how far the search looks.
fn select_targets<R: Rng + ?Sized>(
    snapshot: &Population,
    layout: GridLayout,
    index: usize,
    max_candidates: usize,
    rng: &mut R,
) -> Vec<usize> {
    let healthy: Vec<usize> = layout
        .neighbors_of(index, max_candidates)
        .into_iter()
        .filter(|&candidate| snapshot.is_healthy(candidate))
        .collect();
    let count = rng.random_range(0..=healthy.len());
    healthy.choose_multiple(rng, count).copied().collect()
}
