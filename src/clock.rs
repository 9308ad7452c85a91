use crate::error::EngineError;
use crate::simulation::{InfectionSpreadEngine, TickOutcome};
use log::{debug, error, info, trace};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

struct ClockWorker {
    // Dropping the sender wakes the worker and ends its loop.
    stop_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// Drives [`InfectionSpreadEngine::advance_tick`] on a background thread at a fixed interval.
///
/// Ticks that fall behind schedule are skipped rather than fired in a burst.
/// With a tick limit the worker ends itself once the engine has advanced that many ticks.
pub struct SimulationClock {
    engine: Arc<InfectionSpreadEngine>,
    interval: Duration,
    tick_limit: Option<u64>,
    worker: Mutex<Option<ClockWorker>>,
}

impl SimulationClock {
    /// Clock ticking at the engine's configured interval.
    pub fn new(engine: Arc<InfectionSpreadEngine>) -> Self {
        let interval = engine.params().tick_interval();
        Self::with_interval(engine, interval)
    }

    pub fn with_interval(engine: Arc<InfectionSpreadEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            tick_limit: None,
            worker: Mutex::new(None),
        }
    }

    /// Stops ticking on its own once the engine's tick count reaches `limit`.
    pub fn with_tick_limit(mut self, limit: u64) -> Self {
        self.tick_limit = Some(limit);
        self
    }

    pub fn tick_limit(&self) -> Option<u64> {
        self.tick_limit
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// True once a started worker has ended by itself after reaching its tick limit.
    pub fn has_finished(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|worker| worker.handle.is_finished())
    }

    /// Starts ticking. Does nothing if the clock is already running.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            debug!("Simulation clock already running.");
            return Ok(());
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let engine = Arc::clone(&self.engine);
        let interval = self.interval;
        let tick_limit = self.tick_limit;
        let handle = thread::Builder::new()
            .name("infection-clock".into())
            .spawn(move || run_clock(&engine, interval, tick_limit, &stop_rx))
            .map_err(|source| EngineError::Spawn {
                name: "clock",
                source,
            })?;

        info!("Simulation clock started ({:?} per tick).", interval);
        *worker = Some(ClockWorker { stop_tx, handle });
        Ok(())
    }

    /// Cancels future ticks and waits for a tick already in progress to finish.
    /// Does nothing if the clock is stopped.
    pub fn stop(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(ClockWorker { stop_tx, handle }) = worker else {
            return;
        };
        drop(stop_tx);
        if handle.join().is_err() {
            error!("Simulation clock thread panicked.");
        }
        info!("Simulation clock stopped.");
    }
}

impl Drop for SimulationClock {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_clock(
    engine: &InfectionSpreadEngine,
    interval: Duration,
    tick_limit: Option<u64>,
    stop_rx: &mpsc::Receiver<()>,
) {
    let reached = |tick: u64| tick_limit.is_some_and(|limit| tick >= limit);
    let mut next_tick = Instant::now() + interval;
    loop {
        if reached(engine.tick_count()) {
            break;
        }

        let wait = next_tick.saturating_duration_since(Instant::now());
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            // Any message or a dropped sender means stop.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        match engine.advance_tick() {
            TickOutcome::Advanced { tick, .. } if reached(tick) => {
                info!("Simulation clock reached its limit of {} ticks.", tick);
                break;
            }
            TickOutcome::Advanced { .. } => {}
            TickOutcome::Saturated => {
                trace!("Clock tick had no effect; population saturated.");
            }
        }

        next_tick += interval;
        let now = Instant::now();
        if next_tick < now {
            trace!("Simulation clock fell behind; skipping missed ticks.");
            next_tick = now + interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infection_common::{AggregateCounts, SimulationParameters};

    fn engine(size: usize) -> Arc<InfectionSpreadEngine> {
        let params = SimulationParameters::new(size, 2, 0.005).unwrap().with_seed(3);
        Arc::new(InfectionSpreadEngine::new(params, |_: &[usize], _: AggregateCounts| {}).unwrap())
    }

    #[test]
    fn ticks_while_running_and_halts_after_stop() {
        let engine = engine(50);
        let clock = SimulationClock::new(Arc::clone(&engine));
        assert_eq!(clock.interval(), Duration::from_millis(5));

        clock.start().unwrap();
        assert!(clock.is_running());
        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.tick_count() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        clock.stop();
        assert!(!clock.is_running());

        let ticks = engine.tick_count();
        assert!(ticks >= 3, "clock only ticked {ticks} times");
        thread::sleep(Duration::from_millis(30));
        assert_eq!(engine.tick_count(), ticks);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let engine = engine(10);
        let clock = SimulationClock::with_interval(Arc::clone(&engine), Duration::from_secs(60));
        clock.stop();
        clock.start().unwrap();
        clock.start().unwrap();
        assert!(clock.is_running());
        clock.stop();
        clock.stop();
        assert!(!clock.is_running());
        // A long interval means no tick fired before the stop.
        assert_eq!(engine.tick_count(), 0);
    }

    #[test]
    fn tick_limit_is_never_overshot() {
        for _ in 0..5 {
            let engine = engine(2_000);
            engine.toggle_cells(&[0, 999, 1_500]);
            let clock = SimulationClock::with_interval(Arc::clone(&engine), Duration::from_micros(10))
                .with_tick_limit(20);
            assert_eq!(clock.tick_limit(), Some(20));
            clock.start().unwrap();
            let deadline = Instant::now() + Duration::from_secs(5);
            while !clock.has_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            assert!(clock.has_finished());
            clock.stop();
            assert_eq!(engine.tick_count(), 20);
        }
    }

    #[test]
    fn unlimited_clock_never_finishes_by_itself() {
        let engine = engine(10);
        let clock = SimulationClock::with_interval(Arc::clone(&engine), Duration::from_millis(1));
        assert!(!clock.has_finished());
        clock.start().unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(!clock.has_finished());
        clock.stop();
    }

    #[test]
    fn clock_can_be_restarted() {
        let engine = engine(10);
        let clock = SimulationClock::new(Arc::clone(&engine));
        clock.start().unwrap();
        clock.stop();
        let before = engine.tick_count();
        clock.start().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.tick_count() == before && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        clock.stop();
        assert!(engine.tick_count() > before);
    }
}
