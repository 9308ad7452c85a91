//! Delivery of state deltas to the presentation layer.
//!
//! Every callback runs on one dedicated thread, so an observer never needs its
//! own synchronization no matter which thread mutated the population.

use crate::error::EngineError;
use infection_common::{AggregateCounts, CellsChanged};
use log::{error, warn};
use std::io::Write;
use std::sync::mpsc;
use std::thread;

/// Receives every published change together with the counts after it was applied.
pub trait StateObserver: Send {
    fn on_cells_changed(&mut self, changed: &[usize], counts: AggregateCounts);
}

impl<F> StateObserver for F
where
    F: FnMut(&[usize], AggregateCounts) + Send,
{
    fn on_cells_changed(&mut self, changed: &[usize], counts: AggregateCounts) {
        self(changed, counts)
    }
}

/// Writes each change as one JSON object per line.
pub struct JsonLinesObserver<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonLinesObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_event(&mut self, event: &CellsChanged) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> StateObserver for JsonLinesObserver<W> {
    fn on_cells_changed(&mut self, changed: &[usize], counts: AggregateCounts) {
        let event = CellsChanged {
            changed: changed.to_vec(),
            counts,
        };
        if let Err(e) = self.write_event(&event) {
            error!("Failed to write change event: {}", e);
        }
    }
}

enum PresentationCommand {
    Publish(CellsChanged),
    Flush(mpsc::Sender<()>),
    Shutdown,
}

/// Owns the observer on a dedicated thread and feeds it in publish order.
pub struct PresentationContext {
    tx: mpsc::Sender<PresentationCommand>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PresentationContext {
    pub fn spawn<O>(mut observer: O) -> Result<Self, EngineError>
    where
        O: StateObserver + 'static,
    {
        let (tx, rx) = mpsc::channel::<PresentationCommand>();
        let handle = thread::Builder::new()
            .name("infection-presentation".into())
            .spawn(move || {
                while let Ok(command) = rx.recv() {
                    match command {
                        PresentationCommand::Publish(event) => {
                            observer.on_cells_changed(&event.changed, event.counts)
                        }
                        PresentationCommand::Flush(ack) => {
                            let _ = ack.send(());
                        }
                        PresentationCommand::Shutdown => break,
                    }
                }
            })
            .map_err(|source| EngineError::Spawn {
                name: "presentation",
                source,
            })?;

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Queues an event. Never blocks on the observer.
    pub fn publish(&self, event: CellsChanged) {
        if self.tx.send(PresentationCommand::Publish(event)).is_err() {
            warn!("Presentation context has stopped; change event dropped.");
        }
    }

    /// Blocks until every event queued before this call has been delivered.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(PresentationCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl Drop for PresentationContext {
    fn drop(&mut self) {
        let _ = self.tx.send(PresentationCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Presentation thread panicked while delivering changes.");
            }
        }
    }
}
