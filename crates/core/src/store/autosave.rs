use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam::channel::{self, select, Receiver, Sender};

use crate::{config::Configuration, timeline::Debouncer, OverlayError, Result};

use super::PersistenceStore;

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Default)]
pub struct AutosaveStats {
    writes: AtomicU64,
    failures: AtomicU64,
    last_write: Mutex<Option<Instant>>,
}

impl AutosaveStats {
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Acquire)
    }

    pub fn last_write(&self) -> Option<Instant> {
        *self.last_write.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Control {
    Flush(Sender<()>),
    Shutdown,
}

/// Debounced background writer for the autosave slot.
///
/// Every configuration received on `changes` re-arms a quiet-period timer;
/// only the latest configuration is written once the timer expires, so a
/// burst of changes produces a single write.
pub struct Autosaver {
    control: Sender<Control>,
    stats: Arc<AutosaveStats>,
    worker: Option<JoinHandle<()>>,
}

impl Autosaver {
    pub fn spawn(
        store: PersistenceStore,
        changes: Receiver<Arc<Configuration>>,
        quiet: Duration,
    ) -> Result<Self> {
        let (control, control_rx) = channel::unbounded();
        let stats = Arc::new(AutosaveStats::default());
        let worker = {
            let stats = stats.clone();
            thread::Builder::new()
                .name("autosave".into())
                .spawn(move || {
                    Worker {
                        store,
                        stats,
                        debouncer: Debouncer::new(quiet),
                        pending: None,
                    }
                    .run(&changes, &control_rx)
                })?
        };

        Ok(Self {
            control,
            stats,
            worker: Some(worker),
        })
    }

    pub fn stats(&self) -> &AutosaveStats {
        &self.stats
    }

    /// Writes any pending change immediately and waits for the write.
    pub fn flush(&self) -> Result<()> {
        let (ack, done) = channel::bounded(1);
        self.control
            .send(Control::Flush(ack))
            .map_err(|_| OverlayError::msg("autosave worker has stopped"))?;
        done.recv()
            .map_err(|_| OverlayError::msg("autosave worker has stopped"))
    }

    /// Flushes pending changes and stops the worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.control.send(Control::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("autosave worker panicked");
            }
        }
    }
}

impl Drop for Autosaver {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Autosaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autosaver")
            .field("stats", &self.stats)
            .finish()
    }
}

struct Worker {
    store: PersistenceStore,
    stats: Arc<AutosaveStats>,
    debouncer: Debouncer,
    pending: Option<Arc<Configuration>>,
}

impl Worker {
    fn run(mut self, changes: &Receiver<Arc<Configuration>>, control: &Receiver<Control>) {
        let mut changes_open = true;
        loop {
            let timer = match self.debouncer.deadline() {
                Some(deadline) => channel::at(deadline),
                None => channel::never(),
            };
            let watched = if changes_open {
                changes.clone()
            } else {
                channel::never()
            };

            select! {
                recv(watched) -> msg => match msg {
                    Ok(config) => {
                        self.pending = Some(config);
                        self.debouncer.touch(Instant::now());
                    }
                    Err(_) => changes_open = false,
                },
                recv(control) -> msg => {
                    // Changes sent before the control message must be included.
                    while let Ok(config) = changes.try_recv() {
                        self.pending = Some(config);
                    }
                    match msg {
                        Ok(Control::Flush(ack)) => {
                            self.write_pending();
                            let _ = ack.send(());
                        }
                        Ok(Control::Shutdown) | Err(_) => {
                            self.write_pending();
                            return;
                        }
                    }
                },
                recv(timer) -> _ => {
                    if self.debouncer.fire_if_due(Instant::now()) {
                        self.write_pending();
                    }
                }
            }
        }
    }

    fn write_pending(&mut self) {
        self.debouncer.cancel();
        let Some(config) = self.pending.take() else {
            return;
        };
        match self.store.save_autosave(&config) {
            Ok(()) => {
                self.stats.writes.fetch_add(1, Ordering::AcqRel);
                *self
                    .stats
                    .last_write
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
                tracing::debug!("autosaved configuration");
            }
            Err(err) => {
                self.stats.failures.fetch_add(1, Ordering::AcqRel);
                tracing::warn!(%err, "autosave failed");
            }
        }
    }
}
