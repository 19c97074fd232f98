use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam::channel::{unbounded, Receiver, Sender};

use super::{ConfigUpdate, Configuration};

/// Thread-safe handle to the live [`Configuration`].
///
/// Readers receive immutable snapshots; writers replace the whole record
/// under a short critical section, so no reader can observe a half-applied
/// update. Persisted-field changes are published to subscribers in the
/// order they were applied.
#[derive(Clone, Default)]
pub struct SharedConfig {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    current: Mutex<Arc<Configuration>>,
    subscribers: Mutex<Vec<Sender<Arc<Configuration>>>>,
}

impl SharedConfig {
    pub fn new(config: Configuration) -> Self {
        Self {
            inner: Arc::new(Inner {
                current: Mutex::new(Arc::new(config.sanitized())),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns the latest published configuration.
    pub fn snapshot(&self) -> Arc<Configuration> {
        self.lock_current().clone()
    }

    /// Applies one update and returns the resulting configuration.
    pub fn apply(&self, update: ConfigUpdate) -> Arc<Configuration> {
        self.update(|config| config.apply(update))
    }

    /// Replaces the configuration wholesale, e.g. after loading a snapshot.
    pub fn replace(&self, config: Configuration) -> Arc<Configuration> {
        self.apply(ConfigUpdate::Replace(Box::new(config)))
    }

    /// Runs `mutate` against a private copy and publishes the result as one
    /// indivisible replacement. Subscribers are notified when anything
    /// changed.
    pub fn update(&self, mutate: impl FnOnce(&mut Configuration)) -> Arc<Configuration> {
        let mut current = self.lock_current();
        let mut next = Configuration::clone(&current);
        mutate(&mut next);
        if next == **current {
            return current.clone();
        }

        let next = Arc::new(next);
        *current = next.clone();
        self.publish(&next);
        next
    }

    /// Like [`SharedConfig::update`] but for derived, per-frame state that is
    /// never persisted. Subscribers are not notified.
    pub fn update_transient(&self, mutate: impl FnOnce(&mut Configuration)) -> Arc<Configuration> {
        let mut current = self.lock_current();
        let mut next = Configuration::clone(&current);
        mutate(&mut next);
        if next != **current {
            *current = Arc::new(next);
        }
        current.clone()
    }

    /// Registers a new listener for persisted-field changes.
    pub fn subscribe(&self) -> Receiver<Arc<Configuration>> {
        let (tx, rx) = unbounded();
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    fn publish(&self, config: &Arc<Configuration>) {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(config.clone()).is_ok());
    }

    // Every write swaps a complete record, so a poisoned guard still holds a
    // consistent value.
    fn lock_current(&self) -> MutexGuard<'_, Arc<Configuration>> {
        self.inner
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SharedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConfig")
            .field("current", &self.snapshot())
            .finish()
    }
}
