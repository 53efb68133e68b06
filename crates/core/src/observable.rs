//! Change-tracking map with synchronous observers.
//!
//! [`ObservableMap`] holds the current roster. Writers go through one publish lock, so a bulk
//! replace (diff, write, notify) is atomic with respect to other writers; the apply phase holds
//! the map's write lock, so readers never see half a batch.
//!
//! Notification rules:
//! - [`ObservableMap::replace_all`] notifies once per batch, and only if some value changed,
//! - [`ObservableMap::put`] and [`ObservableMap::remove`] always notify.
//!
//! Observers are called in subscription order, on the writer's thread, after the write lock is
//! released. They may read the map from inside `data_changed` but must not write to it.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Receives a zero-argument "data changed" callback.
pub trait DataObserver: Send + Sync {
    fn data_changed(&self);
}

/// Result of a bulk replace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// At least one value differed; observers were notified once.
    Changed,
    /// Every incoming value matched the stored one; nobody was notified.
    Unchanged,
    /// The batch was older than one already applied and was dropped.
    Stale,
}

#[derive(Default)]
struct PublishState {
    last_generation: Option<u64>,
}

pub struct ObservableMap<K, V> {
    entries: RwLock<HashMap<K, V>>,
    observers: Mutex<Vec<Arc<dyn DataObserver>>>,
    publish: Mutex<PublishState>,
}

impl<K, V> Default for ObservableMap<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            observers: Mutex::new(Vec::new()),
            publish: Mutex::new(PublishState::default()),
        }
    }
}

impl<K, V> ObservableMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn DataObserver>) {
        self.observers.lock().push(observer);
    }

    /// Remove `observer` (matched by identity). Returns whether it was subscribed.
    pub fn unsubscribe(&self, observer: &Arc<dyn DataObserver>) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|o| !same_observer(o, observer));
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Write every pair in `batch`, then notify once if any stored value changed.
    ///
    /// Keys absent from `batch` are left untouched.
    pub fn replace_all<I>(&self, batch: I) -> ReplaceOutcome
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let _publish = self.publish.lock();
        self.apply_batch(batch)
    }

    /// Like [`ObservableMap::replace_all`], but drops the batch if a batch with a newer
    /// `generation` has already been applied.
    pub fn replace_all_versioned<I>(&self, generation: u64, batch: I) -> ReplaceOutcome
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut publish = self.publish.lock();
        if publish
            .last_generation
            .is_some_and(|last| generation < last)
        {
            return ReplaceOutcome::Stale;
        }
        publish.last_generation = Some(generation);
        self.apply_batch(batch)
    }

    /// Insert or overwrite one entry and notify, even if the value is unchanged.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let _publish = self.publish.lock();
        let previous = self.entries.write().insert(key, value);
        self.notify();
        previous
    }

    /// Remove one entry and notify, even if the key was absent.
    pub fn remove(&self, key: &K) -> Option<V> {
        let _publish = self.publish.lock();
        let previous = self.entries.write().remove(key);
        self.notify();
        previous
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.read().keys().cloned().collect()
    }

    /// A consistent copy of every entry.
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.entries.read().clone()
    }

    // Caller holds the publish lock.
    fn apply_batch<I>(&self, batch: I) -> ReplaceOutcome
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut changed = false;
        {
            let mut entries = self.entries.write();
            for (key, value) in batch {
                if entries.get(&key) != Some(&value) {
                    changed = true;
                }
                entries.insert(key, value);
            }
        }

        if changed {
            self.notify();
            ReplaceOutcome::Changed
        } else {
            ReplaceOutcome::Unchanged
        }
    }

    fn notify(&self) {
        let observers = self.observers.lock().clone();
        for observer in observers {
            observer.data_changed();
        }
    }
}

fn same_observer(a: &Arc<dyn DataObserver>, b: &Arc<dyn DataObserver>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
