//! Status store.
//!
//! Holds the fixed set of tracked items plus the `connected` flag and
//! publishes every effective change to subscribers. The store performs
//! no I/O; the connection manager writes through [`StatusSink`].

use crate::types::{SeedItem, StatusSnapshot, TrackedItem};
use std::collections::HashSet;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Write side of the status store.
pub trait StatusSink: Send + Sync {
    /// Replace `curr`/`max` of a tracked key.
    ///
    /// Returns `false` if the key is not tracked. Unknown keys are never
    /// created.
    fn apply_update(&self, key: &str, curr: i64, max: i64) -> bool;

    /// Set the connection flag.
    fn set_connected(&self, connected: bool);
}

/// In-memory status store.
///
/// The latest [`StatusSnapshot`] lives inside a watch channel, so reads
/// always see the last applied mutation and subscribers are woken only
/// when something actually changed.
pub struct StatusStore {
    state: watch::Sender<StatusSnapshot>,
}

impl StatusStore {
    /// Create a store with the given tracked keys, all zeroed and
    /// disconnected.
    ///
    /// Duplicate keys keep their first occurrence.
    pub fn new(seed: impl IntoIterator<Item = SeedItem>) -> Self {
        let mut seen = HashSet::new();
        let mut status = Vec::new();
        for item in seed {
            if !seen.insert(item.key.clone()) {
                warn!(key = %item.key, "Duplicate tracked key in seed, ignoring");
                continue;
            }
            status.push(TrackedItem::from_seed(item));
        }

        debug!(count = status.len(), "Status store initialized");

        let (state, _) = watch::channel(StatusSnapshot {
            connected: false,
            status,
        });
        Self { state }
    }

    /// Current connection flag.
    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    /// Current record for a tracked key.
    pub fn get(&self, key: &str) -> Option<TrackedItem> {
        self.state.borrow().get(key).cloned()
    }

    /// Tracked keys in seed order.
    pub fn keys(&self) -> Vec<String> {
        self.state
            .borrow()
            .status
            .iter()
            .map(|item| item.key.clone())
            .collect()
    }

    /// Owned copy of the whole published state.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    ///
    /// The receiver starts with the current snapshot marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.state.subscribe()
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new(SeedItem::defaults())
    }
}

impl StatusSink for StatusStore {
    fn apply_update(&self, key: &str, curr: i64, max: i64) -> bool {
        let mut tracked = false;
        self.state.send_if_modified(|snapshot| {
            let Some(item) = snapshot.status.iter_mut().find(|item| item.key == key) else {
                return false;
            };
            tracked = true;
            if item.curr == curr && item.max == max {
                return false;
            }
            item.curr = curr;
            item.max = max;
            true
        });

        if tracked {
            trace!(key, curr, max, "Status updated");
        }
        tracked
    }

    fn set_connected(&self, connected: bool) {
        let changed = self.state.send_if_modified(|snapshot| {
            if snapshot.connected == connected {
                return false;
            }
            snapshot.connected = connected;
            true
        });

        if changed {
            debug!(connected, "Connection flag changed");
        }
    }
}
