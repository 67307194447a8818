//! Control update feed.
//!
//! Every change of control produced by a controller can be published to a
//! [`ControlFeed`], which fans the updates out to subscribers. Writers use it
//! to mirror control changes onto a telemetry channel so that clients can see
//! who holds which channel.
//!
//! # Usage
//!
//! ```rust,ignore
//! let feed = Arc::new(ControlFeed::new());
//! let controller = Controller::<MyResource>::with_feed(Config::default(), Arc::clone(&feed));
//!
//! let updates = feed.subscribe();
//! std::thread::spawn(move || {
//!     while let Ok(update) = updates.recv() {
//!         println!("control: {}", update.to_json().unwrap());
//!     }
//! });
//! ```

use crate::control::state::Transfer;
use crate::error::ControlResult;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// A batch of control changes published together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlUpdate {
    /// Position of this update in the feed. Starts at 1.
    pub sequence: u64,
    /// The changes, in the order they happened.
    pub transfers: Vec<Transfer>,
}

impl ControlUpdate {
    /// Encodes the update as JSON.
    pub fn to_json(&self) -> ControlResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes an update from JSON.
    pub fn from_json(data: &str) -> ControlResult<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

/// Distributes control updates to subscribers.
///
/// The feed:
/// - Preserves publish order
/// - Supports multiple subscribers
/// - Keeps a bounded history for catch-up polling
/// - Is thread-safe
pub struct ControlFeed {
    subscribers: RwLock<Vec<Sender<ControlUpdate>>>,
    history: RwLock<Vec<ControlUpdate>>,
    max_history: usize,
    next_sequence: AtomicU64,
}

impl ControlFeed {
    /// Creates a new feed.
    pub fn new() -> Self {
        Self::with_max_history(1024)
    }

    /// Creates a feed that keeps at most `max_history` updates.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            max_history,
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Subscribes to all future updates.
    ///
    /// The receiver should be drained regularly to avoid unbounded memory
    /// growth.
    pub fn subscribe(&self) -> Receiver<ControlUpdate> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Publishes the transfers that actually changed control.
    ///
    /// Returns the sequence of the published update, or `None` if none of
    /// the transfers occurred.
    pub fn emit(&self, transfers: Vec<Transfer>) -> Option<u64> {
        let transfers: Vec<Transfer> = transfers.into_iter().filter(Transfer::occurred).collect();
        if transfers.is_empty() {
            return None;
        }

        // Sequence assignment, history append and delivery happen under the
        // history lock so subscribers and pollers see the same order.
        let mut history = self.history.write();
        let update = ControlUpdate {
            sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
            transfers,
        };
        let sequence = update.sequence;
        self.subscribers
            .write()
            .retain(|tx| tx.send(update.clone()).is_ok());
        history.push(update);
        if history.len() > self.max_history {
            let to_remove = history.len() - self.max_history;
            history.drain(0..to_remove);
        }
        Some(sequence)
    }

    /// Returns updates with a sequence greater than `cursor`, up to `limit`.
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<ControlUpdate> {
        self.history
            .read()
            .iter()
            .filter(|u| u.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the sequence of the newest update in history.
    pub fn latest_sequence(&self) -> u64 {
        self.history.read().last().map(|u| u.sequence).unwrap_or(0)
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of updates in history.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl Default for ControlFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ControlFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlFeed")
            .field("latest_sequence", &self.latest_sequence())
            .field("subscriber_count", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}
