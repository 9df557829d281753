//! Per-key download coalescing.
//!
//! When several callers `put` the same content reference concurrently,
//! only one download runs; the rest subscribe to the leader's result.
//! The original client relied on single-threaded interleaving to make the
//! check-then-download sequence safe, which does not hold under real
//! threads, so the map below closes that race.
//!
//! The leader holds a guard, not a bare role: if the leader's future is
//! dropped before it publishes a result (task abort, a lost `select!`
//! branch), the guard broadcasts a failure and frees the key, so waiters
//! degrade to the remote URL instead of blocking forever.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tokio::sync::broadcast;

/// Result broadcast to coalesced waiters. `None` means the download
/// failed and the caller should fall back to the remote URL.
pub(crate) type FlightResult = Option<PathBuf>;

/// Role a caller plays for a given key.
pub(crate) enum Flight<'a> {
    /// First caller for the key; must download and then call
    /// [`FlightGuard::complete`].
    Leader(FlightGuard<'a>),
    /// A download is already in flight; await the receiver.
    Waiter(broadcast::Receiver<FlightResult>),
}

/// Leadership of one in-flight download.
///
/// Dropping the guard without calling `complete` publishes `None` and
/// clears the key.
pub(crate) struct FlightGuard<'a> {
    map: &'a FlightMap,
    key: String,
    completed: bool,
}

impl FlightGuard<'_> {
    /// Publish the leader's result and clear the key.
    pub(crate) fn complete(mut self, result: FlightResult) {
        self.completed = true;
        self.map.finish(&self.key, result);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.map.finish(&self.key, None);
        }
    }
}

/// Tracks in-flight downloads keyed by cache key.
#[derive(Default)]
pub(crate) struct FlightMap {
    in_flight: Mutex<HashMap<String, broadcast::Sender<FlightResult>>>,
}

impl FlightMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Join the flight for `key`, becoming the leader if none exists.
    pub(crate) fn join(&self, key: &str) -> Flight<'_> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(sender) = in_flight.get(key) {
            Flight::Waiter(sender.subscribe())
        } else {
            let (sender, _) = broadcast::channel(1);
            in_flight.insert(key.to_string(), sender);
            Flight::Leader(FlightGuard {
                map: self,
                key: key.to_string(),
                completed: false,
            })
        }
    }

    /// Send errors mean no waiter subscribed, which is fine.
    fn finish(&self, key: &str, result: FlightResult) {
        let sender = self.in_flight.lock().unwrap().remove(key);
        if let Some(sender) = sender {
            let _ = sender.send(result);
        }
    }
}
