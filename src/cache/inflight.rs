use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

/// Deduplicates concurrent cache misses for the same cache key. The first
/// request (leader) performs the upstream fetch and populates the cache;
/// later requests for the same key (followers) wait for the leader to finish
/// and then re-read the cache.
#[derive(Clone)]
pub struct Inflight {
    in_flight: Arc<Mutex<HashMap<String, watch::Sender<bool>>>>,
}

impl Inflight {
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Acquire a slot for `key`. Returns `FlightSlot::Leader` immediately for
    /// the first request; any other caller blocks until the leader completes
    /// and then gets `FlightSlot::Follower`.
    pub async fn acquire(&self, key: &str) -> FlightSlot {
        let receiver = {
            let in_flight = self.in_flight.lock();
            in_flight.get(key).map(|sender| sender.subscribe())
        };

        if let Some(mut rx) = receiver {
            // RecvError means the leader is gone, which also counts as done
            let _ = rx.wait_for(|completed| *completed).await;
            FlightSlot::Follower
        } else {
            let (tx, _rx) = watch::channel(false);

            let already_in_flight = {
                let mut in_flight = self.in_flight.lock();
                if in_flight.contains_key(key) {
                    true
                } else {
                    in_flight.insert(key.to_string(), tx.clone());
                    false
                }
            };

            if already_in_flight {
                // Another request took the lead between our two lock scopes
                return Box::pin(self.acquire(key)).await;
            }

            FlightSlot::Leader(FlightGuard {
                key: key.to_string(),
                registry: self.clone(),
                sender: tx,
            })
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}

impl Default for Inflight {
    fn default() -> Self {
        Self::new()
    }
}

pub enum FlightSlot {
    /// First request for the key. Holds the guard while fetching; dropping it
    /// releases the key and wakes every follower.
    Leader(FlightGuard),
    /// The leader finished. The cache should now hold the entry; a follower
    /// that still misses does its own fetch.
    Follower,
}

impl FlightSlot {
    pub fn is_leader(&self) -> bool {
        matches!(self, FlightSlot::Leader(_))
    }
}

pub struct FlightGuard {
    key: String,
    registry: Inflight,
    sender: watch::Sender<bool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        // Unregister before waking followers so a follower that re-acquires
        // never sees the finished flight
        self.registry.in_flight.lock().remove(&self.key);
        let _ = self.sender.send(true);
    }
}
