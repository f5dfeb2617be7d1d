// Fan-out of draft events to subscribed connections.
//
// Delivery is best-effort and at-most-once, FIFO per connection. Each
// subscriber owns a bounded queue; a subscriber that falls behind is
// dropped so a slow consumer can never block publication to the rest.
// Publishing only enqueues — socket writes happen in per-connection
// writer tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::ServerEvent;

pub type SharedEvent = Arc<ServerEvent>;
pub type EventReceiver = mpsc::Receiver<SharedEvent>;

/// Identifies one subscription for later removal.
pub type ConnId = u64;

#[derive(Debug, Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
    capacity: usize,
}

#[derive(Debug)]
struct HubInner {
    subscribers: Mutex<HashMap<i64, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

#[derive(Debug)]
struct Subscriber {
    id: ConnId,
    tx: mpsc::Sender<SharedEvent>,
}

impl BroadcastHub {
    /// `capacity` bounds each connection's outbound queue.
    pub fn new(capacity: usize) -> Self {
        BroadcastHub {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
            capacity,
        }
    }

    /// Subscribe a connection to a league's draft channel.
    pub fn subscribe(&self, league_id: i64) -> (ConnId, EventReceiver) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        let mut guard = self.lock();
        guard
            .entry(league_id)
            .or_default()
            .push(Subscriber { id, tx });
        (id, rx)
    }

    pub fn unsubscribe(&self, league_id: i64, conn_id: ConnId) {
        let mut guard = self.lock();
        if let Some(list) = guard.get_mut(&league_id) {
            list.retain(|s| s.id != conn_id);
            if list.is_empty() {
                guard.remove(&league_id);
            }
        }
    }

    /// Publish an event to every subscriber of a league. Returns the number
    /// of connections the event was queued for. Subscribers whose queue is
    /// full or closed are removed; their receiver closing is the signal for
    /// the connection's writer task to shut the socket down.
    pub fn publish(&self, league_id: i64, event: ServerEvent) -> usize {
        let event = Arc::new(event);
        let mut dropped: Vec<ConnId> = Vec::new();
        let mut delivered = 0;

        let mut guard = self.lock();
        if let Some(list) = guard.get_mut(&league_id) {
            for sub in list.iter() {
                match sub.tx.try_send(Arc::clone(&event)) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(
                            league_id,
                            conn_id = sub.id,
                            "subscriber queue full, dropping connection"
                        );
                        dropped.push(sub.id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!(league_id, conn_id = sub.id, "subscriber gone, removing");
                        dropped.push(sub.id);
                    }
                }
            }
            if !dropped.is_empty() {
                list.retain(|s| !dropped.contains(&s.id));
                if list.is_empty() {
                    guard.remove(&league_id);
                }
            }
        }

        delivered
    }

    pub fn subscriber_count(&self, league_id: i64) -> usize {
        self.lock().get(&league_id).map(|l| l.len()).unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, Vec<Subscriber>>> {
        self.inner
            .subscribers
            .lock()
            .expect("hub subscriber lock poisoned")
    }
}
