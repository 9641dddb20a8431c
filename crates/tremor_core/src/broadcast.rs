//! Subscriber Fan-Out
//!
//! Every emitted [`BroadcastEvent`] goes to all subscribers connected at
//! the time of publishing. There is no backlog: a subscriber that joins
//! later only sees later events.
//!
//! # Delivery
//!
//! Each subscriber owns a bounded queue. `publish` works on a snapshot of
//! the subscriber list and uses `try_send`, so it never waits:
//! - queue full: that subscriber misses this event, others are unaffected
//! - receiver dropped: the subscriber is removed
//!
//! A lagging subscriber is logged once when it starts missing events and
//! once when it catches up; totals are in [`SubscriberRegistry::dropped_count`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::message::BroadcastEvent;

/// Receives every event that passes the pipeline gate
pub trait Broadcaster: Send + Sync {
    fn publish(&self, event: BroadcastEvent);
}

impl<B: Broadcaster + ?Sized> Broadcaster for Arc<B> {
    fn publish(&self, event: BroadcastEvent) {
        (**self).publish(event)
    }
}

pub type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    sender: Sender<Arc<BroadcastEvent>>,
    lagging: Arc<AtomicBool>,
}

/// In-process registry of live subscribers
///
/// Cloning shares the same registry.
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
    capacity: usize,
    dropped: AtomicU64,
}

impl SubscriberRegistry {
    /// Create a registry whose subscribers each buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        info!("Subscriber registry initialized with capacity {}", capacity);
        Self {
            inner: Arc::new(RegistryInner {
                subscribers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                capacity,
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Connect a new subscriber
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = bounded(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let mut subscribers = self.inner.subscribers.write();
        subscribers.push(Subscriber {
            id,
            sender,
            lagging: Arc::new(AtomicBool::new(false)),
        });
        info!("Subscriber {} connected, total subscribers: {}", id, subscribers.len());

        Subscription { id, receiver }
    }

    /// Disconnect a subscriber; returns `false` if it was already gone
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if removed {
            info!("Subscriber {} disconnected, total subscribers: {}", id, subscribers.len());
        }
        removed
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Deliveries skipped because a subscriber's queue was full
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Subscribers whose last delivery was dropped
    pub fn lagging_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .iter()
            .filter(|s| s.lagging.load(Ordering::Relaxed))
            .count()
    }

    /// Send to every current subscriber, returning how many accepted it
    pub fn broadcast(&self, event: BroadcastEvent) -> usize {
        let event = Arc::new(event);
        let snapshot: Vec<(SubscriberId, Sender<Arc<BroadcastEvent>>, Arc<AtomicBool>)> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|s| (s.id, s.sender.clone(), Arc::clone(&s.lagging)))
            .collect();

        let mut delivered = 0;
        let mut disconnected = Vec::new();
        for (id, sender, lagging) in snapshot {
            match sender.try_send(Arc::clone(&event)) {
                Ok(()) => {
                    delivered += 1;
                    if lagging.swap(false, Ordering::Relaxed) {
                        info!("Subscriber {} caught up", id);
                    }
                }
                Err(TrySendError::Full(_)) => {
                    self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                    if !lagging.swap(true, Ordering::Relaxed) {
                        warn!("Subscriber {} is lagging, dropping events", id);
                    }
                }
                Err(TrySendError::Disconnected(_)) => disconnected.push(id),
            }
        }

        if !disconnected.is_empty() {
            self.inner
                .subscribers
                .write()
                .retain(|s| !disconnected.contains(&s.id));
            debug!("Pruned {} disconnected subscribers", disconnected.len());
        }

        debug!("Broadcast event to {} subscribers", delivered);
        delivered
    }
}

impl Broadcaster for SubscriberRegistry {
    fn publish(&self, event: BroadcastEvent) {
        self.broadcast(event);
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(16)
    }
}

/// Receiving end of one subscriber
///
/// Dropping the subscription disconnects it; the registry prunes it on the
/// next publish.
pub struct Subscription {
    id: SubscriberId,
    receiver: Receiver<Arc<BroadcastEvent>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Block until the next event
    pub fn recv(&self) -> CoreResult<Arc<BroadcastEvent>> {
        self.receiver.recv().map_err(|_| CoreError::ChannelRecvError)
    }

    /// Next event if one is queued
    pub fn try_recv(&self) -> Option<Arc<BroadcastEvent>> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Arc<BroadcastEvent>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drain everything currently queued
    pub fn drain(&self) -> Vec<Arc<BroadcastEvent>> {
        self.receiver.try_iter().collect()
    }
}
