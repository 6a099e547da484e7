//! Broadcast hub
//!
//! Published events go into a bounded ring (`tokio::sync::broadcast`).
//! Every registered subscriber gets its own forwarding task that drains the
//! ring in publish order and hands each event to the subscriber. Publishing
//! never waits on a subscriber:
//! - a subscriber that falls more than `capacity` events behind loses the
//!   oldest ones
//! - a send that fails or exceeds `send_timeout` prunes the subscriber
//!
//! A lagging subscriber marks the broadcast component degraded until it
//! delivers again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Subscriber, SubscriberId};
use crate::errors::DeliveryError;
use crate::health::{Component, HealthRegistry};
use crate::models::Event;
use crate::observability::MonitorMetrics;

/// Default number of events buffered for a lagging subscriber
const DEFAULT_CAPACITY: usize = 1024;

/// Default upper bound on a single delivery
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the broadcast hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Events retained per subscriber before the oldest are dropped
    pub capacity: usize,
    /// Maximum time a single delivery may take
    pub send_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

/// Counters describing hub activity
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    pub subscribers: usize,
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub pruned: u64,
}

struct HubInner {
    sender: broadcast::Sender<Arc<Event>>,
    subscribers: DashMap<SubscriberId, JoinHandle<()>>,
    send_timeout: Duration,
    next_id: AtomicU64,
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    pruned: AtomicU64,
    metrics: MonitorMetrics,
    health: HealthRegistry,
}

impl HubInner {
    fn prune(&self, id: SubscriberId) {
        if self.subscribers.remove(&id).is_some() {
            self.pruned.fetch_add(1, Ordering::Relaxed);
            self.metrics.inc_subscribers_pruned();
            self.metrics.set_subscribers(self.subscribers.len() as i64);
        }
    }
}

/// Shared handle to the subscriber set. Clones refer to the same hub.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    pub fn new(config: HubConfig) -> Self {
        Self::with_health(config, HealthRegistry::new())
    }

    /// Hub that reports subscriber lag into a shared registry
    pub fn with_health(config: HubConfig, health: HealthRegistry) -> Self {
        let (sender, _) = broadcast::channel(config.capacity.max(1));
        Self {
            inner: Arc::new(HubInner {
                sender,
                subscribers: DashMap::new(),
                send_timeout: config.send_timeout,
                next_id: AtomicU64::new(1),
                published: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
                pruned: AtomicU64::new(0),
                metrics: MonitorMetrics::new(),
                health,
            }),
        }
    }

    /// Register a subscriber. It receives every event published after this
    /// call returns. Must be called from within a Tokio runtime.
    pub fn register(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let rx = self.inner.sender.subscribe();
        // Events queue in `rx` until the id is listed and the gate opens
        let (listed, gate) = oneshot::channel();
        let task = tokio::spawn(forward(
            id,
            subscriber,
            rx,
            gate,
            self.inner.send_timeout,
            Arc::downgrade(&self.inner),
        ));

        self.inner.subscribers.insert(id, task);
        let _ = listed.send(());

        self.inner
            .metrics
            .set_subscribers(self.inner.subscribers.len() as i64);
        debug!(subscriber = %id, "Subscriber registered");
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn deregister(&self, id: SubscriberId) -> bool {
        let removed = match self.inner.subscribers.remove(&id) {
            Some((_, task)) => {
                task.abort();
                true
            }
            None => false,
        };
        self.inner
            .metrics
            .set_subscribers(self.inner.subscribers.len() as i64);
        if removed {
            debug!(subscriber = %id, "Subscriber deregistered");
        }
        removed
    }

    /// Queue an event for every registered subscriber.
    ///
    /// Returns the number of subscribers the event was queued for. Never
    /// blocks; with no subscribers the event is discarded.
    pub fn publish(&self, event: Event) -> usize {
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        self.inner.metrics.inc_events_published(event.kind());
        self.inner.sender.send(Arc::new(event)).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    pub fn is_registered(&self, id: SubscriberId) -> bool {
        self.inner.subscribers.contains_key(&id)
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.inner.subscribers.len(),
            published: self.inner.published.load(Ordering::Relaxed),
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
            pruned: self.inner.pruned.load(Ordering::Relaxed),
        }
    }

    /// Stop all forwarding tasks and forget every subscriber
    pub fn shutdown(&self) {
        let ids: Vec<SubscriberId> = self.inner.subscribers.iter().map(|e| *e.key()).collect();
        for id in &ids {
            if let Some((_, task)) = self.inner.subscribers.remove(id) {
                task.abort();
            }
        }
        self.inner.metrics.set_subscribers(0);
        info!(subscribers = ids.len(), "Broadcast hub shut down");
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

/// Drain the ring for one subscriber until it fails or the hub goes away
async fn forward(
    id: SubscriberId,
    subscriber: Arc<dyn Subscriber>,
    mut rx: broadcast::Receiver<Arc<Event>>,
    gate: oneshot::Receiver<()>,
    send_timeout: Duration,
    hub: Weak<HubInner>,
) {
    if gate.await.is_err() {
        return;
    }

    let mut lagging = false;
    loop {
        match rx.recv().await {
            Ok(event) => {
                let result = match tokio::time::timeout(send_timeout, subscriber.send(&event)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(DeliveryError::TimedOut(send_timeout)),
                };

                let Some(inner) = hub.upgrade() else { break };
                match result {
                    Ok(()) => {
                        inner.delivered.fetch_add(1, Ordering::Relaxed);
                        if lagging {
                            lagging = false;
                            inner.health.set_healthy(Component::Broadcast).await;
                        }
                    }
                    Err(e) => {
                        warn!(
                            subscriber = %id,
                            event = event.kind(),
                            error = %e,
                            "Delivery failed, pruning subscriber"
                        );
                        inner.prune(id);
                        break;
                    }
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(subscriber = %id, skipped, "Subscriber lagging, oldest events dropped");
                if let Some(inner) = hub.upgrade() {
                    inner.dropped.fetch_add(skipped, Ordering::Relaxed);
                    inner.metrics.add_events_dropped(skipped);
                    lagging = true;
                    inner
                        .health
                        .set_degraded(
                            Component::Broadcast,
                            format!("subscriber {} dropped {} events", id, skipped),
                        )
                        .await;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}
