//! Event bus implementation
//!
//! This module provides the event bus abstraction and an in-memory
//! implementation for publishing and subscribing to tenancy events.

use crate::types::Event;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

/// Event bus error types.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// Failed to publish event
    #[error("Failed to publish event: {0}")]
    PublishError(String),

    /// Failed to subscribe
    #[error("Failed to subscribe: {0}")]
    SubscribeError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Subscription handle for receiving events.
pub struct Subscription {
    /// Subscription ID
    pub id: String,
    /// Topic pattern
    pub topic: String,
    /// Event receiver
    pub receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receive the next event.
    ///
    /// Events dropped because the subscriber lagged are skipped.
    pub async fn recv(&mut self) -> EventBusResult<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed)
                }
            }
        }
    }

    /// Receive an already-published event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }
}

/// Event handler trait for processing events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: Event) -> EventBusResult<()>;

    /// Get the topic patterns this handler is interested in.
    fn topics(&self) -> Vec<String>;
}

/// Event bus trait for publish/subscribe operations.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event.
    async fn publish(&self, event: Event) -> EventBusResult<()>;

    /// Subscribe to a topic pattern.
    ///
    /// Topic patterns support wildcards:
    /// - `*` matches any single segment
    /// - `#` matches zero or more segments
    ///
    /// Examples:
    /// - `tenancy.member.*` matches `tenancy.member.added`, `tenancy.member.left`
    /// - `tenancy.#` matches every tenancy event
    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription>;

    /// Register an event handler.
    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()>;

    /// Unsubscribe from a topic.
    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()>;

    /// Get event bus stats.
    async fn stats(&self) -> EventBusStats;
}

/// Event bus statistics.
#[derive(Debug, Clone, Default)]
pub struct EventBusStats {
    /// Total events published
    pub events_published: u64,
    /// Total deliveries to subscribers and handlers
    pub events_delivered: u64,
    /// Active subscriptions
    pub active_subscriptions: usize,
    /// Registered handlers
    pub registered_handlers: usize,
}

/// Check if a dotted topic matches a dotted pattern.
///
/// ```
/// use tenancy_events::bus::topic_matches;
///
/// assert!(topic_matches("tenancy.team.*", "tenancy.team.created"));
/// assert!(topic_matches("tenancy.#", "tenancy.member.role_changed"));
/// assert!(!topic_matches("tenancy.team.*", "tenancy.team"));
/// ```
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let topic: Vec<&str> = topic.split('.').collect();
    segments_match(&pattern, &topic)
}

fn segments_match(pattern: &[&str], topic: &[&str]) -> bool {
    match (pattern.split_first(), topic.split_first()) {
        (None, None) => true,
        (Some((&"#", rest)), _) => {
            segments_match(rest, topic)
                || (!topic.is_empty() && segments_match(pattern, &topic[1..]))
        }
        (Some((&"*", p_rest)), Some((_, t_rest))) => segments_match(p_rest, t_rest),
        (Some((p, p_rest)), Some((t, t_rest))) if p == t => segments_match(p_rest, t_rest),
        _ => false,
    }
}

/// In-memory event bus implementation.
///
/// Suitable for single-process applications and testing.
pub struct MemoryEventBus {
    /// Topic pattern -> channel
    subscribers: Arc<RwLock<HashMap<String, broadcast::Sender<Event>>>>,
    /// Subscription id -> topic pattern
    subscriptions: Arc<RwLock<HashMap<String, String>>>,
    /// Registered handlers
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
    /// Statistics
    stats: Arc<RwLock<EventBusStats>>,
    /// Default channel capacity
    channel_capacity: usize,
}

impl std::fmt::Debug for MemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventBus")
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

impl MemoryEventBus {
    /// Create a new in-memory event bus.
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create with custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            handlers: Arc::new(RwLock::new(Vec::new())),
            stats: Arc::new(RwLock::new(EventBusStats::default())),
            channel_capacity: capacity.max(1),
        }
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: Event) -> EventBusResult<()> {
        let topic = event.topic();
        let mut delivered = 0u64;

        {
            let subscribers = self.subscribers.read().await;
            for (pattern, sender) in subscribers.iter() {
                if topic_matches(pattern, &topic) {
                    // Err only means no live receivers.
                    if let Ok(n) = sender.send(event.clone()) {
                        delivered += n as u64;
                    }
                }
            }
        }

        {
            let handlers = self.handlers.read().await;
            for handler in handlers.iter() {
                if handler.topics().iter().any(|p| topic_matches(p, &topic)) {
                    let handler = handler.clone();
                    let event = event.clone();
                    delivered += 1;
                    tokio::spawn(async move {
                        let event_id = event.id;
                        if let Err(e) = handler.handle(event).await {
                            warn!(%event_id, error = %e, "event handler failed");
                        }
                    });
                }
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_published += 1;
        stats.events_delivered += delivered;

        debug!(topic = %topic, event_id = %event.id, delivered, "event published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription> {
        if topic.trim().is_empty() {
            return Err(EventBusError::SubscribeError(
                "topic pattern must not be empty".to_string(),
            ));
        }
        let id = uuid::Uuid::now_v7().to_string();

        let receiver = {
            let mut subscribers = self.subscribers.write().await;
            subscribers
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
                .subscribe()
        };

        self.subscriptions
            .write()
            .await
            .insert(id.clone(), topic.to_string());
        self.stats.write().await.active_subscriptions += 1;

        Ok(Subscription {
            id,
            topic: topic.to_string(),
            receiver,
        })
    }

    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()> {
        self.handlers.write().await.push(handler);
        self.stats.write().await.registered_handlers += 1;
        Ok(())
    }

    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()> {
        let removed = self.subscriptions.write().await.remove(subscription_id);
        if let Some(pattern) = removed {
            let still_used = self
                .subscriptions
                .read()
                .await
                .values()
                .any(|p| *p == pattern);
            if !still_used {
                self.subscribers.write().await.remove(&pattern);
            }

            let mut stats = self.stats.write().await;
            stats.active_subscriptions = stats.active_subscriptions.saturating_sub(1);
        }
        Ok(())
    }

    async fn stats(&self) -> EventBusStats {
        self.stats.read().await.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventCategory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(event_type: &str) -> Event {
        Event::new(event_type, EventCategory::Team, serde_json::json!({}))
    }

    #[tokio::test]
    async fn test_memory_event_bus_publish_subscribe() {
        let bus = MemoryEventBus::new();
        let mut sub = bus.subscribe("tenancy.team.*").await.unwrap();

        bus.publish(event("team.created")).await.unwrap();
        bus.publish(event("member.added")).await.unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event_type, "team.created");
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_topic_matching() {
        assert!(topic_matches("tenancy.team.created", "tenancy.team.created"));

        assert!(topic_matches("tenancy.team.*", "tenancy.team.created"));
        assert!(topic_matches("tenancy.*.created", "tenancy.team.created"));
        assert!(topic_matches("*.team.created", "tenancy.team.created"));

        assert!(topic_matches("tenancy.#", "tenancy.team.created"));
        assert!(topic_matches("#", "tenancy.team.created"));
        assert!(topic_matches("tenancy.#.created", "tenancy.created"));
        assert!(topic_matches("#.member_added", "tenancy.team.member_added"));

        assert!(!topic_matches("tenancy.team.deleted", "tenancy.team.created"));
        assert!(!topic_matches("tenancy.member.*", "tenancy.team.created"));
        assert!(!topic_matches("tenancy.*", "tenancy.team.created"));
    }

    struct Counter {
        hits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for Counter {
        async fn handle(&self, _event: Event) -> EventBusResult<()> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn topics(&self) -> Vec<String> {
            vec!["tenancy.invitation.#".to_string()]
        }
    }

    #[tokio::test]
    async fn test_handler_receives_matching_events() {
        let bus = MemoryEventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.register_handler(Arc::new(Counter { hits: hits.clone() }))
            .await
            .unwrap();

        bus.publish(event("invitation.created")).await.unwrap();
        bus.publish(event("team.deleted")).await.unwrap();

        for _ in 0..50 {
            if hits.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.stats().await.registered_handlers, 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let bus = MemoryEventBus::new();

        let stats = bus.stats().await;
        assert_eq!(stats.events_published, 0);
        assert_eq!(stats.active_subscriptions, 0);

        let sub = bus.subscribe("tenancy.#").await.unwrap();
        assert_eq!(bus.stats().await.active_subscriptions, 1);

        bus.publish(event("team.created")).await.unwrap();
        let stats = bus.stats().await;
        assert_eq!(stats.events_published, 1);
        assert_eq!(stats.events_delivered, 1);

        bus.unsubscribe(&sub.id).await.unwrap();
        assert_eq!(bus.stats().await.active_subscriptions, 0);
        assert!(bus.subscribe("  ").await.is_err());
    }
}
