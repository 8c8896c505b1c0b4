//! Subscriber registry and synchronous dispatch.

use habitat_types::{MarkerEvent, SubscriberId};
use tracing::{debug, trace, warn};

/// Something that reacts to marker events.
pub trait MarkerSubscriber {
    /// Handle one event. Called synchronously from [`MarkerBus::publish`].
    fn on_marker(&mut self, event: &MarkerEvent);
}

/// Lends out mutable access to subscribers by identity.
pub trait SubscriberResolver {
    /// Return the subscriber registered under `id`, if it still exists.
    fn resolve(&mut self, id: SubscriberId) -> Option<&mut dyn MarkerSubscriber>;
}

/// A process-local publish/subscribe channel for marker events.
///
/// Subscribers are notified in the order they subscribed. Registration is
/// idempotent: subscribing twice delivers once, unsubscribing an unknown
/// identity is a no-op. Nothing is persisted; an event published with no
/// subscribers is simply dropped.
#[derive(Debug, Default, Clone)]
pub struct MarkerBus {
    subscribers: Vec<SubscriberId>,
    published: u64,
}

impl MarkerBus {
    /// Create an empty bus.
    pub const fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            published: 0,
        }
    }

    /// Register `id`. Returns `false` if it was already registered.
    pub fn subscribe(&mut self, id: SubscriberId) -> bool {
        if self.subscribers.contains(&id) {
            return false;
        }
        self.subscribers.push(id);
        debug!(subscriber = %id, total = self.subscribers.len(), "Marker bus subscriber added");
        true
    }

    /// Deregister `id`. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| *s != id);
        let removed = self.subscribers.len() != before;
        if removed {
            debug!(subscriber = %id, total = self.subscribers.len(), "Marker bus subscriber removed");
        }
        removed
    }

    /// Whether `id` is currently registered.
    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.subscribers.contains(&id)
    }

    /// Current subscribers in delivery order.
    pub fn subscribers(&self) -> &[SubscriberId] {
        &self.subscribers
    }

    /// Number of current subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Total events published over the bus's lifetime.
    pub const fn published_count(&self) -> u64 {
        self.published
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    ///
    /// Returns how many subscribers received it. A subscriber identity the
    /// resolver no longer knows is skipped with a warning.
    pub fn publish<R>(&mut self, event: &MarkerEvent, resolver: &mut R) -> usize
    where
        R: SubscriberResolver + ?Sized,
    {
        self.published = self.published.saturating_add(1);

        if self.subscribers.is_empty() {
            debug!(
                entity = %event.entity,
                category = ?event.category,
                kind = ?event.kind,
                "Marker event published with no subscribers"
            );
            return 0;
        }

        let mut delivered: usize = 0;
        for id in &self.subscribers {
            match resolver.resolve(*id) {
                Some(subscriber) => {
                    subscriber.on_marker(event);
                    delivered = delivered.saturating_add(1);
                }
                None => {
                    warn!(subscriber = %id, entity = %event.entity, "Marker subscriber missing, skipped");
                }
            }
        }

        trace!(
            entity = %event.entity,
            category = ?event.category,
            kind = ?event.kind,
            delivered,
            "Marker event delivered"
        );
        delivered
    }

    /// Publish a batch of events in iteration order.
    pub fn publish_all<I, R>(&mut self, events: I, resolver: &mut R) -> usize
    where
        I: IntoIterator<Item = MarkerEvent>,
        R: SubscriberResolver + ?Sized,
    {
        events
            .into_iter()
            .map(|event| self.publish(&event, resolver))
            .fold(0, usize::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use habitat_types::{AgentId, Entity, EntityCategory, MapId, MarkerEventKind, Position};

    use super::*;

    /// Records every event it sees, tagged with its own identity.
    struct Recorder {
        id: SubscriberId,
        log: Vec<(SubscriberId, MarkerEvent)>,
    }

    impl MarkerSubscriber for Recorder {
        fn on_marker(&mut self, event: &MarkerEvent) {
            self.log.push((self.id, *event));
        }
    }

    #[derive(Default)]
    struct Registry {
        recorders: BTreeMap<SubscriberId, Recorder>,
    }

    impl Registry {
        fn add(&mut self, id: SubscriberId) {
            self.recorders.insert(id, Recorder { id, log: Vec::new() });
        }

        fn count(&self, id: SubscriberId) -> usize {
            self.recorders.get(&id).map_or(0, |r| r.log.len())
        }
    }

    impl SubscriberResolver for Registry {
        fn resolve(&mut self, id: SubscriberId) -> Option<&mut dyn MarkerSubscriber> {
            self.recorders
                .get_mut(&id)
                .map(|r| r as &mut dyn MarkerSubscriber)
        }
    }

    fn food_event() -> MarkerEvent {
        MarkerEvent::spawned(&Entity::new(EntityCategory::Food, Position::ORIGIN))
    }

    #[test]
    fn subscribe_is_idempotent() {
        let mut bus = MarkerBus::new();
        let id = SubscriberId::Agent(AgentId(1));
        assert!(bus.subscribe(id));
        assert!(!bus.subscribe(id));
        assert_eq!(bus.len(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert!(bus.is_empty());
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let mut bus = MarkerBus::new();
        let mut registry = Registry::default();
        assert_eq!(bus.publish(&food_event(), &mut registry), 0);
        assert_eq!(bus.published_count(), 1);
    }

    #[test]
    fn delivery_reaches_every_subscriber_once() {
        let mut bus = MarkerBus::new();
        let mut registry = Registry::default();
        let a = SubscriberId::Agent(AgentId(1));
        let m = SubscriberId::Map(MapId::new());
        registry.add(a);
        registry.add(m);
        bus.subscribe(a);
        bus.subscribe(a);
        bus.subscribe(m);

        let delivered = bus.publish(&food_event(), &mut registry);
        assert_eq!(delivered, 2);
        assert_eq!(registry.count(a), 1);
        assert_eq!(registry.count(m), 1);
    }

    #[test]
    fn events_arrive_in_publish_order() {
        let mut bus = MarkerBus::new();
        let mut registry = Registry::default();
        let a = SubscriberId::Agent(AgentId(1));
        registry.add(a);
        bus.subscribe(a);

        let food = Entity::new(EntityCategory::Food, Position::ORIGIN);
        let events = [MarkerEvent::spawned(&food), MarkerEvent::removed(&food)];
        assert_eq!(bus.publish_all(events, &mut registry), 2);

        let kinds: Vec<_> = registry.recorders[&a].log.iter().map(|(_, e)| e.kind).collect();
        assert_eq!(kinds, vec![MarkerEventKind::Spawned, MarkerEventKind::Removed]);
    }

    #[test]
    fn missing_subscriber_is_skipped() {
        let mut bus = MarkerBus::new();
        let mut registry = Registry::default();
        let present = SubscriberId::Agent(AgentId(1));
        let gone = SubscriberId::Agent(AgentId(2));
        registry.add(present);
        bus.subscribe(gone);
        bus.subscribe(present);

        assert_eq!(bus.publish(&food_event(), &mut registry), 1);
        assert_eq!(registry.count(present), 1);
    }

    #[test]
    fn unsubscribed_stops_receiving() {
        let mut bus = MarkerBus::new();
        let mut registry = Registry::default();
        let a = SubscriberId::Agent(AgentId(1));
        registry.add(a);
        bus.subscribe(a);
        bus.publish(&food_event(), &mut registry);
        bus.unsubscribe(a);
        bus.publish(&food_event(), &mut registry);
        assert_eq!(registry.count(a), 1);
    }
}
