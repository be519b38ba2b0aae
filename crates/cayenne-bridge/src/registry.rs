//! Shared connection registry
//!
//! Every endpoint of one broker registers here. The registry fans
//! connection state out to registered endpoints, routes inbound messages
//! to the endpoint that subscribed for them, and keeps one transport
//! subscription per topic no matter how many endpoints share it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use cayenne_core::topic::topic_matches;
use cayenne_core::{PublishRequest, QoS};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    ConnectionListener, EndpointId, IncomingMessage, MessageHandler, Result, Transport,
};

struct Subscription {
    qos: QoS,
    handler: MessageHandler,
}

/// Subscriptions keyed by endpoint, then topic
#[derive(Default)]
struct SubscriptionTable {
    by_endpoint: HashMap<EndpointId, HashMap<String, Subscription>>,
    /// Topics whose last transport subscribe failed
    pending: HashSet<String>,
}

impl SubscriptionTable {
    fn holders(&self, topic: &str) -> usize {
        self.by_endpoint
            .values()
            .filter(|subs| subs.contains_key(topic))
            .count()
    }

    /// Highest QoS any holder asked for, `None` when nobody holds `topic`
    fn max_qos(&self, topic: &str) -> Option<QoS> {
        self.by_endpoint
            .values()
            .filter_map(|subs| subs.get(topic))
            .map(|sub| sub.qos)
            .max_by_key(|qos| qos.as_u8())
    }

    fn len(&self) -> usize {
        self.by_endpoint.values().map(HashMap::len).sum()
    }

    /// Distinct topics with the highest QoS any holder asked for
    fn topics(&self) -> HashMap<String, QoS> {
        let mut topics: HashMap<String, QoS> = HashMap::new();
        for subs in self.by_endpoint.values() {
            for (topic, sub) in subs {
                let qos = topics.entry(topic.clone()).or_insert(sub.qos);
                if sub.qos.as_u8() > qos.as_u8() {
                    *qos = sub.qos;
                }
            }
        }
        topics
    }
}

/// Multiplexes one transport connection across many endpoints
pub struct ConnectionRegistry {
    transport: Arc<dyn Transport>,
    connected: AtomicBool,
    endpoints: DashMap<EndpointId, Weak<dyn ConnectionListener>>,
    subscriptions: Mutex<SubscriptionTable>,
}

impl ConnectionRegistry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            connected: AtomicBool::new(false),
            endpoints: DashMap::new(),
            subscriptions: Mutex::new(SubscriptionTable::default()),
        }
    }

    /// Add an endpoint to the connection-state fan-out
    pub fn register(&self, endpoint_id: &EndpointId, listener: Arc<dyn ConnectionListener>) {
        let previous = self
            .endpoints
            .insert(endpoint_id.clone(), Arc::downgrade(&listener));

        if previous.is_some() {
            warn!("Endpoint {} registered twice, replacing listener", endpoint_id);
        } else {
            debug!("Endpoint {} registered", endpoint_id);
        }
    }

    /// Remove an endpoint and drop any subscriptions it still holds.
    ///
    /// `done` runs once teardown is complete, even for an endpoint that
    /// was never registered.
    pub fn deregister(&self, endpoint_id: &str, done: impl FnOnce()) {
        if self.endpoints.remove(endpoint_id).is_some() {
            debug!("Endpoint {} deregistered", endpoint_id);
        } else {
            debug!("Endpoint {} was not registered", endpoint_id);
        }

        {
            let mut table = self.subscriptions.lock();
            if let Some(leftover) = table.by_endpoint.remove(endpoint_id) {
                for topic in leftover.keys() {
                    if table.holders(topic) == 0 {
                        self.release(&mut table, topic);
                    }
                }
            }
        }

        done();
    }

    /// Subscribe `endpoint_id` to `topic`.
    ///
    /// Only the first endpoint interested in a topic causes a transport
    /// subscription; later ones share it. The transport is asked again when
    /// a later endpoint wants a higher QoS, or when the previous attempt
    /// for the topic failed.
    ///
    /// On a transport error the subscription stays in the table and is
    /// retried by the next `subscribe` for the topic or the next reconnect.
    pub fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        handler: MessageHandler,
        endpoint_id: &EndpointId,
    ) -> Result<()> {
        let mut table = self.subscriptions.lock();
        let current = table.max_qos(topic);

        table
            .by_endpoint
            .entry(endpoint_id.clone())
            .or_default()
            .insert(topic.to_string(), Subscription { qos, handler });

        let needs_transport = match current {
            None => true,
            Some(_) if table.pending.contains(topic) => true,
            Some(current) => qos.as_u8() > current.as_u8(),
        };

        if !needs_transport {
            debug!("Endpoint {} shares subscription to {}", endpoint_id, topic);
            return Ok(());
        }

        let effective = table.max_qos(topic).unwrap_or(qos);
        match self.transport.subscribe(topic, effective) {
            Ok(()) => {
                table.pending.remove(topic);
                debug!("Subscribed to {} (qos {})", topic, effective.as_u8());
                Ok(())
            }
            Err(e) => {
                table.pending.insert(topic.to_string());
                Err(e)
            }
        }
    }

    /// Drop `endpoint_id`'s subscription to `topic`, leaving other
    /// endpoints untouched
    pub fn unsubscribe(&self, topic: &str, endpoint_id: &str) {
        let mut table = self.subscriptions.lock();

        let removed = match table.by_endpoint.get_mut(endpoint_id) {
            Some(subs) => {
                let removed = subs.remove(topic).is_some();
                if subs.is_empty() {
                    table.by_endpoint.remove(endpoint_id);
                }
                removed
            }
            None => false,
        };

        if removed && table.holders(topic) == 0 {
            self.release(&mut table, topic);
        }
    }

    /// Hand a publish to the transport; no retry on failure
    pub fn publish(&self, request: PublishRequest) -> Result<()> {
        debug!(
            "Publishing to {}: {} (qos {}, retain {})",
            request.topic,
            request.payload,
            request.qos.as_u8(),
            request.retain
        );
        self.transport.publish(request)
    }

    /// Route an inbound message to every matching subscription.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, message: &IncomingMessage) -> usize {
        let handlers: Vec<MessageHandler> = {
            let table = self.subscriptions.lock();
            table
                .by_endpoint
                .values()
                .flat_map(|subs| subs.iter())
                .filter(|(topic, _)| topic_matches(topic, &message.topic))
                .map(|(_, sub)| Arc::clone(&sub.handler))
                .collect()
        };

        if handlers.is_empty() {
            debug!("No subscriber for {}", message.topic);
        }

        for handler in &handlers {
            handler(message);
        }

        handlers.len()
    }

    /// Record a connection state change reported by the transport and fan
    /// it out to every registered endpoint
    pub fn set_connected(&self, connected: bool) {
        let previous = self.connected.swap(connected, Ordering::SeqCst);
        if previous == connected {
            return;
        }

        if connected {
            info!("Connection established");
            self.resubscribe();
        } else {
            info!("Connection lost");
        }

        let listeners: Vec<Arc<dyn ConnectionListener>> = self
            .endpoints
            .iter()
            .filter_map(|entry| entry.value().upgrade())
            .collect();

        for listener in listeners {
            listener.connection_changed(connected);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of registered endpoints
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Number of (endpoint, topic) subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    pub fn is_registered(&self, endpoint_id: &str) -> bool {
        self.endpoints.contains_key(endpoint_id)
    }

    /// Re-issue one transport subscription per distinct topic
    fn resubscribe(&self) {
        let mut table = self.subscriptions.lock();
        for (topic, qos) in table.topics() {
            match self.transport.subscribe(&topic, qos) {
                Ok(()) => {
                    table.pending.remove(&topic);
                }
                Err(e) => {
                    warn!("Resubscribe to {} failed: {}", topic, e);
                    table.pending.insert(topic);
                }
            }
        }
    }

    /// Drop the transport subscription of a topic nobody holds any more
    fn release(&self, table: &mut SubscriptionTable, topic: &str) {
        if table.pending.remove(topic) {
            debug!("Dropped pending subscription to {}", topic);
            return;
        }

        match self.transport.unsubscribe(topic) {
            Ok(()) => debug!("Unsubscribed from {}", topic),
            Err(e) => warn!("Unsubscribe from {} failed: {}", topic, e),
        }
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connected", &self.is_connected())
            .field("endpoints", &self.endpoint_count())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
