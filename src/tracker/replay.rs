//! Calls recorded before a real client exists, and their one-time replay.
//!
//! A page may start using the tracker before the library has loaded. Each such early client is
//! represented by a [`PendingClient`] stand-in that records what was asked of it. When the library
//! comes up, [`replay_pending_calls`] drains the process-wide registry once, builds a real
//! [`Keen`] for every stand-in and applies the recorded calls in this order: configuration,
//! global properties, queued events (first in, first out), ready handlers.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex};

use crate::platform::environment::Capabilities;
use crate::tracker::api::{Keen, ReadyHandler};
use crate::tracker::config::{ClientConfig, EventPayload, GlobalPropertiesProvider};
use crate::tracker::error::{internal_error, TrackerResult};
use crate::tracker::transport::{Callbacks, TransportSet};

/// An `add_event` call captured by a stand-in.
#[derive(Debug)]
pub struct QueuedEvent {
    pub collection: String,
    pub properties: EventPayload,
    pub callbacks: Callbacks,
}

/// Stand-in that records calls made before the real client exists.
///
/// Configuration and global properties keep only the latest value; events and ready handlers
/// queue in call order.
#[derive(Default)]
pub struct PendingClient {
    config: Option<ClientConfig>,
    global_properties: Option<GlobalPropertiesProvider>,
    events: VecDeque<QueuedEvent>,
    ready: Vec<ReadyHandler>,
}

impl PendingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&mut self, config: ClientConfig) -> &mut Self {
        self.config = Some(config);
        self
    }

    pub fn set_global_properties<F>(&mut self, provider: F) -> &mut Self
    where
        F: Fn(&str) -> EventPayload + Send + Sync + 'static,
    {
        self.global_properties = Some(Arc::new(provider));
        self
    }

    pub fn add_event(
        &mut self,
        collection: impl Into<String>,
        properties: EventPayload,
        callbacks: Callbacks,
    ) -> &mut Self {
        self.events.push_back(QueuedEvent {
            collection: collection.into(),
            properties,
            callbacks,
        });
        self
    }

    pub fn on_ready<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(&Keen) + Send + 'static,
    {
        self.ready.push(Box::new(handler));
        self
    }

    pub fn queued_events(&self) -> usize {
        self.events.len()
    }

    /// Transfers every recorded call onto `client`.
    pub fn apply_to(self, client: &Keen) {
        let PendingClient {
            config,
            global_properties,
            mut events,
            ready,
        } = self;

        if let Some(config) = config {
            client.configure(config);
        }
        if let Some(provider) = global_properties {
            let _ = client.set_global_properties_provider(provider);
        }
        while let Some(event) = events.pop_front() {
            client.add_event(&event.collection, event.properties, event.callbacks);
        }
        for handler in ready {
            client.on_ready_boxed(handler);
        }
    }
}

impl fmt::Debug for PendingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingClient")
            .field("config", &self.config)
            .field("global_properties", &self.global_properties.is_some())
            .field("events", &self.events)
            .field("ready", &self.ready.len())
            .finish()
    }
}

/// Stand-ins keyed by client instance.
#[derive(Debug, Default)]
pub struct PendingCallRegistry {
    clients: HashMap<String, PendingClient>,
}

impl PendingCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stand-in for `key`, created on first use.
    pub fn stand_in(&mut self, key: impl Into<String>) -> &mut PendingClient {
        self.clients.entry(key.into()).or_default()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Builds a client per stand-in with `factory` and replays its calls onto it. Consuming the
    /// registry guarantees the replay happens once.
    ///
    /// Instances are visited in no particular order.
    pub fn drain_once<F>(self, mut factory: F) -> HashMap<String, Keen>
    where
        F: FnMut(&str) -> Keen,
    {
        let mut clients = HashMap::with_capacity(self.clients.len());
        for (key, pending) in self.clients {
            let client = factory(&key);
            log::debug!(
                "replaying {} queued events for client '{key}'",
                pending.queued_events()
            );
            pending.apply_to(&client);
            clients.insert(key, client);
        }
        clients
    }
}

static PENDING_CALLS: LazyLock<Mutex<Option<PendingCallRegistry>>> =
    LazyLock::new(|| Mutex::new(Some(PendingCallRegistry::new())));

/// Records calls against the process-wide stand-in for `key`.
///
/// Fails once [`replay_pending_calls`] has run; from then on callers should use the real client.
pub fn record_pending<R>(
    key: &str,
    record: impl FnOnce(&mut PendingClient) -> R,
) -> TrackerResult<R> {
    let mut registry = PENDING_CALLS.lock().unwrap();
    match registry.as_mut() {
        Some(registry) => Ok(record(registry.stand_in(key))),
        None => Err(internal_error(
            "pending calls were already replayed; use the client instead",
        )),
    }
}

/// Drains the process-wide registry into real clients built for the current platform.
///
/// Only the first call does any work; later calls return an empty map.
pub fn replay_pending_calls() -> HashMap<String, Keen> {
    let registry = PENDING_CALLS.lock().unwrap().take();
    match registry {
        Some(registry) => registry.drain_once(|_| {
            Keen::unconfigured(Capabilities::detect(), TransportSet::platform_default())
        }),
        None => {
            log::debug!("pending calls already replayed");
            HashMap::new()
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::test_support::RecordingTransport;
    use crate::tracker::selector::ResolvedTransport;
    use futures::channel::oneshot;
    use serde_json::{json, Value};

    fn payload(value: Value) -> EventPayload {
        value.as_object().cloned().unwrap()
    }

    fn factory(transport: &RecordingTransport) -> impl FnMut(&str) -> Keen + '_ {
        move |_| {
            Keen::unconfigured(
                Capabilities::new(true),
                TransportSet::uniform(Arc::new(transport.clone())),
            )
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn queued_events_replay_in_order() {
        let transport = RecordingTransport::new(ResolvedTransport::Direct);
        let mut registry = PendingCallRegistry::new();
        registry
            .stand_in("main")
            .configure(ClientConfig::new("p1").with_write_key("wk"))
            .add_event("purchases", payload(json!({"price": 5})), Callbacks::none())
            .add_event("pageviews", payload(json!({"path": "/"})), Callbacks::none());

        let clients = registry.drain_once(factory(&transport));

        assert_eq!(clients.len(), 1);
        assert!(clients["main"].is_configured());
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(transport.collections(), vec!["purchases", "pageviews"]);
        assert_eq!(
            Value::Object(requests[0].payload.clone()),
            json!({"price": 5})
        );
        assert_eq!(
            Value::Object(requests[1].payload.clone()),
            json!({"path": "/"})
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn global_properties_apply_before_queued_events() {
        let transport = RecordingTransport::new(ResolvedTransport::Direct);
        let mut registry = PendingCallRegistry::new();
        let (tx, rx) = oneshot::channel();
        registry
            .stand_in("main")
            .add_event(
                "signups",
                payload(json!({"plan": "pro"})),
                Callbacks::new().on_success(move |value| {
                    let _ = tx.send(value);
                }),
            )
            .set_global_properties(|collection| payload(json!({ "collection": collection })))
            .configure(ClientConfig::new("p1").with_write_key("wk"));

        registry.drain_once(factory(&transport));

        assert_eq!(rx.await.unwrap(), json!({"created": true}));
        assert_eq!(
            Value::Object(transport.requests()[0].payload.clone()),
            json!({"collection": "signups", "plan": "pro"})
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ready_handlers_run_after_queued_events() {
        let transport = RecordingTransport::new(ResolvedTransport::Direct);
        let mut registry = PendingCallRegistry::new();
        let (tx, rx) = oneshot::channel();
        let seen = transport.clone();
        registry
            .stand_in("main")
            .configure(ClientConfig::new("p1").with_write_key("wk"))
            .on_ready(move |_| {
                let _ = tx.send(seen.collections());
            })
            .add_event("purchases", EventPayload::new(), Callbacks::none());

        registry.drain_once(factory(&transport));

        assert_eq!(rx.await.unwrap(), vec!["purchases".to_string()]);
    }

    #[test]
    fn stand_ins_are_keyed_by_instance() {
        let mut registry = PendingCallRegistry::new();
        registry
            .stand_in("a")
            .add_event("x", EventPayload::new(), Callbacks::none());
        registry
            .stand_in("a")
            .add_event("y", EventPayload::new(), Callbacks::none());
        registry.stand_in("b");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.stand_in("a").queued_events(), 2);
    }

    #[test]
    fn stand_in_without_configuration_stays_unconfigured() {
        let transport = RecordingTransport::new(ResolvedTransport::Direct);
        let mut registry = PendingCallRegistry::new();
        registry
            .stand_in("early")
            .add_event("purchases", EventPayload::new(), Callbacks::none());

        let clients = registry.drain_once(factory(&transport));

        assert!(!clients["early"].is_configured());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn process_wide_registry_replays_once() {
        record_pending("global-test", |stand_in| {
            stand_in.configure(ClientConfig::new("p1"));
        })
        .unwrap();

        let clients = replay_pending_calls();
        assert!(clients.contains_key("global-test"));
        assert!(clients["global-test"].is_configured());

        assert!(replay_pending_calls().is_empty());
        let err = record_pending("late", |_| ()).unwrap_err();
        assert_eq!(err.code_str(), "keen/internal");
    }
}
