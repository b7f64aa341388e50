use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::channel::oneshot;
use serde_json::Value;
use url::Url;

use crate::platform::environment::Capabilities;
use crate::platform::runtime;
use crate::tracker::config::{ClientConfig, EventPayload, GlobalPropertiesProvider};
use crate::tracker::constants::DEFAULT_LINK_TIMEOUT;
use crate::tracker::error::{internal_error, missing_project_id, TrackerResult};
use crate::tracker::logger::{usage_hint, LOGGER};
use crate::tracker::selector::{self, ResolvedTransport};
use crate::tracker::transport::{Callbacks, TransportSet};
use crate::tracker::uploader;

/// Handler registered through [`Keen::on_ready`].
pub type ReadyHandler = Box<dyn FnOnce(&Keen) + Send + 'static>;

/// A tracker client.
///
/// Cloning is cheap and every clone shares the same configuration. A client built without a
/// usable configuration stays unconfigured: events sent through it are logged and dropped until
/// [`Keen::configure`] succeeds.
#[derive(Clone)]
pub struct Keen {
    inner: Arc<KeenInner>,
}

struct KeenInner {
    capabilities: Capabilities,
    transports: TransportSet,
    state: Mutex<Option<ClientState>>,
    ready: Mutex<Vec<ReadyHandler>>,
}

#[derive(Clone)]
struct ClientState {
    config: ClientConfig,
    resolved: ResolvedTransport,
}

impl Keen {
    /// Creates a client for the current platform.
    ///
    /// Construction never fails. Without a configuration the usage guide is logged; an empty
    /// project id is logged and leaves the client unconfigured.
    pub fn new(config: Option<ClientConfig>) -> Self {
        Self::with_environment(
            config,
            Capabilities::detect(),
            TransportSet::platform_default(),
        )
    }

    /// Creates a client with explicit capabilities and transports.
    pub fn with_environment(
        config: Option<ClientConfig>,
        capabilities: Capabilities,
        transports: TransportSet,
    ) -> Self {
        let keen = Self::unconfigured(capabilities, transports);
        match config {
            Some(config) => {
                keen.configure(config);
            }
            None => usage_hint(),
        }
        keen
    }

    /// Creates a client that waits for [`Keen::configure`].
    pub fn unconfigured(capabilities: Capabilities, transports: TransportSet) -> Self {
        Self {
            inner: Arc::new(KeenInner {
                capabilities,
                transports,
                state: Mutex::new(None),
                ready: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Replaces the whole configuration and resolves the transport for it.
    ///
    /// Handlers waiting in [`Keen::on_ready`] run once the first configuration is applied.
    pub fn configure(&self, config: ClientConfig) -> &Self {
        if config.project_id.trim().is_empty() {
            LOGGER.warn("Please provide a projectId");
            return self;
        }
        if let Some(base_url) = config.base_url.as_deref() {
            if let Err(err) = Url::parse(base_url) {
                LOGGER.warn(format!("Base URL {base_url} does not look like a URL: {err}"));
            }
        }

        let resolved = selector::resolve(config.transport, &self.inner.capabilities);
        log::debug!(
            "configured project {} with {} transport",
            config.project_id,
            resolved
        );
        // State changes under the ready lock; `on_ready_boxed` checks it under the same lock.
        let ready = {
            let mut ready = self.inner.ready.lock().unwrap();
            *self.inner.state.lock().unwrap() = Some(ClientState { config, resolved });
            std::mem::take(&mut *ready)
        };
        for handler in ready {
            handler(self);
        }
        self
    }

    pub fn is_configured(&self) -> bool {
        self.inner.state.lock().unwrap().is_some()
    }

    /// A copy of the active configuration.
    pub fn config(&self) -> Option<ClientConfig> {
        self.state().map(|state| state.config)
    }

    pub fn resolved_transport(&self) -> Option<ResolvedTransport> {
        self.state().map(|state| state.resolved)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities
    }

    /// Sends one event to `collection`.
    ///
    /// The outcome is reported through `callbacks` on a later task. Missing credentials and
    /// unconfigured clients are logged and the event is dropped without running a callback.
    pub fn add_event(&self, collection: &str, properties: EventPayload, callbacks: Callbacks) {
        let _ = self.dispatch(collection, properties, callbacks);
    }

    /// Sends one event and waits for its outcome.
    pub async fn add_event_async(
        &self,
        collection: &str,
        properties: EventPayload,
    ) -> TrackerResult<Value> {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let failure_tx = tx.clone();
        let callbacks = Callbacks::new()
            .on_success(move |response| {
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(Ok(response));
                }
            })
            .on_failure(move |error| {
                if let Some(tx) = failure_tx.lock().unwrap().take() {
                    let _ = tx.send(Err(error));
                }
            });

        self.dispatch(collection, properties, callbacks)?;
        rx.await
            .map_err(|_| internal_error("event outcome was dropped before delivery"))?
    }

    /// Replaces the provider whose properties are merged into every event.
    pub fn set_global_properties<F>(&self, provider: F) -> TrackerResult<()>
    where
        F: Fn(&str) -> EventPayload + Send + Sync + 'static,
    {
        self.set_global_properties_provider(Arc::new(provider))
    }

    pub fn set_global_properties_provider(
        &self,
        provider: GlobalPropertiesProvider,
    ) -> TrackerResult<()> {
        if let Some(state) = self.inner.state.lock().unwrap().as_mut() {
            state.config.global_properties = Some(provider);
            return Ok(());
        }
        usage_hint();
        Err(missing_project_id(
            "global properties require a configured client",
        ))
    }

    /// Sends an event before running `action`, typically a navigation.
    ///
    /// `action` runs exactly once: when the upload settles or when `timeout` (500 ms by default)
    /// elapses, whichever comes first. The upload is not cancelled by the timer.
    pub fn track_external_link<A>(
        &self,
        collection: &str,
        properties: EventPayload,
        timeout: Option<Duration>,
        action: A,
    ) where
        A: FnOnce() + Send + 'static,
    {
        let action = Arc::new(Mutex::new(Some(action)));
        let run = move || {
            let action = action.clone();
            move || {
                let action = action.lock().unwrap().take();
                if let Some(action) = action {
                    action();
                }
            }
        };

        let on_success = run();
        let on_failure = run();
        let on_timeout = run();
        self.add_event(
            collection,
            properties,
            Callbacks::new()
                .on_success(move |_| on_success())
                .on_failure(move |_| on_failure()),
        );

        let timeout = timeout.unwrap_or(DEFAULT_LINK_TIMEOUT);
        runtime::spawn_detached(async move {
            runtime::sleep(timeout).await;
            on_timeout();
        });
    }

    /// Runs `handler` once the client is configured. On a configured client the handler runs on
    /// a later task.
    pub fn on_ready<F>(&self, handler: F)
    where
        F: FnOnce(&Keen) + Send + 'static,
    {
        self.on_ready_boxed(Box::new(handler));
    }

    pub(crate) fn on_ready_boxed(&self, handler: ReadyHandler) {
        let mut ready = self.inner.ready.lock().unwrap();
        if !self.is_configured() {
            ready.push(handler);
            return;
        }
        drop(ready);

        let keen = self.clone();
        runtime::spawn_detached(async move {
            handler(&keen);
        });
    }

    fn state(&self) -> Option<ClientState> {
        self.inner.state.lock().unwrap().clone()
    }

    fn dispatch(
        &self,
        collection: &str,
        properties: EventPayload,
        callbacks: Callbacks,
    ) -> TrackerResult<()> {
        let Some(state) = self.state() else {
            usage_hint();
            return Err(missing_project_id(
                "events cannot be sent before the client is configured",
            ));
        };
        let transport = self.inner.transports.get(state.resolved);
        uploader::upload(
            &state.config,
            transport.as_ref(),
            collection,
            properties,
            callbacks,
        )
    }
}

impl fmt::Debug for Keen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Keen")
            .field("capabilities", &self.inner.capabilities)
            .field("config", &state.as_ref().map(|state| &state.config))
            .field("resolved", &state.as_ref().map(|state| state.resolved))
            .finish()
    }
}
