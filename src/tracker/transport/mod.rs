//! Delivery mechanisms for tracked events.
//!
//! Each mechanism implements [`Transport`]: it receives a fully assembled
//! [`TransportRequest`] and reports exactly one outcome through [`Callbacks`], always from a
//! later task and never from inside `send`.

mod direct;
mod pixel;
mod script;

use std::fmt;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::tracker::config::EventPayload;
use crate::tracker::error::TrackerError;
use crate::tracker::selector::ResolvedTransport;

pub use direct::{classify_response, DirectRequestTransport};
pub use pixel::{
    beacon_url, component_escape, sniff_image_dimensions, HttpImageHost, ImageDimensions,
    ImageHost, ImageLoad, PixelBeaconTransport,
};
pub use script::{
    parse_jsonp_body, script_url, unique_callback_name, HttpScriptHost, ScriptHost,
    ScriptInjectionTransport, ScriptLoad, ScriptRequest,
};

pub type SuccessCallback = Box<dyn FnOnce(Value) + Send + 'static>;
pub type FailureCallback = Box<dyn FnOnce(TrackerError) + Send + 'static>;

/// Optional completion handlers for one upload.
///
/// Settling consumes the value, so at most one handler ever runs. With neither handler set the
/// outcome is discarded.
#[derive(Default)]
pub struct Callbacks {
    on_success: Option<SuccessCallback>,
    on_failure: Option<FailureCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire-and-forget: no handler at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_failure<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(TrackerError) + Send + 'static,
    {
        self.on_failure = Some(Box::new(callback));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_success.is_none() && self.on_failure.is_none()
    }

    pub fn succeed(self, response: Value) {
        if let Some(callback) = self.on_success {
            callback(response);
        }
    }

    pub fn fail(self, error: TrackerError) {
        if let Some(callback) = self.on_failure {
            callback(error);
        }
    }

    pub fn settle(self, outcome: Result<Value, TrackerError>) {
        match outcome {
            Ok(response) => self.succeed(response),
            Err(error) => self.fail(error),
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

/// Shared one-shot wrapper around [`Callbacks`] for mechanisms whose environment may emit more
/// than one completion signal. The first signal settles; later ones are ignored.
#[derive(Clone)]
pub struct Completion {
    callbacks: Arc<Mutex<Option<Callbacks>>>,
}

impl Completion {
    pub fn new(callbacks: Callbacks) -> Self {
        Self {
            callbacks: Arc::new(Mutex::new(Some(callbacks))),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.callbacks.lock().unwrap().is_none()
    }

    /// Returns `false` when the completion had already settled.
    pub fn succeed(&self, response: Value) -> bool {
        self.settle(Ok(response))
    }

    /// Returns `false` when the completion had already settled.
    pub fn fail(&self, error: TrackerError) -> bool {
        self.settle(Err(error))
    }

    fn settle(&self, outcome: Result<Value, TrackerError>) -> bool {
        // Take the handlers out first so user code never runs under the lock.
        let callbacks = self.callbacks.lock().unwrap().take();
        match callbacks {
            Some(callbacks) => {
                callbacks.settle(outcome);
                true
            }
            None => false,
        }
    }
}

/// Everything a mechanism needs to deliver one event.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    /// `{base_url}/projects/{project_id}/events/{collection}`
    pub destination: String,
    pub payload: EventPayload,
    /// The write key.
    pub credential: Option<String>,
    /// Only honoured by direct requests on native targets.
    pub timeout: Duration,
}

/// A delivery mechanism. Implementations must not invoke `callbacks` before `send` returns.
pub trait Transport: Send + Sync {
    fn kind(&self) -> ResolvedTransport;

    fn send(&self, request: TransportRequest, callbacks: Callbacks);
}

/// The three mechanisms available to a client, indexed by [`ResolvedTransport`].
#[derive(Clone)]
pub struct TransportSet {
    direct: Arc<dyn Transport>,
    script: Arc<dyn Transport>,
    pixel: Arc<dyn Transport>,
}

impl TransportSet {
    pub fn new(
        direct: Arc<dyn Transport>,
        script: Arc<dyn Transport>,
        pixel: Arc<dyn Transport>,
    ) -> Self {
        Self {
            direct,
            script,
            pixel,
        }
    }

    /// Mechanisms backed by the current platform: DOM elements in the browser, HTTP fetches
    /// everywhere else.
    pub fn platform_default() -> Self {
        Self {
            direct: Arc::new(DirectRequestTransport::new()),
            script: Arc::new(ScriptInjectionTransport::new(default_script_host())),
            pixel: Arc::new(PixelBeaconTransport::new(default_image_host())),
        }
    }

    /// Routes every resolved transport to the same implementation.
    pub fn uniform(transport: Arc<dyn Transport>) -> Self {
        Self {
            direct: transport.clone(),
            script: transport.clone(),
            pixel: transport,
        }
    }

    pub fn with_direct(mut self, transport: Arc<dyn Transport>) -> Self {
        self.direct = transport;
        self
    }

    pub fn with_script(mut self, transport: Arc<dyn Transport>) -> Self {
        self.script = transport;
        self
    }

    pub fn with_pixel(mut self, transport: Arc<dyn Transport>) -> Self {
        self.pixel = transport;
        self
    }

    pub fn get(&self, kind: ResolvedTransport) -> Arc<dyn Transport> {
        match kind {
            ResolvedTransport::Direct => self.direct.clone(),
            ResolvedTransport::Script => self.script.clone(),
            ResolvedTransport::Pixel => self.pixel.clone(),
        }
    }
}

impl Default for TransportSet {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Debug for TransportSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSet")
            .field("direct", &self.direct.kind())
            .field("script", &self.script.kind())
            .field("pixel", &self.pixel.kind())
            .finish()
    }
}

/// HTTP client shared by every mechanism that talks to the network directly.
pub(crate) fn shared_http_client() -> Client {
    static CLIENT: LazyLock<Client> = LazyLock::new(|| {
        Client::builder()
            .build()
            .expect("Failed to construct reqwest client")
    });
    CLIENT.clone()
}

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
fn default_script_host() -> Arc<dyn ScriptHost> {
    Arc::new(crate::platform::browser::dom::DomScriptHost::new())
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
fn default_script_host() -> Arc<dyn ScriptHost> {
    Arc::new(HttpScriptHost::new())
}

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
fn default_image_host() -> Arc<dyn ImageHost> {
    Arc::new(crate::platform::browser::dom::DomImageHost::new())
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
fn default_image_host() -> Arc<dyn ImageHost> {
    Arc::new(HttpImageHost::new())
}
