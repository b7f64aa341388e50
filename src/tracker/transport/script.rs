use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use reqwest::Client;
use serde_json::Value;

use crate::platform::runtime;
use crate::tracker::constants::JSONP_CALLBACK_PREFIX;
use crate::tracker::error::{internal_error, load_signal_error};
use crate::tracker::logger::LOGGER;
use crate::tracker::selector::ResolvedTransport;
use crate::tracker::transport::{
    shared_http_client, Callbacks, Completion, Transport, TransportRequest,
};
use crate::util::base64;

/// What the host needs to load one script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptRequest {
    pub url: String,
    /// Global name the response will call.
    pub callback_name: String,
}

/// Completion signals a host reports while a script loads.
///
/// The remote endpoint answers by calling the generated callback, which maps to
/// [`ScriptLoad::callback`]. Environments report failures through an error event or, on older
/// engines, a `readyState` of `loaded` reached without the callback having run. Only the first
/// signal counts.
#[derive(Clone)]
pub struct ScriptLoad {
    completion: Completion,
}

impl ScriptLoad {
    pub fn new(completion: Completion) -> Self {
        Self { completion }
    }

    /// The generated global callback was invoked with `response`.
    pub fn callback(&self, response: Value) {
        self.completion.succeed(response);
    }

    /// The script element fired its error event.
    pub fn error(&self) {
        if self
            .completion
            .fail(load_signal_error("script injection failed to load"))
        {
            LOGGER.warn("JSONP request failed.");
        }
    }

    /// The script element reported a ready-state change.
    pub fn ready_state(&self, state: &str) {
        if state == "loaded" && !self.completion.is_settled() {
            self.error();
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.completion.is_settled()
    }
}

/// Environment primitive that binds a global callback name and loads a script URL.
pub trait ScriptHost: Send + Sync {
    /// Whether `name` is already taken in the global namespace.
    fn is_bound(&self, name: &str) -> bool;

    /// Binds `request.callback_name`, loads `request.url` and reports signals to `load`.
    /// The host unbinds the name once the callback has run.
    fn inject(&self, request: ScriptRequest, load: ScriptLoad);
}

/// Sends events as a `GET` whose response is a script calling a generated global callback.
#[derive(Clone)]
pub struct ScriptInjectionTransport {
    host: Arc<dyn ScriptHost>,
}

impl ScriptInjectionTransport {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self { host }
    }
}

impl Transport for ScriptInjectionTransport {
    fn kind(&self) -> ResolvedTransport {
        ResolvedTransport::Script
    }

    fn send(&self, request: TransportRequest, callbacks: Callbacks) {
        let completion = Completion::new(callbacks);
        let json = match serde_json::to_string(&request.payload) {
            Ok(json) => json,
            Err(err) => {
                let error = internal_error(format!("failed to serialize event payload: {err}"));
                runtime::spawn_detached(async move {
                    completion.fail(error);
                });
                return;
            }
        };

        let timestamp = runtime::now_millis();
        let url = script_url(
            &request.destination,
            request.credential.as_deref(),
            &base64::encode(&json),
            timestamp,
        );
        let callback_name = unique_callback_name(timestamp, |name| self.host.is_bound(name));
        let url = format!("{url}&jsonp={callback_name}");

        log::debug!("JSONP {url}");
        self.host.inject(
            ScriptRequest { url, callback_name },
            ScriptLoad::new(completion),
        );
    }
}

/// Builds the script URL (without the `jsonp` parameter). Values are appended verbatim.
pub fn script_url(
    destination: &str,
    credential: Option<&str>,
    encoded_payload: &str,
    timestamp: i64,
) -> String {
    let mut params = Vec::with_capacity(3);
    if let Some(credential) = credential {
        params.push(format!("api_key={credential}"));
    }
    params.push(format!("data={encoded_payload}"));
    params.push(format!("modified={timestamp}"));
    format!("{destination}?{}", params.join("&"))
}

/// `keenJSONPCallback{timestamp}`, with `a` appended until the name is free.
pub fn unique_callback_name(timestamp: i64, is_bound: impl Fn(&str) -> bool) -> String {
    let mut name = format!("{JSONP_CALLBACK_PREFIX}{timestamp}");
    while is_bound(&name) {
        name.push('a');
    }
    name
}

/// Extracts the argument of `callback_name(...)` from a JSONP response body.
pub fn parse_jsonp_body(callback_name: &str, body: &str) -> Option<Value> {
    let body = body.trim().trim_end_matches(';').trim_end();
    let rest = body.strip_prefix(callback_name)?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    serde_json::from_str(inner).ok()
}

/// Script host for environments without a DOM: fetches the script and evaluates the
/// `callback(json)` wrapper itself. Callback names are bound in a registry private to the host.
#[derive(Clone)]
pub struct HttpScriptHost {
    client: Client,
    bound: Arc<Mutex<HashSet<String>>>,
}

impl HttpScriptHost {
    pub fn new() -> Self {
        Self::with_client(shared_http_client())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            bound: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl Default for HttpScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptHost for HttpScriptHost {
    fn is_bound(&self, name: &str) -> bool {
        self.bound.lock().unwrap().contains(name)
    }

    fn inject(&self, request: ScriptRequest, load: ScriptLoad) {
        self.bound
            .lock()
            .unwrap()
            .insert(request.callback_name.clone());
        let client = self.client.clone();
        let bound = self.bound.clone();

        runtime::spawn_detached(async move {
            let ScriptRequest { url, callback_name } = request;
            let body = match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => response.text().await.ok(),
                Ok(response) => {
                    log::debug!("script request returned status {}", response.status());
                    None
                }
                Err(err) => {
                    log::debug!("script request failed: {err}");
                    None
                }
            };

            match body.and_then(|body| parse_jsonp_body(&callback_name, &body)) {
                Some(response) => load.callback(response),
                None => load.error(),
            }
            bound.lock().unwrap().remove(&callback_name);
        });
    }
}
