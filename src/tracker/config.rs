use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tracker::constants::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::tracker::error::{invalid_argument, TrackerError};

/// Properties of a single event. Key order is irrelevant to the collection API.
pub type EventPayload = Map<String, Value>;

/// Computes properties merged into every event sent to the named collection.
pub type GlobalPropertiesProvider = Arc<dyn Fn(&str) -> EventPayload + Send + Sync + 'static>;

/// Delivery mechanism requested by the caller.
///
/// `Auto` and `Direct` are both subject to capability probing; `Script` and `Pixel` are used
/// verbatim. The historical names `xhr`, `jsonp` and `beacon` are accepted as aliases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPreference {
    #[default]
    Auto,
    #[serde(alias = "xhr")]
    Direct,
    #[serde(alias = "jsonp")]
    Script,
    #[serde(alias = "beacon")]
    Pixel,
}

impl TransportPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportPreference::Auto => "auto",
            TransportPreference::Direct => "direct",
            TransportPreference::Script => "script",
            TransportPreference::Pixel => "pixel",
        }
    }
}

impl FromStr for TransportPreference {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(TransportPreference::Auto),
            "direct" | "xhr" => Ok(TransportPreference::Direct),
            "script" | "jsonp" => Ok(TransportPreference::Script),
            "pixel" | "beacon" => Ok(TransportPreference::Pixel),
            other => Err(invalid_argument(format!(
                "unknown transport preference `{other}`"
            ))),
        }
    }
}

/// Settings for a tracker client.
///
/// The value is treated as immutable once handed to [`Keen::configure`](crate::tracker::Keen);
/// configuring again replaces it as a whole, global properties provider included.
#[derive(Clone, Default)]
pub struct ClientConfig {
    pub project_id: String,
    pub write_key: Option<String>,
    pub read_key: Option<String>,
    /// Root of the collection API; defaults to [`DEFAULT_BASE_URL`].
    pub base_url: Option<String>,
    pub transport: TransportPreference,
    pub global_properties: Option<GlobalPropertiesProvider>,
    /// Timeout for direct requests; defaults to [`DEFAULT_REQUEST_TIMEOUT`].
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn with_write_key(mut self, write_key: impl Into<String>) -> Self {
        self.write_key = Some(write_key.into());
        self
    }

    pub fn with_read_key(mut self, read_key: impl Into<String>) -> Self {
        self.read_key = Some(read_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportPreference) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_global_properties<F>(mut self, provider: F) -> Self
    where
        F: Fn(&str) -> EventPayload + Send + Sync + 'static,
    {
        self.global_properties = Some(Arc::new(provider));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Write key, treating an empty string as absent.
    pub fn credential(&self) -> Option<&str> {
        self.write_key.as_deref().filter(|key| !key.is_empty())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("project_id", &self.project_id)
            .field("write_key", &self.write_key.as_ref().map(|_| "<redacted>"))
            .field("read_key", &self.read_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url())
            .field("transport", &self.transport)
            .field("global_properties", &self.global_properties.is_some())
            .field("request_timeout", &self.request_timeout())
            .finish()
    }
}
