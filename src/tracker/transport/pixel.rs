use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use serde_json::json;

use crate::platform::runtime;
use crate::tracker::constants::BEACON_PROTOCOL_MARKER;
use crate::tracker::error::{internal_error, load_signal_error};
use crate::tracker::logger::LOGGER;
use crate::tracker::selector::ResolvedTransport;
use crate::tracker::transport::{
    shared_http_client, Callbacks, Completion, Transport, TransportRequest,
};
use crate::util::base64;

/// Characters left alone by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Size of a loaded image. `natural` is absent in engines without `naturalWidth`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageDimensions {
    pub natural: Option<(u32, u32)>,
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn from_natural(width: u32, height: u32) -> Self {
        Self {
            natural: Some((width, height)),
            width,
            height,
        }
    }

    /// A beacon endpoint answers success with a real pixel; an empty image means rejection.
    pub fn is_empty(&self) -> bool {
        match self.natural {
            Some((width, height)) => width == 0 && height == 0,
            None => self.width == 0 && self.height == 0,
        }
    }
}

/// Completion signals for one beacon image.
#[derive(Clone)]
pub struct ImageLoad {
    completion: Completion,
}

impl ImageLoad {
    pub fn new(completion: Completion) -> Self {
        Self { completion }
    }

    /// The image fired its load event. Zero-sized images count as an error.
    pub fn loaded(&self, dimensions: ImageDimensions) {
        if dimensions.is_empty() {
            self.error();
            return;
        }
        self.completion.succeed(json!({ "created": true }));
    }

    /// The image fired its error event.
    pub fn error(&self) {
        if self
            .completion
            .fail(load_signal_error("beacon image failed to load"))
        {
            LOGGER.warn("Beacon request failed.");
        }
    }
}

/// Environment primitive that fetches a URL the way an `<img>` element would.
pub trait ImageHost: Send + Sync {
    fn load(&self, url: String, load: ImageLoad);
}

/// Fire-and-forget delivery through an image request. The response body is never read; success
/// is inferred from the loaded image's size and acknowledged with `{"created": true}`.
#[derive(Clone)]
pub struct PixelBeaconTransport {
    host: Arc<dyn ImageHost>,
}

impl PixelBeaconTransport {
    pub fn new(host: Arc<dyn ImageHost>) -> Self {
        Self { host }
    }
}

impl Transport for PixelBeaconTransport {
    fn kind(&self) -> ResolvedTransport {
        ResolvedTransport::Pixel
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

        let url = beacon_url(
            &request.destination,
            request.credential.as_deref(),
            &base64::encode(&json),
            runtime::now_millis(),
        );
        log::debug!("beacon {url}");
        self.host.load(url, ImageLoad::new(completion));
    }
}

/// Builds the beacon URL; every parameter value is percent-escaped.
pub fn beacon_url(
    destination: &str,
    credential: Option<&str>,
    encoded_payload: &str,
    timestamp: i64,
) -> String {
    let mut params = Vec::with_capacity(4);
    if let Some(credential) = credential {
        params.push(format!("api_key={}", component_escape(credential)));
    }
    params.push(format!("data={}", component_escape(encoded_payload)));
    params.push(format!(
        "modified={}",
        component_escape(&timestamp.to_string())
    ));
    params.push(format!("c={BEACON_PROTOCOL_MARKER}"));
    format!("{destination}?{}", params.join("&"))
}

pub fn component_escape(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Reads width and height from a GIF or PNG header.
pub fn sniff_image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        let header = bytes.get(6..10)?;
        let width = u16::from_le_bytes([header[0], header[1]]);
        let height = u16::from_le_bytes([header[2], header[3]]);
        return Some((u32::from(width), u32::from(height)));
    }
    if bytes.starts_with(PNG_SIGNATURE) && bytes.get(12..16) == Some(b"IHDR".as_slice()) {
        let header = bytes.get(16..24)?;
        let width = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let height = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        return Some((width, height));
    }
    None
}

/// Image host for environments without a DOM. A non-2xx status or a body that is not a GIF or
/// PNG is reported as an error event, as a browser would for an undecodable image.
#[derive(Clone)]
pub struct HttpImageHost {
    client: Client,
}

impl HttpImageHost {
    pub fn new() -> Self {
        Self::with_client(shared_http_client())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpImageHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageHost for HttpImageHost {
    fn load(&self, url: String, load: ImageLoad) {
        let client = self.client.clone();
        runtime::spawn_detached(async move {
            let bytes = match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => response.bytes().await.ok(),
                Ok(response) => {
                    log::debug!("beacon request returned status {}", response.status());
                    None
                }
                Err(err) => {
                    log::debug!("beacon request failed: {err}");
                    None
                }
            };

            match bytes.as_deref().and_then(sniff_image_dimensions) {
                Some((width, height)) => load.loaded(ImageDimensions::from_natural(width, height)),
                None => load.error(),
            }
        });
    }
}
