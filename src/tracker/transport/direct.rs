use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;

use crate::logger::{log_arg, LogLevel};
use crate::platform::runtime;
use crate::tracker::error::{
    body_parse_error, http_status_error, internal_error, network_error, TrackerErrorCode,
    TrackerResult,
};
use crate::tracker::logger::LOGGER;
use crate::tracker::selector::ResolvedTransport;
use crate::tracker::transport::{shared_http_client, Callbacks, Transport, TransportRequest};

/// POSTs the JSON payload with the write key in the `Authorization` header.
#[derive(Clone, Debug)]
pub struct DirectRequestTransport {
    client: Client,
}

impl DirectRequestTransport {
    pub fn new() -> Self {
        Self {
            client: shared_http_client(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for DirectRequestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for DirectRequestTransport {
    fn kind(&self) -> ResolvedTransport {
        ResolvedTransport::Direct
    }

    fn send(&self, request: TransportRequest, callbacks: Callbacks) {
        let client = self.client.clone();
        runtime::spawn_detached(async move {
            let outcome = execute(&client, request).await;
            match &outcome {
                Err(err) if err.code != TrackerErrorCode::BodyParse => LOGGER.log_with(
                    LogLevel::Warn,
                    vec![log_arg("HTTP request failed."), log_arg(err.to_string())],
                ),
                _ => {}
            }
            callbacks.settle(outcome);
        });
    }
}

async fn execute(client: &Client, request: TransportRequest) -> TrackerResult<Value> {
    let body = serde_json::to_string(&request.payload)
        .map_err(|err| internal_error(format!("failed to serialize event payload: {err}")))?;

    let mut builder = client
        .post(&request.destination)
        .header(CONTENT_TYPE, "application/json")
        .body(body);
    if let Some(credential) = request.credential.as_deref() {
        builder = builder.header(AUTHORIZATION, credential);
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        builder = builder.timeout(request.timeout);
    }

    log::debug!("POST {}", request.destination);
    let response = builder
        .send()
        .await
        .map_err(|err| network_error(format!("failed to send event: {err}")))?;

    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|err| {
            network_error(format!("failed to read response body: {err}")).with_status(status)
        })?;

    classify_response(Some(status), &text)
}

/// Maps a completed request onto the single outcome reported to the caller.
///
/// `status` is `None` when the request never produced a response. A 2xx status with a body that
/// is not JSON is a failure carrying the parse error and the raw text.
pub fn classify_response(status: Option<u16>, body: &str) -> TrackerResult<Value> {
    let status = status.ok_or_else(|| network_error("request completed without a status"))?;
    if !(200..300).contains(&status) {
        return Err(http_status_error(status, body));
    }
    serde_json::from_str(body).map_err(|err| {
        LOGGER.warn(format!("Could not JSON parse HTTP response: {body}"));
        body_parse_error(format!("could not parse response body: {err}"))
            .with_status(status)
            .with_response_text(body)
    })
}
