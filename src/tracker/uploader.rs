//! The single path every event takes on its way to a transport.

use crate::platform::runtime;
use crate::tracker::config::{ClientConfig, EventPayload, GlobalPropertiesProvider};
use crate::tracker::constants::PROJECT_URL_PREFIX;
use crate::tracker::error::{invalid_argument, missing_credential, TrackerResult};
use crate::tracker::logger::LOGGER;
use crate::tracker::transport::{Callbacks, Transport, TransportRequest};

/// `{base_url}/projects/{project_id}/events/{collection}`. The collection is used verbatim.
pub fn destination(config: &ClientConfig, collection: &str) -> String {
    format!(
        "{}/projects/{}/events/{}",
        config.base_url(),
        config.project_id,
        collection
    )
}

/// Global properties for `collection`, overlaid with the caller's properties.
pub fn merge_payload(
    provider: Option<&GlobalPropertiesProvider>,
    collection: &str,
    properties: EventPayload,
) -> EventPayload {
    let mut payload = provider
        .map(|provider| provider(collection))
        .unwrap_or_default();
    payload.extend(properties);
    payload
}

/// Assembles the request for `collection` and hands it to `transport`.
///
/// Without a write key nothing is sent, no callback runs and the error is returned to the
/// caller instead. An empty collection name is reported through `on_failure` on a later task.
pub fn upload(
    config: &ClientConfig,
    transport: &dyn Transport,
    collection: &str,
    properties: EventPayload,
    callbacks: Callbacks,
) -> TrackerResult<()> {
    let Some(credential) = config.credential() else {
        let message = format!(
            "Please provide a writeKey for {PROJECT_URL_PREFIX}{}",
            config.project_id
        );
        LOGGER.warn(message.clone());
        return Err(missing_credential(message));
    };

    if collection.is_empty() {
        LOGGER.warn("Event collection name must not be empty.");
        runtime::spawn_detached(async move {
            callbacks.fail(invalid_argument("event collection name must not be empty"));
        });
        return Ok(());
    }

    let request = TransportRequest {
        destination: destination(config, collection),
        payload: merge_payload(config.global_properties.as_ref(), collection, properties),
        credential: Some(credential.to_string()),
        timeout: config.request_timeout(),
    };
    log::debug!(
        "dispatching event for '{collection}' via {}",
        transport.kind()
    );
    transport.send(request, callbacks);
    Ok(())
}
