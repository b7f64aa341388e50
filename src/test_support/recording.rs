use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::platform::runtime;
use crate::tracker::error::TrackerError;
use crate::tracker::selector::ResolvedTransport;
use crate::tracker::transport::{Callbacks, Transport, TransportRequest};

/// Transport double that records every request and settles with a canned outcome on a later
/// task.
#[derive(Clone)]
pub struct RecordingTransport {
    kind: ResolvedTransport,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
    outcome: Result<Value, TrackerError>,
}

impl RecordingTransport {
    pub fn new(kind: ResolvedTransport) -> Self {
        Self {
            kind,
            requests: Arc::new(Mutex::new(Vec::new())),
            outcome: Ok(json!({ "created": true })),
        }
    }

    pub fn failing(kind: ResolvedTransport, error: TrackerError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::new(kind)
        }
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Collection names in the order they were sent.
    pub fn collections(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|request| request.destination.rsplit('/').next().map(str::to_string))
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn kind(&self) -> ResolvedTransport {
        self.kind
    }

    fn send(&self, request: TransportRequest, callbacks: Callbacks) {
        self.requests.lock().unwrap().push(request);
        let outcome = self.outcome.clone();
        runtime::spawn_detached(async move {
            callbacks.settle(outcome);
        });
    }
}
