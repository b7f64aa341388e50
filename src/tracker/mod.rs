#![doc = include_str!("README.md")]

mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod logger;
pub mod replay;
pub mod selector;
pub mod transport;
pub mod uploader;

pub use api::{Keen, ReadyHandler};
pub use config::{ClientConfig, EventPayload, GlobalPropertiesProvider, TransportPreference};
pub use error::{TrackerError, TrackerErrorCode, TrackerResult};
pub use replay::{
    record_pending, replay_pending_calls, PendingCallRegistry, PendingClient, QueuedEvent,
};
pub use selector::{resolve, ResolvedTransport};
pub use transport::{Callbacks, Transport, TransportRequest, TransportSet};
