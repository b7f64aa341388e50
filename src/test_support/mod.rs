//! Test utilities shared across crate-level unit tests.

pub mod http;
pub mod recording;

pub use http::start_mock_server;
pub use recording::RecordingTransport;
