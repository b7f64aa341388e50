use httpmock::MockServer;

/// Starts a fresh `httpmock::MockServer` for collection API tests.
pub fn start_mock_server() -> MockServer {
    MockServer::start()
}
