use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.keen.io/3.0";
pub const USAGE_GUIDE_URL: &str = "https://keen.io/docs/clients/javascript/usage-guide/";
pub const PROJECT_URL_PREFIX: &str = "https://keen.io/project/";

pub const JSONP_CALLBACK_PREFIX: &str = "keenJSONPCallback";
pub const JSONP_SCRIPT_ID: &str = "keen-jsonp";
pub const BEACON_PROTOCOL_MARKER: &str = "clv1";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_millis(500);
