use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerErrorCode {
    MissingCredential,
    MissingProjectId,
    Network,
    HttpStatus,
    BodyParse,
    LoadSignal,
    InvalidArgument,
    Internal,
}

impl TrackerErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerErrorCode::MissingCredential => "keen/missing-credential",
            TrackerErrorCode::MissingProjectId => "keen/missing-project-id",
            TrackerErrorCode::Network => "keen/network",
            TrackerErrorCode::HttpStatus => "keen/http-status",
            TrackerErrorCode::BodyParse => "keen/body-parse",
            TrackerErrorCode::LoadSignal => "keen/load-signal",
            TrackerErrorCode::InvalidArgument => "keen/invalid-argument",
            TrackerErrorCode::Internal => "keen/internal",
        }
    }
}

/// Detail handed to failure callbacks.
///
/// Direct requests attach the HTTP status and the raw response text when they exist; the
/// script-injection and pixel-beacon transports only know that loading failed.
#[derive(Clone, Debug)]
pub struct TrackerError {
    pub code: TrackerErrorCode,
    message: String,
    status: Option<u16>,
    response_text: Option<String>,
}

impl TrackerError {
    pub fn new(code: TrackerErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            response_text: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_response_text(mut self, text: impl Into<String>) -> Self {
        self.response_text = Some(text.into());
        self
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn response_text(&self) -> Option<&str> {
        self.response_text.as_deref()
    }
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for TrackerError {}

pub type TrackerResult<T> = Result<T, TrackerError>;

pub fn missing_credential(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::MissingCredential, message)
}

pub fn missing_project_id(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::MissingProjectId, message)
}

pub fn network_error(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::Network, message)
}

pub fn http_status_error(status: u16, body: impl Into<String>) -> TrackerError {
    TrackerError::new(
        TrackerErrorCode::HttpStatus,
        format!("HTTP request failed with status {status}"),
    )
    .with_status(status)
    .with_response_text(body)
}

pub fn body_parse_error(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::BodyParse, message)
}

pub fn load_signal_error(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::LoadSignal, message)
}

pub fn invalid_argument(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::InvalidArgument, message)
}

pub fn internal_error(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::Internal, message)
}
