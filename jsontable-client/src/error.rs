/// Error types for the jsontable client
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The API was built for a table or endpoint that cannot be used
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The body was not a JSON object
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The response broke the protocol contract of the request that produced it
    #[error("Protocol violation in {request}: {reason}")]
    Protocol { request: String, reason: String },

    #[error(transparent)]
    Model(#[from] jsontable_core::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub(crate) fn protocol(request: impl Into<String>, reason: impl Into<String>) -> Self {
        ClientError::Protocol {
            request: request.into(),
            reason: reason.into(),
        }
    }

    /// Returns a stable error code for this error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Configuration(_) => "CONFIGURATION_ERROR",
            ClientError::Transport(_) => "TRANSPORT_ERROR",
            ClientError::Http { .. } => "HTTP_ERROR",
            ClientError::Timeout(_) => "TIMEOUT",
            ClientError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            ClientError::Protocol { .. } => "PROTOCOL_VIOLATION",
            ClientError::Model(e) => e.code(),
        }
    }

    /// Returns true if re-sending the same request may succeed.
    ///
    /// Connection failures, timeouts, throttling and server-side 5xx errors
    /// are transient. Protocol violations never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Timeout(_) => true,
            ClientError::Http { status, .. } => *status == 429 || *status >= 500,
            ClientError::Configuration(_) => false,
            ClientError::MalformedResponse(_) => false,
            ClientError::Protocol { .. } => false,
            ClientError::Model(e) => e.is_retryable(),
        }
    }
}

impl ClientError {
    /// Returns true if re-sending a non-idempotent request is safe.
    ///
    /// Only answers that prove the service turned the request away before
    /// acting on it qualify. A timeout or a dropped connection may hide a
    /// write that was already applied.
    pub fn is_retryable_write(&self) -> bool {
        matches!(self, ClientError::Http { status: 429 | 503, .. })
    }
}

/// Convert reqwest errors to ClientError
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let msg = err.to_string();

        if err.is_timeout() {
            ClientError::Timeout(msg)
        } else if err.is_decode() {
            ClientError::MalformedResponse(msg)
        } else if let Some(status) = err.status() {
            ClientError::Http {
                status: status.as_u16(),
                body: msg,
            }
        } else {
            ClientError::Transport(msg)
        }
    }
}
