use http::{Method, StatusCode};
use thiserror::Error;

/// Errors raised while building the gateway configuration at startup.
///
/// Every variant is fatal: the process refuses to bind a listener when any of
/// these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value was not provided
    #[error("{0} is required.")]
    Missing(&'static str),

    /// Value is not a valid hex string
    #[error("{name} is not valid hex: {message}")]
    InvalidHex { name: &'static str, message: String },

    /// Hex decoded fine, but the bytes are not valid UTF-8 text
    #[error("{name} must decode to valid UTF-8 text, not random binary data")]
    InvalidUtf8 { name: &'static str },

    /// Allowed widths were not a JSON array of numbers
    #[error(
        "IMGPROXY_GATEWAY_ALLOWED_WIDTHS is invalid. Expected a JSON-encoded array of numbers (pixel widths)."
    )]
    InvalidAllowedWidths,

    /// Upstream timeout must be a positive number of seconds
    #[error("Upstream timeout must be greater than 0 seconds")]
    InvalidTimeout,
}

/// Errors from the HMAC backend.
#[derive(Debug, Clone, Error)]
pub enum SignatureError {
    #[error("HMAC key rejected: {0}")]
    InvalidKey(String),
}

/// Errors returned by the imgproxy fetch step.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// imgproxy answered with something other than 200; the body is its error text
    #[error("{body}")]
    Status { status: StatusCode, body: String },

    /// Request never produced a response (connect failure, timeout, bad URL)
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl UpstreamError {
    /// Status imgproxy answered with, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            UpstreamError::Transport(e) => e.status(),
        }
    }
}

/// Request-level errors. Each one is turned into a JSON error response at the
/// handler boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid request method {0}")]
    InvalidMethod(Method),

    #[error("There is no favicon for this application")]
    NoFavicon,

    /// The request path could not be resolved to a URL path
    #[error("Invalid request path {0}")]
    InvalidPath(String),

    /// Carries the raw `width` query value exactly as the client sent it
    #[error("Invalid width requested: {0}")]
    InvalidWidth(String),

    #[error("Streaming {path} from imgproxy failed: {source}")]
    Upstream {
        path: String,
        #[source]
        source: UpstreamError,
    },

    #[error("Signing {path} for imgproxy failed: {source}")]
    Signature {
        path: String,
        #[source]
        source: SignatureError,
    },
}

impl GatewayError {
    /// HTTP status code used when this error is returned to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::NoFavicon => StatusCode::NOT_FOUND,
            GatewayError::InvalidPath(_)
            | GatewayError::InvalidWidth(_)
            | GatewayError::Upstream { .. } => StatusCode::BAD_REQUEST,
            GatewayError::Signature { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
