//! HTTP request handler for the imgproxy gateway.
//!
//! Every request goes through [`gateway_handler`]:
//!
//! - `GET|HEAD /<path>` - 301 redirect to `<object store prefix>/<path>`
//! - `GET|HEAD /<path>?width=<w>` - signed imgproxy thumbnail, streamed back
//! - `GET /favicon.ico` - 404
//! - any other method - 405

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, info, warn};
use url::{form_urlencoded, Url};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, UpstreamError};
use crate::imgproxy::{parse_width, ImgproxyClient, ProcessingPath};

/// Content type of every error body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Cache-Control sent with redirects to the object store (seven days).
pub const REDIRECT_CACHE_CONTROL: &str =
    "public, max-age=604800, immutable, stale-while-revalidate=604800";

/// This service has no favicon.
pub const FAVICON_PATH: &str = "/favicon.ico";

/// Origin request paths are resolved against. Only the path is ever read back.
const PATH_BASE: &str = "http://gateway";

// =============================================================================
// Application State
// =============================================================================

/// Shared, read-only state handed to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub client: ImgproxyClient,
}

impl AppState {
    /// Build the state, including the pooled imgproxy client.
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        let client = ImgproxyClient::new(config.imgproxy_url.clone(), config.upstream_timeout)?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

// =============================================================================
// Error Responses
// =============================================================================

/// JSON error body: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(skip)]
    pub status: StatusCode,
}

impl ErrorResponse {
    /// Create an error response with the default 400 status.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

/// Logs the error, then renders it as JSON.
impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), " -> Error: {}", self.error);
        } else {
            warn!(status = self.status.as_u16(), " -> Error: {}", self.error);
        }

        let body = serde_json::to_string(&self)
            .unwrap_or_else(|_| String::from("{\"error\":\"internal error\"}"));

        (
            self.status,
            [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
            body,
        )
            .into_response()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut response = ErrorResponse::new(self.to_string())
            .with_status(self.status_code())
            .into_response();

        if matches!(self, GatewayError::InvalidMethod(_)) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
        }

        response
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle any request.
///
/// # Response
///
/// - `301 Moved Permanently`: no `width`; `Location` points at the object store
/// - `200 OK`: thumbnail body and headers exactly as imgproxy returned them
/// - `400 Bad Request`: width not allowed, or imgproxy failed
/// - `404 Not Found`: `/favicon.ico`
/// - `405 Method Not Allowed`: anything but GET or HEAD
/// - `500 Internal Server Error`: signing failed
pub async fn gateway_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Response {
    match uri.query().filter(|q| !q.is_empty()) {
        Some(query) => info!("{} {}?{}", method, uri.path(), query),
        None => info!("{} {}", method, uri.path()),
    }

    match handle_request(&state, &method, &uri).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn handle_request(
    state: &AppState,
    method: &Method,
    uri: &Uri,
) -> Result<Response, GatewayError> {
    if method != Method::GET && method != Method::HEAD {
        return Err(GatewayError::InvalidMethod(method.clone()));
    }

    let path = request_path(uri)?;
    if path == FAVICON_PATH {
        return Err(GatewayError::NoFavicon);
    }

    match width_param(uri.query()) {
        Some(raw_width) => thumbnail_response(state, &path, &raw_width).await,
        None => Ok(redirect_to_original(&state.config, &path)),
    }
}

/// The request path with `.` and `..` segments resolved, percent-encoded
/// ones included.
///
/// Both the redirect and the signed imgproxy path are built from this, so
/// the signed string is exactly what gets sent upstream.
fn request_path(uri: &Uri) -> Result<String, GatewayError> {
    let url = Url::parse(&format!("{}{}", PATH_BASE, uri.path()))
        .map_err(|_| GatewayError::InvalidPath(uri.path().to_string()))?;
    Ok(url.path().to_string())
}

/// First `width` value in the query string, if any. An empty value still counts.
fn width_param(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "width")
        .map(|(_, value)| value.into_owned())
}

/// Sign a thumbnail request, fetch it from imgproxy and stream it back.
async fn thumbnail_response(
    state: &AppState,
    path: &str,
    raw_width: &str,
) -> Result<Response, GatewayError> {
    let width = parse_width(raw_width)
        .filter(|w| state.config.allowed_widths.contains(*w))
        .ok_or_else(|| GatewayError::InvalidWidth(raw_width.to_string()))?;

    let processing_path =
        ProcessingPath::thumbnail(&state.config.object_store_prefix, path, width).to_string();

    let signed_path = state
        .config
        .signer
        .signed_path(&processing_path)
        .map_err(|source| GatewayError::Signature {
            path: path.to_string(),
            source,
        })?;

    let upstream = state
        .client
        .fetch_thumbnail(&signed_path)
        .await
        .map_err(|source| {
            if let Some(status) = source.status() {
                warn!(upstream_status = status.as_u16(), " -> imgproxy responded {}", status);
            }
            GatewayError::Upstream {
                path: path.to_string(),
                source,
            }
        })?;

    let request_id = upstream
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string();
    info!(
        " -> Streaming {} from imgproxy (width {}, request ID {})",
        path, width, request_id
    );

    Ok(stream_upstream(upstream))
}

/// Pass an imgproxy response through without buffering its body.
fn stream_upstream(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    headers.remove(header::CONNECTION);
    headers.remove(header::TRANSFER_ENCODING);
    headers.remove("keep-alive");

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Permanent, long-cached redirect to the original in the object store.
fn redirect_to_original(config: &GatewayConfig, path: &str) -> Response {
    let location = format!("{}{}", config.object_store_prefix, path);
    (
        StatusCode::MOVED_PERMANENTLY,
        [
            (header::LOCATION, location),
            (header::CACHE_CONTROL, REDIRECT_CACHE_CONTROL.to_string()),
        ],
        (),
    )
        .into_response()
}

// =============================================================================
// Tests
// =============================================================================
