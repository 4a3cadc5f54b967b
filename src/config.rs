//! Configuration management for the imgproxy gateway.
//!
//! This module provides:
//! - Command-line arguments via clap, with subcommands for serving, signing and checking
//! - Environment variables using the names the deployed service has always used
//! - Validation that turns the raw arguments into an immutable [`GatewayConfig`]
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use imgproxy_gateway::config::{Cli, Command, GatewayConfig};
//!
//! let cli = Cli::parse();
//! if let Command::Serve(serve) = cli.into_command() {
//!     let config = GatewayConfig::from_args(&serve.gateway)?;
//!     println!("Redirecting originals to {}", config.object_store_prefix);
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `IMGPROXY_GATEWAY_HOST` - Server bind address (default: 0.0.0.0)
//! - `IMGPROXY_GATEWAY_PORT` - Server port (default: 5558)
//! - `IMGPROXY_KEY` - Hex-encoded imgproxy signing key (required)
//! - `IMGPROXY_SALT` - Hex-encoded imgproxy signing salt (required)
//! - `IMGPROXY_GATEWAY_ALLOWED_WIDTHS` - JSON array of thumbnail widths in pixels
//! - `IMGPROXY_GATEWAY_OBJSTORE_PUBLIC_URL_PREFIX` - Public URL prefix of the object store
//! - `IMGPROXY_GATEWAY_IMGPROXY_URL` - Base URL of imgproxy, without trailing slash
//! - `IMGPROXY_GATEWAY_UPSTREAM_TIMEOUT` - imgproxy request timeout in seconds (default: 60)

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;

use crate::error::ConfigError;
use crate::imgproxy::ImgproxySigner;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5558;

/// Default thumbnail widths, as the JSON the environment variable would carry.
pub const DEFAULT_ALLOWED_WIDTHS: &str = "[256, 640, 1000, 2000, 4000]";

/// Default public URL prefix of the object store holding the originals.
pub const DEFAULT_OBJSTORE_PREFIX: &str = "http://localhost:9000/neolace-objects";

/// Default imgproxy base URL.
pub const DEFAULT_IMGPROXY_URL: &str = "http://localhost:5557";

/// Default timeout for a single imgproxy request, in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// Thumbnails are always re-encoded to this format, whatever the source type.
pub const THUMBNAIL_FORMAT: &str = "webp";

/// Quality passed to imgproxy for every thumbnail.
pub const THUMBNAIL_QUALITY: u8 = 87;

// =============================================================================
// CLI Arguments
// =============================================================================

/// imgproxy gateway - redirects originals to object storage and streams signed thumbnails.
///
/// Run without a subcommand to start the server.
#[derive(Parser, Debug, Clone)]
#[command(name = "imgproxy-gateway")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the gateway (default)
    Serve(ServeConfig),

    /// Print the signed imgproxy request for a source path
    Sign(SignConfig),

    /// Validate configuration and optionally probe imgproxy
    Check(CheckConfig),
}

/// Settings shared by every subcommand: signing material and upstream locations.
#[derive(Args, Debug, Clone)]
pub struct GatewayArgs {
    /// Hex-encoded imgproxy key. The decoded bytes must be valid UTF-8.
    #[arg(long, env = "IMGPROXY_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Hex-encoded imgproxy salt. The decoded bytes must be valid UTF-8.
    #[arg(long, env = "IMGPROXY_SALT", hide_env_values = true)]
    pub salt: Option<String>,

    /// JSON-encoded array of allowed thumbnail widths in pixels.
    #[arg(
        long,
        default_value = DEFAULT_ALLOWED_WIDTHS,
        env = "IMGPROXY_GATEWAY_ALLOWED_WIDTHS"
    )]
    pub allowed_widths: String,

    /// Public URL prefix of the object store; full-size requests redirect here.
    #[arg(
        long,
        default_value = DEFAULT_OBJSTORE_PREFIX,
        env = "IMGPROXY_GATEWAY_OBJSTORE_PUBLIC_URL_PREFIX"
    )]
    pub objstore_prefix: String,

    /// imgproxy base URL (no trailing slash).
    #[arg(long, default_value = DEFAULT_IMGPROXY_URL, env = "IMGPROXY_GATEWAY_IMGPROXY_URL")]
    pub imgproxy_url: String,

    /// Timeout for each imgproxy request, in seconds.
    #[arg(
        long,
        default_value_t = DEFAULT_UPSTREAM_TIMEOUT_SECS,
        env = "IMGPROXY_GATEWAY_UPSTREAM_TIMEOUT"
    )]
    pub upstream_timeout: u64,
}

/// Arguments for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IMGPROXY_GATEWAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IMGPROXY_GATEWAY_PORT")]
    pub port: u16,

    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable tower-http request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Output format for `sign`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutputFormat {
    /// Only the base64url signature
    Signature,
    /// `/<signature>/rs:fit:...`, relative to the imgproxy base URL
    Path,
    /// Full imgproxy URL
    Url,
    /// JSON object with every component
    Json,
}

/// Arguments for `sign`.
#[derive(Args, Debug, Clone)]
pub struct SignConfig {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// Source image path as a client would request it (e.g. /abc.jpg).
    pub path: String,

    /// Thumbnail width. Must be one of the allowed widths.
    #[arg(short, long)]
    pub width: String,

    /// What to print.
    #[arg(long, value_enum, default_value_t = SignOutputFormat::Url)]
    pub format: SignOutputFormat,
}

/// Arguments for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// Also call `<imgproxy-url>/health` to verify imgproxy is reachable.
    #[arg(long, default_value_t = false)]
    pub probe: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Validated Configuration
// =============================================================================

/// Thumbnail widths the gateway will forward to imgproxy.
///
/// Only the first entry of the configured JSON array is type-checked; later
/// entries that are not whole non-negative numbers are kept out of the set and
/// can never match a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedWidths(Vec<u32>);

impl AllowedWidths {
    pub fn new(widths: impl Into<Vec<u32>>) -> Self {
        Self(widths.into())
    }

    pub fn contains(&self, width: u32) -> bool {
        self.0.contains(&width)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}

/// Immutable gateway configuration, built once before the listener is bound.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Signs imgproxy request paths with the decoded key and salt
    pub signer: ImgproxySigner,

    pub allowed_widths: AllowedWidths,

    /// Prepended to the request path for redirects and imgproxy source URLs
    pub object_store_prefix: String,

    /// imgproxy base URL, trailing slashes removed
    pub imgproxy_url: String,

    pub upstream_timeout: Duration,
}

impl GatewayConfig {
    /// Create a configuration from already-decoded key and salt, using the
    /// default object store and imgproxy locations.
    pub fn new(
        key: impl Into<String>,
        salt: impl Into<String>,
        allowed_widths: impl Into<Vec<u32>>,
    ) -> Self {
        Self {
            signer: ImgproxySigner::new(key.into(), salt.into()),
            allowed_widths: AllowedWidths::new(allowed_widths),
            object_store_prefix: DEFAULT_OBJSTORE_PREFIX.to_string(),
            imgproxy_url: DEFAULT_IMGPROXY_URL.to_string(),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }

    /// Validate raw arguments into a configuration.
    ///
    /// Any error here is fatal; callers must not start serving.
    pub fn from_args(args: &GatewayArgs) -> Result<Self, ConfigError> {
        let key_hex = args
            .key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::Missing("IMGPROXY_KEY"))?;
        let key = decode_hex_text("IMGPROXY_KEY", key_hex)?;

        let salt_hex = args
            .salt
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("IMGPROXY_SALT"))?;
        let salt = decode_hex_text("IMGPROXY_SALT", salt_hex)?;

        let allowed_widths = parse_allowed_widths(&args.allowed_widths)?;

        if args.upstream_timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(Self {
            signer: ImgproxySigner::new(key, salt),
            allowed_widths,
            object_store_prefix: args.objstore_prefix.clone(),
            imgproxy_url: args.imgproxy_url.trim_end_matches('/').to_string(),
            upstream_timeout: Duration::from_secs(args.upstream_timeout),
        })
    }

    /// The signing key, hex-encoded again.
    pub fn key_hex(&self) -> String {
        hex::encode(self.signer.key())
    }

    /// The signing salt, hex-encoded again.
    pub fn salt_hex(&self) -> String {
        hex::encode(self.signer.salt())
    }

    /// Set the object store URL prefix.
    pub fn with_object_store_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.object_store_prefix = prefix.into();
        self
    }

    /// Set the imgproxy base URL. Trailing slashes are dropped.
    pub fn with_imgproxy_url(mut self, url: impl AsRef<str>) -> Self {
        self.imgproxy_url = url.as_ref().trim_end_matches('/').to_string();
        self
    }

    /// Set the imgproxy request timeout.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}

/// Decode a hex string into text.
///
/// imgproxy treats key and salt as strings, so random binary data is rejected.
pub fn decode_hex_text(name: &'static str, hex_value: &str) -> Result<String, ConfigError> {
    let bytes = hex::decode(hex_value).map_err(|e| ConfigError::InvalidHex {
        name,
        message: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|_| ConfigError::InvalidUtf8 { name })
}

/// Parse the JSON list of allowed widths.
///
/// The value must be an array whose first element is a number. Remaining
/// elements are not validated.
pub fn parse_allowed_widths(json: &str) -> Result<AllowedWidths, ConfigError> {
    let value: Value = serde_json::from_str(json).map_err(|_| ConfigError::InvalidAllowedWidths)?;
    let items = match value {
        Value::Array(items) => items,
        _ => return Err(ConfigError::InvalidAllowedWidths),
    };
    if !items.first().is_some_and(Value::is_number) {
        return Err(ConfigError::InvalidAllowedWidths);
    }

    let widths = items.iter().filter_map(whole_width).collect::<Vec<_>>();
    Ok(AllowedWidths(widths))
}

/// `640` and `640.0` both count as 640; anything else is ignored.
fn whole_width(value: &Value) -> Option<u32> {
    let width = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= f64::from(u32::MAX))
            .map(|f| f as u64)
    })?;
    u32::try_from(width).ok()
}

// =============================================================================
// Tests
// =============================================================================
