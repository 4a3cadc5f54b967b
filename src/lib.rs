//! # imgproxy gateway
//!
//! A small HTTP gateway in front of an object store and an
//! [imgproxy](https://imgproxy.net) instance.
//!
//! - Requests for a full-size image (`GET /abc.jpg`) are answered with a
//!   long-cached 301 redirect to the object store, so originals are never proxied.
//! - Requests for a thumbnail (`GET /abc.jpg?width=640`) are checked against an
//!   allow-list of widths, signed with the imgproxy key and salt, fetched from
//!   imgproxy and streamed back to the client.
//!
//! ## Modules
//!
//! - [`config`] - CLI, environment variables and the validated [`GatewayConfig`]
//! - [`imgproxy`] - processing paths, HMAC signing and the upstream client
//! - [`server`] - Axum handler and router
//! - [`error`] - error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use imgproxy_gateway::{create_router, AppState, GatewayConfig, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::new("key", "salt", vec![256, 640, 1000])
//!         .with_object_store_prefix("https://objects.example.com/images")
//!         .with_imgproxy_url("http://imgproxy:8080");
//!
//!     let router = create_router(AppState::new(config)?, RouterConfig::default());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5558").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod imgproxy;
pub mod server;

// Re-export commonly used types
pub use config::{
    AllowedWidths, CheckConfig, Cli, Command, GatewayArgs, GatewayConfig, ServeConfig, SignConfig,
    SignOutputFormat,
};
pub use error::{ConfigError, GatewayError, SignatureError, UpstreamError};
pub use imgproxy::{hmac_sha256, parse_width, ImgproxyClient, ImgproxySigner, ProcessingPath};
pub use server::{create_router, gateway_handler, AppState, ErrorResponse, RouterConfig};
