//! Router configuration for the imgproxy gateway.
//!
//! The gateway has no fixed routes: every path is an object key, so a single
//! fallback handler receives all requests.
//!
//! # Example
//!
//! ```ignore
//! use imgproxy_gateway::config::GatewayConfig;
//! use imgproxy_gateway::server::{create_router, AppState, RouterConfig};
//!
//! let config = GatewayConfig::new("key", "salt", vec![256, 640, 1000]);
//! let router = create_router(AppState::new(config)?, RouterConfig::default());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5558").await?;
//! axum::serve(listener, router).await?;
//! ```

use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers::{gateway_handler, AppState};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Whether to wrap the router in tower-http request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enable_tracing: true,
        }
    }
}

impl RouterConfig {
    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
pub fn create_router(state: AppState, config: RouterConfig) -> Router {
    let router = Router::new().fallback(gateway_handler).with_state(state);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}
