//! HTTP server layer for the imgproxy gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │              GET /{path}        GET /{path}?width=W             │
//! │                                                                 │
//! │  ┌─────────────────────────────┐  ┌─────────────────────────┐   │
//! │  │          handlers           │  │         routes          │   │
//! │  │ (redirect / proxy / errors) │  │  (fallback + tracing)   │   │
//! │  └─────────────────────────────┘  └─────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    gateway_handler, AppState, ErrorResponse, FAVICON_PATH, JSON_CONTENT_TYPE,
    REDIRECT_CACHE_CONTROL,
};
pub use routes::{create_router, RouterConfig};
