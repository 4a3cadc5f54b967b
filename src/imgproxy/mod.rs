//! imgproxy integration: processing paths, URL signing and the upstream client.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  GET /abc.jpg?width=640                                          │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  ProcessingPath   /rs:fit:640/q:87/plain/<prefix>/abc.jpg@webp   │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  ImgproxySigner   /<hmac(salt + path)>/rs:fit:640/...            │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  ImgproxyClient   GET <imgproxy_url>/<sig>/rs:fit:640/...        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod request;
pub mod signature;

pub use client::ImgproxyClient;
pub use request::{parse_width, ProcessingPath};
pub use signature::{hmac_sha256, ImgproxySigner};
