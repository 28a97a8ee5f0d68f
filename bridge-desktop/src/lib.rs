//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux):
//! - `Storage` using `tokio::fs`
//! - `HttpClient` using `reqwest`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioStorage};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(TokioStorage::new());
//! let http = Arc::new(ReqwestHttpClient::new()?);
//! ```

mod filesystem;
mod http;

pub use filesystem::TokioStorage;
pub use http::ReqwestHttpClient;
