//! # Host Bridge Traits
//!
//! Capability traits the bookmark sync core depends on, plus the error type
//! shared by every implementation.
//!
//! ## Traits
//!
//! - [`Storage`](storage::Storage) - File reads/writes, listing, rename and removal
//! - [`HttpClient`](http::HttpClient) - Single-attempt HTTP GET
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! Desktop implementations live in `bridge-desktop`. [`MemoryStorage`] is a
//! complete in-memory backend that can stand in for the filesystem.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map a missing path to `BridgeError::NotFound` so callers can tell
//! "absent" apart from real failures.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single instance can be shared
//! between the orchestrator and its detached fetch task.

pub mod error;
pub mod http;
pub mod memory;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use memory::MemoryStorage;
pub use storage::{FileMetadata, Storage};
pub use time::{Clock, FixedClock, LogLevel, SystemClock};
