//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the bookmark sync core:
//! - Logging and tracing infrastructure
//! - Settings record, persistence and path composition
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions, the configuration surface and the
//! event broadcasting used to report sync progress to the host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
