//! # AutoCheck Common Library
//!
//! Shared code for the AutoCheck services:
//! - Error types
//! - Bootstrap configuration (TOML + environment) and API key resolution
//! - Event types (AutoCheckEvent enum) and the EventBus used for SSE

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
