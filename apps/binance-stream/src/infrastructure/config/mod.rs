//! Configuration Module
//!
//! Environment-variable configuration for the stream sessions and binary.

mod settings;

pub use settings::{AppConfig, ConfigError, FeedSettings, ServerSettings, StreamKey};
