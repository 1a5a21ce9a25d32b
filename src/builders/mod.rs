//! Builders
//!
//! Fluent builder patterns for provider and session configuration.

pub mod config;

pub use config::{provider_config, session_config_from_lookup, ProviderConfigBuilder};
