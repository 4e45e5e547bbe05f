//! Error types for the Mattermost notifier.

use thiserror::Error;

/// Errors that can occur when posting to a webhook.
///
/// These never reach the host: the fan-out logs them per channel and moves on.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP request failed (connection refused, TLS handshake, DNS, timeout)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The delivery task panicked or was cancelled
    #[error("Delivery task aborted: {0}")]
    Aborted(String),
}

/// Errors raised while loading a [`crate::Settings`] snapshot.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML configuration could not be parsed
    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Plugin settings map could not be deserialized
    #[error("Invalid plugin settings: {0}")]
    Plugin(#[from] serde_json::Error),

    /// A value was present but unusable
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
