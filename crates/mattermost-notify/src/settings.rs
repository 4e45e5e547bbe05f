//! Global plugin configuration.
//!
//! A [`Settings`] value is an immutable snapshot handed to every entry point.
//! It can be built from the host's plugin settings map (string-valued flags),
//! from a TOML file with the same keys, or from environment variables.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// Project custom field that overrides the webhook URL.
pub const URL_FIELD: &str = "Mattermost URL";

/// Project custom field that overrides the channel list.
pub const CHANNEL_FIELD: &str = "Mattermost Channel";

/// Default HTTP timeout for webhook posts.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Notifier configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Settings {
    /// Default incoming-webhook URL.
    pub mattermost_url: Option<String>,
    /// Default channel, possibly comma-separated.
    pub channel: Option<String>,
    /// Bot username shown on posts.
    pub username: Option<String>,
    /// Emoji token (`:ghost:`) or image URL.
    pub icon: Option<String>,
    /// Relay issue updates.
    pub post_updates: bool,
    /// Relay wiki page edits.
    pub post_wiki_updates: bool,
    /// Add a watchers field to new-issue posts.
    pub display_watchers: bool,
    /// Public host name of the tracker, used to build links.
    pub host_name: String,
    /// `http` or `https`.
    pub protocol: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mattermost_url: None,
            channel: None,
            username: None,
            icon: None,
            post_updates: false,
            post_wiki_updates: false,
            display_watchers: false,
            host_name: "localhost:3000".to_string(),
            protocol: "http".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Raw plugin settings as the host stores them: every value is a string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PluginValues {
    mattermost_url: Option<String>,
    channel: Option<String>,
    username: Option<String>,
    icon: Option<String>,
    post_updates: Option<String>,
    post_wiki_updates: Option<String>,
    display_watchers: Option<String>,
    host_name: Option<String>,
    protocol: Option<String>,
    timeout_secs: Option<u64>,
}

impl Settings {
    fn from_raw(raw: PluginValues) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let protocol = match non_blank(raw.protocol) {
            Some(p) if p == "http" || p == "https" => p,
            Some(p) => {
                return Err(ConfigError::InvalidValue {
                    key: "protocol".to_string(),
                    value: p,
                })
            }
            None => defaults.protocol,
        };

        Ok(Self {
            mattermost_url: non_blank(raw.mattermost_url),
            channel: raw.channel,
            username: non_blank(raw.username),
            icon: non_blank(raw.icon),
            post_updates: raw.post_updates.as_deref() == Some("1"),
            post_wiki_updates: raw.post_wiki_updates.as_deref() == Some("1"),
            display_watchers: raw.display_watchers.as_deref() == Some("yes"),
            host_name: non_blank(raw.host_name).unwrap_or(defaults.host_name),
            protocol,
            timeout: raw
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
        })
    }

    /// Build settings from the host's plugin settings map.
    ///
    /// Flags follow the host's conventions: `post_updates` and
    /// `post_wiki_updates` are on when `"1"`, `display_watchers` when `"yes"`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a value is unusable (e.g. unknown protocol).
    pub fn from_plugin_values(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let object = values
            .iter()
            .map(|(k, v)| {
                let value = if k == "timeout_secs" {
                    v.trim()
                        .parse::<u64>()
                        .map(serde_json::Value::from)
                        .map_err(|_| ConfigError::InvalidValue {
                            key: k.clone(),
                            value: v.clone(),
                        })?
                } else {
                    serde_json::Value::String(v.clone())
                };
                Ok((k.clone(), value))
            })
            .collect::<Result<serde_json::Map<_, _>, ConfigError>>()?;

        let raw: PluginValues = serde_json::from_value(serde_json::Value::Object(object))?;
        Self::from_raw(raw)
    }

    /// Parse a TOML document using the plugin settings keys.
    ///
    /// # Errors
    /// Returns [`ConfigError`] on malformed TOML or unusable values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: PluginValues = toml::from_str(source)?;
        Self::from_raw(raw)
    }

    /// Build settings from environment variables.
    ///
    /// - `MATTERMOST_URL`, `MATTERMOST_CHANNEL`, `MATTERMOST_USERNAME`, `MATTERMOST_ICON`
    /// - `MATTERMOST_POST_UPDATES`, `MATTERMOST_POST_WIKI_UPDATES` (`"1"` to enable)
    /// - `MATTERMOST_DISPLAY_WATCHERS` (`"yes"` to enable)
    /// - `REDMINE_HOST_NAME`, `REDMINE_PROTOCOL`, `MATTERMOST_TIMEOUT_SECS`
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a value is unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (var, key) in [
            ("MATTERMOST_URL", "mattermost_url"),
            ("MATTERMOST_CHANNEL", "channel"),
            ("MATTERMOST_USERNAME", "username"),
            ("MATTERMOST_ICON", "icon"),
            ("MATTERMOST_POST_UPDATES", "post_updates"),
            ("MATTERMOST_POST_WIKI_UPDATES", "post_wiki_updates"),
            ("MATTERMOST_DISPLAY_WATCHERS", "display_watchers"),
            ("REDMINE_HOST_NAME", "host_name"),
            ("REDMINE_PROTOCOL", "protocol"),
            ("MATTERMOST_TIMEOUT_SECS", "timeout_secs"),
        ] {
            if let Ok(value) = env::var(var) {
                values.insert(key.to_string(), value);
            }
        }

        debug!(keys = values.len(), "Loaded Mattermost settings from environment");
        Self::from_plugin_values(&values)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
