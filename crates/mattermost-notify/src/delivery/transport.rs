//! Mattermost incoming-webhook transport.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DeliveryError;
use crate::format::{Attachment, NotificationPayload};
use crate::settings::Settings;

/// Trait for sending a webhook body to a URL.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Get the name of this transport.
    fn name(&self) -> &'static str;

    /// Post one message. Any HTTP response counts as delivered.
    async fn post(&self, url: &str, body: &WebhookBody) -> Result<(), DeliveryError>;
}

/// JSON body accepted by a Mattermost incoming webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookBody {
    pub text: String,
    pub link_names: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

impl WebhookBody {
    /// Body shared by all channels; `channel` is filled in per request.
    #[must_use]
    pub fn from_payload(payload: &NotificationPayload, settings: &Settings) -> Self {
        let icon = settings.icon.as_deref().filter(|i| !i.is_empty());
        let (icon_emoji, icon_url) = match icon {
            Some(icon) if icon.starts_with(':') => (Some(icon.to_string()), None),
            Some(icon) => (None, Some(icon.to_string())),
            None => (None, None),
        };

        Self {
            text: payload.text.clone(),
            link_names: 1,
            username: settings.username.clone().filter(|u| !u.is_empty()),
            icon_emoji,
            icon_url,
            channel: String::new(),
            attachments: payload.attachment.clone().map(|a| vec![a]),
        }
    }

    /// Copy of this body addressed to `channel`.
    #[must_use]
    pub fn for_channel(&self, channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            ..self.clone()
        }
    }
}

/// HTTP transport backed by `reqwest` with the platform trust store.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the given request timeout.
    ///
    /// # Errors
    /// Returns [`DeliveryError::Http`] if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mattermost-notify/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Create a transport from a [`Settings`] snapshot.
    ///
    /// # Errors
    /// Returns [`DeliveryError::Http`] if the client cannot be built.
    pub fn from_settings(settings: &Settings) -> Result<Self, DeliveryError> {
        Self::new(settings.timeout)
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    fn name(&self) -> &'static str {
        "mattermost"
    }

    async fn post(&self, url: &str, body: &WebhookBody) -> Result<(), DeliveryError> {
        let response = self.client.post(url).json(body).send().await?;

        debug!(
            channel = %body.channel,
            status = %response.status(),
            "Webhook accepted request"
        );
        Ok(())
    }
}
