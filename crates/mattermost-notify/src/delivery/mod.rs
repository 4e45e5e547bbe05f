//! Per-channel fan-out of formatted messages.
//!
//! Each channel gets its own request. Failures are logged with the
//! destination and cause and never reach the caller; one channel failing does
//! not hold up or cancel the others. There is no retry.

pub mod transport;

use std::sync::Arc;

use futures::future::join_all;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DeliveryError;
use crate::format::NotificationPayload;
use crate::settings::Settings;

pub use transport::{HttpTransport, WebhookBody, WebhookTransport};

/// Outcome of one channel's delivery.
pub type ChannelResult = (String, Result<(), DeliveryError>);

/// Dispatches a message to every resolved channel.
#[derive(Clone)]
pub struct Fanout {
    transport: Arc<dyn WebhookTransport>,
    runtime: Option<Handle>,
    _owned: Option<Arc<OwnedRuntime>>,
}

impl Fanout {
    /// Create a fan-out that spawns posts on the current tokio runtime.
    ///
    /// Outside a runtime a small dedicated one is started, so handlers can be
    /// called from plain host threads.
    #[must_use]
    pub fn new(transport: Arc<dyn WebhookTransport>) -> Self {
        match Handle::try_current() {
            Ok(handle) => Self::with_runtime(transport, handle),
            Err(_) => Self::with_own_runtime(transport),
        }
    }

    /// Create a fan-out that spawns posts on `handle`.
    #[must_use]
    pub fn with_runtime(transport: Arc<dyn WebhookTransport>, handle: Handle) -> Self {
        Self {
            transport,
            runtime: Some(handle),
            _owned: None,
        }
    }

    fn with_own_runtime(transport: Arc<dyn WebhookTransport>) -> Self {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("mattermost-notify")
            .enable_all()
            .build();

        match runtime {
            Ok(runtime) => {
                debug!("Started dedicated runtime for Mattermost delivery");
                Self {
                    transport,
                    runtime: Some(runtime.handle().clone()),
                    _owned: Some(Arc::new(OwnedRuntime(Some(runtime)))),
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot start runtime for Mattermost delivery");
                Self {
                    transport,
                    runtime: None,
                    _owned: None,
                }
            }
        }
    }

    /// Start one background post per channel and return immediately.
    ///
    /// Safe to call from any thread. Posts run on the runtime captured at
    /// construction; without one the event is logged and dropped.
    pub fn spawn(
        &self,
        payload: &NotificationPayload,
        channels: &[String],
        url: &str,
        settings: &Settings,
    ) -> Dispatch {
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!(url = %url, "No tokio runtime, dropping Mattermost notification");
            return Dispatch::default();
        };

        let body = WebhookBody::from_payload(payload, settings);
        let handles = channels
            .iter()
            .map(|channel| {
                let transport = Arc::clone(&self.transport);
                let body = body.for_channel(channel);
                let url = url.to_string();
                let handle = runtime.spawn(async move { post_logged(&*transport, &url, &body).await });
                (channel.clone(), handle)
            })
            .collect();

        Dispatch { handles }
    }

    /// Post to every channel concurrently and wait for all of them.
    pub async fn deliver_and_wait(
        &self,
        payload: &NotificationPayload,
        channels: &[String],
        url: &str,
        settings: &Settings,
    ) -> Vec<ChannelResult> {
        let body = WebhookBody::from_payload(payload, settings);
        let transport = &*self.transport;

        join_all(channels.iter().map(|channel| {
            let body = body.for_channel(channel);
            async move { (channel.clone(), post_logged(transport, url, &body).await) }
        }))
        .await
    }
}

/// Runtime started by the fan-out itself.
///
/// Shut down in the background so the last clone may be dropped from async
/// code; posts still in flight at that point are abandoned.
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

async fn post_logged(
    transport: &dyn WebhookTransport,
    url: &str,
    body: &WebhookBody,
) -> Result<(), DeliveryError> {
    match transport.post(url, body).await {
        Ok(()) => {
            debug!(
                transport = transport.name(),
                channel = %body.channel,
                "Notification sent"
            );
            Ok(())
        }
        Err(e) => {
            warn!(
                transport = transport.name(),
                url = %url,
                channel = %body.channel,
                error = %e,
                "Cannot connect to Mattermost webhook"
            );
            Err(e)
        }
    }
}

/// Handles for the background posts of one event.
///
/// Dropping a `Dispatch` leaves the posts running.
#[derive(Default)]
pub struct Dispatch {
    handles: Vec<(String, JoinHandle<Result<(), DeliveryError>>)>,
}

impl Dispatch {
    /// Number of channels a post was started for.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether nothing was dispatched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Channels in dispatch order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|(c, _)| c.as_str())
    }

    /// Wait for every post to finish.
    pub async fn join(self) -> Vec<ChannelResult> {
        let (channels, handles): (Vec<_>, Vec<_>) = self.handles.into_iter().unzip();
        channels
            .into_iter()
            .zip(join_all(handles).await)
            .map(|(channel, joined)| {
                let result = joined.unwrap_or_else(|e| Err(DeliveryError::Aborted(e.to_string())));
                (channel, result)
            })
            .collect()
    }
}
