//! Entry points the host calls after a save commits.
//!
//! Each handler resolves the destination first and bails out early when there
//! is nowhere to send, then formats the message and hands it to the fan-out.
//! Handlers return immediately; delivery runs in the background.

use std::sync::Arc;

use tracing::debug;

use crate::delivery::{ChannelResult, Dispatch, Fanout, HttpTransport, WebhookTransport};
use crate::directory::Directory;
use crate::error::DeliveryError;
use crate::events::HostEvent;
use crate::format::{Formatter, NotificationPayload};
use crate::links::Links;
use crate::model::{Changeset, Issue, Journal, Project, WikiPage};
use crate::resolver::NotificationTarget;
use crate::settings::Settings;

/// A message ready to post, with its resolved destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channels: Vec<String>,
    pub url: String,
    pub payload: NotificationPayload,
}

/// Relays tracker events to Mattermost.
pub struct Listener {
    settings: Settings,
    links: Links,
    directory: Arc<dyn Directory>,
    fanout: Fanout,
}

impl Listener {
    /// Create a listener with a specific transport.
    #[must_use]
    pub fn new(
        settings: Settings,
        directory: Arc<dyn Directory>,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        Self {
            links: Links::from_settings(&settings),
            settings,
            directory,
            fanout: Fanout::new(transport),
        }
    }

    /// Create a listener that posts over HTTP.
    ///
    /// # Errors
    /// Returns [`DeliveryError::Http`] if the HTTP client cannot be built.
    pub fn with_http(settings: Settings, directory: Arc<dyn Directory>) -> Result<Self, DeliveryError> {
        let transport = HttpTransport::from_settings(&settings)?;
        Ok(Self::new(settings, directory, Arc::new(transport)))
    }

    fn formatter(&self) -> Formatter<'_> {
        Formatter::new(&self.settings, &self.links, self.directory.as_ref())
    }

    /// Destination for a project, or `None` when it has no channels or URL.
    fn target(&self, project: &Project, event: &'static str) -> Option<(Vec<String>, String)> {
        let target = NotificationTarget::for_project(project, &self.settings);
        match target {
            NotificationTarget {
                channels,
                url: Some(url),
            } if !channels.is_empty() => Some((channels, url)),
            _ => {
                debug!(
                    event,
                    project = %self.links.project(project),
                    "No Mattermost channel or URL configured, skipping"
                );
                None
            }
        }
    }

    /// Message for a new issue. Private issues are never posted.
    #[must_use]
    pub fn prepare_issue_created(&self, issue: &Issue) -> Option<Notification> {
        let (channels, url) = self.target(&issue.project, "issue_created")?;
        if issue.is_private {
            debug!(issue = issue.id, "Private issue, skipping");
            return None;
        }

        Some(Notification {
            channels,
            url,
            payload: self.formatter().issue_created(issue),
        })
    }

    /// Message for an edited issue. Requires `post_updates`; skips private
    /// issues and private notes.
    #[must_use]
    pub fn prepare_issue_updated(&self, issue: &Issue, journal: &Journal) -> Option<Notification> {
        let (channels, url) = self.target(&issue.project, "issue_updated")?;
        if !self.settings.post_updates {
            debug!(issue = issue.id, "Issue update posting disabled, skipping");
            return None;
        }
        if issue.is_private || journal.private_notes {
            debug!(issue = issue.id, "Private issue or notes, skipping");
            return None;
        }

        Some(Notification {
            channels,
            url,
            payload: self.formatter().issue_updated(issue, journal),
        })
    }

    /// Message for an issue updated by a commit. Private issues are skipped.
    #[must_use]
    pub fn prepare_issue_committed(
        &self,
        issue: &Issue,
        journal: &Journal,
        changeset: &Changeset,
    ) -> Option<Notification> {
        let (channels, url) = self.target(&issue.project, "issue_committed")?;
        if issue.is_private {
            debug!(issue = issue.id, "Private issue, skipping");
            return None;
        }

        Some(Notification {
            channels,
            url,
            payload: self.formatter().issue_committed(issue, journal, changeset),
        })
    }

    /// Message for an edited wiki page. Requires `post_wiki_updates`.
    #[must_use]
    pub fn prepare_wiki_updated(&self, project: &Project, page: &WikiPage) -> Option<Notification> {
        if !self.settings.post_wiki_updates {
            debug!(page = %page.title, "Wiki update posting disabled, skipping");
            return None;
        }
        let (channels, url) = self.target(project, "wiki_updated")?;

        Some(Notification {
            channels,
            url,
            payload: self.formatter().wiki_updated(project, page),
        })
    }

    /// Message for any host event.
    #[must_use]
    pub fn prepare(&self, event: &HostEvent) -> Option<Notification> {
        match event {
            HostEvent::IssueCreated { issue } => self.prepare_issue_created(issue),
            HostEvent::IssueUpdated { issue, journal } => self.prepare_issue_updated(issue, journal),
            HostEvent::IssueCommitted {
                issue,
                journal,
                changeset,
            } => self.prepare_issue_committed(issue, journal, changeset),
            HostEvent::WikiUpdated { project, page } => self.prepare_wiki_updated(project, page),
        }
    }

    pub fn issue_created(&self, issue: &Issue) -> Dispatch {
        self.dispatch(self.prepare_issue_created(issue))
    }

    pub fn issue_updated(&self, issue: &Issue, journal: &Journal) -> Dispatch {
        self.dispatch(self.prepare_issue_updated(issue, journal))
    }

    pub fn issue_committed(&self, issue: &Issue, journal: &Journal, changeset: &Changeset) -> Dispatch {
        self.dispatch(self.prepare_issue_committed(issue, journal, changeset))
    }

    pub fn wiki_updated(&self, project: &Project, page: &WikiPage) -> Dispatch {
        self.dispatch(self.prepare_wiki_updated(project, page))
    }

    /// Handle any host event in the background.
    pub fn handle(&self, event: &HostEvent) -> Dispatch {
        self.dispatch(self.prepare(event))
    }

    /// Handle an event and wait for every channel's post to finish.
    pub async fn handle_and_wait(&self, event: &HostEvent) -> Vec<ChannelResult> {
        match self.prepare(event) {
            Some(n) => {
                self.fanout
                    .deliver_and_wait(&n.payload, &n.channels, &n.url, &self.settings)
                    .await
            }
            None => vec![],
        }
    }

    /// Post `payload` to explicit channels and URL, bypassing resolution.
    pub async fn post_and_wait(
        &self,
        payload: &NotificationPayload,
        channels: &[String],
        url: &str,
    ) -> Vec<ChannelResult> {
        self.fanout
            .deliver_and_wait(payload, channels, url, &self.settings)
            .await
    }

    fn dispatch(&self, notification: Option<Notification>) -> Dispatch {
        match notification {
            Some(n) => {
                let dispatch = self
                    .fanout
                    .spawn(&n.payload, &n.channels, &n.url, &self.settings);
                debug!(channels = dispatch.len(), "Dispatched Mattermost notification");
                dispatch
            }
            None => Dispatch::default(),
        }
    }
}
