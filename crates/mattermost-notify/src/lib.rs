//! Mattermost notifications for issue tracker events.
//!
//! This crate relays tracker events (issue created, issue updated, issue
//! updated from a commit, wiki page edited) to Mattermost incoming webhooks
//! in a fire-and-forget manner.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use mattermost_notify::{InMemoryDirectory, Listener, Settings};
//!
//! # async fn run(issue: mattermost_notify::model::Issue) -> anyhow::Result<()> {
//! let settings = Settings::from_env()?;
//! let listener = Listener::with_http(settings, Arc::new(InMemoryDirectory::new()))?;
//!
//! // Returns immediately; posts run in the background.
//! listener.issue_created(&issue);
//! # Ok(())
//! # }
//! ```
//!
//! # Routing
//!
//! Channels and webhook URL come from the project's `Mattermost Channel` and
//! `Mattermost URL` custom fields, then the closest ancestor's, then the
//! global settings. A channel value of `-` (or an explicitly empty one)
//! turns notifications off for the project and its subprojects.
//!
//! # Architecture
//!
//! - [`resolver`] picks channels and URL for a project
//! - [`format::Formatter`] builds the message for each event kind
//! - [`delivery::Fanout`] posts one request per channel through a
//!   [`WebhookTransport`]
//! - [`Listener`] ties them together per event

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod delivery;
pub mod directory;
pub mod error;
pub mod escape;
pub mod events;
pub mod format;
pub mod labels;
pub mod links;
pub mod listener;
pub mod model;
pub mod resolver;
pub mod settings;

pub use delivery::{Dispatch, Fanout, HttpTransport, WebhookBody, WebhookTransport};
pub use directory::{Directory, EntityKind, InMemoryDirectory};
pub use error::{ConfigError, DeliveryError};
pub use events::HostEvent;
pub use format::{Attachment, Field, NotificationPayload};
pub use listener::{Listener, Notification};
pub use resolver::NotificationTarget;
pub use settings::Settings;
