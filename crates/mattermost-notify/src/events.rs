//! Tracker events the notifier listens for.

use serde::{Deserialize, Serialize};

use crate::model::{Changeset, Issue, Journal, Project, WikiPage};

/// Events raised by the host after a save commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A new issue was saved
    IssueCreated { issue: Issue },

    /// An issue was edited; `journal` records the change
    IssueUpdated { issue: Issue, journal: Journal },

    /// A commit message referenced an issue and updated it
    IssueCommitted {
        issue: Issue,
        journal: Journal,
        changeset: Changeset,
    },

    /// A wiki page was saved
    WikiUpdated { project: Project, page: WikiPage },
}

impl HostEvent {
    /// Short name for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::IssueCreated { .. } => "issue_created",
            Self::IssueUpdated { .. } => "issue_updated",
            Self::IssueCommitted { .. } => "issue_committed",
            Self::WikiUpdated { .. } => "wiki_updated",
        }
    }

    /// The project whose settings decide where the event goes.
    #[must_use]
    pub fn project(&self) -> &Project {
        match self {
            Self::IssueCreated { issue }
            | Self::IssueUpdated { issue, .. }
            | Self::IssueCommitted { issue, .. } => &issue.project,
            Self::WikiUpdated { project, .. } => project,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiki_event_deserializes() {
        let event: HostEvent = serde_json::from_str(
            r#"{
                "type": "wiki_updated",
                "project": {"id": 1, "identifier": "web", "name": "Web"},
                "page": {"title": "Home", "author": "Gina"}
            }"#,
        )
        .unwrap();

        assert_eq!(event.kind(), "wiki_updated");
        assert_eq!(event.project().identifier, "web");
    }

    #[test]
    fn test_issue_event_project() {
        let event: HostEvent = serde_json::from_str(
            r#"{
                "type": "issue_created",
                "issue": {
                    "id": 3, "tracker": "Bug", "subject": "Broken",
                    "project": {
                        "id": 2, "identifier": "api", "name": "API",
                        "parent": {"id": 1, "identifier": "web", "name": "Web"},
                        "custom_values": {"Mattermost Channel": "api-dev"}
                    },
                    "author": "Alice", "status": "New", "priority": "Normal"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(event.kind(), "issue_created");
        let project = event.project();
        assert_eq!(project.custom_value("Mattermost Channel"), Some("api-dev"));
        assert_eq!(project.lineage().count(), 2);
    }
}
