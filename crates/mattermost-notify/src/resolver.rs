//! Destination resolution across the project hierarchy.
//!
//! A project's own custom field override wins, then the closest ancestor's,
//! then the global setting. The first candidate found shadows everything above
//! it; nothing is merged.

use serde::Serialize;

use crate::model::Project;
use crate::settings::{Settings, CHANNEL_FIELD, URL_FIELD};

/// Channel value that explicitly disables notifications.
pub const OPT_OUT: &str = "-";

/// Where a project's notifications go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationTarget {
    /// Channels in configured order. Empty means do not notify.
    pub channels: Vec<String>,
    /// Incoming-webhook URL.
    pub url: Option<String>,
}

impl NotificationTarget {
    /// Resolve channels and URL for a project.
    #[must_use]
    pub fn for_project(project: &Project, settings: &Settings) -> Self {
        Self {
            channels: resolve_channels(project, settings.channel.as_deref()),
            url: resolve(project, URL_FIELD, settings.mattermost_url.as_deref()),
        }
    }

    /// Whether an event for this target should be delivered at all.
    #[must_use]
    pub fn is_deliverable(&self) -> bool {
        !self.channels.is_empty() && self.url.is_some()
    }
}

/// First non-blank value of `field` on the project or its ancestors, falling
/// back to `global`.
#[must_use]
pub fn resolve(project: &Project, field: &str, global: Option<&str>) -> Option<String> {
    project
        .lineage()
        .filter_map(|p| p.custom_value(field))
        .chain(global)
        .find(|v| !v.trim().is_empty())
        .map(str::to_string)
}

/// Channel list for a project.
///
/// An override that is explicitly empty or `-` at the closest level that has
/// one suppresses delivery even when an ancestor or the global setting names a
/// channel. A project without the field set falls through to its parent.
#[must_use]
pub fn resolve_channels(project: &Project, global: Option<&str>) -> Vec<String> {
    let raw = project
        .lineage()
        .find_map(|p| p.custom_value(CHANNEL_FIELD))
        .or(global)
        .unwrap_or_default();

    split_channels(raw)
}

/// Split a raw channel setting into channel names.
///
/// Blank and `-` yield no channels. Empty comma segments are dropped.
#[must_use]
pub fn split_channels(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == OPT_OUT {
        return vec![];
    }

    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(channel: Option<&str>, url: Option<&str>) -> Settings {
        Settings {
            channel: channel.map(str::to_string),
            mattermost_url: url.map(str::to_string),
            ..Settings::default()
        }
    }

    #[test]
    fn test_global_fallback() {
        let project = Project::new(1, "web", "Web");
        let target = NotificationTarget::for_project(
            &project,
            &settings(Some("town-square"), Some("https://chat/hooks/g")),
        );

        assert_eq!(target.channels, vec!["town-square"]);
        assert_eq!(target.url.as_deref(), Some("https://chat/hooks/g"));
        assert!(target.is_deliverable());
    }

    #[test]
    fn test_closest_ancestor_wins() {
        let root = Project::new(1, "root", "Root")
            .with_custom_value(CHANNEL_FIELD, "root-chan")
            .with_custom_value(URL_FIELD, "https://chat/hooks/root");
        let mid = Project::new(2, "mid", "Mid")
            .with_parent(root)
            .with_custom_value(CHANNEL_FIELD, "mid-chan")
            .with_custom_value(URL_FIELD, "https://chat/hooks/mid");
        let leaf = Project::new(3, "leaf", "Leaf").with_parent(mid.clone());
        let global = settings(Some("global"), Some("https://chat/hooks/g"));

        let leaf_target = NotificationTarget::for_project(&leaf, &global);
        let mid_target = NotificationTarget::for_project(&mid, &global);

        assert_eq!(leaf_target, mid_target);
        assert_eq!(leaf_target.channels, vec!["mid-chan"]);
        assert_eq!(leaf_target.url.as_deref(), Some("https://chat/hooks/mid"));
    }

    #[test]
    fn test_blank_url_override_falls_through() {
        let root = Project::new(1, "root", "Root").with_custom_value(URL_FIELD, "https://chat/r");
        let leaf = Project::new(2, "leaf", "Leaf")
            .with_parent(root)
            .with_custom_value(URL_FIELD, "  ");

        assert_eq!(
            resolve(&leaf, URL_FIELD, Some("https://chat/g")).as_deref(),
            Some("https://chat/r")
        );
    }

    #[test]
    fn test_nothing_configured() {
        let project = Project::new(1, "web", "Web");
        let target = NotificationTarget::for_project(&project, &settings(None, None));

        assert!(target.channels.is_empty());
        assert_eq!(target.url, None);
        assert!(!target.is_deliverable());
    }

    #[test]
    fn test_opt_out_sentinel_suppresses_ancestors_and_global() {
        for sentinel in ["-", ""] {
            let root = Project::new(1, "root", "Root").with_custom_value(CHANNEL_FIELD, "ops");
            let leaf = Project::new(2, "leaf", "Leaf")
                .with_parent(root)
                .with_custom_value(CHANNEL_FIELD, sentinel);

            let target = NotificationTarget::for_project(
                &leaf,
                &settings(Some("global"), Some("https://chat/hooks/g")),
            );
            assert!(target.channels.is_empty(), "sentinel {sentinel:?}");
            assert_eq!(target.url.as_deref(), Some("https://chat/hooks/g"));
        }
    }

    #[test]
    fn test_opt_out_on_parent_applies_to_children() {
        let root = Project::new(1, "root", "Root").with_custom_value(CHANNEL_FIELD, "-");
        let leaf = Project::new(2, "leaf", "Leaf").with_parent(root);

        assert!(resolve_channels(&leaf, Some("global")).is_empty());
    }

    #[test]
    fn test_global_opt_out() {
        let project = Project::new(1, "web", "Web");
        assert!(resolve_channels(&project, Some("-")).is_empty());
    }

    #[test]
    fn test_split_channels() {
        assert_eq!(split_channels("town-square,dev"), vec!["town-square", "dev"]);
        assert_eq!(split_channels("a, b,,c"), vec!["a", "b", "c"]);
        assert_eq!(split_channels("solo"), vec!["solo"]);
        assert!(split_channels("-").is_empty());
        assert!(split_channels("   ").is_empty());
    }
}
