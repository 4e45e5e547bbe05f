//! Absolute links back into the tracker.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Changeset, Project};
use crate::settings::Settings;

/// Splits a configured host name into host, port and path prefix.
static HOST_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\A(https?://)?(.+?)(:(\d+))?(/.+)?\z").expect("valid host name regex")
});

/// Builds object URLs from the tracker's host name and protocol settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    base: String,
}

impl Links {
    /// Create a link builder from a host name such as `tracker.example.com`,
    /// `https://tracker.example.com:8443/redmine` or `localhost:3000`.
    ///
    /// Any scheme in the host name is ignored in favour of `protocol`.
    #[must_use]
    pub fn new(host_name: &str, protocol: &str) -> Self {
        let host_name = host_name.trim();
        let base = match HOST_NAME_RE.captures(host_name) {
            Some(caps) => {
                let host = caps.get(2).map_or("", |m| m.as_str());
                let port = caps
                    .get(4)
                    .map(|m| format!(":{}", m.as_str()))
                    .unwrap_or_default();
                let prefix = caps
                    .get(5)
                    .map_or("", |m| m.as_str().trim_end_matches('/'));
                format!("{protocol}://{host}{port}{prefix}")
            }
            None => format!("{protocol}://{host_name}"),
        };
        Self { base }
    }

    /// Link builder for the host settings in a [`Settings`] snapshot.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.host_name, &settings.protocol)
    }

    #[must_use]
    pub fn issue(&self, id: u64) -> String {
        format!("{}/issues/{id}", self.base)
    }

    #[must_use]
    pub fn project(&self, project: &Project) -> String {
        format!("{}/projects/{}", self.base, project.identifier)
    }

    #[must_use]
    pub fn wiki_page(&self, project: &Project, title: &str) -> String {
        format!(
            "{}/projects/{}/wiki/{}",
            self.base,
            project.identifier,
            urlencoding::encode(title)
        )
    }

    #[must_use]
    pub fn attachment(&self, id: u64) -> String {
        format!("{}/attachments/{id}", self.base)
    }

    /// Revision page of a changeset in its repository browser.
    #[must_use]
    pub fn revision(&self, changeset: &Changeset) -> String {
        let repository = &changeset.repository;
        let revision = urlencoding::encode(&changeset.revision);
        match repository.identifier.as_deref().filter(|id| !id.is_empty()) {
            Some(identifier) => format!(
                "{}/projects/{}/repository/{identifier}/revisions/{revision}",
                self.base, repository.project
            ),
            None => format!(
                "{}/projects/{}/repository/revisions/{revision}",
                self.base, repository.project
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Repository;

    #[test]
    fn test_plain_host() {
        let links = Links::new("tracker.example.com", "https");
        assert_eq!(links.issue(42), "https://tracker.example.com/issues/42");
    }

    #[test]
    fn test_host_with_scheme_port_and_prefix() {
        let links = Links::new("http://tracker.example.com:8443/redmine/", "https");
        assert_eq!(
            links.attachment(7),
            "https://tracker.example.com:8443/redmine/attachments/7"
        );
    }

    #[test]
    fn test_host_with_port() {
        let links = Links::new("localhost:3000", "http");
        assert_eq!(
            links.project(&Project::new(1, "web", "Web")),
            "http://localhost:3000/projects/web"
        );
    }

    #[test]
    fn test_wiki_title_is_encoded() {
        let links = Links::new("tracker.example.com", "https");
        assert_eq!(
            links.wiki_page(&Project::new(1, "web", "Web"), "Release Notes"),
            "https://tracker.example.com/projects/web/wiki/Release%20Notes"
        );
    }

    #[test]
    fn test_revision_links() {
        let links = Links::new("tracker.example.com", "https");
        let mut changeset = Changeset {
            revision: "abc123".to_string(),
            comments: "Fixes #1".to_string(),
            repository: Repository {
                project: "web".to_string(),
                identifier: None,
            },
        };
        assert_eq!(
            links.revision(&changeset),
            "https://tracker.example.com/projects/web/repository/revisions/abc123"
        );

        changeset.repository.identifier = Some("api".to_string());
        assert_eq!(
            links.revision(&changeset),
            "https://tracker.example.com/projects/web/repository/api/revisions/abc123"
        );
    }
}
