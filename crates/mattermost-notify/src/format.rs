//! Message formatting for tracker events.
//!
//! Every message opens with `[<project>] <actor> <verb> <<url>|<subject>>`.
//! Free text is escaped; links use Mattermost's `<url|text>` syntax.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::directory::{Directory, EntityKind};
use crate::escape::escape;
use crate::labels;
use crate::links::Links;
use crate::model::{ChangeDetail, Changeset, Issue, Journal, Project, PropertyKind, WikiPage};
use crate::settings::Settings;

/// Placeholder for fields whose value renders empty.
pub const EMPTY_VALUE: &str = "-";

/// Mattermost usernames: lowercase letters, digits, `_` and `-`, starting
/// with a letter or digit.
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[a-z0-9][a-z0-9_\-]*").expect("valid mention regex"));

/// One title/value pair in a message attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub title: String,
    pub value: String,
    /// Rendered side by side with other short fields.
    pub short: bool,
}

impl Field {
    fn short(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short: true,
        }
    }
}

/// Message attachment with optional text and fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

/// Formatted message for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub text: String,
    pub attachment: Option<Attachment>,
}

/// Builds [`NotificationPayload`]s from event data.
pub struct Formatter<'a> {
    settings: &'a Settings,
    links: &'a Links,
    directory: &'a dyn Directory,
}

impl<'a> Formatter<'a> {
    #[must_use]
    pub fn new(settings: &'a Settings, links: &'a Links, directory: &'a dyn Directory) -> Self {
        Self {
            settings,
            links,
            directory,
        }
    }

    /// Message for a newly created issue.
    #[must_use]
    pub fn issue_created(&self, issue: &Issue) -> NotificationPayload {
        let mut text = self.issue_headline(issue, &issue.author, "created");
        if let Some(to) = mentions(issue.description.as_deref()) {
            text.push_str(&to);
        }

        let mut fields = issue_summary_fields(issue);
        if self.settings.display_watchers {
            fields.push(Field::short(
                labels::WATCHER,
                escape(&issue.watchers.join(", ")),
            ));
        }

        NotificationPayload {
            text,
            attachment: Some(Attachment { text: None, fields }),
        }
    }

    /// Message for an issue edited through the tracker.
    #[must_use]
    pub fn issue_updated(&self, issue: &Issue, journal: &Journal) -> NotificationPayload {
        let mut text = self.issue_headline(issue, &journal.user, "updated");
        if let Some(to) = mentions(journal.notes.as_deref()) {
            text.push_str(&to);
        }

        NotificationPayload {
            text,
            attachment: Some(Attachment {
                text: None,
                fields: issue_summary_fields(issue),
            }),
        }
    }

    /// Message for an issue updated by a commit that references it.
    #[must_use]
    pub fn issue_committed(
        &self,
        issue: &Issue,
        journal: &Journal,
        changeset: &Changeset,
    ) -> NotificationPayload {
        let commit_link = format!(
            "<{}|{}>",
            self.links.revision(changeset),
            escape(&changeset.comments)
        );

        NotificationPayload {
            text: self.issue_headline(issue, &journal.user, "updated"),
            attachment: Some(Attachment {
                text: Some(labels::status_changed_by_changeset(&commit_link)),
                fields: journal
                    .details
                    .iter()
                    .map(|d| self.detail_field(d))
                    .collect(),
            }),
        }
    }

    /// Message for an edited wiki page. Only edits with a comment carry an
    /// attachment.
    #[must_use]
    pub fn wiki_updated(&self, project: &Project, page: &WikiPage) -> NotificationPayload {
        let text = headline(
            project,
            &page.author,
            "updated",
            &self.links.wiki_page(project, &page.title),
            &page.title,
        );

        let attachment = (!page.comments.is_empty()).then(|| Attachment {
            text: Some(escape(&page.comments)),
            fields: vec![],
        });

        NotificationPayload { text, attachment }
    }

    /// Map one change detail to a display field.
    ///
    /// Ids are resolved to display names through the directory; anything that
    /// cannot be resolved keeps the escaped stored value.
    #[must_use]
    pub fn detail_field(&self, detail: &ChangeDetail) -> Field {
        let mut field_format = None;
        let (key, title) = match detail.property {
            PropertyKind::CustomField => {
                match parse_id(&detail.prop_key).and_then(|id| self.directory.custom_field(id)) {
                    Some(def) => {
                        field_format = Some(def.field_format);
                        (def.name.clone(), def.name)
                    }
                    None => (detail.prop_key.clone(), detail.prop_key.clone()),
                }
            }
            PropertyKind::Attachment => ("attachment".to_string(), labels::ATTACHMENT.to_string()),
            PropertyKind::Attribute => {
                let key = detail
                    .prop_key
                    .strip_suffix("_id")
                    .unwrap_or(&detail.prop_key)
                    .to_string();
                let title = labels::field(&key);
                (key, title)
            }
        };

        let raw = escape(detail.raw_value());
        let short = !matches!(key.as_str(), "title" | "subject" | "description");

        let mut value = match key.as_str() {
            "attachment" => parse_id(&detail.prop_key)
                .and_then(|id| self.directory.attachment(id))
                .map(|a| format!("<{}|{}>", self.links.attachment(a.id), escape(&a.filename))),
            "parent" => parse_id(detail.raw_value())
                .and_then(|id| self.directory.issue(id))
                .map(|i| format!("<{}|{}>", self.links.issue(i.id), escape(&i.display))),
            other => EntityKind::for_attribute(other).and_then(|kind| self.name_of(kind, detail)),
        }
        .unwrap_or(raw);

        if field_format.as_deref() == Some("version") {
            if let Some(version) = self.name_of(EntityKind::Version, detail) {
                value = version;
            }
        }

        if value.is_empty() {
            value = EMPTY_VALUE.to_string();
        }

        Field { title, value, short }
    }

    fn name_of(&self, kind: EntityKind, detail: &ChangeDetail) -> Option<String> {
        parse_id(detail.raw_value())
            .and_then(|id| self.directory.name_of(kind, id))
            .map(|name| escape(&name))
    }

    fn issue_headline(&self, issue: &Issue, actor: &str, verb: &str) -> String {
        headline(
            &issue.project,
            actor,
            verb,
            &self.links.issue(issue.id),
            &issue.to_string(),
        )
    }
}

fn headline(project: &Project, actor: &str, verb: &str, url: &str, subject: &str) -> String {
    format!(
        "[{}] {} {verb} <{url}|{}>",
        escape(&project.name),
        escape(actor),
        escape(subject)
    )
}

/// Status, priority and assignee, shared by created and updated messages.
fn issue_summary_fields(issue: &Issue) -> Vec<Field> {
    vec![
        Field::short(labels::field("status"), escape(&issue.status)),
        Field::short(labels::field("priority"), escape(&issue.priority)),
        Field::short(
            labels::field("assigned_to"),
            escape(issue.assigned_to.as_deref().unwrap_or_default()),
        ),
    ]
}

fn parse_id(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

/// Usernames mentioned in `text`, in order of first appearance.
#[must_use]
pub fn extract_usernames(text: &str) -> Vec<String> {
    let mut names: Vec<String> = vec![];
    for m in MENTION_RE.find_iter(text) {
        if !names.iter().any(|n| n == m.as_str()) {
            names.push(m.as_str().to_string());
        }
    }
    names
}

/// Second message line addressing mentioned users, if any.
#[must_use]
pub fn mentions(text: Option<&str>) -> Option<String> {
    let names = extract_usernames(text?);
    (!names.is_empty()).then(|| format!("\nTo: {}", names.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::model::Repository;

    fn issue() -> Issue {
        Issue {
            id: 12,
            tracker: "Bug".to_string(),
            subject: "Crash <on> save".to_string(),
            project: Project::new(1, "web", "Web & API"),
            author: "Alice".to_string(),
            status: "New".to_string(),
            priority: "High".to_string(),
            assigned_to: Some("Bob".to_string()),
            watchers: vec!["Carol".to_string(), "Dan <ops>".to_string()],
            is_private: false,
            description: None,
        }
    }

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::new()
            .with_name(EntityKind::Status, 3, "Closed")
            .with_name(EntityKind::User, 5, "Bob")
            .with_name(EntityKind::Version, 8, "v2.0")
            .with_name(EntityKind::Tracker, 1, "Feature")
            .with_attachment(21, "crash<1>.log")
            .with_issue(4, "Feature #4: Parent")
            .with_custom_field(9, "Release", "version")
            .with_custom_field(10, "Severity", "list")
    }

    fn links() -> Links {
        Links::new("tracker.example.com", "https")
    }

    #[test]
    fn test_issue_created_headline_and_fields() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);

        let payload = formatter.issue_created(&issue());

        assert_eq!(
            payload.text,
            "[Web &amp; API] Alice created <https://tracker.example.com/issues/12|Bug #12: Crash &lt;on&gt; save>"
        );
        let attachment = payload.attachment.unwrap();
        assert_eq!(attachment.text, None);
        assert_eq!(
            attachment.fields,
            vec![
                Field::short("Status", "New"),
                Field::short("Priority", "High"),
                Field::short("Assignee", "Bob"),
            ]
        );
    }

    #[test]
    fn test_issue_created_watchers() {
        let settings = Settings {
            display_watchers: true,
            ..Settings::default()
        };
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);

        let fields = formatter.issue_created(&issue()).attachment.unwrap().fields;

        assert_eq!(fields.len(), 4);
        assert_eq!(fields[3], Field::short("Watcher", "Carol, Dan &lt;ops&gt;"));
    }

    #[test]
    fn test_issue_created_mentions() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);
        let mut issue = issue();
        issue.description = Some("@carol please check with @dev-team and @carol".to_string());

        let text = formatter.issue_created(&issue).text;

        assert!(text.ends_with("\nTo: @carol, @dev-team"));
        assert!(text.starts_with("[Web &amp; API] Alice created <"));
    }

    #[test]
    fn test_issue_updated_uses_journal_user() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);
        let journal = Journal {
            user: "Eve".to_string(),
            notes: Some("no mentions here".to_string()),
            ..Journal::default()
        };

        let payload = formatter.issue_updated(&issue(), &journal);

        assert!(payload.text.starts_with("[Web &amp; API] Eve updated <https://tracker.example.com/issues/12|"));
        assert!(!payload.text.contains('\n'));
        assert_eq!(payload.attachment.unwrap().fields.len(), 3);
    }

    #[test]
    fn test_issue_committed_attachment() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);
        let journal = Journal {
            user: "Frank".to_string(),
            details: vec![ChangeDetail::attribute("status_id", Some("1"), Some("3"))],
            ..Journal::default()
        };
        let changeset = Changeset {
            revision: "abc123".to_string(),
            comments: "Fixes #12 & more".to_string(),
            repository: Repository {
                project: "web".to_string(),
                identifier: None,
            },
        };

        let attachment = formatter
            .issue_committed(&issue(), &journal, &changeset)
            .attachment
            .unwrap();

        assert_eq!(
            attachment.text.as_deref(),
            Some("Applied in changeset <https://tracker.example.com/projects/web/repository/revisions/abc123|Fixes #12 &amp; more>.")
        );
        assert_eq!(attachment.fields, vec![Field::short("Status", "Closed")]);
    }

    #[test]
    fn test_wiki_attachment_only_with_comment() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);
        let project = Project::new(1, "web", "Web");
        let mut page = WikiPage {
            title: "Release Notes".to_string(),
            author: "Gina".to_string(),
            comments: String::new(),
        };

        let payload = formatter.wiki_updated(&project, &page);
        assert_eq!(
            payload.text,
            "[Web] Gina updated <https://tracker.example.com/projects/web/wiki/Release%20Notes|Release Notes>"
        );
        assert_eq!(payload.attachment, None);

        page.comments = "Added <b>2.0</b>".to_string();
        let payload = formatter.wiki_updated(&project, &page);
        assert_eq!(
            payload.attachment.unwrap().text.as_deref(),
            Some("Added &lt;b&gt;2.0&lt;/b&gt;")
        );
    }

    #[test]
    fn test_detail_status_lookup() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);

        let field = formatter.detail_field(&ChangeDetail::attribute("status_id", Some("1"), Some("3")));
        assert_eq!(field, Field::short("Status", "Closed"));
    }

    #[test]
    fn test_detail_long_fields() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);

        let field = formatter.detail_field(&ChangeDetail::attribute("subject", Some("a"), Some("b")));
        assert_eq!(field.title, "Subject");
        assert_eq!(field.value, "b");
        assert!(!field.short);

        let field = formatter.detail_field(&ChangeDetail::attribute("description", None, Some("x")));
        assert!(!field.short);
    }

    #[test]
    fn test_detail_lookup_failure_keeps_raw_value() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);

        let field = formatter.detail_field(&ChangeDetail::attribute("status_id", None, Some("99")));
        assert_eq!(field, Field::short("Status", "99"));

        let field =
            formatter.detail_field(&ChangeDetail::attribute("assigned_to_id", Some("5"), Some("x<")));
        assert_eq!(field, Field::short("Assignee", "x&lt;"));
    }

    #[test]
    fn test_detail_cleared_value_is_placeholder() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);

        let field = formatter.detail_field(&ChangeDetail::attribute("assigned_to_id", Some("5"), None));
        assert_eq!(field, Field::short("Assignee", "-"));
    }

    #[test]
    fn test_detail_attachment_and_parent_links() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);

        let field = formatter.detail_field(&ChangeDetail::attachment(21, "crash<1>.log"));
        assert_eq!(
            field,
            Field::short(
                "File",
                "<https://tracker.example.com/attachments/21|crash&lt;1&gt;.log>"
            )
        );

        let field = formatter.detail_field(&ChangeDetail::attribute("parent_id", None, Some("4")));
        assert_eq!(
            field,
            Field::short(
                "Parent task",
                "<https://tracker.example.com/issues/4|Feature #4: Parent>"
            )
        );

        let field = formatter.detail_field(&ChangeDetail::attachment(22, "gone.txt"));
        assert_eq!(field, Field::short("File", "gone.txt"));
    }

    #[test]
    fn test_detail_custom_fields() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);

        let field = formatter.detail_field(&ChangeDetail::custom_field(9, None, Some("8")));
        assert_eq!(field, Field::short("Release", "v2.0"));

        let field = formatter.detail_field(&ChangeDetail::custom_field(10, None, Some("Major")));
        assert_eq!(field, Field::short("Severity", "Major"));

        let field = formatter.detail_field(&ChangeDetail::custom_field(77, None, Some("x")));
        assert_eq!(field, Field::short("77", "x"));
    }

    #[test]
    fn test_detail_unknown_attribute_humanized() {
        let settings = Settings::default();
        let (links, directory) = (links(), directory());
        let formatter = Formatter::new(&settings, &links, &directory);

        let field =
            formatter.detail_field(&ChangeDetail::attribute("start_date", None, Some("2024-01-01")));
        assert_eq!(field, Field::short("Start date", "2024-01-01"));
    }

    #[test]
    fn test_extract_usernames() {
        assert_eq!(
            extract_usernames("ping @alice, @bob-2 and @alice again; @Upper"),
            vec!["@alice", "@bob-2"]
        );
        assert!(extract_usernames("no one").is_empty());
        assert_eq!(mentions(None), None);
        assert_eq!(mentions(Some("plain")), None);
    }
}
