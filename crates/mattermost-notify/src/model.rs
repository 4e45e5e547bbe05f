//! Read-only snapshots of the host tracker's domain objects.
//!
//! The host owns all of this data. Each snapshot carries exactly the fields the
//! notifier reads, so formatting and resolution can run without a host runtime.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A project and, transitively, its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    /// URL identifier (`my-project`).
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<Box<Project>>,
    /// Project custom field values keyed by field name.
    ///
    /// A key that is present with an empty value is an explicitly cleared
    /// override, which is not the same as the key being absent.
    #[serde(default)]
    pub custom_values: HashMap<String, String>,
}

impl Project {
    /// Create a root project with no overrides.
    #[must_use]
    pub fn new(id: u64, identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            identifier: identifier.into(),
            name: name.into(),
            parent: None,
            custom_values: HashMap::new(),
        }
    }

    /// Attach a parent project.
    #[must_use]
    pub fn with_parent(mut self, parent: Project) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Set a custom field value.
    #[must_use]
    pub fn with_custom_value(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_values.insert(field.into(), value.into());
        self
    }

    /// Custom field value stored on this project only.
    #[must_use]
    pub fn custom_value(&self, field: &str) -> Option<&str> {
        self.custom_values.get(field).map(String::as_str)
    }

    /// This project followed by its ancestors, closest first.
    pub fn lineage(&self) -> Lineage<'_> {
        Lineage {
            next: Some(self),
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Iterator over a project and its ancestors.
pub struct Lineage<'a> {
    next: Option<&'a Project>,
}

impl<'a> Iterator for Lineage<'a> {
    type Item = &'a Project;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}

/// An issue as it stands after the triggering save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub tracker: String,
    pub subject: String,
    pub project: Project,
    pub author: String,
    pub status: String,
    pub priority: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub watchers: Vec<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}: {}", self.tracker, self.id, self.subject)
    }
}

/// The change record written by an issue update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    /// Display name of the user who made the change.
    pub user: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub private_notes: bool,
    #[serde(default)]
    pub details: Vec<ChangeDetail>,
}

/// What kind of property a [`ChangeDetail`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    /// A core issue attribute (`status_id`, `subject`, ...).
    #[serde(rename = "attr")]
    Attribute,
    /// A custom field; the key is the custom field id.
    #[serde(rename = "cf")]
    CustomField,
    /// An attachment was added or removed; the key is the attachment id.
    Attachment,
}

/// One changed field on an issue update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeDetail {
    pub property: PropertyKind,
    pub prop_key: String,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ChangeDetail {
    /// An attribute change, e.g. `status_id` from `1` to `3`.
    #[must_use]
    pub fn attribute(key: impl Into<String>, old: Option<&str>, new: Option<&str>) -> Self {
        Self {
            property: PropertyKind::Attribute,
            prop_key: key.into(),
            old_value: old.map(str::to_string),
            value: new.map(str::to_string),
        }
    }

    /// A custom field change for the field with the given id.
    #[must_use]
    pub fn custom_field(field_id: u64, old: Option<&str>, new: Option<&str>) -> Self {
        Self {
            property: PropertyKind::CustomField,
            prop_key: field_id.to_string(),
            old_value: old.map(str::to_string),
            value: new.map(str::to_string),
        }
    }

    /// An attachment added to the issue.
    #[must_use]
    pub fn attachment(attachment_id: u64, filename: &str) -> Self {
        Self {
            property: PropertyKind::Attachment,
            prop_key: attachment_id.to_string(),
            old_value: None,
            value: Some(filename.to_string()),
        }
    }

    /// The stored after-value, or an empty string when cleared.
    #[must_use]
    pub fn raw_value(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

/// A source control repository attached to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Identifier of the owning project.
    pub project: String,
    /// Repository identifier; `None` for the project's default repository.
    #[serde(default)]
    pub identifier: Option<String>,
}

/// A commit that referenced an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Changeset {
    pub revision: String,
    #[serde(default)]
    pub comments: String,
    pub repository: Repository,
}

/// A wiki page with its latest revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiPage {
    pub title: String,
    /// Author of the latest revision.
    pub author: String,
    /// Edit comment of the latest revision.
    #[serde(default)]
    pub comments: String,
}

/// A file attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: u64,
    pub filename: String,
}

/// Minimal issue reference for linking (e.g. parent task).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub id: u64,
    /// Display text, `Bug #12: Crash on save`.
    pub display: String,
}

/// Definition of a custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldDef {
    pub name: String,
    /// Field format (`string`, `list`, `version`, `user`, ...).
    pub field_format: String,
}
