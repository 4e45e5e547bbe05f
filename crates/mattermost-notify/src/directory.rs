//! Lookups into the host tracker's records.
//!
//! Change details only carry ids. The formatter resolves them to display names
//! through [`Directory`]. A record that was deleted or an id that does not
//! parse comes back as `None`; implementations must not panic or error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{AttachmentRef, CustomFieldDef, IssueRef};

/// Named record types an id in a change detail can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tracker,
    Project,
    Status,
    Priority,
    Category,
    User,
    Version,
}

impl EntityKind {
    /// Kind referenced by an attribute key (after `_id` stripping).
    #[must_use]
    pub fn for_attribute(key: &str) -> Option<Self> {
        match key {
            "tracker" => Some(Self::Tracker),
            "project" => Some(Self::Project),
            "status" => Some(Self::Status),
            "priority" => Some(Self::Priority),
            "category" => Some(Self::Category),
            "assigned_to" => Some(Self::User),
            "fixed_version" => Some(Self::Version),
            _ => None,
        }
    }
}

/// Read access to host records by id.
pub trait Directory: Send + Sync {
    /// Display name of a tracker, status, user, version, etc.
    fn name_of(&self, kind: EntityKind, id: u64) -> Option<String>;

    /// Attachment metadata.
    fn attachment(&self, id: u64) -> Option<AttachmentRef>;

    /// Issue reference for linking.
    fn issue(&self, id: u64) -> Option<IssueRef>;

    /// Custom field definition.
    fn custom_field(&self, id: u64) -> Option<CustomFieldDef>;
}

/// A [`Directory`] backed by maps, loaded from a snapshot or built in tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryDirectory {
    #[serde(default)]
    pub names: HashMap<EntityKind, HashMap<u64, String>>,
    #[serde(default)]
    pub attachments: HashMap<u64, AttachmentRef>,
    #[serde(default)]
    pub issues: HashMap<u64, IssueRef>,
    #[serde(default)]
    pub custom_fields: HashMap<u64, CustomFieldDef>,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named record.
    #[must_use]
    pub fn with_name(mut self, kind: EntityKind, id: u64, name: impl Into<String>) -> Self {
        self.names.entry(kind).or_default().insert(id, name.into());
        self
    }

    #[must_use]
    pub fn with_attachment(mut self, id: u64, filename: impl Into<String>) -> Self {
        self.attachments.insert(
            id,
            AttachmentRef {
                id,
                filename: filename.into(),
            },
        );
        self
    }

    #[must_use]
    pub fn with_issue(mut self, id: u64, display: impl Into<String>) -> Self {
        self.issues.insert(
            id,
            IssueRef {
                id,
                display: display.into(),
            },
        );
        self
    }

    #[must_use]
    pub fn with_custom_field(
        mut self,
        id: u64,
        name: impl Into<String>,
        field_format: impl Into<String>,
    ) -> Self {
        self.custom_fields.insert(
            id,
            CustomFieldDef {
                name: name.into(),
                field_format: field_format.into(),
            },
        );
        self
    }
}

impl Directory for InMemoryDirectory {
    fn name_of(&self, kind: EntityKind, id: u64) -> Option<String> {
        self.names.get(&kind)?.get(&id).cloned()
    }

    fn attachment(&self, id: u64) -> Option<AttachmentRef> {
        self.attachments.get(&id).cloned()
    }

    fn issue(&self, id: u64) -> Option<IssueRef> {
        self.issues.get(&id).cloned()
    }

    fn custom_field(&self, id: u64) -> Option<CustomFieldDef> {
        self.custom_fields.get(&id).cloned()
    }
}
