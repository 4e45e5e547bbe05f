//! English display labels for issue fields.

/// Label for the attachment change kind.
pub const ATTACHMENT: &str = "File";

/// Label for the watchers field on new issues.
pub const WATCHER: &str = "Watcher";

/// Display label for a field key such as `status` or `fixed_version`.
///
/// Keys without a known label are humanized: `start_date` becomes "Start date".
#[must_use]
pub fn field(key: &str) -> String {
    let label = match key {
        "status" => "Status",
        "priority" => "Priority",
        "assigned_to" => "Assignee",
        "watcher" => WATCHER,
        "tracker" => "Tracker",
        "project" => "Project",
        "subject" => "Subject",
        "title" => "Title",
        "description" => "Description",
        "category" => "Category",
        "fixed_version" => "Target version",
        "parent" => "Parent task",
        "author" => "Author",
        "start_date" => "Start date",
        "due_date" => "Due date",
        "done_ratio" => "% Done",
        "estimated_hours" => "Estimated time",
        "is_private" => "Private",
        "notes" => "Notes",
        _ => return humanize(key),
    };
    label.to_string()
}

/// Sentence attached to issues updated from a commit message.
#[must_use]
pub fn status_changed_by_changeset(link: &str) -> String {
    format!("Applied in changeset {link}.")
}

fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
