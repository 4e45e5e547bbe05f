//! Escaping for Mattermost message markup.

/// Escape the characters Mattermost treats as markup in link syntax.
///
/// `&` is replaced first, so escaping already-escaped text double-escapes it.
#[must_use]
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
