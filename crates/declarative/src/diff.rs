//! Unified diffs attached to the reconciliation log.

use similar::TextDiff;

/// Which findings get a diff attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffMode {
    /// No diffs
    #[default]
    None,
    /// Diffs for holdups and for pending changes
    All,
    /// Diffs for holdups only
    HoldupsOnly,
}

impl DiffMode {
    pub fn enabled(self) -> bool {
        self != Self::None
    }
}

/// Unified diff of `old` against `new`, or `None` if they are identical.
///
/// Non-UTF-8 input is decoded lossily.
pub fn unified_diff(old: &[u8], new: &[u8], old_label: &str, new_label: &str) -> Option<String> {
    if old == new {
        return None;
    }
    let old = String::from_utf8_lossy(old);
    let new = String::from_utf8_lossy(new);
    let diff = TextDiff::from_lines(old.as_ref(), new.as_ref());
    let text = diff
        .unified_diff()
        .context_radius(3)
        .header(old_label, new_label)
        .to_string();
    Some(text)
}
