//! The user's pinned metric names.

use serde::{Deserialize, Serialize};

/// Ordered, case-insensitively unique list of pinned metric names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinnedMetrics {
    names: Vec<String>,
}

impl PinnedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `name` after trimming. Returns `false` for blanks and for names
    /// already pinned under any casing.
    pub fn pin(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    /// Remove `name`, matching case-insensitively. Returns whether anything
    /// was removed.
    pub fn unpin(&mut self, name: &str) -> bool {
        let name = name.trim();
        let before = self.names.len();
        self.names.retain(|pinned| !pinned.eq_ignore_ascii_case(name));
        self.names.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|pinned| pinned.eq_ignore_ascii_case(name.trim()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for PinnedMetrics {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut pinned = Self::new();
        for name in iter {
            pinned.pin(name.as_ref());
        }
        pinned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_trims_and_dedupes() {
        let mut pinned = PinnedMetrics::new();
        assert!(pinned.pin("  queue_depth "));
        assert!(!pinned.pin("QUEUE_DEPTH"));
        assert!(!pinned.pin("   "));
        assert!(pinned.pin("jobs_total"));
        assert_eq!(pinned.names(), ["queue_depth", "jobs_total"]);
    }

    #[test]
    fn unpin_is_case_insensitive() {
        let mut pinned: PinnedMetrics = ["a", "B", "c"].into_iter().collect();
        assert!(pinned.unpin("b"));
        assert!(!pinned.unpin("missing"));
        assert_eq!(pinned.names(), ["a", "c"]);
    }

    #[test]
    fn serializes_as_plain_list() {
        let pinned: PinnedMetrics = ["x", "y"].into_iter().collect();
        assert_eq!(serde_json::to_string(&pinned).unwrap(), r#"["x","y"]"#);
    }
}
