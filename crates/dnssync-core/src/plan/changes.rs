//! Change sets produced by the plan calculator

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::record::Record;

/// Create/update/delete output of one reconciliation
///
/// `update_old[i]` is the pre-image replaced by `update_new[i]`. Built empty by
/// the plan calculator, filled during table resolution, rewritten by each
/// policy and finally handed to a target's `apply_changes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub create: Vec<Record>,

    #[serde(default)]
    pub update_old: Vec<Record>,

    #[serde(default)]
    pub update_new: Vec<Record>,

    #[serde(default)]
    pub delete: Vec<Record>,
}

/// Per-bucket sizes of a [`ChangeSet`]
///
/// `updates` counts both halves of every update pair, matching the `~`
/// lines of [`ChangeSet::summary_lines`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl ChangeSet {
    /// True when there is nothing to do ("no drift")
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update_old.is_empty()
            && self.update_new.is_empty()
            && self.delete.is_empty()
    }

    /// Counts for log summaries and reports
    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            creates: self.create.len(),
            updates: self.update_old.len() + self.update_new.len(),
            deletes: self.delete.len(),
        }
    }

    /// One line per change: `+` create, `~` update (old then new), `-` delete
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(
            self.create.len() + self.update_old.len() + self.update_new.len() + self.delete.len(),
        );
        lines.extend(self.create.iter().map(|r| format!("+{r}")));
        lines.extend(self.update_old.iter().map(|r| format!("~{r}")));
        lines.extend(self.update_new.iter().map(|r| format!("~{r}")));
        lines.extend(self.delete.iter().map(|r| format!("-{r}")));
        lines
    }
}

/// Records of `a` whose canonical form does not appear in `b`
pub(crate) fn disjoin(a: &[Record], b: &[Record]) -> Vec<Record> {
    let seen: HashSet<String> = b.iter().map(Record::canonical).collect();
    a.iter()
        .filter(|r| !seen.contains(&r.canonical()))
        .cloned()
        .collect()
}

/// Drop later records whose canonical form was already seen
pub(crate) fn remove_duplicates(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.canonical()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_change_set() {
        let changes = ChangeSet::default();
        assert!(changes.is_empty());
        assert_eq!(changes.counts(), ChangeCounts::default());
        assert!(changes.summary_lines().is_empty());
    }

    #[test]
    fn summary_lines_use_direction_markers() {
        let changes = ChangeSet {
            create: vec![Record::new("a.example.com", "A", ["192.0.2.1"])],
            update_old: vec![Record::new("b.example.com", "A", ["192.0.2.2"])],
            update_new: vec![Record::new("b.example.com", "A", ["192.0.2.3"])],
            delete: vec![Record::new("c.example.com", "A", ["192.0.2.4"])],
        };

        let lines = changes.summary_lines();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("+a.example.com"));
        assert!(lines[1].starts_with("~b.example.com"));
        assert!(lines[2].starts_with("~b.example.com"));
        assert!(lines[3].starts_with("-c.example.com"));
        assert_eq!(
            changes.counts(),
            ChangeCounts { creates: 1, updates: 2, deletes: 1 }
        );
        let tildes = lines.iter().filter(|l| l.starts_with('~')).count();
        assert_eq!(changes.counts().updates, tildes);
    }

    #[test]
    fn disjoin_uses_full_equality() {
        let current = vec![
            Record::new("www.example.com", "A", ["192.0.2.1"]).with_ttl(300),
            Record::new("www.example.com", "A", ["192.0.2.2"]),
        ];
        let desired = vec![Record::new("www.example.com", "A", ["192.0.2.1"]).with_ttl(600)];

        // same targets, different TTL: still not equal
        assert_eq!(disjoin(&current, &desired).len(), 2);
        assert_eq!(disjoin(&current[..1], &current).len(), 0);
    }

    #[test]
    fn remove_duplicates_keeps_first_occurrence() {
        let records = vec![
            Record::new("www.example.com", "A", ["192.0.2.1"]).with_owner("a"),
            Record::new("www.example.com", "A", ["192.0.2.1"]).with_owner("b"),
            Record::new("api.example.com", "A", ["192.0.2.1"]),
        ];
        let deduped = remove_duplicates(records);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].owner.as_deref(), Some("a"));
    }
}
