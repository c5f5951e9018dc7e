//! Plan policies
//!
//! A policy narrows a computed [`ChangeSet`] before it reaches a target.
//! `upsert_only` keeps every change except deletions; `create_only` keeps
//! creations alone.

use serde::{Deserialize, Serialize};

use super::ChangeSet;

/// Ordered transform applied to a [`ChangeSet`] after table resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Full synchronization, changes pass through untouched
    #[default]
    Sync,

    /// Never delete anything
    UpsertOnly,

    /// Only ever create records
    CreateOnly,
}

impl Policy {
    pub fn apply(&self, changes: ChangeSet) -> ChangeSet {
        match self {
            Policy::Sync => changes,
            Policy::UpsertOnly => ChangeSet {
                delete: Vec::new(),
                ..changes
            },
            Policy::CreateOnly => ChangeSet {
                create: changes.create,
                ..ChangeSet::default()
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Sync => "sync",
            Policy::UpsertOnly => "upsert_only",
            Policy::CreateOnly => "create_only",
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn full() -> ChangeSet {
        ChangeSet {
            create: vec![Record::new("a.example.com", "A", ["192.0.2.1"])],
            update_old: vec![Record::new("b.example.com", "A", ["192.0.2.2"])],
            update_new: vec![Record::new("b.example.com", "A", ["192.0.2.3"])],
            delete: vec![Record::new("c.example.com", "A", ["192.0.2.4"])],
        }
    }

    #[test]
    fn sync_is_identity() {
        assert_eq!(Policy::Sync.apply(full()), full());
    }

    #[test]
    fn upsert_only_drops_deletes() {
        let changes = Policy::UpsertOnly.apply(full());
        assert!(changes.delete.is_empty());
        assert_eq!(changes.create.len(), 1);
        assert_eq!(changes.update_old.len(), 1);
        assert_eq!(changes.update_new.len(), 1);
    }

    #[test]
    fn create_only_keeps_creates() {
        let changes = Policy::CreateOnly.apply(full());
        assert_eq!(changes.create.len(), 1);
        assert!(changes.update_old.is_empty());
        assert!(changes.update_new.is_empty());
        assert!(changes.delete.is_empty());
    }

    #[test]
    fn parses_snake_case() {
        let policy: Policy = serde_yaml::from_str("upsert_only").unwrap();
        assert_eq!(policy, Policy::UpsertOnly);
        assert_eq!(Policy::default(), Policy::Sync);
    }
}
