// # Built-in Providers
//
// Backends that ship with the core library:
//
// - [`MemoryProvider`]: records held in process memory
// - [`FileProvider`]: records persisted in a JSON document
//
// Both apply a change set the same way: records listed in `delete` and
// `update_old` are removed by canonical equality, then `update_new` and
// `create` are appended.

pub mod file;
pub mod memory;

pub use file::{FileProvider, FileProviderFactory};
pub use memory::{MemoryProvider, MemoryProviderFactory};

use crate::plan::ChangeSet;
use crate::record::Record;

/// Apply `changes` to an in-memory record list
pub(crate) fn apply_to(records: &mut Vec<Record>, changes: &ChangeSet) {
    for gone in changes.delete.iter().chain(&changes.update_old) {
        let canonical = gone.canonical();
        if let Some(pos) = records.iter().position(|r| r.canonical() == canonical) {
            records.remove(pos);
        }
    }
    records.extend(changes.update_new.iter().cloned());
    records.extend(changes.create.iter().cloned());
}

/// Storage key of a zone: lower-case, no trailing dot
pub(crate) fn zone_key(zone: &str) -> String {
    zone.trim().trim_end_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_removes_one_match_per_delete() {
        let dup = Record::new("www.example.com", "A", ["192.0.2.1"]);
        let mut records = vec![dup.clone(), dup.clone()];

        apply_to(
            &mut records,
            &ChangeSet {
                delete: vec![dup.clone()],
                ..Default::default()
            },
        );
        assert_eq!(records, vec![dup]);
    }

    #[test]
    fn apply_replaces_updates_and_appends_creates() {
        let old = Record::new("www.example.com", "A", ["192.0.2.1"]);
        let new = Record::new("www.example.com", "A", ["192.0.2.2"]);
        let extra = Record::new("api.example.com", "A", ["192.0.2.3"]);
        let mut records = vec![old.clone()];

        apply_to(
            &mut records,
            &ChangeSet {
                create: vec![extra.clone()],
                update_old: vec![old],
                update_new: vec![new.clone()],
                delete: Vec::new(),
            },
        );
        assert_eq!(records, vec![new, extra]);
    }

    #[test]
    fn zone_keys_ignore_case_and_trailing_dot() {
        assert_eq!(zone_key("Example.COM."), "example.com");
    }
}
