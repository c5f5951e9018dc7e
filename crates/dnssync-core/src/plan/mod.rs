//! Plan calculator
//!
//! Compares the records a target currently holds against the records a source
//! wants it to hold and produces the [`ChangeSet`] that converges the two.
//!
//! ```text
//! current ─┐                        ┌─> policies (in order)
//!          ├─> filters ─> PlanTable ┤
//! desired ─┘                        └─> ownership filter ─> ChangeSet
//! ```
//!
//! Calculation never fails: an empty change set means "no drift".

mod changes;
mod policy;
mod table;

pub use changes::{ChangeCounts, ChangeSet};
pub use policy::Policy;
pub use table::{PlanKey, PlanTable, PlanTableRow, TypedRecords};

use tracing::trace;

use crate::filter::{DEFAULT_INCLUDE_TYPES, DomainFilter, is_managed_record, match_all_domain_filters};
use crate::record::{Record, RecordType};
use changes::{disjoin, remove_duplicates};

/// Inputs of one reconciliation between a desired and a current record set
#[derive(Debug, Clone)]
pub struct Plan {
    /// Records the target holds now
    pub current: Vec<Record>,

    /// Records the source wants the target to hold
    pub desired: Vec<Record>,

    /// Transforms applied in order after table resolution
    pub policies: Vec<Policy>,

    /// Every record must match all of these
    pub domain_filters: Vec<DomainFilter>,

    /// Record types taking part in the plan (empty = all types)
    pub managed_records: Vec<RecordType>,

    /// Record types never touched
    pub exclude_records: Vec<RecordType>,

    /// When set, only records owned by this id may be deleted or updated
    pub owner_id: Option<String>,
}

impl Plan {
    /// Plan with the default managed types and the [`Policy::Sync`] policy
    pub fn new(current: Vec<Record>, desired: Vec<Record>) -> Self {
        Self {
            current,
            desired,
            policies: vec![Policy::Sync],
            domain_filters: Vec::new(),
            managed_records: DEFAULT_INCLUDE_TYPES.to_vec(),
            exclude_records: Vec::new(),
            owner_id: None,
        }
    }

    pub fn with_policies(mut self, policies: Vec<Policy>) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_domain_filter(mut self, filter: DomainFilter) -> Self {
        self.domain_filters.push(filter);
        self
    }

    pub fn with_managed_records(mut self, managed: Vec<RecordType>) -> Self {
        self.managed_records = managed;
        self
    }

    pub fn with_exclude_records(mut self, excluded: Vec<RecordType>) -> Self {
        self.exclude_records = excluded;
        self
    }

    /// Enable ownership filtering; an empty id disables it
    pub fn with_owner_id(mut self, owner_id: impl Into<String>) -> Self {
        let owner_id = owner_id.into();
        self.owner_id = if owner_id.is_empty() { None } else { Some(owner_id) };
        self
    }

    /// Compute the change set for this plan
    pub fn calculate(&self) -> ChangeSet {
        let table = PlanTable::build(self.filtered(&self.current), self.filtered(&self.desired));

        let mut changes = ChangeSet::default();
        for row in table.rows() {
            match (row.current.is_empty(), row.candidates.is_empty()) {
                (true, _) => changes.create.extend(row.candidates.iter().cloned()),
                (false, true) => changes.delete.extend(row.current.iter().cloned()),
                (false, false) => {
                    changes.delete.extend(disjoin(&row.current, &row.candidates));
                    changes.create.extend(disjoin(&row.candidates, &row.current));
                }
            }
        }
        trace!(rows = table.len(), "resolved plan table");

        for policy in &self.policies {
            changes = policy.apply(changes);
        }

        if let Some(owner_id) = &self.owner_id {
            changes.delete = remove_duplicates(owned_by(owner_id, changes.delete));
            changes.update_old = owned_by(owner_id, changes.update_old);
            changes.update_new = owned_by(owner_id, changes.update_new);
        }

        changes
    }

    fn filtered(&self, records: &[Record]) -> Vec<Record> {
        records
            .iter()
            .filter(|r| match_all_domain_filters(&self.domain_filters, &r.dns_name))
            .filter(|r| is_managed_record(&r.record_type, &self.managed_records, &self.exclude_records))
            .cloned()
            .collect()
    }
}

fn owned_by(owner_id: &str, records: Vec<Record>) -> Vec<Record> {
    records.into_iter().filter(|r| r.is_owned_by(owner_id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn www(target: &str) -> Record {
        Record::new("www.example.com", "A", [target])
    }

    fn mx(target: &str) -> Record {
        Record::new("example.com", "MX", [target])
    }

    /// Apply a change set the way a well-behaved target would
    fn converge(mut current: Vec<Record>, changes: &ChangeSet) -> Vec<Record> {
        let gone: Vec<String> = changes
            .delete
            .iter()
            .chain(&changes.update_old)
            .map(Record::canonical)
            .collect();
        current.retain(|r| !gone.contains(&r.canonical()));
        current.extend(changes.update_new.iter().cloned());
        current.extend(changes.create.iter().cloned());
        current
    }

    #[test]
    fn creates_into_empty_target() {
        let changes = Plan::new(vec![], vec![www("192.168.1.10")]).calculate();

        assert_eq!(changes.create, vec![www("192.168.1.10")]);
        assert!(changes.update_old.is_empty());
        assert!(changes.update_new.is_empty());
        assert!(changes.delete.is_empty());
    }

    #[test]
    fn deletes_released_names() {
        let changes = Plan::new(vec![www("192.168.1.10")], vec![]).calculate();

        assert_eq!(changes.delete, vec![www("192.168.1.10")]);
        assert!(changes.create.is_empty());
    }

    #[test]
    fn mx_targets_are_diffed_individually() {
        let current = vec![mx("10 mail1.example.com"), mx("20 mail2.example.com")];
        let desired = vec![mx("10 mail1.example.com"), mx("30 mail3.example.com")];

        let changes = Plan::new(current, desired).calculate();

        assert_eq!(changes.create, vec![mx("30 mail3.example.com")]);
        assert_eq!(changes.delete, vec![mx("20 mail2.example.com")]);
    }

    #[test]
    fn identical_sets_produce_no_changes() {
        let records = vec![www("192.168.1.10").with_ttl(300), mx("10 mail1.example.com")];
        let changes = Plan::new(records.clone(), records).calculate();
        assert!(changes.is_empty());
    }

    #[test]
    fn blank_set_identifier_is_not_drift() {
        let current = vec![www("192.168.1.10").with_set_identifier("")];
        let changes = Plan::new(current, vec![www("192.168.1.10")]).calculate();
        assert!(changes.is_empty(), "{changes:?}");
    }

    #[test]
    fn ttl_only_drift_is_delete_plus_create() {
        let current = vec![www("192.168.1.10").with_ttl(300)];
        let desired = vec![www("192.168.1.10").with_ttl(600)];

        let changes = Plan::new(current.clone(), desired.clone()).calculate();

        assert_eq!(changes.delete, current);
        assert_eq!(changes.create, desired);
        assert!(changes.update_old.is_empty());
        assert!(changes.update_new.is_empty());
    }

    #[test]
    fn second_pass_is_empty() {
        let current = vec![
            www("192.0.2.1"),
            mx("20 mail2.example.com"),
            Record::new("old.example.com", "CNAME", ["gone.example.net"]),
        ];
        let desired = vec![
            www("192.0.2.1").with_ttl(120),
            mx("10 mail1.example.com"),
            Record::new("api.example.com", "AAAA", ["2001:db8::1"]),
        ];

        let first = Plan::new(current.clone(), desired.clone()).calculate();
        assert!(!first.is_empty());

        let converged = converge(current, &first);
        let second = Plan::new(converged, desired).calculate();
        assert!(second.is_empty(), "unexpected drift: {:?}", second.summary_lines());
    }

    #[test]
    fn create_and_delete_never_share_a_record() {
        let current = vec![www("192.0.2.1"), www("192.0.2.2"), mx("10 a.example.com")];
        let desired = vec![www("192.0.2.2"), www("192.0.2.3"), mx("10 a.example.com").with_ttl(60)];

        let changes = Plan::new(current, desired).calculate();

        for created in &changes.create {
            assert!(
                changes.delete.iter().all(|d| d.canonical() != created.canonical()),
                "{created} in both create and delete"
            );
        }
    }

    #[test]
    fn names_are_normalized_before_diffing() {
        let current = vec![Record::new("Foo.COM", "A", ["192.0.2.1"])];
        let desired = vec![Record::new("foo.com.", "A", ["192.0.2.2"])];

        let changes = Plan::new(current, desired).calculate();

        // same row: full-equality subtraction in both directions
        assert_eq!(changes.delete.len(), 1);
        assert_eq!(changes.create.len(), 1);
    }

    #[test]
    fn ownership_protects_foreign_records() {
        let current = vec![
            www("192.0.2.1").with_owner("me"),
            Record::new("other.example.com", "A", ["192.0.2.9"]).with_owner("someone-else"),
            Record::new("manual.example.com", "A", ["192.0.2.8"]),
        ];

        let changes = Plan::new(current, vec![]).with_owner_id("me").calculate();

        assert_eq!(changes.delete, vec![www("192.0.2.1").with_owner("me")]);
        for record in changes.delete.iter().chain(&changes.update_old).chain(&changes.update_new) {
            assert!(record.is_owned_by("me"));
        }
    }

    #[test]
    fn ownership_never_filters_creates() {
        let desired = vec![www("192.0.2.1")];
        let changes = Plan::new(vec![], desired.clone()).with_owner_id("me").calculate();
        assert_eq!(changes.create, desired);
    }

    #[test]
    fn owned_deletes_are_deduplicated() {
        let dup = www("192.0.2.1").with_owner("me");
        let changes = Plan::new(vec![dup.clone(), dup.clone()], vec![])
            .with_owner_id("me")
            .calculate();
        assert_eq!(changes.delete, vec![dup]);
    }

    #[test]
    fn empty_owner_id_disables_filtering() {
        let changes = Plan::new(vec![www("192.0.2.1")], vec![]).with_owner_id("").calculate();
        assert_eq!(changes.delete.len(), 1);
    }

    #[test]
    fn unmanaged_types_are_ignored() {
        let current = vec![Record::new("example.com", "SOA", ["ns1 admin 1 2 3 4 5"])];
        let changes = Plan::new(current, vec![]).calculate();
        assert!(changes.is_empty());

        let excluded = Plan::new(vec![www("192.0.2.1")], vec![])
            .with_exclude_records(vec![RecordType::A])
            .calculate();
        assert!(excluded.is_empty());
    }

    #[test]
    fn tightening_managed_types_never_grows_changes() {
        let current = vec![www("192.0.2.1"), mx("10 a.example.com")];
        let desired = vec![www("192.0.2.2"), mx("20 b.example.com")];

        let wide = Plan::new(current.clone(), desired.clone()).calculate();
        let narrow = Plan::new(current, desired)
            .with_managed_records(vec![RecordType::A])
            .calculate();

        let mx_count = |c: &ChangeSet| {
            c.create
                .iter()
                .chain(&c.delete)
                .filter(|r| r.record_type == RecordType::Mx)
                .count()
        };
        assert!(mx_count(&narrow) <= mx_count(&wide));
        assert_eq!(mx_count(&narrow), 0);
    }

    #[test]
    fn domain_filters_scope_both_sides() {
        let current = vec![Record::new("db.internal.example.com", "A", ["10.0.0.1"])];
        let desired = vec![
            www("192.0.2.1"),
            Record::new("www.example.org", "A", ["192.0.2.5"]),
        ];

        let changes = Plan::new(current, desired)
            .with_domain_filter(DomainFilter::new(["example.com"]).with_exclude(["internal.example.com"]))
            .calculate();

        assert_eq!(changes.create, vec![www("192.0.2.1")]);
        assert!(changes.delete.is_empty());
    }

    #[test]
    fn policies_run_in_order() {
        let plan = Plan::new(vec![www("192.0.2.1")], vec![www("192.0.2.2")]);

        let upsert = plan.clone().with_policies(vec![Policy::UpsertOnly]).calculate();
        assert_eq!(upsert.create.len(), 1);
        assert!(upsert.delete.is_empty());

        let none = plan.with_policies(vec![]).calculate();
        assert_eq!(none.create.len(), 1);
        assert_eq!(none.delete.len(), 1);
    }
}
