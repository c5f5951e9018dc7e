// # Reconciliation table
//
// Groups current and desired records by DNS-name identity.
//
// ```text
//  key (name, set-id)   | current              | candidates
//  ---------------------+----------------------+---------------------------
//  foo.com.             | [A ->1.1.1.1]        | [A ->1.1.1.1]              no action
//  bar.com.             |                      | [A ->190.1.1.1]            create
//  dog.com.             | [A ->1.1.1.2]        |                            delete
//  big.com.             | [A ->1.1.1.4]        | [CNAME ->ing.elb.com]      delete + create
// ```
//
// Rows live in an arena (`Vec`) indexed by a value-type [`PlanKey`]; rows and
// per-type buckets are created on first use. A table is built fresh for every
// calculation and dropped once the change set exists.

use std::collections::HashMap;

use crate::record::{Record, RecordType, normalize_dns_name};

/// Row key: normalized name plus set identifier (record type is not part of it)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    pub dns_name: String,
    pub set_identifier: Option<String>,
}

impl PlanKey {
    /// Key under which `record` is grouped
    ///
    /// A blank set identifier is the same as none.
    pub fn for_record(record: &Record) -> Self {
        Self {
            dns_name: normalize_dns_name(&record.dns_name),
            set_identifier: record
                .set_identifier
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        }
    }
}

/// Current and candidate records of a single type within a row
#[derive(Debug, Clone)]
pub struct TypedRecords {
    pub record_type: RecordType,
    pub current: Vec<Record>,
    pub candidates: Vec<Record>,
}

/// All current and candidate records sharing one [`PlanKey`]
///
/// A row may hold, say, current A records and candidate CNAME records at the
/// same time; the table does not forbid it.
#[derive(Debug, Clone)]
pub struct PlanTableRow {
    pub key: PlanKey,
    pub current: Vec<Record>,
    pub candidates: Vec<Record>,
    records: Vec<TypedRecords>,
}

impl PlanTableRow {
    fn new(key: PlanKey) -> Self {
        Self {
            key,
            current: Vec::new(),
            candidates: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Per-type buckets in first-seen order
    pub fn records_by_type(&self) -> &[TypedRecords] {
        &self.records
    }

    /// Bucket for one record type, if the row has any record of that type
    pub fn bucket(&self, record_type: &RecordType) -> Option<&TypedRecords> {
        self.records.iter().find(|b| &b.record_type == record_type)
    }

    fn bucket_mut(&mut self, record_type: &RecordType) -> &mut TypedRecords {
        let idx = match self.records.iter().position(|b| &b.record_type == record_type) {
            Some(idx) => idx,
            None => {
                self.records.push(TypedRecords {
                    record_type: record_type.clone(),
                    current: Vec::new(),
                    candidates: Vec::new(),
                });
                self.records.len() - 1
            }
        };
        &mut self.records[idx]
    }
}

/// Ephemeral grouping of current vs. desired records
#[derive(Debug, Default)]
pub struct PlanTable {
    rows: Vec<PlanTableRow>,
    index: HashMap<PlanKey, usize>,
}

impl PlanTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from already-filtered collections
    pub fn build(current: impl IntoIterator<Item = Record>, desired: impl IntoIterator<Item = Record>) -> Self {
        let mut table = Self::new();
        for record in current {
            table.add_current(record);
        }
        for record in desired {
            table.add_candidate(record);
        }
        table
    }

    /// Insert a record that exists on the target
    pub fn add_current(&mut self, record: Record) {
        let row = self.row_mut(PlanKey::for_record(&record));
        row.bucket_mut(&record.record_type).current.push(record.clone());
        row.current.push(record);
    }

    /// Insert a record that the source wants to exist
    pub fn add_candidate(&mut self, record: Record) {
        let row = self.row_mut(PlanKey::for_record(&record));
        row.bucket_mut(&record.record_type).candidates.push(record.clone());
        row.candidates.push(record);
    }

    /// Rows in first-seen order
    pub fn rows(&self) -> &[PlanTableRow] {
        &self.rows
    }

    /// Look up a row by key
    pub fn row(&self, key: &PlanKey) -> Option<&PlanTableRow> {
        self.index.get(key).map(|&idx| &self.rows[idx])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn row_mut(&mut self, key: PlanKey) -> &mut PlanTableRow {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.rows.len();
                self.rows.push(PlanTableRow::new(key.clone()));
                self.index.insert(key, idx);
                idx
            }
        };
        &mut self.rows[idx]
    }
}
