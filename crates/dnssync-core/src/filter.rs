// # Record and domain filters
//
// Pure predicates deciding which records take part in a sync.
//
// - [`RecordFilter`]: type allow/deny lists plus name include/exclude patterns,
//   configured per zone.
// - [`DomainFilter`]: suffix-based domain scoping, configured per zone and
//   exposed by every provider. The plan calculator requires a record to match
//   all of the domain filters it is given.
//
// Neither filter can fail: a malformed filter degrades to "matches nothing"
// or "matches everything".

use serde::{Deserialize, Serialize};

use crate::record::{Record, RecordType};

/// Record types managed when a zone does not configure `include_types`
pub const DEFAULT_INCLUDE_TYPES: [RecordType; 8] = [
    RecordType::A,
    RecordType::Aaaa,
    RecordType::Cname,
    RecordType::Mx,
    RecordType::Ns,
    RecordType::Ptr,
    RecordType::Srv,
    RecordType::Txt,
];

/// Which records of a zone are synchronized
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Only sync these record types (empty = all types)
    #[serde(default)]
    pub include_types: Vec<RecordType>,

    /// Never sync these record types
    #[serde(default)]
    pub exclude_types: Vec<RecordType>,

    /// Only sync records whose name matches one of these patterns
    #[serde(default)]
    pub include_names: Vec<String>,

    /// Skip records whose name matches any of these patterns
    #[serde(default)]
    pub exclude_names: Vec<String>,
}

impl RecordFilter {
    /// Filter with the default include set and nothing else
    pub fn with_default_types() -> Self {
        Self {
            include_types: DEFAULT_INCLUDE_TYPES.to_vec(),
            ..Self::default()
        }
    }

    /// Replace an empty include list with [`DEFAULT_INCLUDE_TYPES`]
    pub fn apply_defaults(&mut self) {
        if self.include_types.is_empty() {
            self.include_types = DEFAULT_INCLUDE_TYPES.to_vec();
        }
    }

    /// Whether a single record passes every stage of the filter
    pub fn matches(&self, record: &Record) -> bool {
        if !self.include_types.is_empty() && !self.include_types.contains(&record.record_type) {
            return false;
        }

        if self.exclude_types.contains(&record.record_type) {
            return false;
        }

        if !self.include_names.is_empty()
            && !self
                .include_names
                .iter()
                .any(|pattern| matches_pattern(&record.dns_name, pattern))
        {
            return false;
        }

        !self
            .exclude_names
            .iter()
            .any(|pattern| matches_pattern(&record.dns_name, pattern))
    }

    /// Keep only the records that pass the filter, preserving order
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Name pattern match: `"*"` matches everything, anything else is exact
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    pattern == "*" || name == pattern
}

/// Whether a record type is managed by the plan calculator
///
/// Exclusion always wins. An empty managed list manages every type.
pub fn is_managed_record(
    record_type: &RecordType,
    managed: &[RecordType],
    excluded: &[RecordType],
) -> bool {
    if excluded.contains(record_type) {
        return false;
    }
    managed.is_empty() || managed.contains(record_type)
}

/// Suffix-based domain scoping
///
/// An `include` entry matches the domain itself and all of its subdomains; an
/// entry with a leading dot (`.example.com`) matches subdomains only. An empty
/// include list matches everything. `exclude` entries use the same rules and
/// always win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainFilter {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

impl DomainFilter {
    /// Filter that matches every name
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Filter restricted to the given domains
    pub fn new<I, S>(include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    /// Add exclusions
    pub fn with_exclude<I, S>(mut self, exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(exclude.into_iter().map(Into::into));
        self
    }

    /// Whether this filter places no restriction at all
    pub fn is_match_all(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Whether `name` is in scope
    pub fn matches(&self, name: &str) -> bool {
        match_any(&self.include, name, true) && !match_any(&self.exclude, name, false)
    }
}

/// Whether `name` passes every filter in `filters`
pub fn match_all_domain_filters(filters: &[DomainFilter], name: &str) -> bool {
    filters.iter().all(|f| f.matches(name))
}

fn match_any(domains: &[String], name: &str, when_empty: bool) -> bool {
    if domains.is_empty() {
        return when_empty;
    }

    let name = comparable(name);
    domains.iter().any(|domain| {
        let domain = comparable(domain);
        if domain.is_empty() {
            return false;
        }
        if domain.starts_with('.') {
            name.ends_with(&domain)
        } else {
            name == domain || name.ends_with(&format!(".{domain}"))
        }
    })
}

fn comparable(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}
