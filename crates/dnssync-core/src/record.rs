//! DNS record model
//!
//! [`Record`] is the canonical representation of one DNS record set as seen by
//! both sources and targets. Two records occupy the same reconciliation slot
//! when their normalized name and set identifier match; they are identical
//! when their [canonical form](Record::canonical) matches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// DNS record type
///
/// Known types get their own variant; anything else is carried verbatim
/// (upper-cased) in [`RecordType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Ns,
    Ptr,
    Srv,
    Txt,
    Caa,
    Soa,
    Other(String),
}

impl RecordType {
    /// Wire/display name of the type (e.g. `"AAAA"`)
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Ptr => "PTR",
            RecordType::Srv => "SRV",
            RecordType::Txt => "TXT",
            RecordType::Caa => "CAA",
            RecordType::Soa => "SOA",
            RecordType::Other(name) => name,
        }
    }
}

impl From<&str> for RecordType {
    fn from(s: &str) -> Self {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "MX" => RecordType::Mx,
            "NS" => RecordType::Ns,
            "PTR" => RecordType::Ptr,
            "SRV" => RecordType::Srv,
            "TXT" => RecordType::Txt,
            "CAA" => RecordType::Caa,
            "SOA" => RecordType::Soa,
            _ => RecordType::Other(upper),
        }
    }
}

impl From<String> for RecordType {
    fn from(s: String) -> Self {
        RecordType::from(s.as_str())
    }
}

impl From<RecordType> for String {
    fn from(t: RecordType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One DNS record set
///
/// `ttl: None` means "unconfigured" and is distinct from `Some(0)`.
/// `owner` identifies the synchronizer instance that created the record and
/// is deliberately not part of the canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Fully-qualified domain name (case- and trailing-dot-insensitive)
    pub dns_name: String,

    /// Record type
    pub record_type: RecordType,

    /// Ordered target values (IPs, hostnames, `"10 mail.example.com"`, ...)
    #[serde(default)]
    pub targets: Vec<String>,

    /// Explicit TTL, if configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// Distinguishes record sets sharing a name (weighted/multi-value routing)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,

    /// Owning synchronizer instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Backend-specific metadata, compared for equality
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provider_specific: BTreeMap<String, String>,
}

impl Record {
    /// Create a record with no TTL, set identifier, owner or metadata
    pub fn new<I, S>(dns_name: impl Into<String>, record_type: impl Into<RecordType>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dns_name: dns_name.into(),
            record_type: record_type.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            ttl: None,
            set_identifier: None,
            owner: None,
            provider_specific: BTreeMap::new(),
        }
    }

    /// Set an explicit TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the set identifier
    pub fn with_set_identifier(mut self, set_identifier: impl Into<String>) -> Self {
        self.set_identifier = Some(set_identifier.into());
        self
    }

    /// Set the owner label
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Attach a provider-specific property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.provider_specific.insert(name.into(), value.into());
        self
    }

    /// Normalized DNS name used as the reconciliation key
    pub fn normalized_name(&self) -> String {
        normalize_dns_name(&self.dns_name)
    }

    /// Whether this record is owned by `owner_id`
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner.as_deref() == Some(owner_id)
    }

    /// Canonical string form used for full-equality comparison
    ///
    /// Covers normalized name, TTL, type, set identifier, ordered targets
    /// and provider-specific properties. The owner label is excluded.
    pub fn canonical(&self) -> String {
        let ttl = match self.ttl {
            Some(ttl) => ttl.to_string(),
            None => "-".to_string(),
        };
        format!(
            "{} {} IN {} {} {:?} {:?}",
            self.normalized_name(),
            ttl,
            self.record_type,
            self.set_identifier.as_deref().map(str::trim).unwrap_or(""),
            self.targets,
            self.provider_specific,
        )
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Convert a DNS name to its comparison form
///
/// Trims whitespace, lower-cases and ensures exactly one trailing dot, so
/// `"Foo.com"`, `"foo.com."` and `" foo.com "` all collapse to `"foo.com."`.
pub fn normalize_dns_name(name: &str) -> String {
    let mut s = name.trim().to_lowercase();
    while s.ends_with('.') {
        s.pop();
    }
    s.push('.');
    s
}
