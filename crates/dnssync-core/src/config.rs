//! Configuration types for dnssync
//!
//! This module defines all configuration structures used throughout the crate.
//! Configuration is read from YAML. `${NAME}` references are replaced with
//! the value of the environment variable `NAME` before parsing, so secrets
//! can stay out of the file; an unset variable is a configuration error.
//!
//! ```yaml
//! log_level: info
//! log_format: json
//! request_timeout_secs: 30
//! sync:
//!   interval_secs: 300
//!   dry_run: false
//!   record_ttl: 0
//!   owner_id: dnssync-eu
//!   policy: sync
//! zones:
//!   - name: example.com
//!     source:
//!       type: file
//!       path: /etc/dnssync/example.com.json
//!       domain_filter:
//!         include: [example.com]
//!     targets:
//!       - type: cloudflare
//!         api_token: ${CF_API_TOKEN}
//!     record_filter:
//!       include_types: [A, AAAA, CNAME]
//!       exclude_names: [internal.example.com]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::filter::{DomainFilter, RecordFilter};
use crate::plan::Policy;
use crate::record::Record;

/// Main dnssync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncerConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Timeout for calls to provider APIs, in seconds
    ///
    /// Applied to every provider that does not set its own.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Synchronization settings shared by all zones
    #[serde(default)]
    pub sync: SyncSettings,

    /// Zones to keep in sync, processed in this order
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

impl SyncerConfig {
    /// Create a new configuration with defaults and no zones
    pub fn new() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            request_timeout_secs: default_request_timeout_secs(),
            sync: SyncSettings::default(),
            zones: Vec::new(),
        }
    }

    /// Read and parse a YAML configuration file
    ///
    /// The result is not validated; call [`SyncerConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse a YAML configuration document
    ///
    /// `${NAME}` references are expanded from the process environment first.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, crate::Error> {
        let expanded = expand_env(yaml, |name| std::env::var(name).ok())?;
        Ok(serde_yaml::from_str(&expanded)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zones.is_empty() {
            return Err(crate::Error::config("No zones configured"));
        }

        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }

        self.sync.validate()?;

        for zone in &self.zones {
            zone.validate()?;
        }

        Ok(())
    }
}

/// Replace `${NAME}` with `lookup(NAME)`
///
/// Only names made of ASCII letters, digits and `_` are expanded; anything
/// else (a lone `$`, `${}`) is kept as written.
fn expand_env(
    text: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, crate::Error> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let name = after
            .find('}')
            .map(|end| &after[..end])
            .filter(|name| {
                !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            });

        match name {
            Some(name) => {
                let value = lookup(name).ok_or_else(|| {
                    crate::Error::config(format!(
                        "environment variable {name} referenced in config is not set"
                    ))
                })?;
                out.push_str(&value);
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Log output format of the daemon
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl Default for SyncerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Seconds between two passes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Compute and report changes without applying them
    #[serde(default)]
    pub dry_run: bool,

    /// Force this TTL onto every record (0 = keep the source's TTL)
    #[serde(default)]
    pub record_ttl: u32,

    /// Identity of this instance for ownership filtering (empty = disabled)
    #[serde(default)]
    pub owner_id: String,

    /// Policy applied to every change set
    #[serde(default)]
    pub policy: Policy,

    /// Capacity of the synchronizer event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SyncSettings {
    /// Validate the sync settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Sync interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Owner id, if ownership filtering is enabled
    pub fn owner(&self) -> Option<&str> {
        if self.owner_id.is_empty() {
            None
        } else {
            Some(&self.owner_id)
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            dry_run: false,
            record_ttl: 0,
            owner_id: String::new(),
            policy: Policy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// One zone to synchronize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Zone name (e.g., "example.com")
    pub name: String,

    /// Authoritative source of the zone's records
    pub source: SourceConfig,

    /// Backends converged toward the source, in this order
    #[serde(default)]
    pub targets: Vec<ProviderConfig>,

    /// Which records take part in the sync
    #[serde(default)]
    pub record_filter: RecordFilter,

    /// Domain scoping applied to both sides
    #[serde(default)]
    pub domain_filter: DomainFilter,
}

impl ZoneConfig {
    /// Create a zone with a source and no targets
    pub fn new(name: impl Into<String>, source: ProviderConfig) -> Self {
        Self {
            name: name.into(),
            source: SourceConfig::from(source),
            targets: Vec::new(),
            record_filter: RecordFilter::default(),
            domain_filter: DomainFilter::default(),
        }
    }

    /// Add a target
    pub fn with_target(mut self, target: ProviderConfig) -> Self {
        self.targets.push(target);
        self
    }

    /// Set the record filter
    pub fn with_record_filter(mut self, filter: RecordFilter) -> Self {
        self.record_filter = filter;
        self
    }

    /// Validate the zone configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("Zone name cannot be empty"));
        }
        if self.targets.is_empty() {
            return Err(crate::Error::config(format!(
                "Zone {} has no targets",
                self.name
            )));
        }

        self.source.provider.validate()?;
        for target in &self.targets {
            target.validate()?;
        }

        Ok(())
    }

    /// Domain filters every record of this zone must match
    pub fn domain_filters(&self) -> Vec<DomainFilter> {
        [&self.domain_filter, &self.source.domain_filter]
            .into_iter()
            .filter(|f| !f.is_match_all())
            .cloned()
            .collect()
    }
}

/// Source provider plus its own domain scoping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub domain_filter: DomainFilter,
}

impl From<ProviderConfig> for SourceConfig {
    fn from(provider: ProviderConfig) -> Self {
        Self {
            provider,
            domain_filter: DomainFilter::default(),
        }
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone ID (optional, looked up by zone name)
        #[serde(default)]
        zone_id: Option<String>,
        /// Proxy new records through Cloudflare
        #[serde(default)]
        proxied: bool,
        /// API base URL override
        #[serde(default)]
        base_url: Option<String>,
        /// HTTP timeout in seconds (defaults to `request_timeout_secs`)
        #[serde(default)]
        request_timeout_secs: Option<u64>,
    },

    /// JSON file holding records for any number of zones
    File {
        /// Path to the JSON document
        path: String,
    },

    /// In-memory provider (not persistent)
    Memory {
        /// Records every zone starts with
        #[serde(default)]
        records: Vec<Record>,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Empty in-memory provider
    pub fn memory() -> Self {
        ProviderConfig::Memory {
            records: Vec::new(),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                request_timeout_secs,
                ..
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if *request_timeout_secs == Some(0) {
                    return Err(crate::Error::config("Cloudflare request timeout must be > 0"));
                }
                Ok(())
            }
            ProviderConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("File provider path cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Memory { .. } => Ok(()),
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Copy of this config with `secs` as the API timeout, unless one is set
    pub fn with_default_request_timeout(&self, secs: u64) -> Self {
        let mut config = self.clone();
        if let ProviderConfig::Cloudflare {
            request_timeout_secs,
            ..
        } = &mut config
        {
            request_timeout_secs.get_or_insert(secs);
        }
        config
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::File { .. } => "file",
            ProviderConfig::Memory { .. } => "memory",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Identity used in logs and reports
impl fmt::Display for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare { zone_id, .. } => match zone_id {
                Some(id) => write!(f, "cloudflare{{zone={id}}}"),
                None => f.write_str("cloudflare"),
            },
            ProviderConfig::File { path } => write!(f, "file{{{path}}}"),
            ProviderConfig::Memory { .. } => f.write_str("memory"),
            ProviderConfig::Custom { factory, .. } => f.write_str(factory),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                zone_id,
                proxied,
                base_url,
                request_timeout_secs,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<redacted>")
                .field("zone_id", zone_id)
                .field("proxied", proxied)
                .field("base_url", base_url)
                .field("request_timeout_secs", request_timeout_secs)
                .finish(),
            ProviderConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
            ProviderConfig::Memory { records } => f
                .debug_struct("Memory")
                .field("records", &records.len())
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .finish_non_exhaustive(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_interval_secs() -> u64 {
    300
}

fn default_event_channel_capacity() -> usize {
    1000
}
