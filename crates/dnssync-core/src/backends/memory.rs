// # Memory Provider
//
// In-memory implementation of DnsProvider.
//
// ## Purpose
//
// Holds zones in process memory. Nothing persists across restarts.
// Useful for testing, for dry-run previews against an empty target, and
// as a scratch source seeded from configuration.
//
// ## Seeding
//
// Records passed at construction are the initial content of every zone
// they fall under (by domain suffix). A zone is materialized from the seed
// the first time changes are applied to it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{apply_to, zone_key};
use crate::config::ProviderConfig;
use crate::filter::DomainFilter;
use crate::plan::ChangeSet;
use crate::record::Record;
use crate::traits::{DnsProvider, DnsProviderFactory};
use crate::{Error, Result};

/// In-memory provider implementation
///
/// Cloning yields a handle to the same zones, so a test can keep one handle
/// and give another to the synchronizer.
///
/// # Example
///
/// ```rust,no_run
/// use dnssync_core::backends::MemoryProvider;
/// use dnssync_core::{DnsProvider, Record};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let provider = MemoryProvider::with_records(vec![
///         Record::new("www.example.com", "A", ["192.0.2.1"]),
///     ]);
///
///     let records = provider.records("example.com").await?;
///     assert_eq!(records.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    seed: Arc<Vec<Record>>,
    zones: Arc<RwLock<HashMap<String, Vec<Record>>>>,
}

impl MemoryProvider {
    /// Create a provider with no records
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider whose zones start out with `records`
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            seed: Arc::new(records),
            zones: Arc::default(),
        }
    }

    /// Replace the content of a zone
    pub async fn set_records(&self, zone: &str, records: Vec<Record>) {
        self.zones.write().await.insert(zone_key(zone), records);
    }

    fn seeded(&self, zone: &str) -> Vec<Record> {
        let filter = DomainFilter::new([zone]);
        self.seed
            .iter()
            .filter(|r| filter.matches(&r.dns_name))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    async fn records(&self, zone: &str) -> Result<Vec<Record>> {
        let zones = self.zones.read().await;
        Ok(match zones.get(&zone_key(zone)) {
            Some(records) => records.clone(),
            None => self.seeded(zone),
        })
    }

    async fn apply_changes(&self, zone: &str, changes: &ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut zones = self.zones.write().await;
        let records = zones
            .entry(zone_key(zone))
            .or_insert_with(|| self.seeded(zone));
        apply_to(records, changes);

        tracing::debug!(zone, records = records.len(), "applied changes in memory");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for [`MemoryProvider`]
pub struct MemoryProviderFactory;

impl DnsProviderFactory for MemoryProviderFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Memory { records } => {
                Ok(Box::new(MemoryProvider::with_records(records.clone())))
            }
            other => Err(Error::config(format!(
                "memory factory cannot build a {} provider",
                other.type_name()
            ))),
        }
    }
}
