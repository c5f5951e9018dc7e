// # DNS Provider Trait
//
// Defines the interface every source and target backend implements.
//
// ## Implementations
//
// - Memory: `crate::backends::MemoryProvider`
// - JSON file: `crate::backends::FileProvider`
// - Cloudflare: `dnssync-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dnssync_core::{DnsProvider, Plan};
//
// let current = target.records("example.com").await?;
// let desired = source.records("example.com").await?;
// let changes = Plan::new(current, desired).calculate();
// target.apply_changes("example.com", &changes).await?;
// ```

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::DomainFilter;
use crate::plan::ChangeSet;
use crate::record::Record;

/// Trait for DNS backends
///
/// A provider can act as the source of a zone, as one of its targets, or
/// both. The synchronizer never branches on provider identity.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// Providers are isolated integrations:
///
/// ## Allowed Capabilities
/// - ✅ Call their own backend (HTTP API, local file, in-process map)
/// - ✅ Translate between backend representations and [`Record`]
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads (violates shutdown determinism)
/// - ❌ Retry or back off (the next scheduled pass is the retry)
/// - ❌ Decide what should change (owned by the plan calculator)
/// - ❌ Access other providers
///
/// **Correct approach**: Return an error. The synchronizer reports it against
/// the zone and target it belongs to and moves on.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record the backend holds for `zone`
    ///
    /// # Errors
    ///
    /// Network, authentication or storage failures. An unknown zone is not
    /// an error for backends that can hold arbitrary zones; they return an
    /// empty list.
    async fn records(&self, zone: &str) -> Result<Vec<Record>>;

    /// Apply a change set to `zone`
    ///
    /// An empty change set must succeed without touching the backend.
    /// Atomicity across the individual changes is up to the backend.
    async fn apply_changes(&self, zone: &str, changes: &ChangeSet) -> Result<()>;

    /// Canonicalize desired records before planning against this backend
    ///
    /// Lets a backend fill in defaults it would otherwise report back on the
    /// next listing, so that those defaults never show up as drift.
    fn adjust_records(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        Ok(records)
    }

    /// The backend's own scoping filter, intersected with the zone's
    fn domain_filter(&self) -> DomainFilter {
        DomainFilter::match_all()
    }

    /// Get the provider name (for logging/debugging)
    ///
    /// A static string identifying the provider (e.g., "cloudflare", "file")
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    ///
    /// # Returns
    ///
    /// A boxed DnsProvider trait object
    fn create(&self, config: &crate::config::ProviderConfig) -> Result<Box<dyn DnsProvider>>;
}
