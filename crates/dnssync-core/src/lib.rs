// # dnssync-core
//
// Core library for DNS zone synchronization.
//
// ## Architecture Overview
//
// This library keeps one or more target DNS backends consistent with an
// authoritative source:
// - **Record**: canonical form of one DNS record set
// - **RecordFilter / DomainFilter**: decide which records take part
// - **Plan**: compares current and desired records, producing a ChangeSet
// - **Policy**: ordered transforms over a ChangeSet
// - **DnsProvider**: trait implemented by every source/target backend
// - **Synchronizer**: drives the plan per zone and per target, periodically
// - **ProviderRegistry**: plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Planning is pure; backends only list and apply
// 2. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Scoped Failures**: A failing zone or target never stops the others

pub mod backends;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod plan;
pub mod record;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use backends::{FileProvider, MemoryProvider};
pub use config::{ProviderConfig, SyncSettings, SyncerConfig, ZoneConfig};
pub use engine::{ProviderHandle, SyncEvent, SyncReport, Synchronizer, ZoneBinding};
pub use error::{Error, Result};
pub use filter::{DomainFilter, RecordFilter};
pub use plan::{ChangeSet, Plan, Policy};
pub use record::{Record, RecordType};
pub use registry::ProviderRegistry;
pub use traits::{DnsProvider, DnsProviderFactory};
