//! Zone synchronizer
//!
//! The Synchronizer is responsible for:
//! - Fetching desired records from each zone's source
//! - Fetching current records from each of the zone's targets
//! - Running the plan calculator per target
//! - Applying (or, in dry-run mode, only reporting) the resulting changes
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────┐
//!                     │ Synchronizer │── SyncEvent ──> events channel
//!                     └──────────────┘
//!                            │ per zone, in order
//!          ┌─────────────────┼──────────────────────┐
//!          ▼                 ▼                      ▼
//!  ┌──────────────┐   ┌─────────────┐      ┌──────────────┐
//!  │    source    │   │    Plan     │      │   targets    │
//!  │  (records)   │   │ (calculate) │      │ (records,    │
//!  └──────────────┘   └─────────────┘      │  apply)      │
//!                                          └──────────────┘
//! ```
//!
//! ## Failure Scoping
//!
//! 1. Source fetch fails: the zone is skipped, other zones still run
//! 2. Target fetch, adjust or apply fails: remaining targets of that zone
//!    are skipped, other zones still run
//! 3. Nothing is retried inside a pass; the next pass is the retry

mod report;

pub use report::{SyncReport, TargetReport, ZoneReport};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{SyncSettings, SyncerConfig};
use crate::error::{Error, Result};
use crate::filter::{DomainFilter, RecordFilter};
use crate::plan::{ChangeCounts, Plan, Policy};
use crate::record::Record;
use crate::registry::ProviderRegistry;
use crate::traits::DnsProvider;

/// Events emitted by the Synchronizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Periodic loop started
    Started {
        zones: usize,
    },

    /// A pass over all zones began
    PassStarted {
        pass: u64,
    },

    /// Changes were computed for a target
    TargetPlanned {
        zone: String,
        target: String,
        counts: ChangeCounts,
    },

    /// Changes were applied to a target
    TargetApplied {
        zone: String,
        target: String,
        counts: ChangeCounts,
    },

    /// Dry run: changes were computed but not applied
    TargetSimulated {
        zone: String,
        target: String,
        counts: ChangeCounts,
    },

    /// A zone stopped early
    ZoneFailed {
        zone: String,
        error: String,
    },

    /// A pass over all zones ended
    PassCompleted {
        pass: u64,
        zones: usize,
        failed: usize,
    },

    /// Periodic loop stopped
    Stopped {
        reason: String,
    },
}

/// A provider together with the identity it is reported under
#[derive(Clone)]
pub struct ProviderHandle {
    /// Identity used in logs, events and reports
    pub id: String,
    pub provider: Arc<dyn DnsProvider>,
}

impl ProviderHandle {
    pub fn new(id: impl Into<String>, provider: Arc<dyn DnsProvider>) -> Self {
        Self {
            id: id.into(),
            provider,
        }
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("id", &self.id)
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

/// A zone with its providers resolved
#[derive(Debug, Clone)]
pub struct ZoneBinding {
    pub name: String,
    pub source: ProviderHandle,
    /// Converged in this order
    pub targets: Vec<ProviderHandle>,
    pub record_filter: RecordFilter,
    /// Configured scoping; each target's own filter is added per target
    pub domain_filters: Vec<DomainFilter>,
}

impl ZoneBinding {
    pub fn new(name: impl Into<String>, source: ProviderHandle) -> Self {
        Self {
            name: name.into(),
            source,
            targets: Vec::new(),
            record_filter: RecordFilter::default(),
            domain_filters: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: ProviderHandle) -> Self {
        self.targets.push(target);
        self
    }

    pub fn with_record_filter(mut self, filter: RecordFilter) -> Self {
        self.record_filter = filter;
        self
    }

    pub fn with_domain_filter(mut self, filter: DomainFilter) -> Self {
        self.domain_filters.push(filter);
        self
    }
}

/// Core synchronizer
///
/// ## Lifecycle
///
/// 1. Create with [`Synchronizer::from_registry()`] or [`Synchronizer::new()`]
/// 2. Either call [`Synchronizer::run_once()`] or start the periodic loop
///    with [`Synchronizer::run()`]
/// 3. The loop runs until a shutdown signal is received
///
/// ## Threading
///
/// Zones and targets are processed sequentially on the calling task. A pass
/// that has started always runs to completion; shutdown is observed between
/// passes.
pub struct Synchronizer {
    /// Zones in configuration order
    zones: Vec<ZoneBinding>,

    settings: SyncSettings,

    /// Applied to every change set, in order
    policies: Vec<Policy>,

    /// Number of passes started so far
    passes: AtomicU64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl Synchronizer {
    /// Create a synchronizer from pre-built zone bindings
    ///
    /// # Returns
    ///
    /// A tuple of (synchronizer, event_receiver) where event_receiver yields
    /// synchronizer events
    pub fn new(
        zones: Vec<ZoneBinding>,
        settings: SyncSettings,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        settings.validate()?;

        let zones = zones
            .into_iter()
            .map(|mut zone| {
                zone.record_filter.apply_defaults();
                zone
            })
            .collect();

        let (tx, rx) = mpsc::channel(settings.event_channel_capacity);

        let synchronizer = Self {
            zones,
            policies: vec![settings.policy],
            settings,
            passes: AtomicU64::new(0),
            event_tx: tx,
        };

        Ok((synchronizer, rx))
    }

    /// Validate `config` and resolve every provider through `registry`
    ///
    /// Providers are created once here and reused by every pass.
    pub fn from_registry(
        config: &SyncerConfig,
        registry: &ProviderRegistry,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let timeout = config.request_timeout_secs;
        let mut zones = Vec::with_capacity(config.zones.len());
        for zone in &config.zones {
            let source_config = zone.source.provider.with_default_request_timeout(timeout);
            let source = ProviderHandle::new(
                zone.source.provider.to_string(),
                Arc::from(registry.create_provider(&source_config)?),
            );

            let mut binding = ZoneBinding::new(zone.name.clone(), source)
                .with_record_filter(zone.record_filter.clone());
            binding.domain_filters = zone.domain_filters();

            for target in &zone.targets {
                binding = binding.with_target(ProviderHandle::new(
                    target.to_string(),
                    Arc::from(registry.create_provider(&target.with_default_request_timeout(timeout))?),
                ));
            }

            debug!(
                zone = %zone.name,
                source = %binding.source.id,
                targets = binding.targets.len(),
                "resolved zone providers"
            );
            zones.push(binding);
        }

        Self::new(zones, config.sync.clone())
    }

    /// Zones in configuration order
    pub fn zones(&self) -> &[ZoneBinding] {
        &self.zones
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Perform exactly one pass over all zones
    pub async fn run_once(&self) -> SyncReport {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        let started_at = Utc::now();
        self.emit_event(SyncEvent::PassStarted { pass });

        let mut zones = Vec::with_capacity(self.zones.len());
        for zone in &self.zones {
            zones.push(self.sync_zone(zone).await);
        }

        let failed = zones.iter().filter(|z| z.error.is_some()).count();
        self.emit_event(SyncEvent::PassCompleted {
            pass,
            zones: zones.len(),
            failed,
        });

        SyncReport {
            started_at,
            finished_at: Utc::now(),
            zones,
        }
    }

    /// Run the periodic loop
    ///
    /// One pass runs immediately, then one per `interval_secs`, until
    /// SIGINT/Ctrl-C is received.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the periodic loop until `shutdown_rx` fires (or is dropped)
    ///
    /// With `None`, behaves like [`Synchronizer::run()`].
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.emit_event(SyncEvent::Started {
            zones: self.zones.len(),
        });
        info!(
            zones = self.zones.len(),
            interval_secs = self.settings.interval_secs,
            dry_run = self.settings.dry_run,
            "Synchronizer started"
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        // first tick completes immediately
        let mut ticker = tokio::time::interval(Duration::from_secs(self.settings.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(SyncEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }

                _ = ticker.tick() => {
                    let report = self.run_once().await;
                    if report.has_errors() {
                        warn!(
                            failed = report.failed_zones().count(),
                            "Sync pass finished with errors"
                        );
                    }
                }
            }
        }

        info!("Synchronizer stopped");
        Ok(())
    }

    /// Synchronize one zone against all of its targets
    async fn sync_zone(&self, zone: &ZoneBinding) -> ZoneReport {
        info!("Starting sync for zone: {}", zone.name);

        let mut report = ZoneReport {
            zone: zone.name.clone(),
            targets: Vec::with_capacity(zone.targets.len()),
            error: None,
        };

        if let Err(e) = self.sync_targets(zone, &mut report.targets).await {
            error!("Failed to sync zone {}: {}", zone.name, e);
            self.emit_event(SyncEvent::ZoneFailed {
                zone: zone.name.clone(),
                error: e.to_string(),
            });
            report.error = Some(e);
            return report;
        }

        info!("Completed sync for zone: {}", zone.name);
        report
    }

    /// Plan and apply every target in order, stopping at the first failure
    async fn sync_targets(&self, zone: &ZoneBinding, done: &mut Vec<TargetReport>) -> Result<()> {
        let mut desired = self.list_records(zone, &zone.source).await?;
        if let Some(owner) = self.settings.owner() {
            for record in &mut desired {
                record.owner = Some(owner.to_string());
            }
        }

        for target in &zone.targets {
            let current = self.list_records(zone, target).await?;

            let candidates = target.provider.adjust_records(desired.clone()).map_err(|e| {
                Error::provider(
                    target.id.clone(),
                    format!("failed to adjust records for zone {}: {}", zone.name, e),
                )
            })?;

            let mut plan = Plan::new(current, candidates)
                .with_policies(self.policies.clone())
                .with_managed_records(zone.record_filter.include_types.clone())
                .with_exclude_records(zone.record_filter.exclude_types.clone());
            plan.domain_filters = zone.domain_filters.clone();
            let own_filter = target.provider.domain_filter();
            if !own_filter.is_match_all() {
                plan.domain_filters.push(own_filter);
            }
            if let Some(owner) = self.settings.owner() {
                plan = plan.with_owner_id(owner);
            }

            let changes = plan.calculate();
            for line in changes.summary_lines() {
                info!("{}", line);
            }
            let counts = changes.counts();
            info!(
                "Sync {} ({}): {} creates, {} updates, {} deletes",
                zone.name, target.id, counts.creates, counts.updates, counts.deletes
            );
            self.emit_event(SyncEvent::TargetPlanned {
                zone: zone.name.clone(),
                target: target.id.clone(),
                counts,
            });

            if self.settings.dry_run {
                info!("Dry run enabled, skipping apply changes for target {}", target.id);
                self.emit_event(SyncEvent::TargetSimulated {
                    zone: zone.name.clone(),
                    target: target.id.clone(),
                    counts,
                });
                done.push(TargetReport {
                    target: target.id.clone(),
                    changes,
                    applied: false,
                });
                continue;
            }

            target
                .provider
                .apply_changes(&zone.name, &changes)
                .await
                .map_err(|e| Error::apply(zone.name.clone(), target.id.clone(), e))?;

            self.emit_event(SyncEvent::TargetApplied {
                zone: zone.name.clone(),
                target: target.id.clone(),
                counts,
            });
            done.push(TargetReport {
                target: target.id.clone(),
                changes,
                applied: true,
            });
        }

        Ok(())
    }

    /// Fetch, filter and transform the records of one provider
    async fn list_records(&self, zone: &ZoneBinding, handle: &ProviderHandle) -> Result<Vec<Record>> {
        let records = handle
            .provider
            .records(&zone.name)
            .await
            .map_err(|e| Error::fetch(zone.name.clone(), handle.id.clone(), e))?;
        let fetched = records.len();

        let mut filtered = zone.record_filter.apply(records);
        debug!(
            "Fetched {} records, filtered: {} from {} for zone {}",
            fetched,
            filtered.len(),
            handle.id,
            zone.name
        );

        if self.settings.record_ttl > 0 {
            for record in &mut filtered {
                record.ttl = Some(self.settings.record_ttl);
            }
        }

        Ok(filtered)
    }

    /// Emit a synchronizer event
    fn emit_event(&self, event: SyncEvent) {
        // Send event, logging warning if channel is full (backpressure)
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
