//! Test doubles and common utilities for synchronizer contract tests
//!
//! The doubles wrap a [`MemoryProvider`] so that tests can both observe
//! calls and inspect the resulting zone content.

#![allow(dead_code)]

use dnssync_core::backends::MemoryProvider;
use dnssync_core::error::{Error, Result};
use dnssync_core::{ChangeSet, DnsProvider, DomainFilter, ProviderHandle, Record, SyncSettings};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A provider that records every call and can be told to fail
#[derive(Clone)]
pub struct RecordingProvider {
    inner: MemoryProvider,
    /// Call counter for records()
    list_calls: Arc<AtomicUsize>,
    /// Call counter for apply_changes()
    apply_calls: Arc<AtomicUsize>,
    /// Change sets passed to apply_changes()
    applied: Arc<Mutex<Vec<ChangeSet>>>,
    fail_list: Arc<AtomicBool>,
    fail_apply: Arc<AtomicBool>,
    fail_adjust: Arc<AtomicBool>,
    delay: Option<Duration>,
    domain_filter: DomainFilter,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            inner: MemoryProvider::with_records(records),
            list_calls: Arc::new(AtomicUsize::new(0)),
            apply_calls: Arc::new(AtomicUsize::new(0)),
            applied: Arc::new(Mutex::new(Vec::new())),
            fail_list: Arc::new(AtomicBool::new(false)),
            fail_apply: Arc::new(AtomicBool::new(false)),
            fail_adjust: Arc::new(AtomicBool::new(false)),
            delay: None,
            domain_filter: DomainFilter::match_all(),
        }
    }

    /// Make every records() call fail
    pub fn failing_list(self) -> Self {
        self.fail_list.store(true, Ordering::SeqCst);
        self
    }

    /// Make every apply_changes() call fail
    pub fn failing_apply(self) -> Self {
        self.fail_apply.store(true, Ordering::SeqCst);
        self
    }

    /// Make every adjust_records() call fail
    pub fn failing_adjust(self) -> Self {
        self.fail_adjust.store(true, Ordering::SeqCst);
        self
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_domain_filter(mut self, filter: DomainFilter) -> Self {
        self.domain_filter = filter;
        self
    }

    /// Get the number of times records() was called
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Get the number of times apply_changes() was called
    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    /// Change sets received so far
    pub fn applied(&self) -> Vec<ChangeSet> {
        self.applied.lock().unwrap().clone()
    }

    /// Current content of a zone
    pub async fn zone(&self, zone: &str) -> Vec<Record> {
        self.inner.records(zone).await.unwrap()
    }

    /// Handle sharing this provider's state, for the synchronizer
    pub fn handle(&self, id: &str) -> ProviderHandle {
        ProviderHandle::new(id, Arc::new(self.clone()))
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for RecordingProvider {
    async fn records(&self, zone: &str) -> Result<Vec<Record>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::http("connection refused"));
        }
        self.inner.records(zone).await
    }

    async fn apply_changes(&self, zone: &str, changes: &ChangeSet) -> Result<()> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(Error::rate_limited("too many requests"));
        }
        self.applied.lock().unwrap().push(changes.clone());
        self.inner.apply_changes(zone, changes).await
    }

    fn adjust_records(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        if self.fail_adjust.load(Ordering::SeqCst) {
            return Err(Error::invalid_input("SRV target must be 'priority weight port target'"));
        }
        Ok(records)
    }

    fn domain_filter(&self) -> DomainFilter {
        self.domain_filter.clone()
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Settings suitable for tests: short interval, small event channel
pub fn test_settings() -> SyncSettings {
    SyncSettings {
        interval_secs: 1,
        event_channel_capacity: 100,
        ..SyncSettings::default()
    }
}

pub fn a(name: &str, ip: &str) -> Record {
    Record::new(name, "A", [ip])
}
