//! Results of a synchronization pass

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::error::Error;
use crate::plan::{ChangeCounts, ChangeSet};

/// Outcome of one full pass over every configured zone
#[derive(Debug)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per zone, in configuration order
    pub zones: Vec<ZoneReport>,
}

impl SyncReport {
    /// Zone name → target identity → change set
    ///
    /// Targets sharing an identity within one zone collapse to the last one.
    pub fn changes(&self) -> BTreeMap<String, BTreeMap<String, ChangeSet>> {
        self.zones
            .iter()
            .map(|zone| {
                let targets = zone
                    .targets
                    .iter()
                    .map(|t| (t.target.clone(), t.changes.clone()))
                    .collect();
                (zone.zone.clone(), targets)
            })
            .collect()
    }

    /// Whether any zone reported an error
    pub fn has_errors(&self) -> bool {
        self.zones.iter().any(|z| z.error.is_some())
    }

    /// Zones that reported an error
    pub fn failed_zones(&self) -> impl Iterator<Item = &ZoneReport> {
        self.zones.iter().filter(|z| z.error.is_some())
    }

    pub fn zone(&self, name: &str) -> Option<&ZoneReport> {
        self.zones.iter().find(|z| z.zone == name)
    }

    /// Counts summed over every zone and target
    pub fn total(&self) -> ChangeCounts {
        self.zones
            .iter()
            .flat_map(|z| &z.targets)
            .fold(ChangeCounts::default(), |acc, t| {
                let c = t.changes.counts();
                ChangeCounts {
                    creates: acc.creates + c.creates,
                    updates: acc.updates + c.updates,
                    deletes: acc.deletes + c.deletes,
                }
            })
    }
}

/// Outcome for one zone
///
/// `targets` holds every target that was planned before the zone stopped;
/// `error` is set when the source or a target failed.
#[derive(Debug)]
pub struct ZoneReport {
    pub zone: String,
    pub targets: Vec<TargetReport>,
    pub error: Option<Error>,
}

impl ZoneReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn target(&self, identity: &str) -> Option<&TargetReport> {
        self.targets.iter().find(|t| t.target == identity)
    }
}

/// Change set computed for one target
#[derive(Debug, Clone)]
pub struct TargetReport {
    /// Target identity as configured
    pub target: String,
    pub changes: ChangeSet,
    /// False when the pass ran in dry-run mode
    pub applied: bool,
}
