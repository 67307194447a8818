//! Control statistics.
//!
//! Counters are atomic and can be read while gates are being opened and
//! released. All values increase monotonically.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing a controller's activity.
#[derive(Debug, Default)]
pub struct ControlStats {
    gates_opened: AtomicU64,
    gates_released: AtomicU64,
    transfers: AtomicU64,
    full_releases: AtomicU64,
    unauthorized: AtomicU64,
    regions_created: AtomicU64,
    regions_removed: AtomicU64,
}

impl ControlStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_open(&self) {
        self.gates_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self) {
        self.gates_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transfer(&self) {
        self.transfers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_full_release(&self) {
        self.full_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unauthorized(&self) {
        self.unauthorized.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_region_created(&self) {
        self.regions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_region_removed(&self) {
        self.regions_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of gates opened.
    pub fn gates_opened(&self) -> u64 {
        self.gates_opened.load(Ordering::Relaxed)
    }

    /// Returns the number of gates released.
    pub fn gates_released(&self) -> u64 {
        self.gates_released.load(Ordering::Relaxed)
    }

    /// Returns the number of leadership changes, including acquisitions
    /// and full releases.
    pub fn transfers(&self) -> u64 {
        self.transfers.load(Ordering::Relaxed)
    }

    /// Returns the number of regions left without any gate.
    pub fn full_releases(&self) -> u64 {
        self.full_releases.load(Ordering::Relaxed)
    }

    /// Returns the number of rejected opens and failed authorizations.
    pub fn unauthorized(&self) -> u64 {
        self.unauthorized.load(Ordering::Relaxed)
    }

    /// Returns the number of regions created.
    pub fn regions_created(&self) -> u64 {
        self.regions_created.load(Ordering::Relaxed)
    }

    /// Returns the number of regions removed from the directory.
    pub fn regions_removed(&self) -> u64 {
        self.regions_removed.load(Ordering::Relaxed)
    }

    /// Takes a point-in-time copy of every counter.
    pub fn snapshot(&self) -> ControlStatsSnapshot {
        ControlStatsSnapshot {
            gates_opened: self.gates_opened(),
            gates_released: self.gates_released(),
            transfers: self.transfers(),
            full_releases: self.full_releases(),
            unauthorized: self.unauthorized(),
            regions_created: self.regions_created(),
            regions_removed: self.regions_removed(),
        }
    }
}

/// A copy of [`ControlStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlStatsSnapshot {
    /// Gates opened.
    pub gates_opened: u64,
    /// Gates released.
    pub gates_released: u64,
    /// Leadership changes.
    pub transfers: u64,
    /// Regions left without any gate.
    pub full_releases: u64,
    /// Rejected opens and failed authorizations.
    pub unauthorized: u64,
    /// Regions created.
    pub regions_created: u64,
    /// Regions removed.
    pub regions_removed: u64,
}

impl ControlStatsSnapshot {
    /// Returns the number of gates still open.
    pub fn open_gates(&self) -> u64 {
        self.gates_opened.saturating_sub(self.gates_released)
    }

    /// Returns the number of regions still in the directory.
    pub fn live_regions(&self) -> u64 {
        self.regions_created.saturating_sub(self.regions_removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let stats = ControlStats::new();
        assert_eq!(stats.snapshot(), ControlStatsSnapshot::default());
    }

    #[test]
    fn snapshot_reflects_records() {
        let stats = ControlStats::new();
        stats.record_open();
        stats.record_open();
        stats.record_release();
        stats.record_transfer();
        stats.record_region_created();

        let snap = stats.snapshot();
        assert_eq!(snap.gates_opened, 2);
        assert_eq!(snap.open_gates(), 1);
        assert_eq!(snap.transfers, 1);
        assert_eq!(snap.live_regions(), 1);
    }
}
