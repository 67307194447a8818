//! The region directory.

use crate::config::{Concurrency, Config};
use crate::control::feed::ControlFeed;
use crate::control::gate::{Gate, GateConfig};
use crate::control::region::Region;
use crate::control::state::{Authority, Resource, State, Subject, Transfer};
use crate::control::stats::ControlStats;
use crate::error::{ControlError, ControlResult};
use crate::types::TimeRange;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// State shared between a controller and the gates it hands out.
pub(crate) struct Shared<R> {
    concurrency: Concurrency,
    /// Sorted by `time_range.start`, mutually non-overlapping.
    regions: RwLock<Vec<Arc<Region<R>>>>,
    pub(crate) stats: ControlStats,
    feed: Option<Arc<ControlFeed>>,
}

impl<R: Resource> Shared<R> {
    /// Records and publishes a transfer that changed control.
    ///
    /// Called with the region's lock held so the feed sees each region's
    /// transfers in the order they happened.
    pub(crate) fn publish(&self, transfer: &Transfer) {
        if !transfer.occurred() {
            return;
        }
        self.stats.record_transfer();
        debug!(transfer = %transfer, "control transferred");
        if let Some(feed) = &self.feed {
            feed.emit(vec![transfer.clone()]);
        }
    }

    /// Removes a fully released region from the directory.
    ///
    /// Must not be called while holding the region's lock.
    pub(crate) fn remove(&self, region: &Arc<Region<R>>) {
        let mut regions = self.regions.write();
        if let Some(idx) = regions.iter().position(|r| Arc::ptr_eq(r, region)) {
            let removed = regions.remove(idx);
            self.stats.record_region_removed();
            debug!(time_range = %removed.time_range(), "removed control region");
        }
    }

    /// Drops regions whose last gate left but which are still listed.
    fn prune_closed(&self, regions: &mut Vec<Arc<Region<R>>>) {
        let before = regions.len();
        regions.retain(|r| !r.is_closed());
        for _ in regions.len()..before {
            self.stats.record_region_removed();
        }
    }
}

/// Arbitrates write control over the time axis of a resource.
///
/// The controller partitions time into independent regions. Each region has
/// its own resource and its own set of gates competing for it; the gate with
/// the highest authority leads, and ties go to the gate that opened first.
///
/// ## Locking
///
/// The directory lock is always taken before any region lock. Releasing the
/// last gate of a region drops the region lock before the directory lock is
/// taken to remove it.
///
/// ## Example
///
/// ```rust,ignore
/// let controller = Controller::<Writer>::new(Config::default());
/// let (gate, transfer) = controller.open_gate(
///     GateConfig::new(Subject::new("w1", "writer"), range, Authority::ABSOLUTE)
///         .open_resource(move || Ok(Writer::open(channel))),
/// )?;
/// let writer = gate.authorize()?;
/// ```
pub struct Controller<R: Resource> {
    shared: Arc<Shared<R>>,
}

impl<R: Resource> Controller<R> {
    /// Creates a new controller.
    pub fn new(config: Config) -> Self {
        Self::build(config, None)
    }

    /// Creates a controller that publishes every change of control to `feed`.
    pub fn with_feed(config: Config, feed: Arc<ControlFeed>) -> Self {
        Self::build(config, Some(feed))
    }

    fn build(config: Config, feed: Option<Arc<ControlFeed>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                concurrency: config.concurrency,
                regions: RwLock::new(Vec::new()),
                stats: ControlStats::new(),
                feed,
            }),
        }
    }

    /// Returns the concurrency policy.
    #[must_use]
    pub fn concurrency(&self) -> Concurrency {
        self.shared.concurrency
    }

    /// Returns the controller's statistics.
    #[must_use]
    pub fn stats(&self) -> &ControlStats {
        &self.shared.stats
    }

    /// Returns the number of live regions.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.shared
            .regions
            .read()
            .iter()
            .filter(|r| !r.is_closed())
            .count()
    }

    /// Registers a region backed by an already open resource.
    ///
    /// The region has no gates until one is opened on an overlapping range.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `time_range` is zero or overlaps an
    /// existing region.
    pub fn register(&self, time_range: TimeRange, resource: R) -> ControlResult<()> {
        if time_range.is_zero() {
            return Err(ControlError::validation("time_range", "must be non-zero"));
        }
        let mut regions = self.shared.regions.write();
        self.shared.prune_closed(&mut regions);
        if let Some(existing) = regions
            .iter()
            .find(|r| r.time_range().overlaps_with(time_range))
        {
            return Err(ControlError::validation(
                "time_range",
                format!(
                    "{} overlaps with an existing control region {}",
                    time_range,
                    existing.time_range()
                ),
            ));
        }
        let region = Arc::new(Region::new(self.shared.concurrency, time_range, resource));
        let idx = regions.partition_point(|r| r.time_range().start < time_range.start);
        regions.insert(idx, region);
        self.shared.stats.record_region_created();
        debug!(time_range = %time_range, "registered control region");
        Ok(())
    }

    /// Opens a gate on the region overlapping `config.time_range`.
    ///
    /// If no region overlaps, the resource is opened through
    /// `config.open_resource` and a new region is created. The returned
    /// transfer describes any change of control caused by the new gate.
    ///
    /// # Errors
    ///
    /// - Validation errors for an invalid config or a duplicate subject key
    /// - [`ControlError::Unauthorized`] when `err_if_controlled` or
    ///   `err_on_unauthorized_open` reject the gate
    /// - [`ControlError::UnsupportedConfiguration`] when the range overlaps
    ///   more than one region
    /// - Whatever `open_resource` returns
    ///
    /// The controller is left unchanged on every error.
    pub fn open_gate(&self, mut config: GateConfig<R>) -> ControlResult<(Gate<R>, Transfer)> {
        config.validate()?;
        let request = config.request();

        let mut regions = self.shared.regions.write();
        let (region, position, transfer) = loop {
            self.shared.prune_closed(&mut regions);
            let overlapping: Vec<usize> = regions
                .iter()
                .enumerate()
                .filter(|(_, r)| r.time_range().overlaps_with(request.time_range))
                .map(|(i, _)| i)
                .collect();

            match overlapping.as_slice() {
                [] => {
                    let open_resource = config
                        .open_resource
                        .take()
                        .ok_or_else(|| ControlError::validation("open_resource", "required"))?;
                    let resource = open_resource()?;
                    let region = Arc::new(Region::new(
                        self.shared.concurrency,
                        request.time_range,
                        resource,
                    ));
                    let (position, transfer) =
                        region.open(&request, |transfer| self.shared.publish(transfer))?;
                    let idx = regions
                        .partition_point(|r| r.time_range().start < request.time_range.start);
                    regions.insert(idx, Arc::clone(&region));
                    self.shared.stats.record_region_created();
                    debug!(time_range = %request.time_range, "created control region");
                    break (region, position, transfer);
                }
                [idx] => {
                    let region = Arc::clone(&regions[*idx]);
                    match region.open(&request, |transfer| self.shared.publish(transfer)) {
                        Ok((position, transfer)) => break (region, position, transfer),
                        // Fully released between the scan and the open.
                        Err(_) if region.is_closed() => continue,
                        Err(err) => {
                            if err.is_unauthorized() {
                                self.shared.stats.record_unauthorized();
                            }
                            return Err(err);
                        }
                    }
                }
                _ => {
                    warn!(
                        subject = %request.subject,
                        time_range = %request.time_range,
                        regions = overlapping.len(),
                        "gate overlaps multiple control regions"
                    );
                    return Err(ControlError::unsupported(format!(
                        "encountered multiple control regions for time range {}",
                        request.time_range
                    )));
                }
            }
        };
        drop(regions);

        self.shared.stats.record_open();
        debug!(
            subject = %request.subject,
            authority = %request.authority,
            position,
            "opened control gate"
        );
        let gate = Gate::new(
            Arc::clone(&self.shared),
            region,
            request.subject,
            request.authority,
            position,
        );
        Ok((gate, transfer))
    }

    /// Opens a gate with absolute authority, failing if any gate already
    /// controls the overlapping region.
    ///
    /// Used by destructive operations that must not run under a writer.
    pub fn open_absolute_gate_if_uncontrolled(
        &self,
        time_range: TimeRange,
        subject: Subject,
        open_resource: impl FnOnce() -> ControlResult<R> + Send + 'static,
    ) -> ControlResult<(Gate<R>, Transfer)> {
        self.open_gate(
            GateConfig::new(subject, time_range, Authority::ABSOLUTE)
                .open_resource(open_resource)
                .err_if_controlled(true),
        )
    }

    /// Returns the leader of the earliest region, if any region is controlled.
    #[must_use]
    pub fn leading_state(&self) -> Option<State> {
        self.shared
            .regions
            .read()
            .iter()
            .find(|r| !r.is_closed())
            .and_then(|r| r.leading_state())
    }
}

impl<R: Resource> Clone for Controller<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: Resource> fmt::Debug for Controller<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("concurrency", &self.shared.concurrency)
            .field("region_count", &self.region_count())
            .finish_non_exhaustive()
    }
}
