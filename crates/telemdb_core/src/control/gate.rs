//! Gates: per-subject handles on a control region.

use crate::control::controller::Shared;
use crate::control::region::{OpenRequest, Region};
use crate::control::state::{Authority, Resource, Subject, Transfer};
use crate::error::{ControlError, ControlResult};
use crate::types::TimeRange;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Callback that opens the resource for a newly created region.
pub type OpenResourceFn<R> = Box<dyn FnOnce() -> ControlResult<R> + Send>;

/// Configuration for opening a [`Gate`].
pub struct GateConfig<R> {
    /// The time range the gate wants to control.
    pub time_range: TimeRange,
    /// Precedence of the gate's claim.
    pub authority: Authority,
    /// Identity of the bidder.
    pub subject: Subject,
    /// Opens the resource if no region covers `time_range` yet. Only called
    /// when a new region has to be created.
    ///
    /// Runs while the controller's region directory is locked. The callback
    /// must not call back into the same controller or drop a [`Gate`] of it,
    /// or it will deadlock.
    pub open_resource: Option<OpenResourceFn<R>>,
    /// Fail instead of bidding if the region already has a leader.
    pub err_if_controlled: bool,
    /// Fail instead of bidding silently if the gate would not be authorized
    /// right after opening.
    pub err_on_unauthorized_open: bool,
}

impl<R> GateConfig<R> {
    /// Creates a configuration with no resource callback and both error
    /// flags off.
    pub fn new(subject: Subject, time_range: TimeRange, authority: Authority) -> Self {
        Self {
            time_range,
            authority,
            subject,
            open_resource: None,
            err_if_controlled: false,
            err_on_unauthorized_open: false,
        }
    }

    /// Sets the resource callback.
    ///
    /// The callback runs with the controller's region directory locked. It
    /// must not open, release or drop gates of the same controller.
    #[must_use]
    pub fn open_resource(mut self, f: impl FnOnce() -> ControlResult<R> + Send + 'static) -> Self {
        self.open_resource = Some(Box::new(f));
        self
    }

    /// Sets whether to fail when the region is already controlled.
    #[must_use]
    pub fn err_if_controlled(mut self, value: bool) -> Self {
        self.err_if_controlled = value;
        self
    }

    /// Sets whether to fail when the gate would not be authorized.
    #[must_use]
    pub fn err_on_unauthorized_open(mut self, value: bool) -> Self {
        self.err_on_unauthorized_open = value;
        self
    }

    pub(crate) fn validate(&self) -> ControlResult<()> {
        if self.subject.key.is_empty() {
            return Err(ControlError::validation("subject.key", "required"));
        }
        if self.time_range.is_zero() {
            return Err(ControlError::validation("time_range", "must be non-zero"));
        }
        if !self.time_range.is_valid() {
            return Err(ControlError::validation(
                "time_range",
                format!(
                    "start {} must not be after end {}",
                    self.time_range.start, self.time_range.end
                ),
            ));
        }
        if self.open_resource.is_none() {
            return Err(ControlError::validation("open_resource", "required"));
        }
        Ok(())
    }

    pub(crate) fn request(&self) -> OpenRequest {
        OpenRequest {
            time_range: self.time_range,
            authority: self.authority,
            subject: self.subject.clone(),
            err_if_controlled: self.err_if_controlled,
            err_on_unauthorized_open: self.err_on_unauthorized_open,
        }
    }
}

impl<R> fmt::Debug for GateConfig<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateConfig")
            .field("time_range", &self.time_range)
            .field("authority", &self.authority)
            .field("subject", &self.subject)
            .field("has_open_resource", &self.open_resource.is_some())
            .field("err_if_controlled", &self.err_if_controlled)
            .field("err_on_unauthorized_open", &self.err_on_unauthorized_open)
            .finish()
    }
}

/// A subject's handle on one control region.
///
/// A gate bids for control of its region from the moment it is opened until
/// it is released. Call [`Gate::authorize`] before every mutation of the
/// resource; the answer can change whenever another gate on the same region
/// opens, releases or changes authority.
///
/// Dropping a gate releases it.
pub struct Gate<R: Resource> {
    shared: Arc<Shared<R>>,
    region: Arc<Region<R>>,
    subject: Subject,
    position: u64,
    authority: AtomicU8,
    released: AtomicBool,
}

impl<R: Resource> Gate<R> {
    pub(crate) fn new(
        shared: Arc<Shared<R>>,
        region: Arc<Region<R>>,
        subject: Subject,
        authority: Authority,
        position: u64,
    ) -> Self {
        Self {
            shared,
            region,
            subject,
            position,
            authority: AtomicU8::new(authority.as_u8()),
            released: AtomicBool::new(false),
        }
    }

    /// Returns the gate's subject.
    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Returns the gate's current authority.
    #[must_use]
    pub fn authority(&self) -> Authority {
        Authority::new(self.authority.load(Ordering::SeqCst))
    }

    /// Returns the gate's arrival order within its region.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the time range currently covered by the gate's region.
    #[must_use]
    pub fn time_range(&self) -> TimeRange {
        self.region.time_range()
    }

    /// Returns true once the gate has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Checks whether the gate may currently write to the resource.
    ///
    /// Returns a snapshot of the resource on success.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Unauthorized`] naming the current holder, or
    /// stating that the region was already released.
    pub fn authorize(&self) -> ControlResult<R> {
        self.region
            .authorize(self.position, &self.subject)
            .inspect_err(|_| self.shared.stats.record_unauthorized())
    }

    /// Returns a snapshot of the resource without checking authorization.
    #[must_use]
    pub fn peek_resource(&self) -> R {
        self.region.peek_resource()
    }

    /// Removes the gate from its region.
    ///
    /// If the gate was leading, control passes to the strongest remaining
    /// gate and the resource is returned alongside the transfer. Releasing a
    /// gate a second time does nothing.
    pub fn release(&self) -> (Option<R>, Transfer) {
        if self.released.swap(true, Ordering::SeqCst) {
            return (None, Transfer::none());
        }
        let released = self
            .region
            .release(self.position, |transfer| self.shared.publish(transfer));
        self.shared.stats.record_release();
        debug!(subject = %self.subject, position = self.position, "released control gate");
        if released.needs_removal {
            // Region lock is no longer held here.
            self.shared.stats.record_full_release();
            self.shared.remove(&self.region);
        }
        (released.resource, released.transfer)
    }

    /// Changes the gate's authority and re-evaluates who leads the region.
    pub fn set_authority(&self, authority: Authority) -> Transfer {
        if self.is_released() {
            return Transfer::none();
        }
        self.region.update(self.position, authority, |transfer| {
            self.authority.store(authority.as_u8(), Ordering::SeqCst);
            self.shared.publish(transfer);
        })
    }
}

impl<R: Resource> Drop for Gate<R> {
    fn drop(&mut self) {
        if !*self.released.get_mut() {
            self.release();
        }
    }
}

impl<R: Resource> fmt::Debug for Gate<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("subject", &self.subject)
            .field("authority", &self.authority())
            .field("position", &self.position)
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}
