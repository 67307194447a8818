//! Control regions and the arbitration algorithm.
//!
//! A region owns one span of a resource's time axis together with the gates
//! bidding for it. Exactly one gate leads a region at any moment; the leader is
//! always the gate with the highest authority, ties going to the gate that
//! opened first.

use crate::config::Concurrency;
use crate::control::state::{Authority, Resource, State, Subject, Transfer};
use crate::error::{ControlError, ControlResult};
use crate::types::TimeRange;
use parking_lot::RwLock;

/// The parameters of a gate being opened on a region.
#[derive(Debug, Clone)]
pub(crate) struct OpenRequest {
    pub time_range: TimeRange,
    pub authority: Authority,
    pub subject: Subject,
    pub err_if_controlled: bool,
    pub err_on_unauthorized_open: bool,
}

/// Outcome of removing a gate from a region.
#[derive(Debug)]
pub(crate) struct Released<R> {
    /// The region's resource, present only if the gate was the leader.
    pub resource: Option<R>,
    pub transfer: Transfer,
    /// The region lost its last gate and must leave the directory.
    pub needs_removal: bool,
}

impl<R> Released<R> {
    fn nothing() -> Self {
        Self {
            resource: None,
            transfer: Transfer::none(),
            needs_removal: false,
        }
    }
}

/// A gate's bid, as tracked by its region.
#[derive(Debug, Clone)]
struct Bid {
    position: u64,
    subject: Subject,
    authority: Authority,
}

impl Bid {
    /// Returns true if `self` should lead instead of `other`.
    fn supersedes(&self, other: &Bid) -> bool {
        self.authority > other.authority
            || (self.authority == other.authority && self.position < other.position)
    }
}

/// Returns the bid with the highest precedence.
fn strongest<'a>(bids: impl Iterator<Item = &'a Bid>) -> Option<&'a Bid> {
    bids.fold(None, |best: Option<&Bid>, bid| match best {
        Some(b) if !bid.supersedes(b) => Some(b),
        _ => Some(bid),
    })
}

#[derive(Debug)]
struct RegionState<R> {
    time_range: TimeRange,
    resource: R,
    bids: Vec<Bid>,
    /// Position of the leading gate.
    current: Option<u64>,
    position_counter: u64,
    /// Set once the last gate leaves. A closed region never reopens.
    closed: bool,
}

impl<R: Resource> RegionState<R> {
    fn index_of(&self, position: u64) -> Option<usize> {
        self.bids.iter().position(|b| b.position == position)
    }

    fn leader(&self) -> Option<&Bid> {
        let current = self.current?;
        self.bids.iter().find(|b| b.position == current)
    }

    fn state_of(&self, bid: &Bid) -> State {
        State {
            subject: bid.subject.clone(),
            resource: self.resource.channel_key(),
            authority: bid.authority,
        }
    }

    fn open(&mut self, concurrency: Concurrency, req: &OpenRequest) -> ControlResult<(u64, Transfer)> {
        let leader = self.leader();
        if req.err_if_controlled {
            if let Some(l) = leader {
                return Err(ControlError::unauthorized(
                    format!(
                        "{} overlaps with a controlled region {} that is already being controlled by {}",
                        req.time_range, self.time_range, l.subject
                    ),
                    Some(l.subject.clone()),
                ));
            }
        }

        let bid = Bid {
            position: self.position_counter,
            subject: req.subject.clone(),
            authority: req.authority,
        };
        if self.bids.iter().any(|b| b.subject.key == bid.subject.key) {
            return Err(ControlError::validation(
                "subject",
                format!(
                    "control subject {} is already registered in the region",
                    bid.subject
                ),
            ));
        }

        let takes_control = leader.map_or(true, |l| bid.authority > l.authority);
        if !takes_control && req.err_on_unauthorized_open {
            if let Some(l) = leader {
                let may_share = concurrency == Concurrency::Shared && bid.authority == l.authority;
                if !may_share {
                    return Err(ControlError::unauthorized(
                        format!(
                            "{} cannot open with authority {} on {}: controlled by {} with authority {}",
                            bid.subject, bid.authority, self.time_range, l.subject, l.authority
                        ),
                        Some(l.subject.clone()),
                    ));
                }
            }
        }

        let mut transfer = Transfer::none();
        if takes_control {
            transfer.from = leader.map(|l| self.state_of(l));
            transfer.to = Some(self.state_of(&bid));
            self.current = Some(bid.position);
        }
        self.time_range = self.time_range.union(req.time_range);
        let position = bid.position;
        self.bids.push(bid);
        self.position_counter += 1;
        Ok((position, transfer))
    }

    fn release(&mut self, position: u64) -> Released<R> {
        let Some(idx) = self.index_of(position) else {
            return Released::nothing();
        };
        let bid = self.bids.remove(idx);
        if self.current != Some(position) {
            return Released::nothing();
        }

        self.current = None;
        let mut transfer = Transfer {
            from: Some(self.state_of(&bid)),
            to: None,
        };
        if let Some(next) = strongest(self.bids.iter()) {
            let next_position = next.position;
            transfer.to = Some(self.state_of(next));
            self.current = Some(next_position);
        }
        let needs_removal = self.bids.is_empty();
        if needs_removal {
            self.closed = true;
        }
        Released {
            resource: Some(self.resource.clone()),
            transfer,
            needs_removal,
        }
    }

    fn update(&mut self, position: u64, authority: Authority) -> Transfer {
        let Some(idx) = self.index_of(position) else {
            return Transfer::none();
        };
        if self.bids[idx].authority == authority {
            return Transfer::none();
        }
        let before = self.leader().map(|l| self.state_of(l));
        self.bids[idx].authority = authority;
        let updated = &self.bids[idx];

        if self.current == Some(position) {
            // The leader keeps control unless another gate now outranks it.
            let next = strongest(
                self.bids
                    .iter()
                    .filter(|b| b.position != position && b.supersedes(updated)),
            )
            .unwrap_or(updated);
            let next_position = next.position;
            let to = self.state_of(next);
            self.current = Some(next_position);
            return Transfer { from: before, to: Some(to) };
        }

        match self.leader() {
            Some(l) if !updated.supersedes(l) => Transfer::none(),
            _ => {
                let to = self.state_of(updated);
                self.current = Some(position);
                Transfer { from: before, to: Some(to) }
            }
        }
    }

    fn authorize(&self, concurrency: Concurrency, position: u64, subject: &Subject) -> ControlResult<R> {
        let Some(leader) = self.leader() else {
            return Err(ControlError::unauthorized(
                format!("region {} was already released", self.time_range),
                None,
            ));
        };
        let Some(bid) = self.bids.iter().find(|b| b.position == position) else {
            return Err(ControlError::unauthorized(
                format!("{} has already released its gate on {}", subject, self.time_range),
                Some(leader.subject.clone()),
            ));
        };
        let authorized = match concurrency {
            Concurrency::Exclusive => leader.position == bid.position,
            Concurrency::Shared => bid.authority >= leader.authority,
        };
        if !authorized {
            return Err(ControlError::unauthorized(
                format!(
                    "{} is not authorized to write to {}: controlled by {}",
                    bid.subject, self.time_range, leader.subject
                ),
                Some(leader.subject.clone()),
            ));
        }
        Ok(self.resource.clone())
    }
}

/// One non-overlapping span of a resource's time axis under arbitration.
#[derive(Debug)]
pub(crate) struct Region<R> {
    concurrency: Concurrency,
    state: RwLock<RegionState<R>>,
}

impl<R: Resource> Region<R> {
    /// Creates a region with no gates.
    pub fn new(concurrency: Concurrency, time_range: TimeRange, resource: R) -> Self {
        Self {
            concurrency,
            state: RwLock::new(RegionState {
                time_range,
                resource,
                bids: Vec::new(),
                current: None,
                position_counter: 0,
                closed: false,
            }),
        }
    }

    /// Returns the region's current time range.
    pub fn time_range(&self) -> TimeRange {
        self.state.read().time_range
    }

    /// Returns true once the region has been fully released.
    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// Adds a bid for control. Returns the new gate's position.
    ///
    /// Fails without mutating the region if it has already been closed.
    /// `commit` runs under the region lock once the bid is in place, so
    /// transfers it publishes are ordered with every other change here.
    pub fn open(
        &self,
        req: &OpenRequest,
        commit: impl FnOnce(&Transfer),
    ) -> ControlResult<(u64, Transfer)> {
        let mut state = self.state.write();
        if state.closed {
            return Err(ControlError::unauthorized(
                format!("region {} was already released", state.time_range),
                None,
            ));
        }
        let (position, transfer) = state.open(self.concurrency, req)?;
        commit(&transfer);
        Ok((position, transfer))
    }

    /// Removes a bid and re-elects a leader if it led.
    ///
    /// `commit` runs under the region lock after the bid is removed.
    pub fn release(&self, position: u64, commit: impl FnOnce(&Transfer)) -> Released<R> {
        let mut state = self.state.write();
        let released = state.release(position);
        commit(&released.transfer);
        released
    }

    /// Changes a bid's authority and re-elects a leader if needed.
    ///
    /// `commit` runs under the region lock if the bid is still present.
    pub fn update(
        &self,
        position: u64,
        authority: Authority,
        commit: impl FnOnce(&Transfer),
    ) -> Transfer {
        let mut state = self.state.write();
        if state.index_of(position).is_none() {
            return Transfer::none();
        }
        let transfer = state.update(position, authority);
        commit(&transfer);
        transfer
    }

    /// Returns the resource if the bid at `position` may write to it.
    pub fn authorize(&self, position: u64, subject: &Subject) -> ControlResult<R> {
        self.state.read().authorize(self.concurrency, position, subject)
    }

    /// Returns the resource with no authorization check.
    pub fn peek_resource(&self) -> R {
        self.state.read().resource.clone()
    }

    /// Returns the state of the leading bid.
    pub fn leading_state(&self) -> Option<State> {
        let state = self.state.read();
        state.leader().map(|l| state.state_of(l))
    }
}
