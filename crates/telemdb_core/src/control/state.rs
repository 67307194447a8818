//! Control holders and changes of control.

use crate::types::ChannelKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Precedence of a claim to control. Higher values win.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Authority(pub u8);

impl Authority {
    /// The maximum authority. A gate holding it can never be preempted.
    pub const ABSOLUTE: Self = Self(u8::MAX);

    /// Creates a new authority.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the raw authority value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns an authority `by` steps lower, saturating at zero.
    #[must_use]
    pub const fn lower(self, by: u8) -> Self {
        Self(self.0.saturating_sub(by))
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a party bidding for control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Unique key. No two live gates in a region share one.
    pub key: String,
    /// Human readable name, for diagnostics only.
    pub name: String,
}

impl Subject {
    /// Creates a new subject.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }

    /// Creates a subject whose name is empty.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self::new(key, "")
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]<{}>", self.key, self.name)
    }
}

/// A value placed under control.
///
/// The controller never looks inside a resource; it only needs to know which
/// channel the resource belongs to so transfers can be attributed.
pub trait Resource: Clone + Send + Sync + 'static {
    /// Returns the channel this resource writes to.
    fn channel_key(&self) -> ChannelKey;
}

/// Snapshot of one gate's claim on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// The subject holding the claim.
    pub subject: Subject,
    /// The channel of the controlled resource.
    pub resource: ChannelKey,
    /// The authority of the claim.
    pub authority: Authority,
}

/// A change in which gate leads a region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// The leader before the change, if any.
    pub from: Option<State>,
    /// The leader after the change, if any.
    pub to: Option<State>,
}

impl Transfer {
    /// An empty transfer: leadership did not change.
    #[must_use]
    pub const fn none() -> Self {
        Self { from: None, to: None }
    }

    /// Returns true if leadership changed in any way.
    #[must_use]
    pub fn occurred(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// Returns true if an uncontrolled region gained a leader.
    #[must_use]
    pub fn is_acquire(&self) -> bool {
        self.from.is_none() && self.to.is_some()
    }

    /// Returns true if the region no longer has a leader.
    #[must_use]
    pub fn is_release(&self) -> bool {
        self.from.is_some() && self.to.is_none()
    }

    /// Returns true if control passed from one holder to another.
    #[must_use]
    pub fn is_transfer(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn side(s: &Option<State>) -> String {
            s.as_ref()
                .map_or_else(|| "none".to_string(), |s| format!("{}@{}", s.subject, s.authority))
        }
        write!(f, "{} -> {}", side(&self.from), side(&self.to))
    }
}
