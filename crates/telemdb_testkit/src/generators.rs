//! Property-based test generators using proptest.
//!
//! Provides strategies for time ranges, authorities and scripts of gate
//! actions, plus a reference model of who should lead a region.

use proptest::prelude::*;
use telemdb_core::{Authority, Subject, TimeRange, TimeStamp};

/// Strategy for generating valid, non-zero time ranges.
pub fn time_range_strategy() -> impl Strategy<Value = TimeRange> {
    (0i64..10_000, 1i64..1_000)
        .prop_map(|(start, len)| TimeStamp::new(start).range(TimeStamp::new(start + len)))
}

/// Strategy for generating subjects with non-empty keys.
pub fn subject_strategy() -> impl Strategy<Value = Subject> {
    (
        prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex"),
        prop::string::string_regex("[A-Za-z ]{0,20}").expect("Invalid regex"),
    )
        .prop_map(|(key, name)| Subject::new(key, name))
}

/// Strategy for generating authorities, biased toward collisions.
pub fn authority_strategy() -> impl Strategy<Value = Authority> {
    prop_oneof![
        3 => (0u8..4).prop_map(Authority::new),
        1 => any::<u8>().prop_map(Authority::new),
        1 => Just(Authority::ABSOLUTE),
    ]
}

/// One step of a gate script run against a single region.
#[derive(Debug, Clone)]
pub enum GateAction {
    /// Open a new gate.
    Open {
        /// Authority of the new gate.
        authority: Authority,
    },
    /// Release a live gate.
    Release {
        /// Index into the live gates, modulo their count.
        index: usize,
    },
    /// Change the authority of a live gate.
    SetAuthority {
        /// Index into the live gates, modulo their count.
        index: usize,
        /// The new authority.
        authority: Authority,
    },
}

/// Strategy for a single gate action.
pub fn gate_action_strategy() -> impl Strategy<Value = GateAction> {
    prop_oneof![
        3 => authority_strategy().prop_map(|authority| GateAction::Open { authority }),
        2 => any::<usize>().prop_map(|index| GateAction::Release { index }),
        2 => (any::<usize>(), authority_strategy())
            .prop_map(|(index, authority)| GateAction::SetAuthority { index, authority }),
    ]
}

/// Strategy for a script of gate actions.
pub fn gate_script_strategy(max_len: usize) -> impl Strategy<Value = Vec<GateAction>> {
    prop::collection::vec(gate_action_strategy(), 1..max_len)
}

/// Reference model of a region's bids.
///
/// Tracks `(id, authority)` pairs in arrival order and answers who should
/// lead, so tests can compare it against a real controller.
#[derive(Debug, Clone, Default)]
pub struct LeaderModel {
    bids: Vec<(usize, Authority)>,
}

impl LeaderModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a gate arriving.
    pub fn open(&mut self, id: usize, authority: Authority) {
        self.bids.push((id, authority));
    }

    /// Records a gate leaving.
    pub fn release(&mut self, id: usize) {
        self.bids.retain(|(b, _)| *b != id);
    }

    /// Records a gate changing authority.
    pub fn set_authority(&mut self, id: usize, authority: Authority) {
        if let Some(bid) = self.bids.iter_mut().find(|(b, _)| *b == id) {
            bid.1 = authority;
        }
    }

    /// Returns the highest authority, ties going to the earliest arrival.
    pub fn strongest(&self) -> Option<usize> {
        let mut best: Option<(usize, Authority)> = None;
        for &(id, authority) in &self.bids {
            match best {
                Some((_, a)) if authority <= a => {}
                _ => best = Some((id, authority)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Returns the ids of live gates in arrival order.
    pub fn live(&self) -> Vec<usize> {
        self.bids.iter().map(|(id, _)| *id).collect()
    }

    /// Returns true if no gates are live.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }
}
