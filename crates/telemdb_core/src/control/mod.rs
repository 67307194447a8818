//! Region-based write control.
//!
//! Writers on a channel compete for the right to mutate a span of its time
//! axis. The [`Controller`] splits the axis into regions and, within each
//! region, arbitrates between [`Gate`]s using:
//! - **Authority**: the higher value leads
//! - **Position**: among equal authorities, the earliest gate leads
//! - **Concurrency**: exclusive regions authorize only the leader, shared
//!   regions authorize every gate tied with it
//!
//! Every change of leader is described by a [`Transfer`].

mod controller;
mod feed;
mod gate;
mod region;
mod state;
mod stats;

pub use controller::Controller;
pub use feed::{ControlFeed, ControlUpdate};
pub use gate::{Gate, GateConfig, OpenResourceFn};
pub use state::{Authority, Resource, State, Subject, Transfer};
pub use stats::{ControlStats, ControlStatsSnapshot};
