//! # telemdb Core
//!
//! Core primitives for the telemdb time-series storage engine.
//!
//! This crate provides:
//! - Time and channel types shared by every layer of the engine
//! - Region-based write control: arbitration of which writer may mutate a
//!   channel's time range at any instant
//! - A control update feed and control statistics
//!
//! ## Example
//!
//! ```rust
//! use telemdb_core::{Authority, ChannelKey, Config, Controller, GateConfig, Resource, Subject, TimeRange};
//!
//! #[derive(Clone)]
//! struct Channel(ChannelKey);
//!
//! impl Resource for Channel {
//!     fn channel_key(&self) -> ChannelKey {
//!         self.0
//!     }
//! }
//!
//! let controller = Controller::new(Config::default());
//! let (gate, transfer) = controller
//!     .open_gate(
//!         GateConfig::new(Subject::new("w1", "writer"), TimeRange::from_seconds(0, 100), Authority::ABSOLUTE)
//!             .open_resource(|| Ok(Channel(ChannelKey::new(1)))),
//!     )
//!     .unwrap();
//! assert!(transfer.is_acquire());
//! assert!(gate.authorize().is_ok());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod control;
mod error;
mod types;

pub use config::{Concurrency, Config};
pub use control::{
    Authority, ControlFeed, ControlStats, ControlStatsSnapshot, ControlUpdate, Controller, Gate,
    GateConfig, OpenResourceFn, Resource, State, Subject, Transfer,
};
pub use error::{ControlError, ControlResult};
pub use types::{ChannelKey, TimeRange, TimeStamp};
