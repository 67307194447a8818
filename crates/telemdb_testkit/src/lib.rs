//! # telemdb testkit
//!
//! Test utilities for telemdb.
//!
//! This crate provides:
//! - Fixtures: a test resource, counting resource callbacks, log setup
//! - Property-based generators for time ranges, authorities and gate scripts
//! - Threaded stress runs against a shared controller
//!
//! ## Usage
//!
//! ```rust,ignore
//! use telemdb_testkit::prelude::*;
//!
//! #[test]
//! fn writer_takes_control() {
//!     let controller = exclusive_controller();
//!     let (gate, _) = controller.open_gate(writer("w1", 10)).unwrap();
//!     assert!(gate.authorize().is_ok());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
