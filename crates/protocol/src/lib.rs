//! Wire types for the seatwatch acquisition pipeline.
//!
//! This crate contains the serde-serializable shapes exchanged between the
//! monitoring core, the settings file, and the control-plane HTTP surface.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization and small
//!   accessors
//! * camelCase on the wire, matching the settings file and the control plane
//! * Stable: Changes only when an external consumer needs a new field
//!
//! The behavior that produces and consumes these values lives in
//! `seatwatch-core`.

pub mod availability;
pub mod control;
pub mod matches;
pub mod purchase;
pub mod status;

pub use availability::*;
pub use control::*;
pub use matches::*;
pub use purchase::*;
pub use status::*;
