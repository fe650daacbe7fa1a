//! Application services: use-case implementations.
//!
//! Services take their collaborators as generic parameters (constructor
//! injection), so this layer never names a concrete adapter.

pub mod control_service;

pub use control_service::{AppliedIntent, ControlService};
