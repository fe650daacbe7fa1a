//! # roomhub-domain
//!
//! Pure domain model for roomhub, the room control core that talks to a
//! building-automation controller.
//!
//! ## Responsibilities
//! - Foundational types: room and device identifiers, sections, errors, timestamps
//! - Define **Devices** (dimmers, thermostats, switches, momentary actions) and
//!   their state machines
//! - Define **Commands** produced by user intents
//! - Encode and decode the controller **wire protocol**
//! - Define the device configuration schema and built-in **layouts**
//! - Define **Events** emitted by the application layer
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod section;
pub mod time;

pub mod command;
pub mod device;
pub mod event;
pub mod layout;
pub mod protocol;
