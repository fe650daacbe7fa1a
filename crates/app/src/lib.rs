//! # roomhub-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `Transport`: publish/subscribe channel to the controller
//!   - `EventPublisher`: fan-out of delivery and connection events
//! - Own the **device registry**, the single writer of device state
//! - Deliver commands through the **command queue** with bounded retries
//! - Apply controller reports through the **inbound router**
//! - Expose the user-facing **control service** (get, list, apply intent)
//! - Provide in-process infrastructure (event bus, message history, loops)
//!
//! ## Dependency rule
//! Depends on `roomhub-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod command_queue;
pub mod event_bus;
pub mod history;
pub mod ports;
pub mod registry;
pub mod router;
pub mod runtime;
pub mod services;
