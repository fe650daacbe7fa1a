//! # roomhub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** for room control clients
//!   (`/api/devices`, `/api/queue`, `/api/messages`)
//! - Stream device changes and delivery events over **SSE** so a renderer can
//!   observe the registry without polling
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map application errors into HTTP status codes
//!
//! Rendering is left to clients; this crate serves data only.
//!
//! ## Dependency rule
//! Depends on `roomhub-app` (for port traits and services) and `roomhub-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
