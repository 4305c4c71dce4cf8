//! Error types for the session runtime.
//!
//! Typed per-module enums live next to their producers; [`domain`]
//! aggregates them, and [`operational`] adds `anyhow` context propagation
//! for host-facing operations.

pub mod domain;
pub mod operational;

pub use {domain::SessionError, operational::ResultExt};
