// crates/types/src/lib.rs
//! Shared job types for the gource-studio dashboard.
//!
//! Everything the tracking engine exchanges with the backend (start requests,
//! status payloads) and with the UI (snapshots, completion summaries) lives
//! here so the dashboard frontend can consume the same shapes via ts-rs.

pub mod job;
pub mod payload;
pub mod request;
pub mod snapshot;

pub use job::*;
pub use payload::*;
pub use request::*;
pub use snapshot::*;
