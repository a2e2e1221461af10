// crates/client/src/lib.rs
//! HTTP client for the gource-studio dashboard backend.
//!
//! [`StudioApi`] wraps the job start and status endpoints and implements
//! [`gource_studio_jobs::JobBackend`], so a runner can drive real jobs.

pub mod api;
pub mod config;
pub mod error;

pub use api::StudioApi;
pub use config::ClientConfig;
pub use error::ClientError;
