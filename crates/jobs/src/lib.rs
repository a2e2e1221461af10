// crates/jobs/src/lib.rs
//! Client-side tracking of long-running backend jobs.
//!
//! A [`JobRunner`] starts a job through a [`JobBackend`], polls its status on
//! a fixed schedule and reconciles every response into a [`JobSnapshot`]
//! that UIs read or subscribe to. Until the backend reports real progress,
//! an [`OptimisticEstimator`] fills the bar.
//!
//! [`JobSnapshot`]: gource_studio_types::JobSnapshot

pub mod backend;
pub mod config;
pub mod error;
pub mod estimator;
pub mod identity;
pub mod poll;
pub mod reconcile;
pub mod runner;
pub mod state;

pub use backend::{JobBackend, StartResponse};
pub use config::{ConfigError, EstimatorConfig, KindConfig, PollSchedule, TrackingConfig};
pub use error::{BackendError, JobError};
pub use estimator::OptimisticEstimator;
pub use identity::JobIdentity;
pub use poll::{Flow, PollLoop, Probe};
pub use reconcile::{JobHooks, NoopHooks, Reconciled, StatusReconciler};
pub use runner::JobRunner;
pub use state::{JobEvent, JobState};
