// crates/jobs/src/backend.rs
//! The seam between the engine and whatever actually runs the jobs.

use async_trait::async_trait;
use gource_studio_types::{JobId, JobKind, StartRequest, StatusPayload};

use crate::error::BackendError;

/// What a start request produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StartResponse {
    /// The backend accepted the job and will report on it under this id.
    Accepted(JobId),
    /// The work finished within the start request itself; there is nothing
    /// to poll.
    Finished(StatusPayload),
}

/// Start and status endpoints for long-running jobs.
///
/// Implementations must be cheap to share: a runner holds one behind an
/// `Arc` and calls it from its poll task.
#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn start(&self, request: &StartRequest) -> Result<StartResponse, BackendError>;

    async fn status(&self, kind: JobKind, job_id: &JobId) -> Result<StatusPayload, BackendError>;
}
