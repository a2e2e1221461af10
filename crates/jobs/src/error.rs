// crates/jobs/src/error.rs
use gource_studio_types::{JobId, JobKind};
use thiserror::Error;

/// Errors a [`crate::JobBackend`] reports for a single request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The clone URL names a GitHub account rather than a repository.
    #[error("URL names a GitHub account; use a bulk import of {github_url}")]
    SuggestBulkImport { github_url: String },
}

/// Errors surfaced by a [`crate::JobRunner`] to its caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    /// The start request failed before a job id was obtained.
    #[error("failed to start {kind} job: {source}")]
    Start {
        kind: JobKind,
        #[source]
        source: BackendError,
    },

    /// A status request failed; tracking of that job has stopped.
    #[error("lost track of job {job_id}: {source}")]
    Poll {
        job_id: JobId,
        #[source]
        source: BackendError,
    },

    /// A newer start began while this one was waiting on the backend.
    #[error("start superseded by a newer {0} job")]
    Superseded(JobKind),

    /// The runner was asked to track a job of a different kind.
    #[error("runner tracks {expected} jobs, got a {actual} request")]
    WrongKind { expected: JobKind, actual: JobKind },
}

impl JobError {
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            JobError::Start { source, .. } | JobError::Poll { source, .. } => Some(source),
            JobError::Superseded(_) | JobError::WrongKind { .. } => None,
        }
    }
}
