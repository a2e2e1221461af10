// crates/jobs/src/reconcile.rs
//! Merging backend status payloads into the displayed job.

use std::sync::Arc;

use gource_studio_types::{
    CompletionSummary, ItemRecord, JobId, JobKind, JobSnapshot, JobStatus, RunnerPhase,
    StatusPayload,
};

use crate::error::{BackendError, JobError};
use crate::identity::JobIdentity;
use crate::state::{JobEvent, JobState, TrackedJob};

const UNKNOWN_ERROR: &str = "Unknown error";

/// Side effects run when a tracked job ends.
///
/// Each method runs at most once per job, after the state lock is released.
pub trait JobHooks: Send + Sync {
    fn on_completed(&self, _snapshot: &JobSnapshot) {}

    fn on_failed(&self, _snapshot: &JobSnapshot, _error: &str) {}

    /// Starting or tracking the job failed on our side.
    fn on_error(&self, _error: &JobError) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl JobHooks for NoopHooks {}

/// Outcome of applying one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The payload belonged to a job that is no longer current; nothing changed.
    Stale,
    /// Applied; the job is still running.
    Continue,
    Completed,
    Failed,
}

impl Reconciled {
    pub fn should_continue(self) -> bool {
        self == Reconciled::Continue
    }
}

enum Outcome {
    Completed,
    Failed(String),
}

/// Applies payloads for the job currently held by a [`JobIdentity`].
pub struct StatusReconciler {
    state: Arc<JobState>,
    identity: Arc<JobIdentity>,
    hooks: Arc<dyn JobHooks>,
}

impl StatusReconciler {
    pub fn new(state: Arc<JobState>, identity: Arc<JobIdentity>, hooks: Arc<dyn JobHooks>) -> Self {
        Self {
            state,
            identity,
            hooks,
        }
    }

    /// Merge `payload` into the job if `job_id` is still the current one.
    ///
    /// A terminal payload clears the identity; that clear is what makes a
    /// repeated terminal payload a no-op.
    pub fn apply(&self, job_id: &JobId, payload: &StatusPayload) -> Reconciled {
        let (event, outcome) = {
            let mut tracked = self.state.lock();
            if !self.identity.is_current(job_id) {
                tracing::debug!(%job_id, status = %payload.status, "Discarding stale status payload");
                return Reconciled::Stale;
            }

            merge(&mut tracked, payload);
            tracing::debug!(
                %job_id,
                kind = %tracked.job.kind,
                status = %tracked.job.status,
                progress = tracked.job.progress,
                "Status reconciled"
            );

            if !payload.status.is_terminal() {
                let snapshot = tracked.snapshot();
                drop(tracked);
                self.state.emit(JobEvent::Progress(snapshot));
                return Reconciled::Continue;
            }
            if !self.identity.clear_if(job_id) {
                return Reconciled::Stale;
            }
            let outcome = finish(&mut tracked, payload);
            let snapshot = tracked.snapshot();
            (outcome_event(snapshot, &outcome), outcome)
        };
        self.run_terminal_side_effects(Some(job_id), event, outcome)
    }

    /// Handle a start request that completed without a job id.
    ///
    /// `still_current` is checked under the state lock; when it returns
    /// `false` the payload is discarded as stale.
    pub fn apply_immediate(
        &self,
        payload: &StatusPayload,
        still_current: impl FnOnce() -> bool,
    ) -> Reconciled {
        let (event, outcome) = {
            let mut tracked = self.state.lock();
            if !still_current() {
                return Reconciled::Stale;
            }
            tracked.estimator = None;
            merge(&mut tracked, payload);
            if payload.status != JobStatus::Failed {
                tracked.job.advance_status(JobStatus::Completed);
            }
            let outcome = finish(&mut tracked, payload);
            let snapshot = tracked.snapshot();
            (outcome_event(snapshot, &outcome), outcome)
        };
        self.run_terminal_side_effects(None, event, outcome)
    }

    /// Record that tracking `job_id` broke down. The caller has already
    /// reset the identity.
    pub fn lost(&self, job_id: &JobId, error: BackendError) -> JobError {
        let error = JobError::Poll {
            job_id: job_id.clone(),
            source: error,
        };
        let event = {
            let mut tracked = self.state.lock();
            if tracked.job.id.as_ref() != Some(job_id) || !tracked.phase.is_busy() {
                return error;
            }
            tracked.phase = RunnerPhase::Idle;
            tracked.estimator = None;
            tracked.job.error = Some(error.to_string());
            JobEvent::Error {
                snapshot: tracked.snapshot(),
                error: error.clone(),
            }
        };
        self.state.emit(event);
        self.hooks.on_error(&error);
        error
    }

    fn run_terminal_side_effects(
        &self,
        job_id: Option<&JobId>,
        event: JobEvent,
        outcome: Outcome,
    ) -> Reconciled {
        let snapshot = event.snapshot().clone();
        let kind = snapshot.job.kind;
        self.state.emit(event);
        match outcome {
            Outcome::Completed => {
                let message = &snapshot.job.message;
                match job_id {
                    Some(job_id) => tracing::info!(%job_id, %kind, %message, "Job completed"),
                    None => tracing::info!(%kind, %message, "Job completed within its start request"),
                }
                self.hooks.on_completed(&snapshot);
                Reconciled::Completed
            }
            Outcome::Failed(error) => {
                match job_id {
                    Some(job_id) => tracing::info!(%job_id, %kind, %error, "Job failed"),
                    None => tracing::info!(%kind, %error, "Job failed within its start request"),
                }
                self.hooks.on_failed(&snapshot, &error);
                Reconciled::Failed
            }
        }
    }
}

/// Copy the payload's fields onto the job. Authoritative progress replaces
/// the estimate for good.
fn merge(tracked: &mut TrackedJob, payload: &StatusPayload) {
    let job = &mut tracked.job;

    if !payload.status_recognized() {
        tracing::warn!(
            raw_status = payload.raw_status.as_deref().unwrap_or_default(),
            "Unrecognized job status, treating as active"
        );
    }
    if !job.advance_status(payload.status) && payload.status != job.status {
        tracing::debug!(
            current = %job.status,
            reported = %payload.status,
            "Ignoring backward status transition"
        );
    }

    if let Some(progress) = payload.progress {
        job.set_progress(progress);
        if tracked.estimator.take().is_some() {
            tracing::debug!(progress, "Authoritative progress received, estimator retired");
        }
    }
    if let Some(message) = &payload.message {
        job.message = message.clone();
    }
    if let Some(step) = payload.step {
        job.reach_step(step);
    }
    if let Some(items) = &payload.items {
        merge_items(&mut job.items, items);
    }
    if let Some(error) = &payload.error {
        job.error = Some(error.clone());
    }
    if let Some(processing) = payload.processing_assets {
        tracked.post_processing = processing;
    }
}

/// Merge item records by name. An item that already ended keeps its status.
fn merge_items(current: &mut Vec<ItemRecord>, incoming: &[ItemRecord]) {
    for item in incoming {
        match current.iter_mut().find(|c| c.name == item.name) {
            Some(existing) if existing.status.is_terminal() => {
                if existing.status != item.status {
                    tracing::debug!(
                        item = %item.name,
                        current = ?existing.status,
                        reported = ?item.status,
                        "Ignoring status change of finished item"
                    );
                }
            }
            Some(existing) => *existing = item.clone(),
            None => current.push(item.clone()),
        }
    }
}

fn finish(tracked: &mut TrackedJob, payload: &StatusPayload) -> Outcome {
    tracked.estimator = None;
    let job = &mut tracked.job;

    if job.status == JobStatus::Failed {
        let error = payload
            .error
            .clone()
            .or_else(|| payload.message.clone())
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        job.set_progress(0.0);
        job.error = Some(error.clone());
        job.message = error.clone();
        tracked.phase = RunnerPhase::Failed;
        return Outcome::Failed(error);
    }

    job.set_progress(100.0);
    job.complete_all_steps();
    job.error = None;
    match job.kind {
        JobKind::Clone => job.message = "Repository cloned successfully.".to_string(),
        JobKind::Render => job.message = "Render completed successfully".to_string(),
        JobKind::BulkImport => {
            let summary = bulk_summary(&job.items, payload);
            job.message = summary.message();
            tracked.summary = Some(summary);
        }
    }
    tracked.phase = RunnerPhase::Completed;
    Outcome::Completed
}

/// The backend's `repositories` list only names imported repositories, so
/// its counters win whenever they are present.
fn bulk_summary(items: &[ItemRecord], payload: &StatusPayload) -> CompletionSummary {
    let mut summary = match payload.total_items {
        Some(total) => CompletionSummary::from_counts(
            total,
            payload.processed_items.unwrap_or(total),
            payload.failed_items.unwrap_or(0),
        ),
        _ => CompletionSummary::from_items(items),
    };
    summary.created_projects = payload.created_projects.unwrap_or(0);
    summary
}

fn outcome_event(snapshot: JobSnapshot, outcome: &Outcome) -> JobEvent {
    match outcome {
        Outcome::Completed => JobEvent::Completed(snapshot),
        Outcome::Failed(error) => JobEvent::Failed {
            snapshot,
            error: error.clone(),
        },
    }
}
