// crates/jobs/src/state.rs
//! Displayed state for a single job slot, plus its event stream.

use std::sync::{Mutex, MutexGuard};

use gource_studio_types::{CompletionSummary, Job, JobKind, JobSnapshot, RunnerPhase};
use tokio::sync::broadcast;

use crate::error::JobError;
use crate::estimator::OptimisticEstimator;

/// State changes a runner publishes to its subscribers.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// A start request is in flight.
    Starting(JobSnapshot),
    /// The backend accepted the job; polling has begun.
    Tracking(JobSnapshot),
    /// A status payload or an estimator tick changed the job.
    Progress(JobSnapshot),
    Completed(JobSnapshot),
    /// The backend reported the job as failed.
    Failed { snapshot: JobSnapshot, error: String },
    /// Starting or tracking the job broke down on our side.
    Error { snapshot: JobSnapshot, error: JobError },
    /// Tracking was cancelled or torn down.
    Stopped(JobSnapshot),
}

impl JobEvent {
    pub fn snapshot(&self) -> &JobSnapshot {
        match self {
            JobEvent::Starting(snapshot)
            | JobEvent::Tracking(snapshot)
            | JobEvent::Progress(snapshot)
            | JobEvent::Completed(snapshot)
            | JobEvent::Stopped(snapshot)
            | JobEvent::Failed { snapshot, .. }
            | JobEvent::Error { snapshot, .. } => snapshot,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Completed(_) | JobEvent::Failed { .. })
    }
}

/// Everything guarded by the state lock.
#[derive(Debug)]
pub struct TrackedJob {
    pub phase: RunnerPhase,
    pub job: Job,
    /// Present until the first authoritative progress value arrives.
    pub estimator: Option<OptimisticEstimator>,
    pub summary: Option<CompletionSummary>,
    pub post_processing: bool,
}

impl TrackedJob {
    fn new(kind: JobKind) -> Self {
        Self {
            phase: RunnerPhase::Idle,
            job: Job::new(kind),
            estimator: None,
            summary: None,
            post_processing: false,
        }
    }

    /// Forget the previous job and return to a fresh record in `phase`.
    pub fn reset(&mut self, phase: RunnerPhase) {
        *self = Self::new(self.job.kind);
        self.phase = phase;
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            phase: self.phase,
            job: self.job.clone(),
            estimated: self.estimator.is_some() && self.phase.is_busy(),
            summary: self.summary,
            post_processing: self.post_processing,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Shared state for one job slot.
///
/// Mutations happen inside short critical sections on [`lock`](Self::lock);
/// events are built from the guarded state and sent after the guard drops.
pub struct JobState {
    tracked: Mutex<TrackedJob>,
    events_tx: broadcast::Sender<JobEvent>,
}

impl JobState {
    pub fn new(kind: JobKind) -> Self {
        let (events_tx, _) = broadcast::channel(64);
        Self {
            tracked: Mutex::new(TrackedJob::new(kind)),
            events_tx,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, TrackedJob> {
        self.tracked.lock().unwrap_or_else(|poisoned| {
            tracing::error!("JobState lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.lock().snapshot()
    }

    pub fn phase(&self) -> RunnerPhase {
        self.lock().phase
    }

    /// Subscribe to events for this slot.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events_tx.subscribe()
    }

    pub fn emit(&self, event: JobEvent) {
        // Ignore send errors (no subscribers is fine).
        let _ = self.events_tx.send(event);
    }

    /// Advance the optimistic estimate by one tick.
    ///
    /// Only applies while tracking and before any authoritative progress has
    /// been seen. Returns the displayed progress when it was updated.
    pub fn tick_estimate(&self) -> Option<f64> {
        let snapshot = {
            let mut tracked = self.lock();
            if tracked.phase != RunnerPhase::Tracking {
                return None;
            }
            let estimate = tracked.estimator.as_mut()?.tick();
            if estimate <= tracked.job.progress {
                return None;
            }
            tracked.job.set_progress(estimate);
            tracked.snapshot()
        };
        let progress = snapshot.job.progress;
        self.emit(JobEvent::Progress(snapshot));
        Some(progress)
    }
}
