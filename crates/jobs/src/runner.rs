// crates/jobs/src/runner.rs
//! One runner per job slot: start, track, reconcile, clean up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gource_studio_types::{JobId, JobKind, JobSnapshot, RunnerPhase, StartRequest};
use tokio::sync::broadcast;

use crate::backend::{JobBackend, StartResponse};
use crate::config::{KindConfig, TrackingConfig};
use crate::error::{BackendError, JobError};
use crate::estimator::OptimisticEstimator;
use crate::identity::JobIdentity;
use crate::poll::{Flow, PollLoop, Probe};
use crate::reconcile::{JobHooks, NoopHooks, Reconciled, StatusReconciler};
use crate::state::{JobEvent, JobState};

/// Drives jobs of one kind through
/// `idle → starting → tracking → completed | failed → idle`.
///
/// A runner tracks at most one job at a time. Starting a new job retires
/// the previous one: its poll loop is stopped and any response still in
/// flight for it is discarded. Dropping the runner stops polling.
pub struct JobRunner {
    kind: JobKind,
    config: KindConfig,
    backend: Arc<dyn JobBackend>,
    state: Arc<JobState>,
    identity: Arc<JobIdentity>,
    reconciler: Arc<StatusReconciler>,
    hooks: Arc<dyn JobHooks>,
    poll: PollLoop,
    /// Bumped by every start and cancel; a start whose response resolves
    /// under an older generation has been superseded.
    generation: AtomicU64,
}

impl JobRunner {
    pub fn new(
        kind: JobKind,
        backend: Arc<dyn JobBackend>,
        config: &TrackingConfig,
        hooks: Arc<dyn JobHooks>,
    ) -> Self {
        let state = Arc::new(JobState::new(kind));
        let identity = Arc::new(JobIdentity::new());
        let reconciler = Arc::new(StatusReconciler::new(
            Arc::clone(&state),
            Arc::clone(&identity),
            Arc::clone(&hooks),
        ));
        Self {
            kind,
            config: *config.for_kind(kind),
            backend,
            poll: PollLoop::new(Arc::clone(&identity)),
            state,
            identity,
            reconciler,
            hooks,
            generation: AtomicU64::new(0),
        }
    }

    /// A runner with default tracking config and no hooks.
    pub fn with_defaults(kind: JobKind, backend: Arc<dyn JobBackend>) -> Self {
        Self::new(kind, backend, &TrackingConfig::default(), Arc::new(NoopHooks))
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn phase(&self) -> RunnerPhase {
        self.state.phase()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.state.snapshot()
    }

    /// Subscribe to state changes of this runner.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.state.subscribe()
    }

    /// Id of the job currently being tracked.
    pub fn current_job(&self) -> Option<JobId> {
        self.identity.get()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_running()
    }

    /// Start a job and begin tracking it.
    ///
    /// Returns the snapshot right after the backend answered: `Tracking` for
    /// an accepted job, or the terminal state for one that finished within
    /// the start request.
    pub async fn start(&self, request: StartRequest) -> Result<JobSnapshot, JobError> {
        if request.kind() != self.kind {
            return Err(JobError::WrongKind {
                expected: self.kind,
                actual: request.kind(),
            });
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let starting = {
            let mut tracked = self.state.lock();
            self.poll.stop();
            if let Some(previous) = self.identity.clear() {
                tracing::info!(previous_job = %previous, kind = %self.kind, "Retiring tracked job");
            }
            tracked.reset(RunnerPhase::Starting);
            tracked.snapshot()
        };
        self.state.emit(JobEvent::Starting(starting));
        tracing::info!(kind = %self.kind, request = %request.describe(), "Starting job");

        match self.backend.start(&request).await {
            Ok(StartResponse::Accepted(job_id)) => self.track(generation, job_id, &request),
            Ok(StartResponse::Finished(payload)) => {
                let result = self
                    .reconciler
                    .apply_immediate(&payload, || self.is_generation(generation));
                if result == Reconciled::Stale {
                    return Err(JobError::Superseded(self.kind));
                }
                Ok(self.snapshot())
            }
            Err(source) => Err(self.start_failed(generation, source)),
        }
    }

    /// Stop tracking the current job and return to idle. Nothing is sent to
    /// the backend. Returns whether anything was running.
    pub fn cancel(&self) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let event = {
            let mut tracked = self.state.lock();
            self.poll.stop();
            self.identity.clear();
            if !tracked.phase.is_busy() {
                return false;
            }
            tracked.phase = RunnerPhase::Idle;
            tracked.estimator = None;
            tracked.job.message = "Cancelled".to_string();
            JobEvent::Stopped(tracked.snapshot())
        };
        tracing::info!(kind = %self.kind, "Job tracking cancelled");
        self.state.emit(event);
        true
    }

    /// Teardown of the owning feature.
    pub fn shutdown(&self) {
        let was_busy = self.cancel();
        tracing::debug!(kind = %self.kind, was_busy, "Job runner shut down");
    }

    /// Probe the current job once, outside the regular schedule.
    ///
    /// Returns `None` when nothing is being tracked.
    pub async fn refresh(&self) -> Result<Option<Reconciled>, JobError> {
        let Some(job_id) = self.identity.get() else {
            return Ok(None);
        };
        match self.backend.status(self.kind, &job_id).await {
            Ok(payload) => {
                let result = self.reconciler.apply(&job_id, &payload);
                if matches!(result, Reconciled::Completed | Reconciled::Failed) {
                    self.poll.stop_job(&job_id);
                }
                Ok(Some(result))
            }
            Err(source) => {
                if !self.identity.clear_if(&job_id) {
                    return Ok(Some(Reconciled::Stale));
                }
                self.poll.stop_job(&job_id);
                tracing::warn!(%job_id, error = %source, "Status refresh failed, tracking stopped");
                Err(self.reconciler.lost(&job_id, source))
            }
        }
    }

    /// Return a finished runner to idle. Returns whether it was finished.
    pub fn acknowledge(&self) -> bool {
        let mut tracked = self.state.lock();
        if !matches!(tracked.phase, RunnerPhase::Completed | RunnerPhase::Failed) {
            return false;
        }
        tracked.reset(RunnerPhase::Idle);
        true
    }

    /// Advance the optimistic estimate by hand. The poll loop does this on
    /// every heartbeat.
    pub fn tick_estimate(&self) -> Option<f64> {
        self.state.tick_estimate()
    }

    fn is_generation(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn track(
        &self,
        generation: u64,
        job_id: JobId,
        request: &StartRequest,
    ) -> Result<JobSnapshot, JobError> {
        let snapshot = {
            let mut tracked = self.state.lock();
            if !self.is_generation(generation) {
                tracing::info!(%job_id, kind = %self.kind, "Start superseded, not tracking job");
                return Err(JobError::Superseded(self.kind));
            }
            tracked.phase = RunnerPhase::Tracking;
            tracked.job.id = Some(job_id.clone());
            tracked.estimator = Some(OptimisticEstimator::new(
                self.config.estimator,
                request.expected_items(),
            ));
            self.identity.set(job_id.clone());
            self.poll.start(
                job_id.clone(),
                self.config.schedule,
                RunnerProbe {
                    kind: self.kind,
                    backend: Arc::clone(&self.backend),
                    state: Arc::clone(&self.state),
                    reconciler: Arc::clone(&self.reconciler),
                },
            );
            tracked.snapshot()
        };
        tracing::info!(%job_id, kind = %self.kind, "Tracking job");
        self.state.emit(JobEvent::Tracking(snapshot.clone()));
        Ok(snapshot)
    }

    fn start_failed(&self, generation: u64, source: BackendError) -> JobError {
        let error = JobError::Start {
            kind: self.kind,
            source,
        };
        let event = {
            let mut tracked = self.state.lock();
            if !self.is_generation(generation) {
                return JobError::Superseded(self.kind);
            }
            tracked.phase = RunnerPhase::Idle;
            tracked.job.error = Some(error.to_string());
            JobEvent::Error {
                snapshot: tracked.snapshot(),
                error: error.clone(),
            }
        };
        tracing::warn!(kind = %self.kind, error = %error, "Job start failed");
        self.state.emit(event);
        self.hooks.on_error(&error);
        error
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        self.poll.stop();
        self.identity.clear();
    }
}

/// Status probe a runner hands to its poll loop.
struct RunnerProbe {
    kind: JobKind,
    backend: Arc<dyn JobBackend>,
    state: Arc<JobState>,
    reconciler: Arc<StatusReconciler>,
}

#[async_trait]
impl Probe for RunnerProbe {
    async fn probe(&mut self, job_id: &JobId) -> Result<Flow, BackendError> {
        let payload = self.backend.status(self.kind, job_id).await?;
        if self.reconciler.apply(job_id, &payload).should_continue() {
            Ok(Flow::Continue)
        } else {
            Ok(Flow::Stop)
        }
    }

    fn on_error(&mut self, job_id: &JobId, error: BackendError) {
        self.reconciler.lost(job_id, error);
    }

    fn heartbeat(&mut self, _job_id: &JobId) {
        self.state.tick_estimate();
    }
}
