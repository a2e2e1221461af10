// crates/jobs/src/poll.rs
//! Fixed-interval status polling for one job id at a time.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use gource_studio_types::JobId;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::PollSchedule;
use crate::error::BackendError;
use crate::identity::JobIdentity;

/// Whether the loop should keep polling after a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// One status check, plus the callbacks a [`PollLoop`] drives between checks.
#[async_trait]
pub trait Probe: Send + 'static {
    async fn probe(&mut self, job_id: &JobId) -> Result<Flow, BackendError>;

    /// Called at most once per loop, after the slot has been reset.
    fn on_error(&mut self, job_id: &JobId, error: BackendError);

    /// Called on every heartbeat tick of the schedule.
    fn heartbeat(&mut self, _job_id: &JobId) {}
}

struct LoopHandle {
    job_id: JobId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns at most one polling task.
///
/// Starting a loop stops the previous one first. Dropping the `PollLoop`
/// stops whatever is running.
pub struct PollLoop {
    slot: Arc<JobIdentity>,
    active: Mutex<Option<LoopHandle>>,
}

impl PollLoop {
    /// `slot` is the identity a failing probe resets.
    pub fn new(slot: Arc<JobIdentity>) -> Self {
        Self {
            slot,
            active: Mutex::new(None),
        }
    }

    /// Probe `job_id` after the schedule's initial delay, then every interval.
    /// Must be called from within a tokio runtime.
    pub fn start<P: Probe>(&self, job_id: JobId, schedule: PollSchedule, probe: P) {
        let mut active = self.active();
        if let Some(previous) = active.take() {
            stop_handle(previous);
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            job_id.clone(),
            schedule,
            probe,
            Arc::clone(&self.slot),
            cancel.clone(),
        ));
        tracing::debug!(%job_id, interval_ms = schedule.interval_ms, "Poll loop started");
        *active = Some(LoopHandle {
            job_id,
            cancel,
            task,
        });
    }

    /// Stop the running loop, if any. Returns whether a live loop was stopped.
    pub fn stop(&self) -> bool {
        match self.active().take() {
            Some(handle) => stop_handle(handle),
            None => false,
        }
    }

    /// Stop the running loop only if it is polling `job_id`.
    pub fn stop_job(&self, job_id: &JobId) -> bool {
        let mut active = self.active();
        if active.as_ref().is_some_and(|handle| &handle.job_id == job_id) {
            active.take().is_some_and(stop_handle)
        } else {
            false
        }
    }

    pub fn is_running(&self) -> bool {
        self.active()
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Job id of the live loop.
    pub fn current_job(&self) -> Option<JobId> {
        self.active()
            .as_ref()
            .filter(|handle| !handle.task.is_finished())
            .map(|handle| handle.job_id.clone())
    }

    fn active(&self) -> MutexGuard<'_, Option<LoopHandle>> {
        self.active.lock().unwrap_or_else(|poisoned| {
            tracing::error!("PollLoop lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stop_handle(handle: LoopHandle) -> bool {
    let was_live = !handle.task.is_finished();
    handle.cancel.cancel();
    handle.task.abort();
    if was_live {
        tracing::debug!(job_id = %handle.job_id, "Poll loop stopped");
    }
    was_live
}

async fn run_loop<P: Probe>(
    job_id: JobId,
    schedule: PollSchedule,
    mut probe: P,
    slot: Arc<JobIdentity>,
    cancel: CancellationToken,
) {
    let mut poll = time::interval_at(Instant::now() + schedule.initial_delay(), schedule.interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut heartbeat = schedule.heartbeat().map(|period| {
        let mut tick = time::interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tick
    });

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = poll.tick() => {
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = probe.probe(&job_id) => Some(result),
                };
                match result {
                    None | Some(Ok(Flow::Stop)) => break,
                    Some(Ok(Flow::Continue)) => {}
                    Some(Err(error)) => {
                        if slot.clear_if(&job_id) {
                            tracing::warn!(%job_id, error = %error, "Status probe failed, tracking stopped");
                            probe.on_error(&job_id, error);
                        } else {
                            tracing::debug!(%job_id, error = %error, "Dropping probe error for superseded job");
                        }
                        break;
                    }
                }
            }
            _ = next_heartbeat(&mut heartbeat) => probe.heartbeat(&job_id),
        }
    }
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
