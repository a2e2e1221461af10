//! End-to-end runner scenarios against a scripted in-memory backend.
//!
//! All tests run on tokio's paused clock, so poll intervals elapse
//! instantly and deterministically.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gource_studio_jobs::{
    BackendError, JobBackend, JobError, JobEvent, JobHooks, JobRunner, Reconciled,
    StartResponse, TrackingConfig,
};
use gource_studio_types::{
    BulkImportRequest, CloneRequest, ItemRecord, ItemStatus, JobId, JobKind, JobSnapshot,
    JobStatus, RenderRequest, RunnerPhase, StartRequest, StatusPayload,
};
use pretty_assertions::assert_eq;
use tokio::sync::{broadcast, oneshot};
use tokio::time::sleep;

struct ScriptedStart {
    gate: Option<oneshot::Receiver<()>>,
    response: Result<StartResponse, BackendError>,
}

/// Replays scripted start responses in order, and per-job status responses.
/// Once a job's script runs out it reports `active` with no progress.
#[derive(Default)]
struct ScriptedBackend {
    starts: Mutex<VecDeque<ScriptedStart>>,
    statuses: Mutex<HashMap<String, VecDeque<Result<StatusPayload, BackendError>>>>,
    latency: Mutex<HashMap<String, Duration>>,
    status_calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn accept(&self, id: &str) {
        self.push_start(None, Ok(StartResponse::Accepted(JobId::new(id))));
    }

    /// Accept `id`, but only once the returned sender fires.
    fn accept_later(&self, id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push_start(Some(rx), Ok(StartResponse::Accepted(JobId::new(id))));
        tx
    }

    fn push_start(
        &self,
        gate: Option<oneshot::Receiver<()>>,
        response: Result<StartResponse, BackendError>,
    ) {
        self.starts
            .lock()
            .unwrap()
            .push_back(ScriptedStart { gate, response });
    }

    fn script(&self, id: &str, statuses: Vec<Result<StatusPayload, BackendError>>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(id.to_string(), statuses.into());
    }

    fn slow(&self, id: &str, latency: Duration) {
        self.latency.lock().unwrap().insert(id.to_string(), latency);
    }

    fn calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }

    fn calls_for(&self, id: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == id).count()
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn start(&self, _request: &StartRequest) -> Result<StartResponse, BackendError> {
        let scripted = self.starts.lock().unwrap().pop_front();
        let Some(scripted) = scripted else {
            return Err(BackendError::Transport("no start scripted".into()));
        };
        if let Some(gate) = scripted.gate {
            let _ = gate.await;
        }
        scripted.response
    }

    async fn status(&self, _kind: JobKind, job_id: &JobId) -> Result<StatusPayload, BackendError> {
        self.status_calls
            .lock()
            .unwrap()
            .push(job_id.to_string());
        let latency = self.latency.lock().unwrap().get(job_id.as_str()).copied();
        if let Some(latency) = latency {
            sleep(latency).await;
        }
        self.statuses
            .lock()
            .unwrap()
            .get_mut(job_id.as_str())
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Ok(StatusPayload::new(JobStatus::Active)))
    }
}

#[derive(Default)]
struct CountingHooks {
    completed: AtomicUsize,
    failed: Mutex<Vec<String>>,
    errors: AtomicUsize,
}

impl JobHooks for CountingHooks {
    fn on_completed(&self, _snapshot: &JobSnapshot) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_failed(&self, _snapshot: &JobSnapshot, error: &str) {
        self.failed.lock().unwrap().push(error.to_string());
    }

    fn on_error(&self, _error: &JobError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

fn new_runner(
    kind: JobKind,
    backend: &Arc<ScriptedBackend>,
) -> (Arc<JobRunner>, Arc<CountingHooks>) {
    let hooks = Arc::new(CountingHooks::default());
    let runner = JobRunner::new(
        kind,
        Arc::clone(backend) as Arc<dyn JobBackend>,
        &TrackingConfig::default(),
        Arc::clone(&hooks) as Arc<dyn JobHooks>,
    );
    (Arc::new(runner), hooks)
}

fn clone_request(url: &str) -> StartRequest {
    StartRequest::Clone(CloneRequest {
        url: url.to_string(),
        create_project: true,
    })
}

fn drain(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<&'static str> {
    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(match event {
            JobEvent::Starting(_) => "starting",
            JobEvent::Tracking(_) => "tracking",
            JobEvent::Progress(_) => "progress",
            JobEvent::Completed(_) => "completed",
            JobEvent::Failed { .. } => "failed",
            JobEvent::Error { .. } => "error",
            JobEvent::Stopped(_) => "stopped",
        });
    }
    names
}

#[tokio::test(start_paused = true)]
async fn clone_runs_to_completion() {
    let backend = ScriptedBackend::new();
    backend.accept("c1");
    backend.script(
        "c1",
        vec![
            Ok(StatusPayload::new(JobStatus::Preparing)
                .with_progress(10.0)
                .with_step(0)
                .with_message("Preparing...")),
            Ok(StatusPayload::new(JobStatus::Active)
                .with_progress(55.0)
                .with_step(2)
                .with_message("Generating Gource log...")),
            Ok(StatusPayload::new(JobStatus::Completed).with_progress(100.0)),
        ],
    );
    let (runner, hooks) = new_runner(JobKind::Clone, &backend);
    let mut events = runner.subscribe();

    runner
        .start(clone_request("https://github.com/acme/site.git"))
        .await
        .unwrap();
    sleep(Duration::from_secs(5)).await;

    let snap = runner.snapshot();
    assert_eq!(snap.phase, RunnerPhase::Completed);
    assert_eq!(snap.job.status, JobStatus::Completed);
    assert_eq!(snap.job.progress, 100.0);
    assert!(snap.job.steps.iter().all(|s| s.completed));
    assert!(!runner.is_polling());
    assert_eq!(runner.current_job(), None);
    assert_eq!(hooks.completed.load(Ordering::SeqCst), 1);
    assert_eq!(backend.calls_for("c1"), 3);
    assert_eq!(
        drain(&mut events),
        vec!["starting", "tracking", "progress", "progress", "completed"]
    );
}

#[tokio::test(start_paused = true)]
async fn bulk_import_reports_partial_failure() {
    let backend = ScriptedBackend::new();
    backend.accept("b1");
    backend.script(
        "b1",
        vec![
            Ok(StatusPayload::new(JobStatus::Active).with_items(vec![
                ItemRecord::new("acme/one", ItemStatus::Completed),
                ItemRecord::new("acme/two", ItemStatus::Active),
            ])),
            Ok(StatusPayload::new(JobStatus::Completed).with_items(vec![
                ItemRecord::new("acme/one", ItemStatus::Completed),
                ItemRecord::new("acme/two", ItemStatus::Failed),
                ItemRecord::new("acme/three", ItemStatus::Completed),
            ])),
        ],
    );
    let (runner, hooks) = new_runner(JobKind::BulkImport, &backend);

    let mut request = BulkImportRequest::new("https://github.com/acme");
    request.expected_items = Some(3);
    runner.start(StartRequest::BulkImport(request)).await.unwrap();

    // Before the first probe only the estimate moves.
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(backend.calls_for("b1"), 0);
    let snap = runner.snapshot();
    assert!(snap.estimated);
    assert!(snap.job.progress > 0.0 && snap.job.progress <= 95.0);

    sleep(Duration::from_secs(10)).await;
    let snap = runner.snapshot();
    assert_eq!(snap.phase, RunnerPhase::Completed);
    assert!(snap.job.message.contains("2 of 3 succeeded"), "{}", snap.job.message);
    assert!(snap.job.message.contains("1 failed"));
    assert_eq!(snap.summary.unwrap().failed, 1);
    assert_eq!(hooks.completed.load(Ordering::SeqCst), 1);
    assert_eq!(backend.calls_for("b1"), 2);
}

#[tokio::test(start_paused = true)]
async fn teardown_mid_poll_stops_probing() {
    let backend = ScriptedBackend::new();
    backend.accept("c1");
    let (runner, _hooks) = new_runner(JobKind::Clone, &backend);
    let mut events = runner.subscribe();

    runner
        .start(clone_request("https://github.com/acme/site.git"))
        .await
        .unwrap();
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(backend.calls_for("c1"), 3);

    runner.shutdown();
    sleep(Duration::from_secs(30)).await;

    assert_eq!(backend.calls_for("c1"), 3);
    assert_eq!(runner.phase(), RunnerPhase::Idle);
    assert!(!runner.is_polling());
    assert_eq!(drain(&mut events).last(), Some(&"stopped"));
}

#[tokio::test(start_paused = true)]
async fn dropping_runner_stops_probing() {
    let backend = ScriptedBackend::new();
    backend.accept("c1");
    let (runner, _hooks) = new_runner(JobKind::Clone, &backend);

    runner
        .start(clone_request("https://github.com/acme/site.git"))
        .await
        .unwrap();
    sleep(Duration::from_millis(1500)).await;
    drop(runner);
    sleep(Duration::from_secs(30)).await;

    assert_eq!(backend.calls_for("c1"), 2);
}

#[tokio::test(start_paused = true)]
async fn second_start_retires_first_loop() {
    let backend = ScriptedBackend::new();
    backend.accept("a");
    backend.accept("b");
    let (runner, _hooks) = new_runner(JobKind::Clone, &backend);

    runner
        .start(clone_request("https://github.com/acme/a.git"))
        .await
        .unwrap();
    sleep(Duration::from_millis(1500)).await;
    runner
        .start(clone_request("https://github.com/acme/b.git"))
        .await
        .unwrap();
    sleep(Duration::from_millis(3500)).await;

    let calls = backend.calls();
    let first_b = calls.iter().position(|c| c == "b").unwrap();
    assert!(calls[first_b..].iter().all(|c| c == "b"));
    assert_eq!(backend.calls_for("a"), 2);
    assert_eq!(backend.calls_for("b"), 4);
    assert_eq!(runner.current_job(), Some(JobId::new("b")));
}

#[tokio::test(start_paused = true)]
async fn late_response_from_superseded_job_is_discarded() {
    let backend = ScriptedBackend::new();
    backend.accept("a");
    backend.accept("b");
    backend.slow("a", Duration::from_secs(5));
    backend.script(
        "a",
        vec![
            Ok(StatusPayload::new(JobStatus::Completed).with_progress(100.0)),
            Ok(StatusPayload::new(JobStatus::Completed).with_progress(100.0)),
        ],
    );
    let (runner, hooks) = new_runner(JobKind::Clone, &backend);

    runner
        .start(clone_request("https://github.com/acme/a.git"))
        .await
        .unwrap();
    let refresh = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move { runner.refresh().await })
    };
    sleep(Duration::from_secs(1)).await;
    runner
        .start(clone_request("https://github.com/acme/b.git"))
        .await
        .unwrap();

    let result = refresh.await.unwrap().unwrap();
    assert_eq!(result, Some(Reconciled::Stale));

    let snap = runner.snapshot();
    assert_eq!(snap.phase, RunnerPhase::Tracking);
    assert_eq!(snap.job.id, Some(JobId::new("b")));
    assert_ne!(snap.job.status, JobStatus::Completed);
    assert_eq!(hooks.completed.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn start_resolving_after_newer_start_is_superseded() {
    let backend = ScriptedBackend::new();
    let release_a = backend.accept_later("a");
    backend.accept("b");
    let (runner, _hooks) = new_runner(JobKind::Clone, &backend);

    let first = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            runner
                .start(clone_request("https://github.com/acme/a.git"))
                .await
        })
    };
    sleep(Duration::from_millis(10)).await;
    assert_eq!(runner.phase(), RunnerPhase::Starting);

    runner
        .start(clone_request("https://github.com/acme/b.git"))
        .await
        .unwrap();
    release_a.send(()).unwrap();

    let err = first.await.unwrap().unwrap_err();
    assert_eq!(err, JobError::Superseded(JobKind::Clone));
    assert_eq!(runner.current_job(), Some(JobId::new("b")));

    sleep(Duration::from_secs(3)).await;
    assert_eq!(backend.calls_for("a"), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_start_discards_accepted_job() {
    let backend = ScriptedBackend::new();
    let release = backend.accept_later("a");
    let (runner, _hooks) = new_runner(JobKind::Clone, &backend);

    let pending = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            runner
                .start(clone_request("https://github.com/acme/a.git"))
                .await
        })
    };
    sleep(Duration::from_millis(10)).await;
    assert!(runner.cancel());
    release.send(()).unwrap();

    assert!(matches!(
        pending.await.unwrap(),
        Err(JobError::Superseded(JobKind::Clone))
    ));
    sleep(Duration::from_secs(3)).await;
    assert!(backend.calls().is_empty());
    assert_eq!(runner.phase(), RunnerPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_stops_loop_and_resets_slot() {
    let backend = ScriptedBackend::new();
    backend.accept("c1");
    backend.accept("c2");
    backend.script(
        "c1",
        vec![
            Ok(StatusPayload::new(JobStatus::Active).with_progress(20.0)),
            Err(BackendError::Transport("connection reset".into())),
        ],
    );
    let (runner, hooks) = new_runner(JobKind::Clone, &backend);
    let mut events = runner.subscribe();

    runner
        .start(clone_request("https://github.com/acme/site.git"))
        .await
        .unwrap();
    sleep(Duration::from_secs(10)).await;

    assert_eq!(backend.calls_for("c1"), 2);
    assert_eq!(hooks.errors.load(Ordering::SeqCst), 1);
    assert_eq!(runner.phase(), RunnerPhase::Idle);
    assert_eq!(runner.current_job(), None);
    assert!(!runner.is_polling());
    assert!(runner.snapshot().job.error.unwrap().contains("connection reset"));
    assert_eq!(drain(&mut events).last(), Some(&"error"));

    // A fresh start works after the reset.
    let snap = runner
        .start(clone_request("https://github.com/acme/site.git"))
        .await
        .unwrap();
    assert_eq!(snap.job.id, Some(JobId::new("c2")));
    assert!(runner.is_polling());
}

#[tokio::test(start_paused = true)]
async fn start_failure_never_polls() {
    let backend = ScriptedBackend::new();
    backend.push_start(
        None,
        Err(BackendError::SuggestBulkImport {
            github_url: "https://github.com/acme".into(),
        }),
    );
    let (runner, hooks) = new_runner(JobKind::Clone, &backend);

    let err = runner
        .start(clone_request("https://github.com/acme"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.backend(),
        Some(BackendError::SuggestBulkImport { github_url }) if github_url == "https://github.com/acme"
    ));

    sleep(Duration::from_secs(5)).await;
    assert!(backend.calls().is_empty());
    assert_eq!(runner.phase(), RunnerPhase::Idle);
    assert_eq!(hooks.errors.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn immediate_result_skips_polling() {
    let backend = ScriptedBackend::new();
    backend.push_start(
        None,
        Ok(StartResponse::Finished(
            StatusPayload::new(JobStatus::Completed).with_message("Repository already exists"),
        )),
    );
    let (runner, hooks) = new_runner(JobKind::Clone, &backend);

    let snap = runner
        .start(clone_request("https://github.com/acme/site.git"))
        .await
        .unwrap();
    assert_eq!(snap.phase, RunnerPhase::Completed);
    assert_eq!(snap.job.progress, 100.0);

    sleep(Duration::from_secs(5)).await;
    assert!(backend.calls().is_empty());
    assert_eq!(hooks.completed.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn reported_failure_runs_failure_hook_once() {
    let backend = ScriptedBackend::new();
    backend.accept("r1");
    backend.script(
        "r1",
        vec![
            Ok(StatusPayload::new(JobStatus::Active).with_progress(40.0)),
            Ok(StatusPayload::new(JobStatus::Failed).with_error("Gource exited with code 1")),
        ],
    );
    let (runner, hooks) = new_runner(JobKind::Render, &backend);

    runner
        .start(StartRequest::Render(RenderRequest {
            project_id: "12".into(),
            custom_name: Some("launch".into()),
        }))
        .await
        .unwrap();
    sleep(Duration::from_secs(10)).await;

    let snap = runner.snapshot();
    assert_eq!(snap.phase, RunnerPhase::Failed);
    assert_eq!(snap.job.progress, 0.0);
    assert_eq!(*hooks.failed.lock().unwrap(), vec!["Gource exited with code 1"]);
    assert_eq!(backend.calls_for("r1"), 2);

    assert!(runner.acknowledge());
    assert_eq!(runner.phase(), RunnerPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn authoritative_progress_holds_against_heartbeats() {
    let backend = ScriptedBackend::new();
    backend.accept("r1");
    backend.script(
        "r1",
        vec![Ok(StatusPayload::new(JobStatus::Active).with_progress(45.0))],
    );
    let (runner, _hooks) = new_runner(JobKind::Render, &backend);

    runner
        .start(StartRequest::Render(RenderRequest {
            project_id: "12".into(),
            custom_name: None,
        }))
        .await
        .unwrap();
    sleep(Duration::from_millis(4200)).await;

    assert!(backend.calls_for("r1") >= 4);
    assert_eq!(runner.tick_estimate(), None);
    let snap = runner.snapshot();
    assert_eq!(snap.job.progress, 45.0);
    assert!(!snap.estimated);
}
