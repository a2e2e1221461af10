//! Arbitrary status bodies must never panic the normalizer, and whatever
//! they decode to must keep a job record within bounds.
#![no_main]

use gource_studio_types::{CompletionSummary, Job, JobKind, StatusPayload};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = serde_json::from_slice::<StatusPayload>(data) else {
        return;
    };
    let _ = payload.status_recognized();

    for kind in JobKind::ALL {
        let mut job = Job::new(kind);
        job.advance_status(payload.status);
        if let Some(progress) = payload.progress {
            job.set_progress(progress);
        }
        if let Some(step) = payload.step {
            job.reach_step(step);
        }
        assert!((0.0..=100.0).contains(&job.progress));
        assert!(job.active_step.map_or(true, |s| (s as usize) < job.steps.len()));
    }

    if let Some(items) = &payload.items {
        let summary = CompletionSummary::from_items(items);
        assert!(summary.succeeded + summary.failed + summary.skipped <= summary.total);
        let _ = summary.message();
    }
});
