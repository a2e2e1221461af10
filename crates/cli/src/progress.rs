// crates/cli/src/progress.rs
//! Terminal progress bar fed by job snapshots.

use std::time::Duration;

use anyhow::Result;
use gource_studio_types::{JobKind, JobSnapshot, RunnerPhase};
use indicatif::{ProgressBar, ProgressStyle};

pub struct JobProgress {
    bar: ProgressBar,
}

impl JobProgress {
    pub fn new(kind: JobKind) -> Result<Self> {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("  {spinner} {prefix:<11} [{bar:32}] {pos:>3}% {msg}")?
                .progress_chars("=> "),
        );
        bar.set_prefix(kind.as_str().to_string());
        bar.set_message(kind.starting_message());
        bar.enable_steady_tick(Duration::from_millis(100));
        Ok(Self { bar })
    }

    pub fn update(&self, snapshot: &JobSnapshot) {
        self.bar.set_position(snapshot.job.progress.round() as u64);
        self.bar.set_message(status_line(snapshot));
    }

    /// Clear the bar and print the outcome line.
    pub fn finish(&self, snapshot: &JobSnapshot) {
        self.bar.finish_and_clear();
        match snapshot.phase {
            RunnerPhase::Completed => {
                eprintln!("  \u{2713} {}", snapshot.job.message);
                if snapshot.post_processing {
                    eprintln!("    Assets are still being generated in the background.");
                }
            }
            RunnerPhase::Failed => eprintln!(
                "  \u{2717} {}",
                snapshot.job.error.as_deref().unwrap_or(&snapshot.job.message)
            ),
            _ => eprintln!("  - {}", snapshot.job.message),
        }
    }

    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }

    /// Print above the bar without tearing it.
    pub fn println(&self, line: impl AsRef<str>) {
        self.bar.println(line);
    }
}

fn status_line(snapshot: &JobSnapshot) -> String {
    let job = &snapshot.job;
    let mut line = job.message.clone();
    if let Some(step) = job.active_step.and_then(|i| job.steps.get(i as usize)) {
        if !line.contains(&step.label) {
            line = format!("{} ({})", line, step.label);
        }
    }
    if !job.items.is_empty() {
        let done = job.items.iter().filter(|i| i.status.is_terminal()).count();
        line = format!("{} [{}/{}]", line, done, job.items.len());
    }
    if snapshot.estimated {
        line.push_str(" ~");
    }
    line
}
