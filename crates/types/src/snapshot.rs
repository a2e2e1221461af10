// crates/types/src/snapshot.rs
//! Display-side state published by a job runner.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::job::{ItemRecord, ItemStatus, Job};

/// Where a runner is in its `idle → starting → tracking → terminal` cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "snake_case")]
pub enum RunnerPhase {
    Idle,
    Starting,
    Tracking,
    Completed,
    Failed,
}

impl RunnerPhase {
    pub fn is_busy(self) -> bool {
        matches!(self, RunnerPhase::Starting | RunnerPhase::Tracking)
    }
}

/// Outcome tally for a finished bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total: u32,
    pub created_projects: u32,
}

impl CompletionSummary {
    /// Tally from per-item records.
    pub fn from_items(items: &[ItemRecord]) -> Self {
        let mut summary = Self {
            total: items.len() as u32,
            ..Self::default()
        };
        for item in items {
            match item.status {
                ItemStatus::Completed => summary.succeeded += 1,
                ItemStatus::Failed => summary.failed += 1,
                ItemStatus::Skipped => summary.skipped += 1,
                ItemStatus::Pending | ItemStatus::Active => {}
            }
        }
        summary
    }

    /// Tally from aggregate counters. `processed` includes failures.
    pub fn from_counts(total: u32, processed: u32, failed: u32) -> Self {
        let failed = failed.min(processed);
        Self {
            succeeded: processed - failed,
            failed,
            skipped: 0,
            total,
            created_projects: 0,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.skipped > 0
    }

    /// User-visible completion message. Partial failures are spelled out
    /// rather than reported as a plain success.
    pub fn message(&self) -> String {
        let mut message = if self.total == 0 {
            "Import completed. No repositories found.".to_string()
        } else if self.has_failures() {
            let mut problems = Vec::new();
            if self.failed > 0 {
                problems.push(format!("{} failed", self.failed));
            }
            if self.skipped > 0 {
                problems.push(format!("{} skipped", self.skipped));
            }
            format!(
                "Import completed: {} of {} succeeded ({}).",
                self.succeeded,
                self.total,
                problems.join(", ")
            )
        } else {
            format!(
                "Import completed: {} of {} succeeded.",
                self.succeeded, self.total
            )
        };
        if self.created_projects > 0 {
            message.push_str(&format!(" Created {} project(s).", self.created_projects));
        }
        message
    }
}

/// Everything a UI needs to draw the current job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub phase: RunnerPhase,
    pub job: Job,
    /// `true` while the displayed progress is a local estimate.
    pub estimated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<CompletionSummary>,
    /// The job is terminal but the backend is still producing derived assets.
    pub post_processing: bool,
    pub timestamp: String,
}
