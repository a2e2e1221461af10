// crates/types/src/job.rs
//! Core job record types: identity, kind, lifecycle status, clone steps and
//! bulk-import items.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Opaque backend-assigned identifier for a long-running job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Which dashboard feature a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Clone,
    BulkImport,
    Render,
}

/// Labels of the discrete phases a repository clone goes through.
const CLONE_STEPS: [&str; 4] = ["Preparation", "Cloning", "Log Generation", "Finalization"];

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::Clone, JobKind::BulkImport, JobKind::Render];

    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Clone => "clone",
            JobKind::BulkImport => "bulk_import",
            JobKind::Render => "render",
        }
    }

    /// Fresh step list for this kind. Only clones are multi-step.
    pub fn initial_steps(self) -> Vec<JobStep> {
        match self {
            JobKind::Clone => CLONE_STEPS.iter().map(|label| JobStep::new(*label)).collect(),
            JobKind::BulkImport | JobKind::Render => Vec::new(),
        }
    }

    /// Message shown while the start request is in flight.
    pub fn starting_message(self) -> &'static str {
        match self {
            JobKind::Clone => "Initializing clone operation...",
            JobKind::BulkImport => "Starting bulk import...",
            JobKind::Render => "Starting render...",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical job lifecycle.
///
/// Ordered: a job only ever moves forward through these, and `Completed` /
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Preparing,
    Active,
    Finalizing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Map a raw backend status string onto the canonical lifecycle.
    ///
    /// Returns `None` for strings the dashboard backend is not known to send.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" | "initializing" => Some(JobStatus::Pending),
            "preparing" => Some(JobStatus::Preparing),
            "active" | "running" | "processing" | "cloning" | "rendering" | "importing"
            | "skipped_clone" | "finished_clone" => Some(JobStatus::Active),
            "finalizing" => Some(JobStatus::Finalizing),
            "completed" | "complete" | "done" | "success" => Some(JobStatus::Completed),
            "failed" | "error" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Preparing => "preparing",
            JobStatus::Active => "active",
            JobStatus::Finalizing => "finalizing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named phase of a multi-step job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
pub struct JobStep {
    pub label: String,
    pub completed: bool,
}

impl JobStep {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            completed: false,
        }
    }
}

/// Status of one sub-job inside a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Active,
    Completed,
    Failed,
    Skipped,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Failed | ItemStatus::Skipped)
    }

    fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "failed" | "error" => ItemStatus::Failed,
            "skipped" | "skipped_clone" => ItemStatus::Skipped,
            "completed" | "complete" | "done" | "success" => ItemStatus::Completed,
            "pending" | "queued" | "initializing" => ItemStatus::Pending,
            _ => ItemStatus::Active,
        }
    }
}

/// One sub-job of a bulk import (typically one repository).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(from = "RawItemRecord")]
pub struct ItemRecord {
    pub name: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ItemRecord {
    pub fn new(name: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            name: name.into(),
            status,
            message: None,
        }
    }
}

/// Lenient wire shape for items. The backend's imported-repository list has
/// no status field at all: every entry in it is a finished import.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItemRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl From<RawItemRecord> for ItemRecord {
    fn from(raw: RawItemRecord) -> Self {
        let name = raw
            .name
            .or(raw.full_name)
            .or(raw.url)
            .unwrap_or_default();
        let status = raw
            .status
            .as_deref()
            .map(ItemStatus::from_wire)
            .unwrap_or(ItemStatus::Completed);
        Self {
            name,
            status,
            message: raw.message.or(raw.error),
        }
    }
}

/// Display-side record of one tracked job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Absent until the backend has accepted the start request.
    pub id: Option<JobId>,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Always within `0.0..=100.0`.
    pub progress: f64,
    pub message: String,
    pub steps: Vec<JobStep>,
    pub active_step: Option<u32>,
    pub items: Vec<ItemRecord>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(kind: JobKind) -> Self {
        Self {
            id: None,
            kind,
            status: JobStatus::Pending,
            progress: 0.0,
            message: kind.starting_message().to_string(),
            steps: kind.initial_steps(),
            active_step: None,
            items: Vec::new(),
            error: None,
        }
    }

    pub fn set_progress(&mut self, value: f64) {
        self.progress = if value.is_finite() {
            value.clamp(0.0, 100.0)
        } else {
            0.0
        };
    }

    /// Move the status forward. Regressions and transitions out of a
    /// terminal status are refused; returns whether the status changed.
    pub fn advance_status(&mut self, next: JobStatus) -> bool {
        if self.status.is_terminal() || next <= self.status {
            return false;
        }
        self.status = next;
        true
    }

    /// Mark every step before `step` completed and make `step` the active one.
    /// Out-of-range steps are ignored.
    pub fn reach_step(&mut self, step: u32) {
        let index = step as usize;
        if index >= self.steps.len() {
            return;
        }
        for earlier in &mut self.steps[..index] {
            earlier.completed = true;
        }
        self.active_step = Some(step);
    }

    pub fn complete_all_steps(&mut self) {
        for step in &mut self.steps {
            step.completed = true;
        }
        if !self.steps.is_empty() {
            self.active_step = Some(self.steps.len() as u32 - 1);
        }
    }
}
