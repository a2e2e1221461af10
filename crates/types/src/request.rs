// crates/types/src/request.rs
//! Start request bodies for each job kind.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::job::JobKind;

/// Add a single repository by URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "camelCase")]
pub struct CloneRequest {
    pub url: String,
    #[serde(default)]
    pub create_project: bool,
}

/// How the backend groups bulk-imported repositories into projects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "snake_case")]
pub enum ProjectCreationMode {
    #[default]
    None,
    PerOwner,
    Single,
}

/// Import every repository of one or more GitHub users / organizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "camelCase")]
pub struct BulkImportRequest {
    /// One or more sources separated by whitespace, commas or semicolons.
    pub github_url: String,
    pub project_creation_mode: ProjectCreationMode,
    pub project_name_template: String,
    pub skip_confirmation: bool,
    pub repo_limit: u32,
    pub exclude_forks: bool,
    /// Number of items the caller expects, when known up front. Only feeds
    /// the optimistic estimate; never sent to the backend.
    #[serde(skip)]
    #[ts(skip)]
    pub expected_items: Option<usize>,
}

impl BulkImportRequest {
    pub fn new(github_url: impl Into<String>) -> Self {
        Self {
            github_url: github_url.into(),
            project_creation_mode: ProjectCreationMode::None,
            project_name_template: "{owner}".to_string(),
            skip_confirmation: true,
            repo_limit: 99_999,
            exclude_forks: false,
            expected_items: None,
        }
    }
}

/// Render a project's Gource visualization to video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "camelCase")]
pub struct FadeFilter {
    pub enabled: bool,
    /// Seconds.
    pub duration_in: f64,
    /// Seconds.
    pub duration_out: f64,
}

impl Default for FadeFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_in: 3.0,
            duration_out: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
pub struct MusicFilter {
    pub enabled: bool,
    /// Path of a previously uploaded audio file.
    pub file: String,
    /// `0.0..=1.0`
    pub volume: f64,
}

impl Default for MusicFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            file: String::new(),
            volume: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Low,
    Medium,
    #[default]
    High,
}

/// Re-encode an existing render with FFmpeg filters applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../bindings/"))]
pub struct FilterRequest {
    /// Render to process. Part of the URL, not the body.
    #[serde(skip)]
    #[ts(skip)]
    pub render_id: String,
    pub fade: FadeFilter,
    pub music: MusicFilter,
    pub quality: Quality,
}

/// Anything that starts a tracked job.
#[derive(Debug, Clone, PartialEq)]
pub enum StartRequest {
    Clone(CloneRequest),
    BulkImport(BulkImportRequest),
    Render(RenderRequest),
    Filter(FilterRequest),
}

impl StartRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            StartRequest::Clone(_) => JobKind::Clone,
            StartRequest::BulkImport(_) => JobKind::BulkImport,
            StartRequest::Render(_) | StartRequest::Filter(_) => JobKind::Render,
        }
    }

    /// Item count used to size per-item optimistic increments.
    pub fn expected_items(&self) -> Option<usize> {
        match self {
            StartRequest::BulkImport(req) => req.expected_items,
            _ => None,
        }
    }

    /// Short human-readable description for logs and UI headers.
    pub fn describe(&self) -> String {
        match self {
            StartRequest::Clone(req) => format!("clone {}", req.url),
            StartRequest::BulkImport(req) => format!("bulk import {}", req.github_url),
            StartRequest::Render(req) => format!("render project {}", req.project_id),
            StartRequest::Filter(req) => format!("apply filters to render {}", req.render_id),
        }
    }
}
