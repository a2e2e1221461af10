// crates/types/src/payload.rs
//! Status payloads returned by the backend's job status endpoints.
//!
//! All three job kinds share one envelope. The raw JSON is deliberately
//! lenient: status strings are normalized through [`JobStatus::from_wire`],
//! the bulk-import repository list is accepted as `items`, and counters the
//! backend only reports for some kinds are optional.

use serde::Deserialize;

use crate::job::{ItemRecord, JobStatus};

/// One status response, normalized.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawStatusPayload")]
pub struct StatusPayload {
    pub status: JobStatus,
    /// Status string exactly as the backend sent it (for logging).
    pub raw_status: Option<String>,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub step: Option<u32>,
    pub items: Option<Vec<ItemRecord>>,
    pub error: Option<String>,
    /// Bulk imports: repositories found across all sources.
    pub total_items: Option<u32>,
    /// Bulk imports: repositories processed so far, failures included.
    pub processed_items: Option<u32>,
    /// Bulk imports: repositories that failed to import.
    pub failed_items: Option<u32>,
    /// Bulk imports: number of dashboard projects created.
    pub created_projects: Option<u32>,
    /// The job is terminal but derived assets are still being produced.
    pub processing_assets: Option<bool>,
    pub owner: Option<String>,
}

impl StatusPayload {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            raw_status: Some(status.as_str().to_string()),
            progress: None,
            message: None,
            step: None,
            items: None,
            error: None,
            total_items: None,
            processed_items: None,
            failed_items: None,
            created_projects: None,
            processing_assets: None,
            owner: None,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_items(mut self, items: Vec<ItemRecord>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Whether the raw status string was one the normalizer recognizes.
    /// A missing status counts as recognized (it means `pending`).
    pub fn status_recognized(&self) -> bool {
        self.raw_status
            .as_deref()
            .map_or(true, |raw| JobStatus::from_wire(raw).is_some())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatusPayload {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    step: Option<i64>,
    #[serde(default, alias = "repositories")]
    items: Option<Vec<ItemRecord>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    total_repos: Option<u32>,
    #[serde(default)]
    completed_repos: Option<u32>,
    #[serde(default)]
    failed_repos: Option<u32>,
    #[serde(default)]
    created_projects: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    processing_assets: Option<bool>,
    #[serde(default)]
    owner: Option<String>,
}

impl From<RawStatusPayload> for StatusPayload {
    fn from(raw: RawStatusPayload) -> Self {
        let status = raw
            .status
            .as_deref()
            .and_then(JobStatus::from_wire)
            .unwrap_or(if raw.status.is_some() {
                JobStatus::Active
            } else {
                JobStatus::Pending
            });
        Self {
            status,
            raw_status: raw.status,
            progress: raw.progress.filter(|p| p.is_finite()),
            message: raw.message,
            step: raw.step.and_then(|s| u32::try_from(s).ok()),
            items: raw.items,
            error: raw.error,
            total_items: raw.total_repos,
            processed_items: raw.completed_repos,
            failed_items: raw.failed_repos,
            created_projects: raw.created_projects.map(|p| p.len() as u32),
            processing_assets: raw.processing_assets,
            owner: raw.owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ItemStatus;

    #[test]
    fn test_clone_status_deserialize() {
        let json = r#"{
            "progress": 20,
            "status": "cloning",
            "step": 1,
            "message": "Cloning repository from https://github.com/acme/site..."
        }"#;
        let payload: StatusPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.status, JobStatus::Active);
        assert_eq!(payload.raw_status.as_deref(), Some("cloning"));
        assert_eq!(payload.progress, Some(20.0));
        assert_eq!(payload.step, Some(1));
        assert!(payload.status_recognized());
    }

    #[test]
    fn test_bulk_status_deserialize() {
        let json = r#"{
            "status": "completed",
            "progress": 100,
            "message": "Import completed.",
            "totalRepos": 3,
            "completedRepos": 3,
            "failedRepos": 1,
            "repositories": [{"name": "a"}, {"name": "c"}],
            "createdProjects": [{"id": "p1"}],
            "processingAssets": true
        }"#;
        let payload: StatusPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.status, JobStatus::Completed);
        assert_eq!(payload.total_items, Some(3));
        assert_eq!(payload.processed_items, Some(3));
        assert_eq!(payload.failed_items, Some(1));
        assert_eq!(payload.created_projects, Some(1));
        assert_eq!(payload.processing_assets, Some(true));
        let items = payload.items.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.status == ItemStatus::Completed));
    }

    #[test]
    fn test_unknown_status_maps_to_active() {
        let payload: StatusPayload = serde_json::from_str(r#"{"status": "warming_up"}"#).unwrap();
        assert_eq!(payload.status, JobStatus::Active);
        assert!(!payload.status_recognized());
    }

    #[test]
    fn test_missing_status_is_pending() {
        let payload: StatusPayload = serde_json::from_str(r#"{"progress": 3}"#).unwrap();
        assert_eq!(payload.status, JobStatus::Pending);
        assert!(payload.status_recognized());
    }

    #[test]
    fn test_negative_step_is_dropped() {
        let payload: StatusPayload =
            serde_json::from_str(r#"{"status": "preparing", "step": -1}"#).unwrap();
        assert_eq!(payload.step, None);
    }

    #[test]
    fn test_failed_payload_carries_error() {
        let payload: StatusPayload = serde_json::from_str(
            r#"{"status": "failed", "error": "Error cloning repository: not found", "progress": 0}"#,
        )
        .unwrap();
        assert_eq!(payload.status, JobStatus::Failed);
        assert_eq!(
            payload.error.as_deref(),
            Some("Error cloning repository: not found")
        );
    }
}
