// crates/client/src/api.rs
//! REST client for the dashboard's job endpoints.
//!
//! Start endpoints answer `202` with an id field that differs per kind;
//! status endpoints share the [`StatusPayload`] envelope.

use async_trait::async_trait;
use gource_studio_jobs::{BackendError, JobBackend, StartResponse};
use gource_studio_types::{
    BulkImportRequest, CloneRequest, FilterRequest, JobId, JobKind, RenderRequest, StartRequest,
    StatusPayload,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ClientError, ErrorBody};

/// HTTP client for one dashboard backend.
#[derive(Debug, Clone)]
pub struct StudioApi {
    client: reqwest::Client,
    base_url: String,
}

impl StudioApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /repositories`
    pub async fn start_clone(&self, request: &CloneRequest) -> Result<StartResponse, ClientError> {
        let body: Value = self.post_json("/repositories", request).await?;
        start_response(body, &["cloneId"])
    }

    /// `POST /repositories/bulk-import`
    pub async fn start_bulk_import(
        &self,
        request: &BulkImportRequest,
    ) -> Result<StartResponse, ClientError> {
        let body: Value = self.post_json("/repositories/bulk-import", request).await?;
        start_response(body, &["bulkImportId"])
    }

    /// `POST /renders`
    pub async fn start_render(&self, request: &RenderRequest) -> Result<StartResponse, ClientError> {
        let body: Value = self.post_json("/renders", request).await?;
        start_response(body, &["id"])
    }

    /// `POST /renders/{id}/ffmpeg-process`
    ///
    /// The filtered video becomes a new render; its id is what gets polled.
    pub async fn apply_filters(&self, request: &FilterRequest) -> Result<StartResponse, ClientError> {
        let path = format!("/renders/{}/ffmpeg-process", request.render_id);
        let body: Value = self.post_json(&path, request).await?;
        start_response(body, &["renderId", "id"])
    }

    /// `GET /repositories/clone-status/{id}`
    pub async fn clone_status(&self, job_id: &JobId) -> Result<StatusPayload, ClientError> {
        self.get_json(&format!("/repositories/clone-status/{job_id}"))
            .await
    }

    /// `GET /repositories/bulk-import-status/{id}`
    pub async fn bulk_import_status(&self, job_id: &JobId) -> Result<StatusPayload, ClientError> {
        self.get_json(&format!("/repositories/bulk-import-status/{job_id}"))
            .await
    }

    /// `GET /renders/{id}/progress`
    pub async fn render_progress(&self, job_id: &JobId) -> Result<StatusPayload, ClientError> {
        self.get_json(&format!("/renders/{job_id}/progress")).await
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        Self::parse_response(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        tracing::trace!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        Self::parse_response(response).await
    }

    /// Ensure the response has a success status code, turning error bodies
    /// into a typed [`ClientError`].
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ErrorBody::into_error(status.as_u16(), &body));
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Pick the job id out of a start response. A response with none of the
/// id fields describes work that already finished.
fn start_response(body: Value, id_fields: &[&str]) -> Result<StartResponse, ClientError> {
    for field in id_fields {
        match body.get(field) {
            Some(Value::String(id)) if !id.is_empty() => {
                return Ok(StartResponse::Accepted(JobId::new(id.as_str())))
            }
            Some(Value::Number(id)) => return Ok(StartResponse::Accepted(JobId::new(id.to_string()))),
            _ => {}
        }
    }
    tracing::debug!(fields = ?id_fields, "Start response carried no job id, treating as finished");
    let payload: StatusPayload = serde_json::from_value(body)?;
    Ok(StartResponse::Finished(payload))
}

#[async_trait]
impl JobBackend for StudioApi {
    async fn start(&self, request: &StartRequest) -> Result<StartResponse, BackendError> {
        let result = match request {
            StartRequest::Clone(req) => self.start_clone(req).await,
            StartRequest::BulkImport(req) => self.start_bulk_import(req).await,
            StartRequest::Render(req) => self.start_render(req).await,
            StartRequest::Filter(req) => self.apply_filters(req).await,
        };
        result.map_err(BackendError::from)
    }

    async fn status(&self, kind: JobKind, job_id: &JobId) -> Result<StatusPayload, BackendError> {
        let result = match kind {
            JobKind::Clone => self.clone_status(job_id).await,
            JobKind::BulkImport => self.bulk_import_status(job_id).await,
            JobKind::Render => self.render_progress(job_id).await,
        };
        result.map_err(BackendError::from)
    }
}
