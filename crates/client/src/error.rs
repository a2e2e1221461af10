// crates/client/src/error.rs
use gource_studio_jobs::BackendError;
use serde::Deserialize;

/// Errors from the dashboard REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body was not the JSON we expected.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A clone was requested for a GitHub account rather than a repository.
    #[error("{message}")]
    SuggestBulkImport { github_url: String, message: String },
}

impl From<ClientError> for BackendError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Request(e) => BackendError::Transport(e.to_string()),
            ClientError::Api { status, message } => BackendError::Api { status, message },
            ClientError::Decode(e) => BackendError::InvalidResponse(e.to_string()),
            ClientError::SuggestBulkImport { github_url, .. } => {
                BackendError::SuggestBulkImport { github_url }
            }
        }
    }
}

/// Shape of the backend's error bodies: `{ error, details }`, or
/// `{ suggestBulkImport, githubUrl, message }` for account URLs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub suggest_bulk_import: bool,
    #[serde(default)]
    pub github_url: Option<String>,
}

impl ErrorBody {
    /// Build the error for a non-2xx response with raw `body`.
    pub(crate) fn into_error(status: u16, body: &str) -> ClientError {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        if status == 422 && parsed.suggest_bulk_import {
            if let Some(github_url) = parsed.github_url {
                let message = parsed
                    .message
                    .unwrap_or_else(|| format!("Use a bulk import for {github_url}"));
                return ClientError::SuggestBulkImport {
                    github_url,
                    message,
                };
            }
        }
        let message = match (parsed.error.or(parsed.message), parsed.details) {
            (Some(error), Some(details)) => format!("{error}: {details}"),
            (Some(error), None) => error,
            (None, _) if body.trim().is_empty() => "<empty body>".to_string(),
            (None, _) => body.trim().to_string(),
        };
        ClientError::Api { status, message }
    }
}
