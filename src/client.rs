//! Remote service access: the [`ConversionService`] seam and its production
//! implementation, [`RemoteConversionClient`].
//!
//! Every operation is a single request/response over HTTPS; no state is
//! retained across calls beyond the credential and the connection pool, and
//! no retries happen at this layer — each call surfaces its outcome exactly
//! once and the orchestrator decides what to do with a failure.
//!
//! ## Why a trait seam?
//!
//! The orchestrator holds an `Arc<dyn ConversionService>` rather than the
//! concrete client, so the whole state machine is testable against a
//! scripted in-memory service without a network. The production client is a
//! thin mapping from the trait calls to the service's wire contract.

use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::formats::TargetFormat;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Coarse status of the most recent remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    /// Still queued or converting.
    Pending,
    /// Finished; the artifact can be fetched.
    Finished,
    /// The service gave up on the job.
    Failed,
}

/// Result of one status poll.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub status: RemoteStatus,
    /// The service's error string, when it reported one alongside `Failed`.
    pub error_detail: Option<String>,
}

/// The four operations the orchestrator needs from the remote service.
///
/// `poll_status` is a coarse, service-defined query: the wire contract has
/// no per-job status endpoint, only "most recent job(s) visible to this
/// credential". Callers must treat the outcome as the status of the job
/// they most recently submitted — the orchestrator's single-active-job slot
/// keeps that assumption sound within one process, but two processes
/// sharing one credential can observe each other's jobs.
#[async_trait]
pub trait ConversionService: Send + Sync {
    /// Ask the service to create a pending job expecting an upload.
    /// Returns the remote job id.
    async fn submit_job(&self, target: TargetFormat) -> Result<String, ConvertError>;

    /// Transfer the source file's raw bytes to the job's upload endpoint.
    async fn upload_payload(
        &self,
        remote_job_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ConvertError>;

    /// Query the status of the most recently submitted job.
    async fn poll_status(&self) -> Result<PollOutcome, ConvertError>;

    /// Retrieve the finished artifact as a base64-encoded string.
    /// Only meaningful once `poll_status` reported [`RemoteStatus::Finished`].
    async fn fetch_result(&self, remote_job_id: &str) -> Result<String, ConvertError>;
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    apikey: &'a str,
    /// Always `"upload"`: the source arrives via a follow-up PUT, not a URL.
    input: &'static str,
    outputformat: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    data: SubmitData,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    id: String,
}

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    apikey: &'a str,
    status: &'static str,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Vec<ListEntry>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    data: DownloadData,
}

#[derive(Debug, Deserialize)]
struct DownloadData {
    content: String,
}

/// Shape of the service's non-success bodies: `{ "status": "error", "error": "..." }`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

// ── Production client ────────────────────────────────────────────────────

/// HTTPS client for a Convertio-compatible conversion service.
pub struct RemoteConversionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RemoteConversionClient {
    /// Build a client from the config and a resolved API key.
    pub fn new(config: &ConverterConfig, api_key: String) -> Result<Self, ConvertError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConvertError::Network {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
        })
    }

    /// Map a non-success response to the error taxonomy, pulling the
    /// service's own error string out of the body when it provides one.
    async fn classify_failure(response: reqwest::Response) -> ConvertError {
        let status = response.status();
        let detail = match response.json::<ErrorBody>().await {
            Ok(ErrorBody { error: Some(msg) }) if !msg.is_empty() => msg,
            _ => format!("HTTP {status}"),
        };

        match status.as_u16() {
            401 | 403 => ConvertError::Auth { detail },
            413 => ConvertError::PayloadTooLarge,
            _ => ConvertError::Service { detail },
        }
    }
}

/// Build the upload endpoint URL. The file name is pushed as a proper path
/// segment so names containing spaces or reserved characters (`?`, `#`, `/`)
/// are percent-encoded instead of producing a malformed URL.
fn upload_url(
    base_url: &str,
    remote_job_id: &str,
    file_name: &str,
) -> Result<reqwest::Url, ConvertError> {
    let mut url = reqwest::Url::parse(base_url).map_err(|e| {
        ConvertError::InvalidConfig(format!("base_url '{base_url}' is not a valid URL: {e}"))
    })?;
    url.path_segments_mut()
        .map_err(|()| {
            ConvertError::InvalidConfig(format!("base_url '{base_url}' cannot carry a path"))
        })?
        .push("convert")
        .push(remote_job_id)
        .push(file_name);
    Ok(url)
}

fn transport_error(e: reqwest::Error) -> ConvertError {
    ConvertError::Network {
        detail: e.to_string(),
    }
}

fn malformed_body(context: &str, e: impl std::fmt::Display) -> ConvertError {
    ConvertError::Service {
        detail: format!("malformed {context} response: {e}"),
    }
}

#[async_trait]
impl ConversionService for RemoteConversionClient {
    async fn submit_job(&self, target: TargetFormat) -> Result<String, ConvertError> {
        let url = format!("{}/convert", self.base_url);
        debug!(%target, "submitting conversion job");

        let response = self
            .http
            .post(&url)
            .json(&SubmitRequest {
                apikey: &self.api_key,
                input: "upload",
                outputformat: target.token(),
            })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| malformed_body("submit", e))?;

        debug!(remote_job_id = %body.data.id, "job accepted");
        Ok(body.data.id)
    }

    async fn upload_payload(
        &self,
        remote_job_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ConvertError> {
        let url = upload_url(&self.base_url, remote_job_id, file_name)?;
        debug!(remote_job_id, file_name, size = bytes.len(), "uploading source file");

        let response = self
            .http
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        Ok(())
    }

    async fn poll_status(&self) -> Result<PollOutcome, ConvertError> {
        let url = format!("{}/convert/list", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&ListRequest {
                apikey: &self.api_key,
                status: "all",
                count: 1,
            })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| malformed_body("list", e))?;

        let Some(entry) = body.data.into_iter().next() else {
            // The credential has no visible jobs even though we submitted
            // one; the list query is not scoped to an id, so treat this as
            // a service-side inconsistency rather than "still pending".
            warn!("status list returned no entries for an in-flight job");
            return Err(ConvertError::Service {
                detail: "status list returned no entries".into(),
            });
        };

        let status = match entry.status.as_str() {
            "finished" => RemoteStatus::Finished,
            "failed" => RemoteStatus::Failed,
            other => {
                debug!(status = other, "job still pending");
                RemoteStatus::Pending
            }
        };

        Ok(PollOutcome {
            status,
            error_detail: entry.error,
        })
    }

    async fn fetch_result(&self, remote_job_id: &str) -> Result<String, ConvertError> {
        let url = format!("{}/convert/{remote_job_id}/dl", self.base_url);
        debug!(remote_job_id, "fetching converted result");

        let response = self.http.get(&url).send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        let body: DownloadResponse = response
            .json()
            .await
            .map_err(|e| malformed_body("download", e))?;

        Ok(body.data.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_wire_shape() {
        let req = SubmitRequest {
            apikey: "k",
            input: "upload",
            outputformat: "pdf",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "apikey": "k", "input": "upload", "outputformat": "pdf" })
        );
    }

    #[test]
    fn list_request_wire_shape() {
        let req = ListRequest {
            apikey: "k",
            status: "all",
            count: 1,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "apikey": "k", "status": "all", "count": 1 })
        );
    }

    #[test]
    fn submit_response_parses() {
        let body: SubmitResponse =
            serde_json::from_str(r#"{ "data": { "id": "abc123" } }"#).unwrap();
        assert_eq!(body.data.id, "abc123");
    }

    #[test]
    fn list_response_parses_with_and_without_error() {
        let body: ListResponse = serde_json::from_str(
            r#"{ "data": [ { "status": "failed", "error": "bad input" } ] }"#,
        )
        .unwrap();
        assert_eq!(body.data[0].status, "failed");
        assert_eq!(body.data[0].error.as_deref(), Some("bad input"));

        let body: ListResponse =
            serde_json::from_str(r#"{ "data": [ { "status": "convert" } ] }"#).unwrap();
        assert_eq!(body.data[0].status, "convert");
        assert!(body.data[0].error.is_none());
    }

    #[test]
    fn list_response_tolerates_empty_data() {
        let body: ListResponse = serde_json::from_str(r#"{ "data": [] }"#).unwrap();
        assert!(body.data.is_empty());
        let body: ListResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(body.data.is_empty());
    }

    #[test]
    fn download_response_parses() {
        let body: DownloadResponse =
            serde_json::from_str(r#"{ "data": { "content": "aGVsbG8=" } }"#).unwrap();
        assert_eq!(body.data.content, "aGVsbG8=");
    }

    #[test]
    fn upload_url_percent_encodes_file_name() {
        let url = upload_url("https://api.convertio.co", "job-1", "my report?.txt").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.convertio.co/convert/job-1/my%20report%3F.txt"
        );

        let url = upload_url("https://api.convertio.co", "job-1", "notes#draft.md").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.convertio.co/convert/job-1/notes%23draft.md"
        );
    }

    #[test]
    fn upload_url_leaves_plain_names_untouched() {
        let url = upload_url("https://api.convertio.co", "abc123", "a.txt").unwrap();
        assert_eq!(url.as_str(), "https://api.convertio.co/convert/abc123/a.txt");
    }

    #[test]
    fn error_body_parses() {
        let body: ErrorBody =
            serde_json::from_str(r#"{ "status": "error", "error": "This API Key is invalid" }"#)
                .unwrap();
        assert_eq!(body.error.as_deref(), Some("This API Key is invalid"));
    }
}
