//! Job data model: source file, lifecycle phase, result handle, and the
//! snapshot the orchestrator publishes to its observers.
//!
//! The snapshot is a read model: the presentation layer only ever sees a
//! [`JobSnapshot`], never the orchestrator's internals, so the invariants
//! documented on its fields are the full observable contract.

use crate::formats::{OCTET_STREAM, TargetFormat};
use serde::Serialize;
use std::sync::Arc;

/// The file a job converts: opaque bytes plus declared name and MIME type.
/// Immutable once a job starts.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Declared file name, used for the upload path and to derive the
    /// converted file's suggested name.
    pub name: String,
    /// Declared MIME type, if the caller knows it. Sent as the upload
    /// `Content-Type`; `application/octet-stream` when absent.
    pub mime_type: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            bytes,
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// The `Content-Type` to send when uploading.
    pub fn content_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(OCTET_STREAM)
    }
}

/// A job's position in the orchestration state machine.
///
/// Transitions only along these edges (plus `reset()` from anywhere):
///
/// ```text
/// Idle → Submitting → Uploading → Polling → Decoding → Completed
///             │            │         │          └──────→ Failed
///             └────────────┴─────────┴─────────────────→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// No job; the only state `start()` and terminal states return to.
    Idle,
    /// Asking the service to create a pending job.
    Submitting,
    /// Transferring source bytes to the service.
    Uploading,
    /// Waiting for the service to finish, polled on a fixed interval.
    Polling,
    /// Fetching and base64-decoding the finished artifact.
    Decoding,
    /// Terminal: the result handle is available.
    Completed,
    /// Terminal: the error detail is available.
    Failed,
}

impl Phase {
    /// True while the job occupies the single active-job slot.
    /// `start()` is rejected exactly when this holds.
    pub fn is_active(self) -> bool {
        !matches!(self, Phase::Idle | Phase::Completed | Phase::Failed)
    }
}

/// The converted artifact: an owned byte buffer plus download metadata.
///
/// The orchestrator never triggers a save/open action itself — turning this
/// into a user-visible download is the presentation layer's job.
#[derive(Debug, Clone)]
pub struct ResultHandle {
    /// Decoded result bytes.
    pub bytes: Vec<u8>,
    /// MIME type derived from the job's target format.
    pub mime_type: &'static str,
    /// Suggested download filename, e.g. `"a.pdf"` for source `"a.txt"`.
    pub file_name: String,
}

/// Suggested filename for a converted file: the source name up to the first
/// dot, plus the target extension. `"archive.tar.gz"` converted to pdf
/// becomes `"archive.pdf"`; an empty source name becomes `"converted.pdf"`.
pub fn suggested_file_name(source_name: &str, target: TargetFormat) -> String {
    let stem = source_name.split('.').next().unwrap_or("");
    let stem = if stem.is_empty() { "converted" } else { stem };
    format!("{stem}.{}", target.token())
}

/// Point-in-time view of the active job, published on every transition.
///
/// Field invariants:
/// * `remote_job_id` is set once a submit has succeeded, and is retained in
///   `Failed` for diagnostics when a later step fails.
/// * `result` is set iff `phase == Completed`.
/// * `error_detail` is set iff `phase == Failed`.
/// * `progress_percent` is monotonically non-decreasing while the job is
///   active; it is advisory checkpoint progress, not a measured percentage.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub phase: Phase,
    pub progress_percent: u8,
    /// Identifier assigned by the remote service; absent until submission
    /// succeeds.
    pub remote_job_id: Option<String>,
    /// The target format of the job in flight, for display.
    pub target_format: Option<TargetFormat>,
    pub error_detail: Option<String>,
    pub result: Option<Arc<ResultHandle>>,
}

impl JobSnapshot {
    /// The snapshot of a freshly created (or reset) orchestrator.
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            progress_percent: 0,
            remote_job_id: None,
            target_format: None,
            error_detail: None,
            result: None,
        }
    }
}

impl Default for JobSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggested_name_replaces_extension() {
        assert_eq!(suggested_file_name("a.txt", TargetFormat::Pdf), "a.pdf");
        assert_eq!(
            suggested_file_name("photo.jpeg", TargetFormat::Webp),
            "photo.webp"
        );
    }

    #[test]
    fn suggested_name_truncates_at_first_dot() {
        assert_eq!(
            suggested_file_name("archive.tar.gz", TargetFormat::Pdf),
            "archive.pdf"
        );
    }

    #[test]
    fn suggested_name_handles_missing_stem() {
        assert_eq!(suggested_file_name("", TargetFormat::Png), "converted.png");
        assert_eq!(
            suggested_file_name(".hidden", TargetFormat::Png),
            "converted.png"
        );
        assert_eq!(suggested_file_name("noext", TargetFormat::Mp3), "noext.mp3");
    }

    #[test]
    fn active_phases() {
        for phase in [Phase::Submitting, Phase::Uploading, Phase::Polling, Phase::Decoding] {
            assert!(phase.is_active(), "{phase:?} should be active");
        }
        for phase in [Phase::Idle, Phase::Completed, Phase::Failed] {
            assert!(!phase.is_active(), "{phase:?} should not be active");
        }
    }

    #[test]
    fn idle_snapshot_is_empty() {
        let s = JobSnapshot::idle();
        assert_eq!(s.phase, Phase::Idle);
        assert_eq!(s.progress_percent, 0);
        assert!(s.remote_job_id.is_none());
        assert!(s.error_detail.is_none());
        assert!(s.result.is_none());
    }

    #[test]
    fn source_file_content_type_fallback() {
        let f = SourceFile::new("a.bin", vec![1, 2, 3]);
        assert_eq!(f.content_type(), "application/octet-stream");
        let f = f.with_mime_type("text/plain");
        assert_eq!(f.content_type(), "text/plain");
    }
}
