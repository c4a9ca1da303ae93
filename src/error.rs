//! Error types for the remote-convert library.
//!
//! The taxonomy mirrors who can fix the problem:
//!
//! * Precondition errors ([`ConvertError::MissingApiKey`],
//!   [`ConvertError::EmptySourceFile`]) — the caller must fix its input
//!   before retrying; no network call was made.
//! * [`ConvertError::Auth`] — the remote service rejected the credential;
//!   retrying without a new key will not help.
//! * [`ConvertError::Network`] — transport failure, potentially transient.
//! * [`ConvertError::Service`] / [`ConvertError::PayloadTooLarge`] — the
//!   service returned a defined failure, carrying its detail string when
//!   the response body provided one.
//! * [`ConvertError::Decode`] — the finished artifact could not be decoded.
//!
//! None of these are retried automatically by the orchestrator: every error
//! terminates the active job, and retry is a user-initiated
//! `reset()` + `start()`.

use thiserror::Error;

/// All errors returned by the remote-convert library.
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    // ── Precondition errors ───────────────────────────────────────────────
    /// No API key configured, neither explicitly nor via `CONVERTIO_API_KEY`.
    #[error(
        "No API key configured.\n\
         Set one with ConverterConfig::builder().api_key(...) or export CONVERTIO_API_KEY."
    )]
    MissingApiKey,

    /// The source file has no bytes to upload.
    #[error("Source file '{name}' is empty — nothing to convert")]
    EmptySourceFile { name: String },

    /// `start()` was called while another job is still in flight.
    #[error("A conversion job is already active; call reset() before starting another")]
    JobActive,

    // ── Remote service errors ─────────────────────────────────────────────
    /// The service rejected the credential (HTTP 401/403).
    #[error("Authentication rejected by the conversion service: {detail}")]
    Auth { detail: String },

    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("Network error talking to the conversion service: {detail}")]
    Network { detail: String },

    /// The service refused the upload as too large (HTTP 413).
    #[error("The conversion service rejected the file as too large")]
    PayloadTooLarge,

    /// Any other defined failure from the service (non-success response,
    /// remote job reported as failed, malformed response body).
    #[error("Conversion service error: {detail}")]
    Service { detail: String },

    // ── Local errors ──────────────────────────────────────────────────────
    /// The finished artifact was not valid base64.
    #[error("Failed to decode the converted result: {detail}")]
    Decode { detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConvertError {
    /// True for errors the caller must fix locally before any retry makes
    /// sense. These never involve a network round-trip.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ConvertError::MissingApiKey | ConvertError::EmptySourceFile { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_mentions_env_var() {
        let msg = ConvertError::MissingApiKey.to_string();
        assert!(msg.contains("CONVERTIO_API_KEY"), "got: {msg}");
    }

    #[test]
    fn empty_source_names_file() {
        let e = ConvertError::EmptySourceFile {
            name: "report.docx".into(),
        };
        assert!(e.to_string().contains("report.docx"));
    }

    #[test]
    fn service_error_carries_detail() {
        let e = ConvertError::Service {
            detail: "bad input".into(),
        };
        assert!(e.to_string().contains("bad input"));
    }

    #[test]
    fn precondition_classification() {
        assert!(ConvertError::MissingApiKey.is_precondition());
        assert!(ConvertError::EmptySourceFile { name: "a".into() }.is_precondition());
        assert!(!ConvertError::JobActive.is_precondition());
        assert!(!ConvertError::Network { detail: "x".into() }.is_precondition());
    }
}
