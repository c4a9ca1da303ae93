//! # remote-convert
//!
//! Convert files by delegating to a remote Convertio-compatible conversion
//! service over HTTPS, with a small state machine that keeps a user-facing
//! phase and progress view consistent with the asynchronous job underneath.
//!
//! ## Why this crate?
//!
//! Talking to a hosted conversion API looks trivial until the lifecycle
//! details bite: the upload must not start before the job is accepted,
//! polling must stop the instant the job finishes, fails, or is discarded,
//! and a superseded job's in-flight requests must never overwrite a newer
//! job's state. This crate owns exactly that orchestration and hands the
//! embedding application a plain snapshot to render.
//!
//! ## Lifecycle Overview
//!
//! ```text
//! start(file, format)
//!  │
//!  ├─ 1. Submit   POST /convert            job accepted, id assigned
//!  ├─ 2. Upload   PUT  /convert/{id}/{name}  raw source bytes
//!  ├─ 3. Poll     POST /convert/list       fixed 3 s interval until terminal
//!  ├─ 4. Fetch    GET  /convert/{id}/dl    base64-encoded artifact
//!  └─ 5. Decode   bytes + MIME + filename exposed as a ResultHandle
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remote_convert::{ConversionOrchestrator, ConverterConfig, Phase, SourceFile, TargetFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from CONVERTIO_API_KEY unless set explicitly
//!     let config = ConverterConfig::builder().build()?;
//!     let orchestrator = ConversionOrchestrator::new(config);
//!
//!     let source = SourceFile::new("notes.txt", std::fs::read("notes.txt")?)
//!         .with_mime_type("text/plain");
//!     orchestrator.start(source, TargetFormat::Pdf)?;
//!
//!     let mut state = orchestrator.subscribe();
//!     loop {
//!         state.changed().await?;
//!         let snapshot = state.borrow_and_update().clone();
//!         println!("{:?} — {}%", snapshot.phase, snapshot.progress_percent);
//!         match snapshot.phase {
//!             Phase::Completed => {
//!                 let result = snapshot.result.unwrap();
//!                 std::fs::write(&result.file_name, &result.bytes)?;
//!                 break;
//!             }
//!             Phase::Failed => {
//!                 eprintln!("failed: {}", snapshot.error_detail.unwrap_or_default());
//!                 break;
//!             }
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## What this crate does NOT do
//!
//! No conversion happens locally — the remote service is an opaque black
//! box behind its wire contract. There is no UI, no CLI, and no persisted
//! state; the orchestrator hands back an owned byte buffer plus metadata
//! and the embedding application decides how to present or save it.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod formats;
pub mod job;
pub mod orchestrator;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{ConversionService, PollOutcome, RemoteConversionClient, RemoteStatus};
pub use config::{ConverterConfig, ConverterConfigBuilder, DEFAULT_BASE_URL};
pub use error::ConvertError;
pub use formats::{mime_for_token, FormatCategory, TargetFormat, OCTET_STREAM};
pub use job::{suggested_file_name, JobSnapshot, Phase, ResultHandle, SourceFile};
pub use orchestrator::ConversionOrchestrator;
