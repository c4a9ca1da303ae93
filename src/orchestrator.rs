//! The conversion orchestration state machine.
//!
//! One [`ConversionOrchestrator`] owns a single active-job slot and drives
//! the full lifecycle against the remote service:
//!
//! ```text
//! Idle → Submitting → Uploading → Polling → Decoding → Completed
//!             │            │         │          └──────→ Failed
//!             └────────────┴─────────┴─────────────────→ Failed
//! (any state) → reset() → Idle
//! ```
//!
//! ## Progress model
//!
//! The service exposes no byte-level progress, so the reported percentage is
//! a set of fixed checkpoints: 10 on submit, 30 once the job is accepted,
//! 50 once the upload completes, then +5 per pending poll tick capped at 90
//! so "waiting" never looks like "done". `Completed` reports 100.
//!
//! ## Cancellation
//!
//! Every spawned job sequence carries a generation token. All state
//! mutations re-check the token against the current generation under the
//! state lock and are discarded when stale, so a tick that resolves after
//! `reset()` is provably inert — the task is also aborted, but correctness
//! does not depend on the abort winning the race.
//!
//! ## Poll failure policy
//!
//! A remote-reported `failed` status is immediately terminal. A *transport*
//! error on a poll tick is treated as a transient hiccup and retried on the
//! next tick, up to `max_poll_transport_failures` consecutive failures,
//! after which the job fails with the last transport error.

use crate::client::{ConversionService, PollOutcome, RemoteConversionClient, RemoteStatus};
use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::formats::TargetFormat;
use crate::job::{suggested_file_name, JobSnapshot, Phase, ResultHandle, SourceFile};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// Advisory checkpoint values; see the module docs.
const PROGRESS_SUBMITTING: u8 = 10;
const PROGRESS_SUBMITTED: u8 = 30;
const PROGRESS_UPLOADED: u8 = 50;
const PROGRESS_POLL_STEP: u8 = 5;
const PROGRESS_POLL_CAP: u8 = 90;

/// Drives one conversion job at a time and publishes its state.
///
/// The presentation layer reads state via [`snapshot`](Self::snapshot) or
/// subscribes to every transition via [`subscribe`](Self::subscribe), and
/// dispatches intents through [`start`](Self::start) and
/// [`reset`](Self::reset).
pub struct ConversionOrchestrator {
    config: ConverterConfig,
    service: Option<Arc<dyn ConversionService>>,
    shared: Arc<Shared>,
}

struct Shared {
    control: Mutex<Control>,
    state_tx: watch::Sender<JobSnapshot>,
}

struct Control {
    /// Bumped on every accepted `start()` and every `reset()`. A spawned
    /// sequence only mutates state while its captured value still matches.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Shared {
    /// Apply `f` to the published snapshot iff `generation` is still
    /// current. The check and the mutation happen under one lock so a
    /// stale task can never interleave with a newer job's writes.
    fn update_if_current(&self, generation: u64, f: impl FnOnce(&mut JobSnapshot)) -> bool {
        let control = self.control.lock().expect("state lock poisoned");
        if control.generation != generation {
            debug!(generation, current = control.generation, "discarding stale job update");
            return false;
        }
        self.state_tx.send_modify(f);
        true
    }

    /// Terminal failure: set `Failed` and the error detail, drop any
    /// partial result, but keep `remote_job_id` for diagnostics.
    fn fail_if_current(&self, generation: u64, error: &ConvertError) -> bool {
        let applied = self.update_if_current(generation, |s| {
            s.phase = Phase::Failed;
            s.error_detail = Some(error.to_string());
            s.result = None;
        });
        if applied {
            warn!(%error, "conversion job failed");
        }
        applied
    }
}

impl ConversionOrchestrator {
    /// Orchestrator backed by the production [`RemoteConversionClient`].
    ///
    /// The HTTP client is built lazily inside [`start`](Self::start), after
    /// the API key resolves — a missing credential must surface as a
    /// precondition failure, not as a construction error or a deferred 401.
    pub fn new(config: ConverterConfig) -> Self {
        Self::build(config, None)
    }

    /// Orchestrator backed by a caller-supplied service implementation.
    ///
    /// The seam used by tests and by callers that need middleware around
    /// the wire client; the state machine is identical.
    pub fn with_service(config: ConverterConfig, service: Arc<dyn ConversionService>) -> Self {
        Self::build(config, Some(service))
    }

    fn build(config: ConverterConfig, service: Option<Arc<dyn ConversionService>>) -> Self {
        let (state_tx, _) = watch::channel(JobSnapshot::idle());
        Self {
            config,
            service,
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    generation: 0,
                    task: None,
                }),
                state_tx,
            }),
        }
    }

    /// The current job state.
    pub fn snapshot(&self) -> JobSnapshot {
        self.shared.state_tx.borrow().clone()
    }

    /// Watch every state transition. The receiver always starts with the
    /// current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.state_tx.subscribe()
    }

    /// Begin converting `source` to `target`.
    ///
    /// Rejected with [`ConvertError::JobActive`] — leaving the existing job
    /// untouched — while a job is in flight. Precondition failures (missing
    /// API key, empty source) transition the slot to `Failed` with the
    /// error detail set, make no network call, and also return the error.
    ///
    /// On acceptance the phase is `Submitting` before this method returns;
    /// the submit → upload → poll → decode sequence then runs on a spawned
    /// task and is observable via [`subscribe`](Self::subscribe).
    pub fn start(&self, source: SourceFile, target: TargetFormat) -> Result<(), ConvertError> {
        let mut control = self.shared.control.lock().expect("state lock poisoned");

        if self.shared.state_tx.borrow().phase.is_active() {
            return Err(ConvertError::JobActive);
        }

        // A terminal job's task has finished; a fresh generation makes any
        // laggard writes from it inert either way.
        control.generation += 1;
        if let Some(task) = control.task.take() {
            task.abort();
        }
        let generation = control.generation;

        let accepted = self
            .check_preconditions(&source)
            .and_then(|key| self.resolve_service(key));

        let service = match accepted {
            Ok(service) => service,
            Err(error) => {
                self.shared.state_tx.send_replace(JobSnapshot {
                    phase: Phase::Failed,
                    progress_percent: 0,
                    remote_job_id: None,
                    target_format: Some(target),
                    error_detail: Some(error.to_string()),
                    result: None,
                });
                return Err(error);
            }
        };

        info!(file = %source.name, %target, "starting conversion job");
        self.shared.state_tx.send_replace(JobSnapshot {
            phase: Phase::Submitting,
            progress_percent: PROGRESS_SUBMITTING,
            remote_job_id: None,
            target_format: Some(target),
            error_detail: None,
            result: None,
        });

        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        control.task = Some(tokio::spawn(async move {
            run_job(shared, service, config, generation, source, target).await;
        }));

        Ok(())
    }

    /// Discard the current job and return to `Idle`.
    ///
    /// Always legal. Clears every job field, cancels the spawned sequence,
    /// and guarantees no tick scheduled for the discarded job mutates state
    /// afterwards.
    pub fn reset(&self) {
        let mut control = self.shared.control.lock().expect("state lock poisoned");
        control.generation += 1;
        if let Some(task) = control.task.take() {
            task.abort();
        }
        debug!(generation = control.generation, "orchestrator reset");
        self.shared.state_tx.send_replace(JobSnapshot::idle());
    }

    fn check_preconditions(&self, source: &SourceFile) -> Result<String, ConvertError> {
        let key = self.config.resolve_api_key()?;
        if source.bytes.is_empty() {
            return Err(ConvertError::EmptySourceFile {
                name: source.name.clone(),
            });
        }
        Ok(key)
    }

    fn resolve_service(&self, api_key: String) -> Result<Arc<dyn ConversionService>, ConvertError> {
        match self.service {
            Some(ref service) => Ok(Arc::clone(service)),
            None => {
                let client = RemoteConversionClient::new(&self.config, api_key)?;
                Ok(Arc::new(client))
            }
        }
    }
}

/// The asynchronous submit → upload → poll → decode sequence for one job.
///
/// Steps are strictly sequential: each remote call fully completes before
/// the next is issued, and the poll loop awaits each status request before
/// sleeping for the next tick, so at most one request is ever outstanding.
async fn run_job(
    shared: Arc<Shared>,
    service: Arc<dyn ConversionService>,
    config: ConverterConfig,
    generation: u64,
    source: SourceFile,
    target: TargetFormat,
) {
    // ── Submit ───────────────────────────────────────────────────────────
    let remote_job_id = match service.submit_job(target).await {
        Ok(id) => id,
        Err(error) => {
            shared.fail_if_current(generation, &error);
            return;
        }
    };

    let id_for_state = remote_job_id.clone();
    if !shared.update_if_current(generation, |s| {
        s.phase = Phase::Uploading;
        s.remote_job_id = Some(id_for_state);
        s.progress_percent = PROGRESS_SUBMITTED;
    }) {
        return;
    }

    // ── Upload ───────────────────────────────────────────────────────────
    let upload = service
        .upload_payload(
            &remote_job_id,
            &source.name,
            source.bytes.clone(),
            source.content_type(),
        )
        .await;
    if let Err(error) = upload {
        // remote_job_id stays in the snapshot for diagnostics.
        shared.fail_if_current(generation, &error);
        return;
    }

    if !shared.update_if_current(generation, |s| {
        s.phase = Phase::Polling;
        s.progress_percent = PROGRESS_UPLOADED;
    }) {
        return;
    }
    info!(%remote_job_id, "upload complete, polling for completion");

    // ── Poll ─────────────────────────────────────────────────────────────
    let mut consecutive_transport_failures = 0u32;
    loop {
        tokio::time::sleep(config.poll_interval).await;

        // Cheap staleness check before spending a request on a dead job.
        if shared.control.lock().expect("state lock poisoned").generation != generation {
            return;
        }

        match service.poll_status().await {
            Ok(PollOutcome {
                status: RemoteStatus::Pending,
                ..
            }) => {
                consecutive_transport_failures = 0;
                shared.update_if_current(generation, |s| {
                    s.progress_percent =
                        (s.progress_percent + PROGRESS_POLL_STEP).min(PROGRESS_POLL_CAP);
                });
            }
            Ok(PollOutcome {
                status: RemoteStatus::Finished,
                ..
            }) => break,
            Ok(PollOutcome {
                status: RemoteStatus::Failed,
                error_detail,
            }) => {
                let error = ConvertError::Service {
                    detail: error_detail.unwrap_or_else(|| "Conversion failed".to_string()),
                };
                shared.fail_if_current(generation, &error);
                return;
            }
            Err(error @ ConvertError::Network { .. }) => {
                consecutive_transport_failures += 1;
                if consecutive_transport_failures >= config.max_poll_transport_failures {
                    shared.fail_if_current(generation, &error);
                    return;
                }
                warn!(
                    %error,
                    attempt = consecutive_transport_failures,
                    budget = config.max_poll_transport_failures,
                    "poll tick failed at transport level, will retry on next tick"
                );
            }
            Err(error) => {
                // Auth or service-defined failures are never transient.
                shared.fail_if_current(generation, &error);
                return;
            }
        }
    }

    // ── Decode ───────────────────────────────────────────────────────────
    if !shared.update_if_current(generation, |s| s.phase = Phase::Decoding) {
        return;
    }

    let encoded = match service.fetch_result(&remote_job_id).await {
        Ok(content) => content,
        Err(error) => {
            shared.fail_if_current(generation, &error);
            return;
        }
    };

    let bytes = match STANDARD.decode(encoded.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            let error = ConvertError::Decode {
                detail: e.to_string(),
            };
            shared.fail_if_current(generation, &error);
            return;
        }
    };

    let result = Arc::new(ResultHandle {
        bytes,
        mime_type: target.mime_type(),
        file_name: suggested_file_name(&source.name, target),
    });

    info!(
        %remote_job_id,
        file_name = %result.file_name,
        size = result.bytes.len(),
        "conversion complete"
    );
    shared.update_if_current(generation, |s| {
        s.phase = Phase::Completed;
        s.progress_percent = 100;
        s.error_detail = None;
        s.result = Some(result);
    });
}
