//! Transfer orchestration
//!
//! [`TransferOrchestrator::execute`] runs one [`OperationRequest`] to completion:
//! - [`resolver`] - classifies the primary response (reference, inline, message, error)
//! - [`fallback`] - re-submits an encode to the direct endpoint after a storage-upload failure
//!
//! An operation makes at most two attempts, strictly one after the other. Each
//! attempt has its own budget; exceeding it drops the in-flight request.

mod fallback;
pub mod resolver;


pub use fallback::is_storage_upload_failure;
pub use resolver::RawResponse;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result, TransferError};
use crate::request::build_form;
use crate::types::{AttemptKind, Event, Operation, OperationRequest, OperationResult};

/// One execution of a request against one endpoint
#[derive(Debug)]
pub(crate) struct TransferAttempt {
    /// Sequence number, unique per orchestrator
    id: u64,
    kind: AttemptKind,
    endpoint: String,
    /// Time allowed for the whole exchange
    budget: Duration,
    deadline: Instant,
    cancel: CancellationToken,
}

impl TransferAttempt {
    fn new(
        id: u64,
        kind: AttemptKind,
        endpoint: String,
        budget: Duration,
        parent: &CancellationToken,
    ) -> Self {
        Self {
            id,
            kind,
            endpoint,
            budget,
            deadline: Instant::now() + budget,
            cancel: parent.child_token(),
        }
    }
}

/// Executes requests against the service (cloneable - all fields are shared)
#[derive(Clone)]
pub struct TransferOrchestrator {
    pub(crate) config: Arc<Config>,
    pub(crate) http: reqwest::Client,
    pub(crate) event_tx: broadcast::Sender<Event>,
    next_attempt_id: Arc<AtomicU64>,
}

impl TransferOrchestrator {
    /// Create an orchestrator, validating the configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        // No client-wide timeout: every attempt carries its own budget
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::config("user_agent", format!("failed to create HTTP client: {}", e)))?;

        let (event_tx, _) = broadcast::channel(64);

        Ok(Self {
            config: Arc::new(config),
            http,
            event_tx,
            next_attempt_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// The configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to transfer events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    /// Execute a request with no external cancellation
    pub async fn execute(&self, request: &OperationRequest) -> Result<OperationResult> {
        self.execute_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Execute a request; cancelling `cancel` aborts whichever attempt is in flight
    pub async fn execute_with_cancel(
        &self,
        request: &OperationRequest,
        cancel: &CancellationToken,
    ) -> Result<OperationResult> {
        let mode = request.mode();
        let operation = request.operation();
        let profile = mode.profile();

        let response = self
            .send_attempt(
                request,
                AttemptKind::Primary,
                profile.primary_path(operation),
                cancel,
            )
            .await?;

        if response.is_success() {
            let result = resolver::resolve(&response, operation, profile).inspect_err(|e| {
                warn!(%mode, %operation, error = %e, "response did not have the expected shape");
            })?;
            info!(%mode, %operation, "transfer complete");
            return Ok(result);
        }

        let failure = resolver::classify_failure(&response);
        if operation == Operation::Encode
            && let Some(detail) =
                is_storage_upload_failure(&failure, &self.config.storage_failure_signature)
        {
            return self.fallback(request, detail, cancel).await;
        }

        error!(%mode, %operation, status = response.status, error = %failure, "transfer failed");
        Err(failure.into())
    }

    /// Send one attempt and buffer its response, within the attempt budget
    pub(crate) async fn send_attempt(
        &self,
        request: &OperationRequest,
        kind: AttemptKind,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        let mode = request.mode();
        let operation = request.operation();
        let attempt = TransferAttempt::new(
            self.next_attempt_id.fetch_add(1, Ordering::Relaxed),
            kind,
            self.config.endpoint(path),
            self.config.timeouts.budget(mode, operation),
            cancel,
        );

        let form = build_form(request)?;

        debug!(
            attempt_id = attempt.id,
            attempt = %attempt.kind,
            %mode,
            %operation,
            endpoint = %attempt.endpoint,
            carrier = %request.carrier().display_name,
            carrier_bytes = request.carrier().byte_size,
            budget_secs = attempt.budget.as_secs(),
            "sending request"
        );
        self.emit(Event::AttemptStarted {
            mode,
            operation,
            attempt: attempt.kind,
            endpoint: attempt.endpoint.clone(),
            budget_secs: attempt.budget.as_secs(),
        });

        let call = async {
            let response = self
                .http
                .post(&attempt.endpoint)
                .multipart(form)
                .send()
                .await?;
            RawResponse::read(response).await
        };

        let outcome = tokio::select! {
            biased;
            _ = attempt.cancel.cancelled() => Err(TransferError::Cancelled),
            result = tokio::time::timeout_at(attempt.deadline, call) => match result {
                Ok(result) => result,
                Err(_) => {
                    attempt.cancel.cancel();
                    warn!(attempt_id = attempt.id, attempt = %attempt.kind, %mode, %operation, budget_secs = attempt.budget.as_secs(), "attempt timed out");
                    self.emit(Event::TimedOut {
                        mode,
                        operation,
                        attempt: attempt.kind,
                        budget_secs: attempt.budget.as_secs(),
                    });
                    Err(TransferError::Timeout {
                        budget: attempt.budget,
                    })
                }
            },
        };

        let response = outcome.inspect_err(|e| {
            if !matches!(e, TransferError::Timeout { .. }) {
                warn!(attempt_id = attempt.id, attempt = %attempt.kind, %mode, %operation, error = %e, "attempt failed");
            }
        })?;

        debug!(
            attempt_id = attempt.id,
            status = response.status,
            content_type = ?response.content_type,
            bytes = response.body.len(),
            "response received"
        );
        self.emit(Event::AttemptFinished {
            mode,
            operation,
            attempt: attempt.kind,
            status: response.status,
            bytes: response.body.len() as u64,
        });

        Ok(response)
    }
}
