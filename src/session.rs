//! Per-form session state
//!
//! A [`FormSession`] owns what one form holds between user actions: the
//! selected carriers and payload, one in-flight flag per operation, and the
//! last materialized artifact of each operation. Sessions share nothing with
//! each other except the orchestrator's HTTP client and event channel.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::sink::{ArtifactSink, Materialized};
use crate::transfer::TransferOrchestrator;
use crate::types::{MediaAsset, MediaKind, Mode, Operation, OperationRequest, Payload};
use crate::validation::{validate, validate_carrier};

#[derive(Default)]
struct SessionState {
    encode_carrier: Option<MediaAsset>,
    decode_carrier: Option<MediaAsset>,
    payload: Option<Payload>,
    last_encode: Option<Materialized>,
    last_decode: Option<Materialized>,
}

impl SessionState {
    fn last_mut(&mut self, operation: Operation) -> &mut Option<Materialized> {
        match operation {
            Operation::Encode => &mut self.last_encode,
            Operation::Decode => &mut self.last_decode,
        }
    }
}

/// Holds an operation's in-flight flag; clears it when dropped
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Selections, flags and results of one form
///
/// # Example
///
/// ```no_run
/// use stego_client::{Config, FormSession, MediaAsset, MediaKind, Mode, TransferOrchestrator};
///
/// # async fn run() -> stego_client::Result<()> {
/// let orchestrator = TransferOrchestrator::new(Config::from_env()?)?;
/// let session = FormSession::new(Mode::Image, &orchestrator);
///
/// let carrier = MediaAsset::from_path(std::path::Path::new("cover.png"), MediaKind::Image).await?;
/// session.select_encode_carrier(carrier).await?;
/// session.set_message("hello").await?;
///
/// let materialized = session.submit_encode().await?;
/// println!("saved to {:?}", materialized.download);
/// # Ok(())
/// # }
/// ```
pub struct FormSession {
    mode: Mode,
    orchestrator: TransferOrchestrator,
    sink: ArtifactSink,
    state: Mutex<SessionState>,
    encoding: AtomicBool,
    decoding: AtomicBool,
    cancel: CancellationToken,
}

impl FormSession {
    /// Create an empty session for `mode`
    pub fn new(mode: Mode, orchestrator: &TransferOrchestrator) -> Self {
        Self {
            mode,
            orchestrator: orchestrator.clone(),
            sink: ArtifactSink::new(orchestrator),
            state: Mutex::new(SessionState::default()),
            encoding: AtomicBool::new(false),
            decoding: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// The session's mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether `operation` is in flight
    pub fn is_busy(&self, operation: Operation) -> bool {
        self.flag(operation).load(Ordering::Acquire)
    }

    /// Select the carrier to encode into
    ///
    /// A rejected file clears the slot, so a previously accepted carrier is not
    /// silently submitted instead.
    pub async fn select_encode_carrier(&self, asset: MediaAsset) -> Result<()> {
        let checked = validate_carrier(&asset, self.mode, Operation::Encode);
        let mut state = self.state.lock().await;
        state.encode_carrier = None;
        checked?;
        debug!(mode = %self.mode, carrier = %asset.display_name, bytes = asset.byte_size, "encode carrier selected");
        state.encode_carrier = Some(asset);
        Ok(())
    }

    /// Select the carrier to decode from
    pub async fn select_decode_carrier(&self, asset: MediaAsset) -> Result<()> {
        let checked = validate_carrier(&asset, self.mode, Operation::Decode);
        let mut state = self.state.lock().await;
        state.decode_carrier = None;
        checked?;
        debug!(mode = %self.mode, carrier = %asset.display_name, bytes = asset.byte_size, "decode carrier selected");
        state.decode_carrier = Some(asset);
        Ok(())
    }

    /// Set the message to hide; an empty message clears it
    pub async fn set_message(&self, text: impl Into<String>) -> Result<()> {
        if self.mode.profile().payload_is_file {
            return Err(Error::InvalidRequest(format!(
                "{} mode hides a file, not a text message",
                self.mode
            )));
        }

        let text = text.into();
        let mut state = self.state.lock().await;
        state.payload = (!text.is_empty()).then_some(Payload::Text(text));
        Ok(())
    }

    /// Select the file to hide
    pub async fn select_payload_file(&self, asset: MediaAsset) -> Result<()> {
        if !self.mode.profile().payload_is_file {
            return Err(Error::InvalidRequest(format!(
                "{} mode hides a text message, not a file",
                self.mode
            )));
        }

        let checked = validate(&asset, MediaKind::File);
        let mut state = self.state.lock().await;
        state.payload = None;
        checked?;
        state.payload = Some(Payload::File(asset));
        Ok(())
    }

    /// Submit the encode form
    pub async fn submit_encode(&self) -> Result<Materialized> {
        self.submit(Operation::Encode).await
    }

    /// Submit the decode form
    pub async fn submit_decode(&self) -> Result<Materialized> {
        self.submit(Operation::Decode).await
    }

    /// The last artifact produced by `operation`, if any
    pub async fn last(&self, operation: Operation) -> Option<Materialized> {
        self.state.lock().await.last_mut(operation).clone()
    }

    /// Download the last artifact of `operation` again
    pub async fn download_again(&self, operation: Operation) -> Result<PathBuf> {
        let last = self.last(operation).await.ok_or(Error::NoArtifact(operation))?;
        self.sink.download_again(&last, &self.cancel).await
    }

    /// Cancel any in-flight attempt or download; later submissions fail as cancelled
    pub fn close(&self) {
        self.cancel.cancel();
    }

    async fn submit(&self, operation: Operation) -> Result<Materialized> {
        let _busy = BusyGuard::acquire(self.flag(operation)).ok_or(Error::Busy(operation))?;

        let request = self.build_request(operation).await?;
        let result = self
            .orchestrator
            .execute_with_cancel(&request, &self.cancel)
            .await?;

        let filename = self.mode.profile().default_filename(operation);
        let materialized = self
            .sink
            .materialize(result, filename, &self.cancel)
            .await;
        info!(
            mode = %self.mode,
            %operation,
            downloaded = materialized.auto_download_triggered(),
            "result ready"
        );

        *self.state.lock().await.last_mut(operation) = Some(materialized.clone());
        Ok(materialized)
    }

    async fn build_request(&self, operation: Operation) -> Result<OperationRequest> {
        let state = self.state.lock().await;
        let carrier_kind = self.mode.profile().carrier_kind;

        match operation {
            Operation::Encode => {
                let carrier = state.encode_carrier.clone().ok_or_else(|| {
                    Error::MissingInput(format!("select a {} to encode into", carrier_kind))
                })?;
                let payload = state.payload.clone().ok_or_else(|| {
                    let what = if self.mode.profile().payload_is_file {
                        "select a file to hide"
                    } else {
                        "enter a message to hide"
                    };
                    Error::MissingInput(what.to_string())
                })?;
                OperationRequest::encode(self.mode, carrier, payload)
            }
            Operation::Decode => {
                let carrier = state.decode_carrier.clone().ok_or_else(|| {
                    Error::MissingInput(format!("select a {} to decode", carrier_kind))
                })?;
                Ok(OperationRequest::decode(self.mode, carrier))
            }
        }
    }

    fn flag(&self, operation: Operation) -> &AtomicBool {
        match operation {
            Operation::Encode => &self.encoding,
            Operation::Decode => &self.decoding,
        }
    }
}

impl Drop for FormSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
