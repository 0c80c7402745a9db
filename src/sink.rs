//! Artifact materialization
//!
//! Whatever path produced a result, the sink turns it into something the
//! caller can show plus a file in the download directory.
//!
//! Inline artifacts are kept in memory as an [`ArtifactHandle`] that stays
//! valid for as long as the caller holds it, so the artifact can be shown or
//! saved again. The bytes fetched for a reference result are dropped once they
//! are written; the URL itself remains the display handle.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result, TransferError};
use crate::transfer::TransferOrchestrator;
use crate::types::{Event, OperationResult};
use crate::utils::get_unique_path;

/// In-memory artifact returned directly by the service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactHandle {
    /// Download name
    pub filename: String,
    /// Declared content type, if any
    pub content_type: Option<String>,
    /// Artifact bytes
    pub data: Bytes,
    /// Hex SHA-256 of `data`
    pub sha256: String,
}

impl ArtifactHandle {
    /// Wrap artifact bytes, computing their digest
    pub fn new(filename: impl Into<String>, content_type: Option<String>, data: Bytes) -> Self {
        let sha256 = format!("{:x}", Sha256::digest(&data));
        Self {
            filename: filename.into(),
            content_type,
            data,
            sha256,
        }
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the artifact is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What the caller shows for a result
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayHandle {
    /// Remotely stored artifact
    Remote(String),
    /// Artifact held in memory
    Local(ArtifactHandle),
    /// Decoded message
    Text(String),
}

/// A result made available to the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Materialized {
    /// What to show
    pub display: DisplayHandle,
    /// Where the automatic download was written, if it happened
    pub download: Option<PathBuf>,
    /// Name used for (re-)downloads
    pub filename: String,
}

impl Materialized {
    /// Whether the automatic download happened
    pub fn auto_download_triggered(&self) -> bool {
        self.download.is_some()
    }
}

/// Turns operation results into display handles and downloaded files
#[derive(Clone)]
pub struct ArtifactSink {
    config: Arc<Config>,
    http: reqwest::Client,
    event_tx: broadcast::Sender<Event>,
}

impl ArtifactSink {
    /// Create a sink sharing the orchestrator's configuration, HTTP client and events
    pub fn new(orchestrator: &TransferOrchestrator) -> Self {
        Self {
            config: orchestrator.config.clone(),
            http: orchestrator.http.clone(),
            event_tx: orchestrator.event_tx.clone(),
        }
    }

    /// Make a result available and trigger its automatic download
    ///
    /// `reference_filename` names the download of a reference result; inline
    /// results carry their own name. A failed download is logged and leaves
    /// `download` empty; it does not fail the operation. Cancelling `cancel`
    /// abandons the secondary fetch of a reference result.
    pub async fn materialize(
        &self,
        result: OperationResult,
        reference_filename: &str,
        cancel: &CancellationToken,
    ) -> Materialized {
        match result {
            OperationResult::Reference { url } => {
                let download = match self.fetch_reference(&url, cancel).await {
                    Ok(data) => self.save_or_warn(reference_filename, &data).await,
                    Err(TransferError::Cancelled) => {
                        debug!(url = %url, "automatic download abandoned, session closed");
                        None
                    }
                    Err(e) => {
                        warn!(url = %url, error = %e, "automatic download of stored artifact failed");
                        self.emit(Event::DownloadFailed {
                            url: url.clone(),
                            error: e.to_string(),
                        });
                        None
                    }
                };

                Materialized {
                    display: DisplayHandle::Remote(url),
                    download,
                    filename: reference_filename.to_string(),
                }
            }
            OperationResult::Inline {
                data,
                filename,
                content_type,
            } => {
                let handle = ArtifactHandle::new(filename.clone(), content_type, data);
                let download = self.save_or_warn(&filename, &handle.data).await;

                Materialized {
                    display: DisplayHandle::Local(handle),
                    download,
                    filename,
                }
            }
            OperationResult::Message { text } => Materialized {
                display: DisplayHandle::Text(text),
                download: None,
                filename: String::new(),
            },
        }
    }

    /// Download a previously materialized artifact again
    ///
    /// Local artifacts are re-written from memory; remote ones are fetched again.
    pub async fn download_again(
        &self,
        materialized: &Materialized,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        match &materialized.display {
            DisplayHandle::Local(handle) => self.save(&handle.filename, &handle.data).await,
            DisplayHandle::Remote(url) => {
                let data = self.fetch_reference(url, cancel).await?;
                self.save(&materialized.filename, &data).await
            }
            DisplayHandle::Text(_) => Err(Error::InvalidRequest(
                "a decoded message has no file to download".to_string(),
            )),
        }
    }

    /// Fetch the bytes behind a reference URL
    async fn fetch_reference(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<Bytes, TransferError> {
        let budget = self.config.timeouts.download;
        debug!(url, budget_secs = budget.as_secs(), "fetching stored artifact");

        let fetch = async {
            let response = self.http.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransferError::ServerStatus {
                    status: status.as_u16(),
                });
            }
            Ok(response.bytes().await?)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransferError::Cancelled),
            fetched = tokio::time::timeout(budget, fetch) => {
                fetched.map_err(|_| TransferError::Timeout { budget })?
            }
        }
    }

    async fn save_or_warn(&self, filename: &str, data: &Bytes) -> Option<PathBuf> {
        match self.save(filename, data).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(filename, error = %e, "could not save artifact");
                None
            }
        }
    }

    /// Write an artifact into the download directory
    async fn save(&self, filename: &str, data: &Bytes) -> Result<PathBuf> {
        let dir = self.config.download_dir();
        tokio::fs::create_dir_all(dir).await?;

        let path = get_unique_path(&dir.join(filename), self.config.download.file_collision)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| Error::SaveFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        info!(path = %path.display(), bytes = data.len(), "artifact saved");
        self.emit(Event::ArtifactSaved {
            path: path.clone(),
            bytes: data.len() as u64,
        });
        Ok(path)
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
