//! Direct-endpoint fallback after a storage-upload failure.

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{TransferOrchestrator, resolver};
use crate::error::{Error, Result, TransferError};
use crate::types::{AttemptKind, Event, OperationRequest, OperationResult};

/// Return the error detail if `failure` is a remote-storage upload failure
///
/// Only structured server errors whose `detail` contains `signature` qualify.
pub fn is_storage_upload_failure<'a>(failure: &'a TransferError, signature: &str) -> Option<&'a str> {
    match failure {
        TransferError::Server { detail, .. } if detail.contains(signature) => Some(detail),
        _ => None,
    }
}

impl TransferOrchestrator {
    /// Re-submit an encode to the mode's direct endpoint
    ///
    /// The direct endpoint returns the artifact in the body, so a success is
    /// always an inline result. Any failure here is final.
    pub(crate) async fn fallback(
        &self,
        request: &OperationRequest,
        detail: &str,
        cancel: &CancellationToken,
    ) -> Result<OperationResult> {
        let mode = request.mode();
        let profile = mode.profile();

        warn!(%mode, detail, "storage upload failed, retrying against direct endpoint");
        self.emit(Event::FallbackTriggered {
            mode,
            detail: detail.to_string(),
        });

        let response = match self
            .send_attempt(request, AttemptKind::Fallback, profile.encode_direct_path, cancel)
            .await
        {
            Ok(response) => response,
            Err(Error::Transfer(TransferError::Cancelled)) => {
                return Err(TransferError::Cancelled.into());
            }
            Err(e) => {
                error!(%mode, error = %e, "direct encoding failed");
                return Err(TransferError::FallbackFailed {
                    reason: e.to_string(),
                }
                .into());
            }
        };

        if !response.is_success() {
            let failure = resolver::classify_failure(&response);
            error!(%mode, status = response.status, error = %failure, "direct encoding failed");
            return Err(TransferError::FallbackFailed {
                reason: failure.to_string(),
            }
            .into());
        }

        info!(%mode, bytes = response.body.len(), "direct encoding succeeded");
        Ok(resolver::inline_result(&response, profile.encoded_filename))
    }
}
