//! # stego-client
//!
//! Client library for a steganography service: hide a text message or a file
//! inside an image, audio or video carrier, and extract it again.
//!
//! ## Design Philosophy
//!
//! stego-client is designed to be:
//! - **Validated up front** - Carriers and payloads are checked before any network call
//! - **One state machine** - All four modes share one orchestrator, parameterized by [`ModeProfile`]
//! - **Defensive about responses** - Declared content types are not trusted blindly
//! - **Event-driven** - Consumers subscribe to transfer events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use stego_client::{Config, FormSession, MediaAsset, MediaKind, Mode, TransferOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = TransferOrchestrator::new(Config::new("https://stego.example.com"))?;
//!
//!     // Subscribe to events
//!     let mut events = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let session = FormSession::new(Mode::Audio, &orchestrator);
//!     let carrier = MediaAsset::from_path(std::path::Path::new("song.wav"), MediaKind::Audio).await?;
//!     session.select_decode_carrier(carrier).await?;
//!
//!     let decoded = session.submit_decode().await?;
//!     println!("{:?}", decoded.display);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Per-mode descriptors
pub mod profile;
/// Multipart request assembly
pub mod request;
/// Per-form session state
pub mod session;
/// Artifact materialization and downloads
pub mod sink;
/// Transfer orchestration, response resolution and fallback
pub mod transfer;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;
/// Media validation
pub mod validation;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, FileCollisionAction, TimeoutConfig};
pub use error::{Error, Rejection, Result, TransferError};
pub use profile::{DecodeShape, ModeProfile};
pub use session::FormSession;
pub use sink::{ArtifactHandle, ArtifactSink, DisplayHandle, Materialized};
pub use transfer::TransferOrchestrator;
pub use types::{
    AttemptKind, Event, MediaAsset, MediaKind, Mode, Operation, OperationRequest,
    OperationResult, Payload,
};

/// Submit one of a session's forms, closing the session on a termination signal.
///
/// Closing cancels the in-flight attempt, so an interrupted submission ends
/// with [`TransferError::Cancelled`] instead of leaving a request running.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use stego_client::{Config, FormSession, Mode, Operation, TransferOrchestrator, submit_until_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let orchestrator = TransferOrchestrator::new(Config::from_env()?)?;
///     let session = FormSession::new(Mode::Video, &orchestrator);
///
///     // ... select carrier and message ...
///
///     let materialized = submit_until_signal(&session, Operation::Encode).await?;
///     println!("{:?}", materialized.download);
///
///     Ok(())
/// }
/// ```
pub async fn submit_until_signal(
    session: &FormSession,
    operation: Operation,
) -> Result<Materialized> {
    let submit = async {
        match operation {
            Operation::Encode => session.submit_encode().await,
            Operation::Decode => session.submit_decode().await,
        }
    };

    tokio::select! {
        result = submit => result,
        signal = wait_for_signal() => {
            tracing::info!(signal, %operation, "Closing session, in-flight submission abandoned");
            session.close();
            Err(TransferError::Cancelled.into())
        }
    }
}

/// Resolves with the name of the first termination signal received
///
/// A listener that cannot be installed never resolves, so the submission
/// is left to finish on its own.
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    async fn listen(kind: SignalKind, name: &'static str) -> &'static str {
        match signal(kind) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, signal = name, "Signal listener unavailable");
                std::future::pending::<()>().await;
            }
        }
        name
    }

    tokio::select! {
        name = listen(SignalKind::terminate(), "SIGTERM") => name,
        name = listen(SignalKind::interrupt(), "SIGINT") => name,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl+C listener unavailable");
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}
