//! Core types for stego-client

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Kind of an individual media asset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// PNG image
    Image,
    /// WAV/MP3 audio
    Audio,
    /// Video container
    Video,
    /// Arbitrary file hidden inside an image
    File,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::File => "file",
        };
        f.write_str(s)
    }
}

/// Operation performed against a carrier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Hide a payload inside the carrier
    Encode,
    /// Extract the payload from the carrier
    Decode,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Encode => f.write_str("encode"),
            Operation::Decode => f.write_str("decode"),
        }
    }
}

/// Transfer channel offered by the service
///
/// A mode fixes the carrier kind, the payload type, and the endpoints; see
/// [`crate::profile::ModeProfile`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Text message inside a PNG image
    Image,
    /// Text message inside audio
    Audio,
    /// Text message inside video
    Video,
    /// Arbitrary file inside a PNG image
    FileInImage,
}

impl Mode {
    /// All modes, in the order the front-end presents them
    pub const ALL: [Mode; 4] = [Mode::Image, Mode::Audio, Mode::FileInImage, Mode::Video];
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Image => "image",
            Mode::Audio => "audio",
            Mode::Video => "video",
            Mode::FileInImage => "file-in-image",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Mode::Image),
            "audio" => Ok(Mode::Audio),
            "video" => Ok(Mode::Video),
            "file-in-image" | "fileinimage" | "image-file" => Ok(Mode::FileInImage),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

/// A user-selected file
///
/// The bytes are shared, so cloning an asset (or building several requests
/// from it) never copies or mutates the underlying data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaAsset {
    /// Kind the asset was selected as
    pub kind: MediaKind,
    /// Declared MIME type
    pub mime_type: String,
    /// Size in bytes
    pub byte_size: u64,
    /// Original file name
    pub display_name: String,
    /// File contents
    pub data: Bytes,
}

impl MediaAsset {
    /// Create an asset from in-memory bytes
    pub fn new(
        kind: MediaKind,
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            kind,
            mime_type: mime_type.into(),
            byte_size: data.len() as u64,
            display_name: display_name.into(),
            data,
        }
    }

    /// Load an asset from disk, guessing the MIME type from the file extension
    pub async fn from_path(path: &Path, kind: MediaKind) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| Error::MissingInput(format!("{} has no file name", path.display())))?;

        Ok(Self::new(kind, display_name, mime_type, data))
    }
}

/// What gets hidden inside the carrier
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text message
    Text(String),
    /// File to hide
    File(MediaAsset),
}

impl Payload {
    /// Multipart field the payload travels under
    pub fn field_name(&self) -> &'static str {
        match self {
            Payload::Text(_) => "message",
            Payload::File(_) => "file",
        }
    }
}

/// A write-once submission: one operation against one carrier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationRequest {
    operation: Operation,
    mode: Mode,
    carrier: MediaAsset,
    payload: Option<Payload>,
}

impl OperationRequest {
    /// Build an encode request, checking the payload type fits the mode
    pub fn encode(mode: Mode, carrier: MediaAsset, payload: Payload) -> Result<Self> {
        let wants_file = mode.profile().payload_is_file;
        match (&payload, wants_file) {
            (Payload::Text(text), false) if text.is_empty() => {
                return Err(Error::MissingInput("message to hide is empty".to_string()));
            }
            (Payload::Text(_), false) | (Payload::File(_), true) => {}
            (Payload::Text(_), true) => {
                return Err(Error::InvalidRequest(format!(
                    "{} mode hides a file, not a text message",
                    mode
                )));
            }
            (Payload::File(_), false) => {
                return Err(Error::InvalidRequest(format!(
                    "{} mode hides a text message, not a file",
                    mode
                )));
            }
        }

        Ok(Self {
            operation: Operation::Encode,
            mode,
            carrier,
            payload: Some(payload),
        })
    }

    /// Build a decode request
    pub fn decode(mode: Mode, carrier: MediaAsset) -> Self {
        Self {
            operation: Operation::Decode,
            mode,
            carrier,
            payload: None,
        }
    }

    /// The operation to perform
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The transfer channel
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The carrier file
    pub fn carrier(&self) -> &MediaAsset {
        &self.carrier
    }

    /// The payload (always present for encode, absent for decode)
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
}

/// Successful outcome of an operation
///
/// Failures are reported as [`crate::error::TransferError`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationResult {
    /// Artifact stored remotely; fetch it from `url`
    Reference {
        /// Location of the stored artifact
        url: String,
    },
    /// Artifact returned directly in the response body
    Inline {
        /// Artifact bytes
        data: Bytes,
        /// Suggested download name
        filename: String,
        /// Declared content type, if any
        content_type: Option<String>,
    },
    /// Text extracted by a message decode
    Message {
        /// The decoded message
        text: String,
    },
}

/// Which endpoint an attempt targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptKind {
    /// The mode's primary endpoint
    Primary,
    /// The direct endpoint, used after a storage-upload failure
    Fallback,
}

impl std::fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptKind::Primary => f.write_str("primary"),
            AttemptKind::Fallback => f.write_str("fallback"),
        }
    }
}

/// Event emitted during a transfer
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A request was sent to an endpoint
    AttemptStarted {
        /// Transfer channel
        mode: Mode,
        /// Operation being performed
        operation: Operation,
        /// Primary or fallback
        attempt: AttemptKind,
        /// Full endpoint URL
        endpoint: String,
        /// Budget for this attempt, in seconds
        budget_secs: u64,
    },

    /// A response was fully received
    AttemptFinished {
        /// Transfer channel
        mode: Mode,
        /// Operation being performed
        operation: Operation,
        /// Primary or fallback
        attempt: AttemptKind,
        /// HTTP status code
        status: u16,
        /// Body size in bytes
        bytes: u64,
    },

    /// An attempt exceeded its budget
    TimedOut {
        /// Transfer channel
        mode: Mode,
        /// Operation being performed
        operation: Operation,
        /// Primary or fallback
        attempt: AttemptKind,
        /// The budget that was exceeded, in seconds
        budget_secs: u64,
    },

    /// A storage-upload failure routed the request to the direct endpoint
    FallbackTriggered {
        /// Transfer channel
        mode: Mode,
        /// The server's error detail
        detail: String,
    },

    /// An artifact was written to the download directory
    ArtifactSaved {
        /// Where the artifact was written
        path: PathBuf,
        /// Size in bytes
        bytes: u64,
    },

    /// The secondary fetch of a reference result failed
    DownloadFailed {
        /// The referenced URL
        url: String,
        /// Error message
        error: String,
    },
}
