//! Media validation
//!
//! Checks run on selection, before any network call, so an invalid file never
//! costs a round-trip.

use crate::error::Rejection;
use crate::types::{MediaAsset, MediaKind, Mode, Operation};

const MIB: u64 = 1024 * 1024;

/// Size ceiling for audio carriers
pub const AUDIO_MAX_BYTES: u64 = 10 * MIB;
/// Size ceiling for video carriers
pub const VIDEO_MAX_BYTES: u64 = 50 * MIB;
/// Size ceiling for files hidden inside an image
pub const FILE_MAX_BYTES: u64 = 5 * MIB;
/// Size ceiling for PNG carriers submitted for encoding
pub const IMAGE_ENCODE_MAX_BYTES: u64 = 5 * MIB;

/// MIME constraint of a media kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MimeRule {
    /// MIME type must equal this value
    Exact(&'static str),
    /// MIME type must start with this class prefix
    Class(&'static str),
    /// Any MIME type is accepted
    Any,
}

impl MimeRule {
    fn accepts(&self, mime_type: &str) -> bool {
        match *self {
            MimeRule::Exact(expected) => mime_type == expected,
            MimeRule::Class(prefix) => mime_type.starts_with(prefix),
            MimeRule::Any => true,
        }
    }

    fn describe(&self) -> &'static str {
        match *self {
            MimeRule::Exact(expected) => expected,
            MimeRule::Class("audio/") => "audio/*",
            MimeRule::Class("video/") => "video/*",
            MimeRule::Class(prefix) => prefix,
            MimeRule::Any => "*/*",
        }
    }
}

/// Validation policy of a media kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaPolicy {
    /// MIME constraint
    pub mime: MimeRule,
    /// Size ceiling in bytes (inclusive), if any
    pub max_bytes: Option<u64>,
}

impl MediaKind {
    /// Validation policy for this kind
    pub fn policy(self) -> MediaPolicy {
        match self {
            MediaKind::Image => MediaPolicy {
                mime: MimeRule::Exact("image/png"),
                max_bytes: None,
            },
            MediaKind::Audio => MediaPolicy {
                mime: MimeRule::Class("audio/"),
                max_bytes: Some(AUDIO_MAX_BYTES),
            },
            MediaKind::Video => MediaPolicy {
                mime: MimeRule::Class("video/"),
                max_bytes: Some(VIDEO_MAX_BYTES),
            },
            MediaKind::File => MediaPolicy {
                mime: MimeRule::Any,
                max_bytes: Some(FILE_MAX_BYTES),
            },
        }
    }
}

/// Check an asset against the policy of `kind`
///
/// The MIME type is checked before the size, so a file that is both the wrong
/// type and too large is reported as `UnsupportedType`.
pub fn validate(asset: &MediaAsset, kind: MediaKind) -> Result<(), Rejection> {
    let policy = kind.policy();

    if !policy.mime.accepts(&asset.mime_type) {
        return Err(Rejection::UnsupportedType {
            expected: policy.mime.describe(),
            actual: asset.mime_type.clone(),
        });
    }

    check_size(asset, policy.max_bytes)
}

/// Check a carrier for a mode and operation
///
/// Applies the carrier kind's policy, plus the 5 MiB ceiling on PNG carriers
/// submitted for encoding.
pub fn validate_carrier(
    asset: &MediaAsset,
    mode: Mode,
    operation: Operation,
) -> Result<(), Rejection> {
    let kind = mode.profile().carrier_kind;
    validate(asset, kind)?;

    if kind == MediaKind::Image && operation == Operation::Encode {
        check_size(asset, Some(IMAGE_ENCODE_MAX_BYTES))?;
    }
    Ok(())
}

fn check_size(asset: &MediaAsset, max_bytes: Option<u64>) -> Result<(), Rejection> {
    match max_bytes {
        Some(limit) if asset.byte_size > limit => Err(Rejection::TooLarge {
            limit,
            actual: asset.byte_size,
        }),
        _ => Ok(()),
    }
}
