//! Per-mode descriptors
//!
//! Every mode runs the same transfer state machine; the differences between
//! them (endpoint paths, multipart field names, default filenames, payload and
//! decode shapes) live here.

use crate::types::{MediaKind, Mode, Operation};

/// What a successful decode returns
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeShape {
    /// JSON `{ "message": ... }`
    Message,
    /// Raw file bytes, named by a content-disposition header
    File,
}

/// Static description of one mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeProfile {
    /// The mode described
    pub mode: Mode,
    /// Kind the carrier must validate as
    pub carrier_kind: MediaKind,
    /// Multipart field name of the carrier
    pub carrier_field: &'static str,
    /// Whether the payload is a file (otherwise a text message)
    pub payload_is_file: bool,
    /// Shape of a successful decode response
    pub decode_shape: DecodeShape,
    /// Primary encode path
    pub encode_path: &'static str,
    /// Direct encode path, guaranteed to return the artifact inline
    pub encode_direct_path: &'static str,
    /// Decode path
    pub decode_path: &'static str,
    /// Download name for encoded artifacts
    pub encoded_filename: &'static str,
}

/// Download name for extracted files when the server does not name them
pub const EXTRACTED_FILENAME: &str = "extracted_file";

const IMAGE: ModeProfile = ModeProfile {
    mode: Mode::Image,
    carrier_kind: MediaKind::Image,
    carrier_field: "image",
    payload_is_file: false,
    decode_shape: DecodeShape::Message,
    encode_path: "/encode/image",
    encode_direct_path: "/encode/image/direct",
    decode_path: "/decode/image",
    encoded_filename: "encoded.png",
};

const AUDIO: ModeProfile = ModeProfile {
    mode: Mode::Audio,
    carrier_kind: MediaKind::Audio,
    carrier_field: "audio",
    payload_is_file: false,
    decode_shape: DecodeShape::Message,
    encode_path: "/audio/encode",
    encode_direct_path: "/audio/encode/direct",
    decode_path: "/audio/decode",
    encoded_filename: "encoded.wav",
};

const VIDEO: ModeProfile = ModeProfile {
    mode: Mode::Video,
    carrier_kind: MediaKind::Video,
    carrier_field: "video",
    payload_is_file: false,
    decode_shape: DecodeShape::Message,
    encode_path: "/video/encode",
    encode_direct_path: "/video/encode/direct",
    decode_path: "/video/decode",
    encoded_filename: "encoded_video.mp4",
};

const FILE_IN_IMAGE: ModeProfile = ModeProfile {
    mode: Mode::FileInImage,
    carrier_kind: MediaKind::Image,
    carrier_field: "image",
    payload_is_file: true,
    decode_shape: DecodeShape::File,
    encode_path: "/image-file/encode",
    encode_direct_path: "/image-file/encode/direct",
    decode_path: "/image-file/decode",
    encoded_filename: "encoded_with_file.png",
};

impl Mode {
    /// Descriptor for this mode
    pub fn profile(self) -> &'static ModeProfile {
        match self {
            Mode::Image => &IMAGE,
            Mode::Audio => &AUDIO,
            Mode::Video => &VIDEO,
            Mode::FileInImage => &FILE_IN_IMAGE,
        }
    }
}

impl ModeProfile {
    /// Primary endpoint path for an operation
    pub fn primary_path(&self, operation: Operation) -> &'static str {
        match operation {
            Operation::Encode => self.encode_path,
            Operation::Decode => self.decode_path,
        }
    }

    /// Default download name for an operation's artifact
    pub fn default_filename(&self, operation: Operation) -> &'static str {
        match operation {
            Operation::Encode => self.encoded_filename,
            Operation::Decode => EXTRACTED_FILENAME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_table_matches_service_routes() {
        let table = [
            (Mode::Image, "/encode/image", "/encode/image/direct", "/decode/image"),
            (Mode::Audio, "/audio/encode", "/audio/encode/direct", "/audio/decode"),
            (Mode::Video, "/video/encode", "/video/encode/direct", "/video/decode"),
            (
                Mode::FileInImage,
                "/image-file/encode",
                "/image-file/encode/direct",
                "/image-file/decode",
            ),
        ];

        for (mode, encode, direct, decode) in table {
            let profile = mode.profile();
            assert_eq!(profile.primary_path(Operation::Encode), encode);
            assert_eq!(profile.encode_direct_path, direct);
            assert_eq!(profile.primary_path(Operation::Decode), decode);
        }
    }

    #[test]
    fn direct_paths_extend_primary_encode_paths() {
        for mode in Mode::ALL {
            let profile = mode.profile();
            assert_eq!(
                profile.encode_direct_path,
                format!("{}/direct", profile.encode_path)
            );
        }
    }

    #[test]
    fn default_filenames_per_mode() {
        assert_eq!(Mode::Image.profile().default_filename(Operation::Encode), "encoded.png");
        assert_eq!(Mode::Audio.profile().default_filename(Operation::Encode), "encoded.wav");
        assert_eq!(
            Mode::Video.profile().default_filename(Operation::Encode),
            "encoded_video.mp4"
        );
        assert_eq!(
            Mode::FileInImage.profile().default_filename(Operation::Encode),
            "encoded_with_file.png"
        );
        assert_eq!(
            Mode::FileInImage.profile().default_filename(Operation::Decode),
            "extracted_file"
        );
    }

    #[test]
    fn only_file_in_image_hides_and_extracts_files() {
        for mode in Mode::ALL {
            let profile = mode.profile();
            let is_file_mode = mode == Mode::FileInImage;
            assert_eq!(profile.payload_is_file, is_file_mode);
            assert_eq!(profile.decode_shape == DecodeShape::File, is_file_mode);
        }
    }
}
