//! Response classification
//!
//! The service's content-type header does not reliably predict the body: an
//! encode that stored its artifact remotely answers with JSON, one that could
//! not may answer with the artifact itself, and a body declared as JSON is
//! not guaranteed to parse. Resolution therefore looks at the body, not just
//! the declared type.

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use crate::error::TransferError;
use crate::profile::{DecodeShape, EXTRACTED_FILENAME, ModeProfile};
use crate::types::{OperationResult, Operation};
use crate::utils::{excerpt, filename_from_content_disposition, is_json_content_type, sanitize_filename};

/// A fully received HTTP response
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Declared Content-Type
    pub content_type: Option<String>,
    /// Content-Disposition header, if any
    pub content_disposition: Option<String>,
    /// Response body
    pub body: Bytes,
}

impl RawResponse {
    /// Buffer a reqwest response
    pub async fn read(response: reqwest::Response) -> Result<Self, TransferError> {
        let status = response.status().as_u16();
        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(reqwest::header::CONTENT_TYPE);
        let content_disposition = header(reqwest::header::CONTENT_DISPOSITION);
        let body = response.bytes().await?;

        Ok(Self {
            status,
            content_type,
            content_disposition,
            body,
        })
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Turn a successful response into an [`OperationResult`]
///
/// - Encode: a JSON body with `url` is a reference; JSON without `url` is
///   invalid; a body declared as JSON that does not parse, or any non-JSON
///   body, is the artifact itself.
/// - Message decode: the body must be JSON with a non-empty `message`.
/// - File decode: the body is always the artifact, whatever its declared type.
pub fn resolve(
    response: &RawResponse,
    operation: Operation,
    profile: &ModeProfile,
) -> Result<OperationResult, TransferError> {
    match (operation, profile.decode_shape) {
        (Operation::Encode, _) => resolve_encode(response, profile),
        (Operation::Decode, DecodeShape::Message) => resolve_message(response),
        (Operation::Decode, DecodeShape::File) => Ok(resolve_file(response)),
    }
}

/// Wrap the body as an inline artifact named `filename`
pub fn inline_result(response: &RawResponse, filename: &str) -> OperationResult {
    OperationResult::Inline {
        data: response.body.clone(),
        filename: filename.to_string(),
        content_type: response.content_type.clone(),
    }
}

/// Classify a non-success response
///
/// A JSON body with a `detail` yields [`TransferError::Server`]; JSON without
/// one yields [`TransferError::ServerStatus`]; anything else yields
/// [`TransferError::ServerRaw`] carrying a 100-character excerpt.
pub fn classify_failure(response: &RawResponse) -> TransferError {
    let status = response.status;
    let text = String::from_utf8_lossy(&response.body);

    match serde_json::from_str::<Value>(&text) {
        Ok(value) => match value.get("detail") {
            Some(Value::String(detail)) if !detail.is_empty() => TransferError::Server {
                status,
                detail: detail.clone(),
            },
            Some(Value::String(_)) | Some(Value::Null) | None => {
                TransferError::ServerStatus { status }
            }
            Some(other) => TransferError::Server {
                status,
                detail: other.to_string(),
            },
        },
        Err(_) => TransferError::ServerRaw {
            status,
            excerpt: excerpt(&text),
        },
    }
}

fn resolve_encode(
    response: &RawResponse,
    profile: &ModeProfile,
) -> Result<OperationResult, TransferError> {
    if is_json_content_type(response.content_type.as_deref()) {
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) => {
                return match value.get("url").and_then(Value::as_str) {
                    Some(url) if !url.is_empty() => Ok(OperationResult::Reference {
                        url: url.to_string(),
                    }),
                    _ => Err(TransferError::InvalidResponse(
                        "encode response has no url".to_string(),
                    )),
                };
            }
            Err(e) => {
                debug!(error = %e, bytes = response.body.len(), "declared JSON body did not parse, treating as artifact");
            }
        }
    }

    Ok(inline_result(response, profile.encoded_filename))
}

fn resolve_message(response: &RawResponse) -> Result<OperationResult, TransferError> {
    let value: Value = serde_json::from_slice(&response.body).map_err(|e| {
        TransferError::InvalidResponse(format!("could not parse decode response: {}", e))
    })?;

    match value.get("message").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => Ok(OperationResult::Message {
            text: text.to_string(),
        }),
        _ => Err(TransferError::NoMessageFound),
    }
}

fn resolve_file(response: &RawResponse) -> OperationResult {
    let filename = response
        .content_disposition
        .as_deref()
        .and_then(filename_from_content_disposition)
        .and_then(|name| sanitize_filename(&name))
        .unwrap_or_else(|| EXTRACTED_FILENAME.to_string());

    inline_result(response, &filename)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mode;

    fn response(status: u16, content_type: Option<&str>, body: &[u8]) -> RawResponse {
        RawResponse {
            status,
            content_type: content_type.map(str::to_string),
            content_disposition: None,
            body: Bytes::copy_from_slice(body),
        }
    }

    #[test]
    fn encode_json_with_url_is_reference() {
        let r = response(200, Some("application/json"), br#"{"url":"https://storage/x.png"}"#);
        assert_eq!(
            resolve(&r, Operation::Encode, Mode::Image.profile()).unwrap(),
            OperationResult::Reference {
                url: "https://storage/x.png".to_string()
            }
        );
    }

    #[test]
    fn encode_json_without_url_is_invalid() {
        for body in [&br#"{"status":"ok"}"#[..], br#"{"url":""}"#, br#"{"url":7}"#, b"[]"] {
            let r = response(200, Some("application/json"), body);
            assert!(matches!(
                resolve(&r, Operation::Encode, Mode::Audio.profile()),
                Err(TransferError::InvalidResponse(_))
            ));
        }
    }

    #[test]
    fn encode_declared_json_that_does_not_parse_is_inline() {
        let r = response(200, Some("application/json"), b"\x89PNG\r\n\x1a\n");
        match resolve(&r, Operation::Encode, Mode::Image.profile()).unwrap() {
            OperationResult::Inline { data, filename, .. } => {
                assert_eq!(&data[..], b"\x89PNG\r\n\x1a\n");
                assert_eq!(filename, "encoded.png");
            }
            other => panic!("expected inline result, got {:?}", other),
        }
    }

    #[test]
    fn encode_binary_body_is_inline_even_if_it_looks_like_json() {
        let r = response(200, Some("audio/wav"), br#"{"url":"https://storage/x.wav"}"#);
        match resolve(&r, Operation::Encode, Mode::Audio.profile()).unwrap() {
            OperationResult::Inline { filename, .. } => assert_eq!(filename, "encoded.wav"),
            other => panic!("expected inline result, got {:?}", other),
        }
    }

    #[test]
    fn encode_without_content_type_is_inline() {
        let r = response(200, None, b"raw");
        assert!(matches!(
            resolve(&r, Operation::Encode, Mode::Video.profile()).unwrap(),
            OperationResult::Inline { .. }
        ));
    }

    #[test]
    fn decode_message_extracts_text() {
        let r = response(200, Some("application/json"), br#"{"message":"hello"}"#);
        assert_eq!(
            resolve(&r, Operation::Decode, Mode::Image.profile()).unwrap(),
            OperationResult::Message {
                text: "hello".to_string()
            }
        );
    }

    #[test]
    fn decode_message_missing_or_empty_is_no_message_found() {
        for body in [&br#"{}"#[..], br#"{"message":""}"#, br#"{"message":null}"#] {
            let r = response(200, Some("application/json"), body);
            assert_eq!(
                resolve(&r, Operation::Decode, Mode::Video.profile()),
                Err(TransferError::NoMessageFound)
            );
        }
    }

    #[test]
    fn decode_message_unparseable_is_invalid() {
        let r = response(200, Some("text/html"), b"<html>oops</html>");
        assert!(matches!(
            resolve(&r, Operation::Decode, Mode::Audio.profile()),
            Err(TransferError::InvalidResponse(_))
        ));
    }

    #[test]
    fn decode_file_is_always_binary_and_named_by_header() {
        let mut r = response(200, Some("application/json"), br#"{"not":"parsed"}"#);
        r.content_disposition = Some(r#"attachment; filename="secret.zip""#.to_string());

        match resolve(&r, Operation::Decode, Mode::FileInImage.profile()).unwrap() {
            OperationResult::Inline { data, filename, .. } => {
                assert_eq!(&data[..], br#"{"not":"parsed"}"#);
                assert_eq!(filename, "secret.zip");
            }
            other => panic!("expected inline result, got {:?}", other),
        }
    }

    #[test]
    fn decode_file_without_header_uses_generic_name() {
        let r = response(200, Some("application/octet-stream"), b"bytes");
        match resolve(&r, Operation::Decode, Mode::FileInImage.profile()).unwrap() {
            OperationResult::Inline { filename, .. } => assert_eq!(filename, "extracted_file"),
            other => panic!("expected inline result, got {:?}", other),
        }
    }

    #[test]
    fn decode_file_header_cannot_escape_download_dir() {
        let mut r = response(200, None, b"bytes");
        r.content_disposition = Some("attachment; filename=../../.bashrc".to_string());

        match resolve(&r, Operation::Decode, Mode::FileInImage.profile()).unwrap() {
            OperationResult::Inline { filename, .. } => assert_eq!(filename, ".bashrc"),
            other => panic!("expected inline result, got {:?}", other),
        }
    }

    #[test]
    fn failure_with_detail() {
        let r = response(500, Some("application/json"), br#"{"detail":"Error uploading to S3: timeout"}"#);
        assert_eq!(
            classify_failure(&r),
            TransferError::Server {
                status: 500,
                detail: "Error uploading to S3: timeout".to_string()
            }
        );
    }

    #[test]
    fn failure_with_structured_detail_is_stringified() {
        let r = response(422, None, br#"{"detail":[{"loc":["body","image"],"msg":"field required"}]}"#);
        match classify_failure(&r) {
            TransferError::Server { status, detail } => {
                assert_eq!(status, 422);
                assert!(detail.contains("field required"));
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[test]
    fn failure_json_without_detail_reports_status_only() {
        let r = response(503, None, br#"{"error":"busy"}"#);
        assert_eq!(classify_failure(&r), TransferError::ServerStatus { status: 503 });
    }

    #[test]
    fn failure_with_unparseable_body_keeps_excerpt() {
        let body = format!("<html>{}</html>", "x".repeat(200));
        let r = response(502, Some("text/html"), body.as_bytes());

        match classify_failure(&r) {
            TransferError::ServerRaw { status, excerpt } => {
                assert_eq!(status, 502);
                assert_eq!(excerpt.chars().count(), 103);
                assert!(excerpt.starts_with("<html>"));
                assert!(excerpt.ends_with("..."));
            }
            other => panic!("expected raw server error, got {:?}", other),
        }
    }

    #[test]
    fn success_range() {
        assert!(response(200, None, b"").is_success());
        assert!(response(204, None, b"").is_success());
        assert!(!response(302, None, b"").is_success());
        assert!(!response(500, None, b"").is_success());
    }
}
