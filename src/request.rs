//! Multipart request assembly
//!
//! The builder trusts its input: validation has already happened when the
//! assets were selected. Forms are rebuilt for every attempt because sending
//! consumes them; the shared asset bytes are never modified.

use reqwest::multipart::{Form, Part};

use crate::error::{Error, Result};
use crate::types::{MediaAsset, OperationRequest, Payload};

/// Build the multipart body for a request
pub fn build_form(request: &OperationRequest) -> Result<Form> {
    let profile = request.mode().profile();
    let form = Form::new().part(profile.carrier_field, asset_part(request.carrier())?);

    let form = match request.payload() {
        None => form,
        Some(payload) => match payload {
            Payload::Text(message) => form.text(payload.field_name(), message.clone()),
            Payload::File(file) => form.part(payload.field_name(), asset_part(file)?),
        },
    };

    Ok(form)
}

fn asset_part(asset: &MediaAsset) -> Result<Part> {
    let part = Part::bytes(asset.data.to_vec()).file_name(asset.display_name.clone());
    if asset.mime_type.is_empty() {
        return Ok(part);
    }

    part.mime_str(&asset.mime_type).map_err(|e| {
        Error::InvalidRequest(format!(
            "{} has an invalid MIME type {:?}: {}",
            asset.display_name, asset.mime_type, e
        ))
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MediaKind, Mode};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png() -> MediaAsset {
        MediaAsset::new(MediaKind::Image, "cover.png", "image/png", b"PNG-bytes".to_vec())
    }

    #[test]
    fn invalid_mime_type_is_reported() {
        let broken = MediaAsset::new(MediaKind::File, "x", "not a mime", "data");
        let request = OperationRequest::encode(Mode::FileInImage, png(), Payload::File(broken))
            .unwrap();

        let err = build_form(&request).unwrap_err();
        assert_eq!(err.error_code(), "invalid_request");
    }

    #[test]
    fn building_twice_leaves_request_untouched() {
        let request = OperationRequest::encode(Mode::Image, png(), Payload::Text("hi".into()))
            .unwrap();
        let before = request.clone();

        build_form(&request).unwrap();
        build_form(&request).unwrap();

        assert_eq!(request, before);
    }

    #[tokio::test]
    async fn form_carries_carrier_and_message_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/encode/image"))
            .and(body_string_contains(r#"name="image"; filename="cover.png""#))
            .and(body_string_contains(r#"name="message""#))
            .and(body_string_contains("hello"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let request = OperationRequest::encode(Mode::Image, png(), Payload::Text("hello".into()))
            .unwrap();
        let form = build_form(&request).unwrap();

        reqwest::Client::new()
            .post(format!("{}/encode/image", server.uri()))
            .multipart(form)
            .send()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn form_carries_hidden_file_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/image-file/encode"))
            .and(body_string_contains(r#"name="file"; filename="notes.txt""#))
            .and(body_string_contains("top secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let secret = MediaAsset::new(MediaKind::File, "notes.txt", "text/plain", "top secret");
        let request = OperationRequest::encode(Mode::FileInImage, png(), Payload::File(secret))
            .unwrap();
        let form = build_form(&request).unwrap();

        reqwest::Client::new()
            .post(format!("{}/image-file/encode", server.uri()))
            .multipart(form)
            .send()
            .await
            .unwrap();
    }
}
