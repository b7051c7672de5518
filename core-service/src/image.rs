//! Decoding of the browser-supplied image payload.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use provider_linkedin::PublishError;

/// Decode a `data:image/...;base64,` URL, or bare base64, into raw bytes.
///
/// Whitespace inside the base64 text is ignored.
pub fn decode_image_data(input: &str) -> Result<Bytes, PublishError> {
    let input = input.trim();
    let encoded = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest.split_once(',').ok_or_else(|| {
                PublishError::InvalidImage("data URL has no payload".to_string())
            })?;
            let mut parts = header.split(';');
            let mime = parts.next().unwrap_or_default();
            if !mime.is_empty() && !mime.starts_with("image/") {
                return Err(PublishError::InvalidImage(format!(
                    "unsupported media type '{}'",
                    mime
                )));
            }
            if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
                return Err(PublishError::InvalidImage(
                    "data URL is not base64 encoded".to_string(),
                ));
            }
            data
        }
        None => input,
    };

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(PublishError::InvalidImage("image is empty".to_string()));
    }

    STANDARD
        .decode(compact.as_bytes())
        .map(Bytes::from)
        .map_err(|e| PublishError::InvalidImage(format!("invalid base64: {}", e)))
}
