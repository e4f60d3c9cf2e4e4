//! Request body helpers shared by the JSON endpoints.

use axum::http::{HeaderMap, header::CONTENT_TYPE};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

/// Upper bound for any request body; a scan of ten thousand links fits comfortably.
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Parses and validates Content-Type header for application/json
///
/// Accepts `application/json` with or without a charset parameter; rejects
/// look-alikes such as `application/jsonp` or `text/json`.
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidPayload(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Validates that body size does not exceed the maximum allowed size
pub fn validate_body_size(data: &[u8], max_size: usize) -> Result<(), ApiError> {
    if data.len() > max_size {
        return Err(ApiError::PayloadTooLarge(data.len()));
    }
    Ok(())
}

/// Checks the Content-Type, collects the body and decodes it as JSON.
///
/// Gzip request bodies are already inflated by the decompression layer.
pub async fn read_json<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: axum::body::Body,
) -> Result<T, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;

    let data = body
        .collect()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .to_bytes();
    validate_body_size(&data, MAX_PAYLOAD_SIZE)?;

    Ok(serde_json::from_slice(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde::Deserialize;

    #[test]
    fn test_parse_content_type_valid() {
        assert!(parse_content_type("application/json").is_ok());
        assert!(parse_content_type("application/json; charset=utf-8").is_ok());
    }

    #[test]
    fn test_parse_content_type_invalid() {
        assert!(parse_content_type("application/jsonp").is_err());
        assert!(parse_content_type("text/json").is_err());
        assert!(parse_content_type("invalid").is_err());
        assert!(parse_content_type("").is_err());
    }

    #[test]
    fn test_validate_body_size() {
        assert!(validate_body_size(&[0u8; 16], 16).is_ok());
        assert!(matches!(
            validate_body_size(&[0u8; 17], 16),
            Err(ApiError::PayloadTooLarge(17))
        ));
    }

    #[derive(Debug, Deserialize)]
    struct Probe {
        address: String,
    }

    #[tokio::test]
    async fn test_read_json() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let probe: Probe = read_json(&headers, axum::body::Body::from(r#"{"address":"a"}"#))
            .await
            .unwrap();
        assert_eq!(probe.address, "a");

        let result: Result<Probe, _> =
            read_json(&headers, axum::body::Body::from("not json")).await;
        assert!(matches!(result, Err(ApiError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn test_read_json_requires_content_type() {
        let result: Result<Probe, _> =
            read_json(&HeaderMap::new(), axum::body::Body::from(r#"{"address":"a"}"#)).await;
        assert!(matches!(result, Err(ApiError::InvalidPayload(_))));
    }
}
