use axum::http::HeaderMap;
use warehouse_core::error::DomainError;

const HEADER_NAME: &str = "Idempotency-Key";

/// Extracts and validates `Idempotency-Key` for the operations that
/// require one: missing or blank is `InvalidArgument`, not a
/// silently-generated key.
pub fn required(headers: &HeaderMap) -> Result<String, DomainError> {
    let value = headers
        .get(HEADER_NAME)
        .ok_or_else(|| DomainError::InvalidArgument("missing Idempotency-Key header".into()))?
        .to_str()
        .map_err(|_| DomainError::InvalidArgument("Idempotency-Key header is not valid UTF-8".into()))?
        .trim();

    if value.is_empty() || value.len() > 64 {
        return Err(DomainError::InvalidArgument(
            "Idempotency-Key must be 1-64 characters".into(),
        ));
    }
    Ok(value.to_string())
}

/// The goods-receipts endpoint treats the header as optional — the engine
/// derives a key from the payload when it's absent.
pub fn optional(headers: &HeaderMap) -> Option<String> {
    headers
        .get(HEADER_NAME)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
