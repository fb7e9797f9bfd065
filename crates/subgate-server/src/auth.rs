//! HTTP Basic authentication for the admin surface.

use axum::http::{HeaderMap, header};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use subgate_config::AdminConfig;

use crate::error::ApiError;

/// Verify the `Authorization: Basic ...` header against the configured
/// admin credentials.
pub fn verify_basic(headers: &HeaderMap, admin: &AdminConfig) -> Result<(), ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    let encoded = header
        .strip_prefix("Basic ")
        .ok_or(ApiError::Unauthorized)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| ApiError::Unauthorized)?;
    let decoded = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;
    let (username, password) = decoded.split_once(':').ok_or(ApiError::Unauthorized)?;

    // Non-short-circuiting `&` so both comparisons always run.
    if digest_eq(username, &admin.username) & digest_eq(password, &admin.password) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Compare by fixed-length digest so timing does not leak prefix length.
fn digest_eq(supplied: &str, expected: &str) -> bool {
    Sha256::digest(supplied.as_bytes()) == Sha256::digest(expected.as_bytes())
}
