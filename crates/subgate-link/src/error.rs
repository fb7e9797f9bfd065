//! Codec error types.

/// Error produced when a share link cannot be decoded.
///
/// Decode failures are always non-fatal for callers: renderers downgrade
/// them to a skipped slot plus a logged warning.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Scheme is intentionally opaque (`vless://`, `trojan://`, `http://`)
    /// or unknown entirely.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Base64 payload did not decode.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded vmess payload was not valid JSON.
    #[error("invalid vmess json: {0}")]
    Json(#[from] serde_json::Error),

    /// Decoded payload was not valid UTF-8.
    #[error("invalid utf-8 in link payload")]
    Utf8,

    /// Port was missing, non-numeric, or out of range (1-65535).
    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    /// Link structure did not match the scheme's expected layout.
    #[error("malformed link: {0}")]
    Malformed(&'static str),
}
