//! Remark injection into share links.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use tracing::warn;

use crate::error::DecodeError;

/// Inject or replace the display remark on a share link.
///
/// vmess links carry their remark as the `ps` field inside the base64 JSON
/// body, so the body is decoded, patched and re-encoded. Every other scheme
/// gets the remark as a percent-encoded `#fragment`, replacing any existing
/// one.
///
/// This function never fails: if a vmess body cannot be patched, the remark
/// degrades to a fragment appended to the original string and the failure is
/// logged.
pub fn inject_remark(share: &str, remark: &str) -> String {
    if let Some(rest) = scheme_rest(share, "vmess") {
        match patch_vmess_ps(rest, remark) {
            Ok(patched) => return patched,
            Err(e) => {
                warn!(error = %e, "failed to patch vmess remark, falling back to fragment");
            }
        }
    }

    let base = match share.split_once('#') {
        Some((body, _)) => body,
        None => share,
    };
    format!("{base}#{}", urlencoding::encode(remark))
}

/// Case-insensitive scheme match, returning the remainder after `://`.
fn scheme_rest<'a>(share: &'a str, scheme: &str) -> Option<&'a str> {
    let (prefix, rest) = share.split_once("://")?;
    prefix.eq_ignore_ascii_case(scheme).then_some(rest)
}

fn patch_vmess_ps(rest: &str, remark: &str) -> Result<String, DecodeError> {
    let body = match rest.split_once('#') {
        Some((body, _)) => body,
        None => rest,
    };
    let bytes = STANDARD
        .decode(body.trim())
        .or_else(|_| STANDARD_NO_PAD.decode(body.trim()))?;

    let mut value: serde_json::Value = serde_json::from_slice(&bytes)?;
    let obj = value
        .as_object_mut()
        .ok_or(DecodeError::Malformed("vmess body is not a json object"))?;
    obj.insert("ps".to_string(), serde_json::Value::String(remark.to_string()));

    Ok(format!("vmess://{}", STANDARD.encode(value.to_string())))
}
