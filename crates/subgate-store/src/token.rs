//! Secret token generation and display masking.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of generated customer tokens.
pub const TOKEN_LENGTH: usize = 32;

/// Generate a random alphanumeric token of the given length.
pub fn generate_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Mask a token for log output, keeping only a recognizable prefix/suffix.
pub fn mask_token(token: &str) -> String {
    if token.len() >= 12 {
        format!("{}...{}", &token[..8], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}
