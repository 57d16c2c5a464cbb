//! Heuristic ciphertext detection.
//!
//! Tells tokens apart from legacy plaintext written before field
//! encryption existed. A plaintext value made only of base64 characters
//! that decodes to at least 44 bytes is misclassified as ciphertext; the
//! façade then fails authentication and shows it unchanged.

use crate::format::{self, v2};

fn is_base64_alphabet(s: &str) -> bool {
    let body = s.trim_end_matches('=');
    s.len() - body.len() <= 2
        && s.len() % 4 == 0
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Returns `true` if `value` is plausibly a ciphertext token.
pub fn looks_encrypted(value: &str) -> bool {
    let body = value.strip_prefix(v2::PREFIX).unwrap_or(value);
    if body.is_empty() || !is_base64_alphabet(body) {
        return false;
    }
    format::unpack(value).is_ok()
}
