//! Token format v1.
//!
//! V1 Token Format:
//! ```text
//! base64( SALT (16) | NONCE (12) | CIPHERTEXT + TAG (>= 16) )
//! ```
//!
//! Fixed-width framing, no version marker. Keys are derived with
//! PBKDF2-HMAC-SHA256.

use super::{Token, TokenKdf, decode, encode, split_frame};
use crate::{
    crypto::{NONCE_LEN, SALT_LEN},
    error::VaultResult,
};

pub const VERSION_V1: u8 = 1;

/// Concatenates salt, nonce and sealed bytes and encodes them as base64.
pub fn pack(salt: &[u8; SALT_LEN], nonce: &[u8; NONCE_LEN], sealed: &[u8]) -> String {
    let mut buf = Vec::with_capacity(SALT_LEN + NONCE_LEN + sealed.len());
    buf.extend_from_slice(salt);
    buf.extend_from_slice(nonce);
    buf.extend_from_slice(sealed);
    encode(&buf)
}

/// Parses a v1 token.
///
/// # Errors
///
/// Returns a format error if the text is not base64 or decodes to fewer
/// than 44 bytes.
pub fn unpack(text: &str) -> VaultResult<Token> {
    let data = decode(text)?;
    let (salt, nonce, sealed) = split_frame(&data)?;
    Ok(Token::new(TokenKdf::Pbkdf2, salt, nonce, sealed))
}
