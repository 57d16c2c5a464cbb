//! Ciphertext token encoding.
//!
//! A token is the text stored in place of a plaintext field. Two layouts
//! exist and are told apart by a text prefix, since `:` never occurs in
//! standard base64:
//!
//! ```text
//! v1:        base64( SALT (16) | NONCE (12) | CIPHERTEXT + TAG )
//! v2:  "v2:" base64( MEM (4) | TIME (4) | PAR (4) | SALT (16) | NONCE (12) | CIPHERTEXT + TAG )
//! ```

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{
    crypto::{Argon2Params, NONCE_LEN, SALT_LEN, TAG_LEN},
    error::{VaultError, VaultResult},
};

pub mod v1;
pub mod v2;

/// Smallest decoded v1 token: salt, nonce and a bare tag.
pub const MIN_TOKEN_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// Which key derivation a token was sealed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKdf {
    /// PBKDF2-HMAC-SHA256; the iteration count is configuration, not stored.
    Pbkdf2,
    /// Argon2id with the parameters carried in the token.
    Argon2id(Argon2Params),
}

/// A parsed ciphertext token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kdf: TokenKdf,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    sealed: Vec<u8>,
}

impl Token {
    pub fn new(
        kdf: TokenKdf,
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
        sealed: Vec<u8>,
    ) -> Self {
        Self {
            kdf,
            salt,
            nonce,
            sealed,
        }
    }

    /// Returns the token format version.
    pub fn version(&self) -> u8 {
        match self.kdf {
            TokenKdf::Pbkdf2 => v1::VERSION_V1,
            TokenKdf::Argon2id(_) => v2::VERSION_V2,
        }
    }

    pub fn kdf(&self) -> &TokenKdf {
        &self.kdf
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Returns `ciphertext ‖ tag`.
    pub fn sealed(&self) -> &[u8] {
        &self.sealed
    }
}

/// Encodes a token as text, picking the layout from its KDF.
pub fn pack(token: &Token) -> String {
    match token.kdf {
        TokenKdf::Pbkdf2 => v1::pack(&token.salt, &token.nonce, &token.sealed),
        TokenKdf::Argon2id(params) => v2::pack(params, &token.salt, &token.nonce, &token.sealed),
    }
}

/// Parses token text.
///
/// # Errors
///
/// Returns [`VaultError::Format`] if the text is not valid base64, is
/// shorter than the minimum token size, or carries bad KDF parameters.
pub fn unpack(text: &str) -> VaultResult<Token> {
    match text.strip_prefix(v2::PREFIX) {
        Some(body) => v2::unpack(body),
        None => v1::unpack(text),
    }
}

/// Decodes strict standard base64 (padding required, no whitespace).
pub(crate) fn decode(text: &str) -> VaultResult<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| VaultError::Format(format!("invalid base64: {e}")))
}

pub(crate) fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

type Frame = ([u8; SALT_LEN], [u8; NONCE_LEN], Vec<u8>);

/// Splits `SALT | NONCE | SEALED` at fixed offsets.
pub(crate) fn split_frame(data: &[u8]) -> VaultResult<Frame> {
    if data.len() < MIN_TOKEN_LEN {
        return Err(VaultError::Format(format!(
            "token too short: {} bytes, need at least {MIN_TOKEN_LEN}",
            data.len()
        )));
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce, sealed) = rest.split_at(NONCE_LEN);

    let salt: [u8; SALT_LEN] = salt
        .try_into()
        .map_err(|_| VaultError::Format("invalid salt length".into()))?;
    let nonce: [u8; NONCE_LEN] = nonce
        .try_into()
        .map_err(|_| VaultError::Format("invalid nonce length".into()))?;

    Ok((salt, nonce, sealed.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_dispatches_on_prefix() {
        let v1_text = v1::pack(&[1u8; 16], &[2u8; 12], &[3u8; 16]);
        assert_eq!(unpack(&v1_text).unwrap().version(), 1);

        let params = Argon2Params::new(64, 1, 1).unwrap();
        let v2_text = v2::pack(params, &[1u8; 16], &[2u8; 12], &[3u8; 16]);
        assert!(v2_text.starts_with("v2:"));
        assert_eq!(unpack(&v2_text).unwrap().version(), 2);
    }

    #[test]
    fn pack_follows_token_kdf() {
        let token = Token::new(TokenKdf::Pbkdf2, [9u8; 16], [8u8; 12], vec![7u8; 20]);
        let parsed = unpack(&pack(&token)).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn encoded_text_has_no_line_wraps() {
        let text = v1::pack(&[0u8; 16], &[0u8; 12], &vec![0u8; 512]);
        assert!(!text.contains('\n'));
        assert!(!text.contains('\r'));
    }
}
