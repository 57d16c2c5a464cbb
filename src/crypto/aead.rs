use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, consts::U12},
};
use getrandom::fill;

use super::{KEY_LEN, NONCE_LEN, SALT_LEN};
use crate::error::{VaultError, VaultResult};

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> VaultResult<()> {
    fill(buf).map_err(|_| VaultError::Random)
}

/// Generate a fresh salt
pub fn generate_salt() -> VaultResult<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Generate a fresh nonce
pub fn generate_nonce() -> VaultResult<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;
    Ok(nonce)
}

fn cipher(key: &[u8]) -> VaultResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key).map_err(|_| {
        VaultError::InvalidParameters(format!("key must be {KEY_LEN} bytes, got {}", key.len()))
    })
}

fn nonce(nonce: &[u8]) -> VaultResult<&Nonce<U12>> {
    if nonce.len() != NONCE_LEN {
        return Err(VaultError::InvalidParameters(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }
    Ok(Nonce::from_slice(nonce))
}

/// Encrypt plaintext, returning `ciphertext ‖ tag`.
pub fn seal(key: &[u8], nonce_bytes: &[u8], plaintext: &[u8]) -> VaultResult<Vec<u8>> {
    cipher(key)?
        .encrypt(nonce(nonce_bytes)?, plaintext)
        .map_err(|_| VaultError::InvalidParameters("plaintext too long for AES-GCM".into()))
}

/// Decrypt `ciphertext ‖ tag`.
///
/// Any tag mismatch is reported as [`VaultError::Authentication`].
pub fn open(key: &[u8], nonce_bytes: &[u8], sealed: &[u8]) -> VaultResult<Vec<u8>> {
    cipher(key)?
        .decrypt(nonce(nonce_bytes)?, sealed)
        .map_err(|_| VaultError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::TAG_LEN;

    #[test]
    fn seal_open_roundtrip() {
        let key = [3u8; KEY_LEN];
        let nonce = generate_nonce().unwrap();

        let sealed = seal(&key, &nonce, b"secret data").unwrap();
        assert_eq!(sealed.len(), b"secret data".len() + TAG_LEN);

        let plaintext = open(&key, &nonce, &sealed).unwrap();
        assert_eq!(plaintext, b"secret data");
    }

    #[test]
    fn empty_plaintext_is_just_a_tag() {
        let key = [3u8; KEY_LEN];
        let nonce = [0u8; NONCE_LEN];

        let sealed = seal(&key, &nonce, b"").unwrap();
        assert_eq!(sealed.len(), TAG_LEN);
        assert!(open(&key, &nonce, &sealed).unwrap().is_empty());
    }

    #[test]
    fn wrong_key_is_authentication_failure() {
        let nonce = [0u8; NONCE_LEN];
        let sealed = seal(&[1u8; KEY_LEN], &nonce, b"data").unwrap();

        match open(&[2u8; KEY_LEN], &nonce, &sealed) {
            Err(VaultError::Authentication) => {}
            other => panic!("expected Authentication, got: {other:?}"),
        }
    }

    #[test]
    fn tampered_ciphertext_is_authentication_failure() {
        let key = [1u8; KEY_LEN];
        let nonce = [0u8; NONCE_LEN];
        let mut sealed = seal(&key, &nonce, b"data").unwrap();
        sealed[0] ^= 0x01;

        assert!(matches!(
            open(&key, &nonce, &sealed),
            Err(VaultError::Authentication)
        ));
    }

    #[test]
    fn bad_key_and_nonce_lengths_are_invalid_parameters() {
        assert!(matches!(
            seal(&[0u8; 16], &[0u8; NONCE_LEN], b"x"),
            Err(VaultError::InvalidParameters(_))
        ));
        assert!(matches!(
            seal(&[0u8; KEY_LEN], &[0u8; 24], b"x"),
            Err(VaultError::InvalidParameters(_))
        ));
    }

    #[test]
    fn salts_are_fresh() {
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
    }
}
