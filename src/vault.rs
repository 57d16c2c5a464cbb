//! Field encryption façade.
//!
//! Empty input or a missing passphrase is a no-op in both directions, and
//! decryption hands back the input unchanged whenever it is not a token
//! or does not authenticate. Legacy plaintext records and encrypted ones
//! can therefore live side by side.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    crypto::{self, Argon2Params, KdfParams, Pbkdf2Params},
    error::{VaultError, VaultResult},
    format::{self, Token, TokenKdf, v2},
};

/// Token layout written by [`VaultCrypto::encrypt_field`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Unprefixed PBKDF2-SHA256 tokens.
    #[default]
    V1,
    /// `v2:` prefixed Argon2id tokens.
    V2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub scheme: Scheme,
    pub pbkdf2: Pbkdf2Params,
    pub argon2: Argon2Params,
}

impl VaultConfig {
    /// Default v1 configuration with a custom PBKDF2 iteration count.
    pub fn with_iterations(iterations: u32) -> VaultResult<Self> {
        Ok(Self {
            pbkdf2: Pbkdf2Params::new(iterations)?,
            ..Self::default()
        })
    }

    /// Checks both parameter sets. Argon2 costs must also be readable back
    /// from a v2 token.
    pub fn validate(&self) -> VaultResult<()> {
        self.pbkdf2.validate()?;
        self.argon2.validate()?;

        let argon2 = &self.argon2;
        if !v2::within_limits(argon2.mem_cost_kib(), argon2.time_cost(), argon2.parallelism()) {
            return Err(VaultError::InvalidParameters(format!(
                "argon2 costs exceed v2 token limits ({} KiB, {} passes, {} lanes)",
                v2::MAX_MEM_COST_KIB,
                v2::MAX_TIME_COST,
                v2::MAX_PARALLELISM
            )));
        }
        Ok(())
    }

    fn kdf_for(&self, kdf: &TokenKdf) -> KdfParams {
        match kdf {
            TokenKdf::Pbkdf2 => KdfParams::Pbkdf2Sha256(self.pbkdf2),
            TokenKdf::Argon2id(params) => KdfParams::Argon2id(*params),
        }
    }
}

/// What happened when a field was decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptOutcome {
    Decrypted(String),
    /// The input or the passphrase was empty.
    NoPassphrase,
    /// The input is not a token; most likely legacy plaintext.
    NotCiphertext,
    /// The token did not authenticate under this passphrase.
    AuthenticationFailed,
}

#[derive(Debug, Clone, Default)]
pub struct VaultCrypto {
    config: VaultConfig,
}

impl VaultCrypto {
    pub fn new(config: VaultConfig) -> VaultResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Encrypts `plaintext` under `passphrase` with a fresh salt and nonce.
    ///
    /// Returns `plaintext` unchanged if either argument is empty.
    pub fn encrypt_field(&self, plaintext: &str, passphrase: &str) -> VaultResult<String> {
        if plaintext.is_empty() || passphrase.is_empty() {
            return Ok(plaintext.to_owned());
        }

        let salt = crypto::generate_salt()?;
        let nonce = crypto::generate_nonce()?;

        let token_kdf = match self.config.scheme {
            Scheme::V1 => TokenKdf::Pbkdf2,
            Scheme::V2 => TokenKdf::Argon2id(self.config.argon2),
        };
        let kdf = self.config.kdf_for(&token_kdf);
        let key = crypto::derive_key(passphrase.as_bytes(), &salt, kdf)?;
        let sealed = crypto::seal(key.as_slice(), &nonce, plaintext.as_bytes())?;

        let token = Token::new(token_kdf, salt, nonce, sealed);
        debug!(version = token.version(), "field encrypted");
        Ok(format::pack(&token))
    }

    /// Decrypts `token`, reporting format and authentication failures apart.
    ///
    /// Only [`VaultError::InvalidParameters`] is returned as an error.
    pub fn try_decrypt_field(&self, token: &str, passphrase: &str) -> VaultResult<DecryptOutcome> {
        if token.is_empty() || passphrase.is_empty() {
            return Ok(DecryptOutcome::NoPassphrase);
        }

        let parsed = match format::unpack(token) {
            Ok(parsed) => parsed,
            Err(VaultError::Format(_)) => {
                debug!(len = token.len(), "value is not a ciphertext token");
                return Ok(DecryptOutcome::NotCiphertext);
            }
            Err(e) => return Err(e),
        };

        let key = crypto::derive_key(
            passphrase.as_bytes(),
            parsed.salt(),
            self.config.kdf_for(parsed.kdf()),
        )?;

        let plaintext = match crypto::open(key.as_slice(), parsed.nonce(), parsed.sealed()) {
            Ok(plaintext) => plaintext,
            Err(VaultError::Authentication) => return Ok(DecryptOutcome::AuthenticationFailed),
            Err(e) => return Err(e),
        };

        match String::from_utf8(plaintext) {
            Ok(text) => Ok(DecryptOutcome::Decrypted(text)),
            Err(_) => Ok(DecryptOutcome::NotCiphertext),
        }
    }

    /// Decrypts `token`, falling back to returning it unchanged.
    pub fn decrypt_field(&self, token: &str, passphrase: &str) -> VaultResult<String> {
        match self.try_decrypt_field(token, passphrase)? {
            DecryptOutcome::Decrypted(plaintext) => Ok(plaintext),
            DecryptOutcome::NoPassphrase => Ok(token.to_owned()),
            DecryptOutcome::NotCiphertext => {
                warn!(len = token.len(), "field is not ciphertext, returning as-is");
                Ok(token.to_owned())
            }
            DecryptOutcome::AuthenticationFailed => {
                warn!(len = token.len(), "field failed authentication, returning as-is");
                Ok(token.to_owned())
            }
        }
    }
}

/// [`VaultCrypto::encrypt_field`] with the default configuration.
pub fn encrypt_field(plaintext: &str, passphrase: &str) -> VaultResult<String> {
    VaultCrypto::default().encrypt_field(plaintext, passphrase)
}

/// [`VaultCrypto::decrypt_field`] with the default configuration.
pub fn decrypt_field(token: &str, passphrase: &str) -> VaultResult<String> {
    VaultCrypto::default().decrypt_field(token, passphrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniff::looks_encrypted;
    use base64::{Engine, engine::general_purpose::STANDARD};

    fn fast() -> VaultCrypto {
        VaultCrypto::new(VaultConfig::with_iterations(1_000).unwrap()).unwrap()
    }

    fn fast_v2() -> VaultCrypto {
        VaultCrypto::new(VaultConfig {
            scheme: Scheme::V2,
            argon2: Argon2Params::new(64, 1, 1).unwrap(),
            ..VaultConfig::with_iterations(1_000).unwrap()
        })
        .unwrap()
    }

    #[test]
    fn scenario_with_default_iterations() {
        let passphrase = "correct horse battery staple";
        let token = encrypt_field("S3cr3t!", passphrase).unwrap();

        assert_ne!(token, "S3cr3t!");
        assert!(STANDARD.decode(&token).unwrap().len() > 44);

        assert_eq!(decrypt_field(&token, passphrase).unwrap(), "S3cr3t!");
        assert_eq!(decrypt_field(&token, "wrong").unwrap(), token);
    }

    #[test]
    fn roundtrip_unicode_and_long_values() {
        let vault = fast();
        let long = "x".repeat(10_000);
        for plaintext in ["p", "pässwörd 🔑", "line\nbreak", long.as_str()] {
            let token = vault.encrypt_field(plaintext, "pw").unwrap();
            assert_eq!(vault.decrypt_field(&token, "pw").unwrap(), plaintext);
        }
    }

    #[test]
    fn empty_inputs_are_noops() {
        let vault = fast();
        assert_eq!(vault.encrypt_field("secret", "").unwrap(), "secret");
        assert_eq!(vault.decrypt_field("secret", "").unwrap(), "secret");
        assert_eq!(vault.encrypt_field("", "pw").unwrap(), "");
        assert_eq!(vault.decrypt_field("", "pw").unwrap(), "");
        assert_eq!(
            vault.try_decrypt_field("secret", "").unwrap(),
            DecryptOutcome::NoPassphrase
        );
    }

    #[test]
    fn each_encryption_is_fresh() {
        let vault = fast();
        let a = vault.encrypt_field("same", "pw").unwrap();
        let b = vault.encrypt_field("same", "pw").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_passphrase_returns_token_unchanged() {
        let vault = fast();
        let token = vault.encrypt_field("hunter2", "right").unwrap();

        assert_eq!(vault.decrypt_field(&token, "wrong").unwrap(), token);
        assert_eq!(
            vault.try_decrypt_field(&token, "wrong").unwrap(),
            DecryptOutcome::AuthenticationFailed
        );
    }

    #[test]
    fn legacy_plaintext_is_returned_as_is() {
        let vault = fast();
        assert_eq!(
            vault.decrypt_field("not-base64-!!!", "anyKey").unwrap(),
            "not-base64-!!!"
        );
        assert_eq!(
            vault.try_decrypt_field("plainpassword123", "anyKey").unwrap(),
            DecryptOutcome::NotCiphertext
        );
    }

    #[test]
    fn zeroed_minimum_token_fails_authentication() {
        let vault = fast();
        let token = STANDARD.encode([0u8; 44]);
        assert_eq!(
            vault.try_decrypt_field(&token, "pw").unwrap(),
            DecryptOutcome::AuthenticationFailed
        );
        assert_eq!(vault.decrypt_field(&token, "pw").unwrap(), token);
    }

    #[test]
    fn tampered_token_falls_back() {
        let vault = fast();
        let token = vault.encrypt_field("hunter2", "pw").unwrap();

        let mut raw = STANDARD.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x80;
        let tampered = STANDARD.encode(raw);

        assert_eq!(vault.decrypt_field(&tampered, "pw").unwrap(), tampered);
    }

    #[test]
    fn iteration_count_must_match_to_decrypt_v1() {
        let token = fast().encrypt_field("hunter2", "pw").unwrap();
        let other = VaultCrypto::new(VaultConfig::with_iterations(1_001).unwrap()).unwrap();
        assert_eq!(
            other.try_decrypt_field(&token, "pw").unwrap(),
            DecryptOutcome::AuthenticationFailed
        );
    }

    #[test]
    fn v2_tokens_carry_their_own_parameters() {
        let token = fast_v2().encrypt_field("hunter2", "pw").unwrap();
        assert!(token.starts_with("v2:"));
        assert!(looks_encrypted(&token));

        // A v1-configured vault still reads v2 tokens.
        assert_eq!(fast().decrypt_field(&token, "pw").unwrap(), "hunter2");
        assert_eq!(fast().decrypt_field(&token, "nope").unwrap(), token);
    }

    #[test]
    fn sniffer_recognises_fresh_tokens() {
        let token = fast().encrypt_field("hello", "pw").unwrap();
        assert!(looks_encrypted(&token));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: VaultConfig = serde_json::from_str(r#"{"scheme":"v2"}"#).unwrap();
        assert_eq!(config.scheme, Scheme::V2);
        assert_eq!(config.pbkdf2.iterations(), 100_000);
        assert!(VaultCrypto::new(config).is_ok());
        assert!(VaultConfig::with_iterations(0).is_err());
    }

    #[test]
    fn argon2_costs_beyond_token_limits_are_rejected() {
        let config = VaultConfig {
            argon2: Argon2Params::new(v2::MAX_MEM_COST_KIB * 2, 1, 1).unwrap(),
            ..VaultConfig::default()
        };
        assert!(matches!(
            VaultCrypto::new(config),
            Err(VaultError::InvalidParameters(_))
        ));
    }
}
