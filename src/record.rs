use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::VaultResult,
    sniff::looks_encrypted,
    vault::{DecryptOutcome, VaultCrypto},
};

/// Result of sealing one record's password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealOutcome {
    /// Plaintext was encrypted.
    Sealed,
    /// The password is already a token that decrypts under this passphrase.
    AlreadySealed,
    /// Empty password or no passphrase.
    Skipped,
    /// The password is shaped like a token but does not decrypt under this
    /// passphrase. It may be plaintext or ciphertext under another key, so
    /// it is left unchanged.
    Unverified,
}

/// A password vault entry as the record API stores it.
///
/// `password` holds either a ciphertext token or legacy plaintext.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VaultRecord {
    id: String,
    site: String,
    username: String,
    password: String,
    #[serde(default)]
    updated: String,
}

impl VaultRecord {
    pub fn new(id: &str, site: &str, username: &str, password: &str) -> Self {
        Self {
            id: id.to_string(),
            site: site.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            updated: Utc::now().to_rfc3339(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The stored password attribute, as persisted.
    pub fn stored_password(&self) -> &str {
        &self.password
    }

    pub fn updated(&self) -> &str {
        &self.updated
    }

    /// `true` if the password was written before field encryption.
    ///
    /// Sniffer based: long base64-shaped plaintext reports `false`.
    pub fn is_legacy(&self) -> bool {
        !self.password.is_empty() && !looks_encrypted(&self.password)
    }

    /// Decrypts the password, returning the stored value on any failure.
    pub fn reveal(&self, vault: &VaultCrypto, passphrase: &str) -> VaultResult<String> {
        vault.decrypt_field(&self.password, passphrase)
    }

    /// Encrypts a legacy password in place.
    ///
    /// A password the sniffer takes for a token only counts as sealed once
    /// it decrypts under `passphrase`.
    pub fn seal(&mut self, vault: &VaultCrypto, passphrase: &str) -> VaultResult<SealOutcome> {
        if passphrase.is_empty() || self.password.is_empty() {
            return Ok(SealOutcome::Skipped);
        }

        if looks_encrypted(&self.password) {
            match vault.try_decrypt_field(&self.password, passphrase)? {
                DecryptOutcome::Decrypted(_) => return Ok(SealOutcome::AlreadySealed),
                DecryptOutcome::AuthenticationFailed => {
                    warn!(id = %self.id, "password looks encrypted but does not decrypt");
                    return Ok(SealOutcome::Unverified);
                }
                DecryptOutcome::NotCiphertext | DecryptOutcome::NoPassphrase => {}
            }
        }

        self.encrypt_password(vault, passphrase)?;
        Ok(SealOutcome::Sealed)
    }

    /// Like [`seal`](Self::seal), but also encrypts [`SealOutcome::Unverified`]
    /// passwords, treating them as plaintext.
    pub fn seal_unverified(
        &mut self,
        vault: &VaultCrypto,
        passphrase: &str,
    ) -> VaultResult<SealOutcome> {
        match self.seal(vault, passphrase)? {
            SealOutcome::Unverified => {
                self.encrypt_password(vault, passphrase)?;
                Ok(SealOutcome::Sealed)
            }
            outcome => Ok(outcome),
        }
    }

    fn encrypt_password(&mut self, vault: &VaultCrypto, passphrase: &str) -> VaultResult<()> {
        self.password = vault.encrypt_field(&self.password, passphrase)?;
        self.updated = Utc::now().to_rfc3339();
        Ok(())
    }
}
