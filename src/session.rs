//! Per-session master passphrase cache.
//!
//! A `SessionKeyStore` is owned by whoever drives one interactive session
//! and passed explicitly; there is no process-wide instance. The
//! passphrase only ever lives in memory and is wiped on `clear` or drop.

use std::fmt;

use tracing::debug;
use zeroize::Zeroizing;

use crate::{
    error::VaultResult,
    vault::{DecryptOutcome, VaultCrypto},
};

#[derive(Default)]
pub struct SessionKeyStore {
    passphrase: Option<Zeroizing<String>>,
}

impl SessionKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&str> {
        self.passphrase.as_deref().map(String::as_str)
    }

    /// Replaces the cached passphrase. An empty passphrase locks the session.
    pub fn set(&mut self, passphrase: Zeroizing<String>) {
        if passphrase.is_empty() {
            self.clear();
            return;
        }
        self.passphrase = Some(passphrase);
        debug!("vault session unlocked");
    }

    pub fn clear(&mut self) {
        if self.passphrase.take().is_some() {
            debug!("vault session locked");
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Caches `passphrase` only if it decrypts `probe_token`, a known entry.
    ///
    /// Returns whether the session is now unlocked. A failed probe leaves
    /// the previous state untouched.
    pub fn unlock(
        &mut self,
        vault: &VaultCrypto,
        passphrase: Zeroizing<String>,
        probe_token: &str,
    ) -> VaultResult<bool> {
        match vault.try_decrypt_field(probe_token, &passphrase)? {
            DecryptOutcome::Decrypted(_) => {
                self.set(passphrase);
                Ok(true)
            }
            outcome => {
                debug!(?outcome, "unlock probe rejected");
                Ok(false)
            }
        }
    }
}

impl fmt::Debug for SessionKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeyStore")
            .field("unlocked", &self.is_unlocked())
            .finish()
    }
}
