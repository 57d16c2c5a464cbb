use argon2::{Algorithm, Argon2, Params, Version};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{KEY_LEN, SALT_LEN};
use crate::error::{VaultError, VaultResult};

/// A derived 256-bit key, wiped on drop.
pub type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pbkdf2Params {
    iterations: u32,
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            iterations: 100_000,
        }
    }
}

impl Pbkdf2Params {
    pub fn new(iterations: u32) -> VaultResult<Self> {
        let params = Self { iterations };
        params.validate()?;
        Ok(params)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.iterations < 1 {
            return Err(VaultError::InvalidParameters(
                "pbkdf2 iteration count must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            mem_cost_kib: 64 * 1024, // 64 MiB
            time_cost: 3,
            parallelism: 1,
        }
    }
}

impl Argon2Params {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> VaultResult<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> VaultResult<()> {
        let invalid = |msg: &str| Err(VaultError::InvalidParameters(msg.into()));

        if self.time_cost < 1 {
            return invalid("argon2 time cost must be >= 1");
        }
        if self.parallelism < 1 {
            return invalid("argon2 parallelism must be >= 1");
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            return invalid("argon2 memory cost must be at least 8 * parallelism");
        }
        Ok(())
    }
}

/// Key derivation algorithm together with its cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfParams {
    Pbkdf2Sha256(Pbkdf2Params),
    Argon2id(Argon2Params),
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::Pbkdf2Sha256(Pbkdf2Params::default())
    }
}

/// Derives a 32-byte key from `passphrase` and a 16-byte `salt`.
///
/// Deterministic for identical inputs. Fails with
/// [`VaultError::InvalidParameters`] on a wrong salt length or bad cost
/// parameters.
pub fn derive_key(passphrase: &[u8], salt: &[u8], kdf: KdfParams) -> VaultResult<DerivedKey> {
    if salt.len() != SALT_LEN {
        return Err(VaultError::InvalidParameters(format!(
            "salt must be {SALT_LEN} bytes, got {}",
            salt.len()
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);

    match kdf {
        KdfParams::Pbkdf2Sha256(params) => {
            params.validate()?;
            pbkdf2_hmac::<Sha256>(passphrase, salt, params.iterations, &mut key[..]);
        }
        KdfParams::Argon2id(params) => {
            params.validate()?;
            let argon_params = Params::new(
                params.mem_cost_kib,
                params.time_cost,
                params.parallelism,
                Some(KEY_LEN),
            )
            .map_err(|e| VaultError::InvalidParameters(format!("argon2 params: {e}")))?;

            Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params)
                .hash_password_into(passphrase, salt, &mut key[..])
                .map_err(|e| VaultError::InvalidParameters(format!("argon2: {e}")))?;
        }
    }

    Ok(key)
}
