//! Field-level encryption for password vault entries.
//!
//! Secrets are sealed locally with AES-256-GCM under a key derived from the
//! user's master passphrase, and stored by an untrusted backend as opaque
//! base64 tokens. Values written before encryption existed keep working:
//! anything that is not a token, or that does not authenticate, is handed
//! back unchanged.

pub mod crypto;
mod error;
pub mod format;
pub mod record;
pub mod session;
pub mod sniff;
pub mod storage;
pub mod vault;

pub use crate::crypto::{Argon2Params, Pbkdf2Params};
pub use crate::error::{VaultError, VaultResult};
pub use crate::record::{SealOutcome, VaultRecord};
pub use crate::session::SessionKeyStore;
pub use crate::sniff::looks_encrypted;
pub use crate::storage::RecordFile;
pub use crate::vault::{
    DecryptOutcome, Scheme, VaultConfig, VaultCrypto, decrypt_field, encrypt_field,
};
