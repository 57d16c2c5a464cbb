use thiserror::Error;

/// Errors raised by the field encryption core.
///
/// Messages never include passphrases or plaintext.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Malformed salt, key length or KDF parameters. Only caller bugs reach this.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The token does not parse as a ciphertext token.
    #[error("malformed ciphertext token: {0}")]
    Format(String),

    /// Tag verification failed: wrong passphrase or tampered data.
    #[error("invalid passphrase or corrupted data")]
    Authentication,

    #[error("OS random generator unavailable")]
    Random,
}

pub type VaultResult<T> = Result<T, VaultError>;
