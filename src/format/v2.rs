//! Token format v2.
//!
//! V2 Token Format:
//! ```text
//! "v2:" base64( MEM_COST (4) | TIME_COST (4) | PARALLELISM (4) | SALT (16) | NONCE (12) | CIPHERTEXT + TAG )
//! ```
//!
//! Cost fields are little-endian u32. Keys are derived with Argon2id.

use super::{MIN_TOKEN_LEN, Token, TokenKdf, decode, encode, split_frame};
use crate::{
    crypto::{Argon2Params, NONCE_LEN, SALT_LEN},
    error::{VaultError, VaultResult},
};

pub const VERSION_V2: u8 = 2;

/// Text marker ahead of the base64 body.
pub const PREFIX: &str = "v2:";

const MEM_LEN: usize = 4;
const TIME_LEN: usize = 4;
const PAR_LEN: usize = 4;

const PARAMS_LEN: usize = MEM_LEN + TIME_LEN + PAR_LEN;

// Upper bounds on stored costs, so a crafted token cannot stall a reader.
pub const MAX_MEM_COST_KIB: u32 = 256 * 1024;
pub const MAX_TIME_COST: u32 = 10;
pub const MAX_PARALLELISM: u32 = 4;

/// `true` if a reader will accept these costs from a v2 token.
pub fn within_limits(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> bool {
    mem_cost_kib <= MAX_MEM_COST_KIB && time_cost <= MAX_TIME_COST && parallelism <= MAX_PARALLELISM
}

/// Smallest decoded v2 body.
pub const MIN_V2_LEN: usize = PARAMS_LEN + MIN_TOKEN_LEN;

pub fn pack(
    params: Argon2Params,
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
    sealed: &[u8],
) -> String {
    let mut buf = Vec::with_capacity(PARAMS_LEN + SALT_LEN + NONCE_LEN + sealed.len());

    buf.extend_from_slice(&params.mem_cost_kib().to_le_bytes());
    buf.extend_from_slice(&params.time_cost().to_le_bytes());
    buf.extend_from_slice(&params.parallelism().to_le_bytes());

    buf.extend_from_slice(salt);
    buf.extend_from_slice(nonce);
    buf.extend_from_slice(sealed);

    format!("{PREFIX}{}", encode(&buf))
}

/// Parses the base64 body of a v2 token (prefix already stripped).
pub fn unpack(body: &str) -> VaultResult<Token> {
    let data = decode(body)?;
    if data.len() < MIN_V2_LEN {
        return Err(VaultError::Format(format!(
            "v2 token too short: {} bytes, need at least {MIN_V2_LEN}",
            data.len()
        )));
    }

    let read_u32 = |at: usize| -> VaultResult<u32> {
        let bytes: [u8; 4] = data[at..at + 4]
            .try_into()
            .map_err(|_| VaultError::Format("truncated cost field".into()))?;
        Ok(u32::from_le_bytes(bytes))
    };

    let mem_cost = read_u32(0)?;
    let time_cost = read_u32(MEM_LEN)?;
    let parallelism = read_u32(MEM_LEN + TIME_LEN)?;

    if !within_limits(mem_cost, time_cost, parallelism) {
        return Err(VaultError::Format("v2 kdf parameters exceed limits".into()));
    }

    let params = Argon2Params::new(mem_cost, time_cost, parallelism)
        .map_err(|e| VaultError::Format(format!("bad v2 kdf parameters: {e}")))?;

    let (salt, nonce, sealed) = split_frame(&data[PARAMS_LEN..])?;
    Ok(Token::new(TokenKdf::Argon2id(params), salt, nonce, sealed))
}
