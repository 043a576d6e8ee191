//! Cryptographic primitives.
//!
//! Provides the secret key type, OS randomness, and the AES-256-CTR
//! keystream used for both directions.

pub mod cipher;
pub mod key;

pub use cipher::{apply_keystream, decrypt, encrypt, encrypt_with_nonce};
pub use key::SecretKey;

use crate::error::{Error, Result};

/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the nonce, one AES block (16 bytes / 128 bits).
pub const NONCE_LEN: usize = 16;

/// Fill buffer with cryptographically secure random bytes
pub(crate) fn secure_random(buf: &mut [u8]) -> Result<()> {
    getrandom::fill(buf).map_err(|e| Error::RandomSource(e.to_string()))
}

/// Generate a fresh nonce
pub fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;
    Ok(nonce)
}
