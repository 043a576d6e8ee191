//! AES-256 in counter mode.
//!
//! The nonce is the initial value of a 128-bit big-endian counter that is
//! incremented once per block and wraps modulo 2^128. Encryption and
//! decryption are the same XOR with the keystream.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use zeroize::Zeroizing;

use super::{NONCE_LEN, SecretKey, generate_nonce};
use crate::error::Result;
use crate::format::Envelope;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// XORs `buf` in place with the keystream for `key` and `nonce`.
pub fn apply_keystream(key: &SecretKey, nonce: &[u8; NONCE_LEN], buf: &mut [u8]) {
    let mut cipher = Aes256Ctr::new(key.as_bytes().into(), nonce.into());
    cipher.apply_keystream(buf);
}

/// Encrypt plaintext under a fresh random nonce
pub fn encrypt(key: &SecretKey, plaintext: &[u8]) -> Result<Envelope> {
    let nonce = generate_nonce()?;
    Ok(encrypt_with_nonce(key, nonce, plaintext))
}

/// Encrypt plaintext under a caller-chosen nonce.
///
/// The nonce must never repeat under the same key; use [`encrypt`] unless
/// reproducing a fixed vector.
pub fn encrypt_with_nonce(key: &SecretKey, nonce: [u8; NONCE_LEN], plaintext: &[u8]) -> Envelope {
    let mut ciphertext = plaintext.to_vec();
    apply_keystream(key, &nonce, &mut ciphertext);
    Envelope::new(nonce, ciphertext)
}

/// Decrypt an envelope. No integrity check is possible, so a wrong key or
/// a tampered envelope yields garbage rather than an error.
pub fn decrypt(key: &SecretKey, envelope: &Envelope) -> Zeroizing<Vec<u8>> {
    let mut plaintext = Zeroizing::new(envelope.ciphertext().to_vec());
    apply_keystream(key, envelope.nonce(), &mut plaintext);
    plaintext
}
