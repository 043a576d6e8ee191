//! Wire format for encrypted strings.
//!
//! ```text
//! NONCE (16) | CIPHERTEXT (len(plaintext))
//! ```
//!
//! The concatenation is carried as standard padded base64 text. There is no
//! header, version byte, or authentication tag.

pub mod codec;

use crate::crypto::NONCE_LEN;
use crate::error::{Error, Result};

/// Nonce and ciphertext of one encrypted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn new(nonce: [u8; NONCE_LEN], ciphertext: Vec<u8>) -> Self {
        Self { nonce, ciphertext }
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Serializes to `nonce || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.ciphertext);
        buf
    }

    /// Splits raw bytes into nonce (first block) and ciphertext (remainder).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedEnvelope`] if `data` is shorter than one
    /// nonce.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < NONCE_LEN {
            return Err(Error::MalformedEnvelope { len: data.len() });
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let nonce: [u8; NONCE_LEN] = nonce
            .try_into()
            .map_err(|_| Error::MalformedEnvelope { len: data.len() })?;

        Ok(Self::new(nonce, ciphertext.to_vec()))
    }

    /// Encodes the envelope as base64 text.
    pub fn encode(&self) -> String {
        codec::encode(&self.to_bytes())
    }

    /// Parses base64 text produced by [`Envelope::encode`].
    pub fn decode(text: &str) -> Result<Self> {
        Self::from_bytes(&codec::decode(text)?)
    }
}
