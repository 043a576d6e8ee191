pub mod crypto;
mod error;
pub mod format;
pub mod keygen;
mod storage;

pub use crate::crypto::SecretKey;
pub use crate::error::{EXIT_OTHER, Error, Result};
pub use crate::format::Envelope;
pub use crate::keygen::generate_key;
pub use crate::storage::{DIR_MODE, FILE_MODE, KeyFileInfo, KeyStore};

use directories::BaseDirs;
use std::path::PathBuf;

/// Encrypts and decrypts strings with the key held in a [`KeyStore`].
pub struct KeyCrypt {
    store: KeyStore,
}

impl KeyCrypt {
    pub fn new(store: KeyStore) -> Self {
        Self { store }
    }

    /// Uses the per-user key at [`default_key_path`].
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(KeyStore::new(default_key_path()?)))
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    /// Returns the key, generating it first if no key file exists yet.
    ///
    /// If another process creates the file between the existence check and
    /// our own create, its key is used instead.
    pub fn provision(&self) -> Result<SecretKey> {
        if !self.store.exists() {
            match keygen::generate_key(&self.store) {
                Ok(()) => {}
                Err(Error::KeyExists(_)) => {
                    tracing::debug!("key file appeared concurrently; using it");
                }
                Err(e) => return Err(e),
            }
        }

        self.store.load()
    }

    /// Encrypts `plaintext` and returns the envelope.
    pub fn encrypt_envelope(&self, plaintext: &str) -> Result<Envelope> {
        let key = self.provision()?;
        crypto::encrypt(&key, plaintext.as_bytes())
    }

    /// Encrypts `plaintext` and returns the base64 envelope text.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(self.encrypt_envelope(plaintext)?.encode())
    }

    /// Decrypts an envelope. Never generates a key.
    ///
    /// # Errors
    ///
    /// - [`Error::KeyNotFound`] if the key file is missing
    /// - [`Error::Decode`] if the result is not UTF-8, which usually means a
    ///   wrong key or a corrupted envelope
    pub fn decrypt_envelope(&self, envelope: &Envelope) -> Result<String> {
        let key = self.store.load()?;
        open(&key, envelope)
    }

    /// Decrypts base64 envelope text produced by [`KeyCrypt::encrypt`].
    ///
    /// # Errors
    ///
    /// In addition to those of [`KeyCrypt::decrypt_envelope`]:
    /// - [`Error::MalformedEncoding`] if `text` is not valid base64
    /// - [`Error::MalformedEnvelope`] if it decodes to less than one nonce
    pub fn decrypt(&self, text: &str) -> Result<String> {
        let data = format::codec::decode(text)?;
        let key = self.store.load()?;
        let envelope = Envelope::from_bytes(&data)?;
        open(&key, &envelope)
    }

    /// Describes the key file.
    pub fn info(&self) -> Result<KeyFileInfo> {
        self.store.info()
    }
}

fn open(key: &SecretKey, envelope: &Envelope) -> Result<String> {
    let plaintext = crypto::decrypt(key, envelope);
    Ok(std::str::from_utf8(&plaintext)?.to_owned())
}

/// `<home>/.secret/keyfile`
pub fn default_key_path() -> Result<PathBuf> {
    let dirs = BaseDirs::new().ok_or(Error::HomeDirUnavailable)?;
    Ok(dirs.home_dir().join(".secret").join("keyfile"))
}
