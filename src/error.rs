//! Error type shared by every keycrypt operation.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::crypto::{KEY_LEN, NONCE_LEN};

/// Exit code for failures without a dedicated code.
pub const EXIT_OTHER: u8 = 4;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("key file not found: {}", .0.display())]
    KeyNotFound(PathBuf),

    #[error("permission denied: {}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is a directory; a key file path is required", .0.display())]
    InvalidPath(PathBuf),

    #[error("OS random generator unavailable: {0}")]
    RandomSource(String),

    #[error("key file already exists: {}; refusing to overwrite", .0.display())]
    KeyExists(PathBuf),

    #[error("key file {} holds {len} bytes, expected {}", .path.display(), KEY_LEN)]
    InvalidKeyLength { path: PathBuf, len: usize },

    #[error("envelope is {len} bytes, shorter than the {} byte nonce", NONCE_LEN)]
    MalformedEnvelope { len: usize },

    #[error("malformed encoding: {0}")]
    MalformedEncoding(#[from] base64::DecodeError),

    #[error("decrypted data is not valid UTF-8; wrong key or corrupted data")]
    Decode(#[from] std::str::Utf8Error),

    #[error("could not determine the home directory")]
    HomeDirUnavailable,

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Maps an I/O failure on `path`. Only permission problems get their
    /// own variant; use [`Error::key_io`] for operations on the key file.
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => Error::PermissionDenied {
                path: path.to_path_buf(),
                source,
            },
            _ => Error::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Maps an I/O failure on the key file itself, where a missing or
    /// already present file is meaningful to the caller.
    pub(crate) fn key_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Error::KeyNotFound(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => Error::KeyExists(path.to_path_buf()),
            _ => Error::io(path, source),
        }
    }

    /// Process exit code for this failure.
    ///
    /// - [`Error::InvalidPath`] → 1
    /// - [`Error::RandomSource`] → 2
    /// - [`Error::PermissionDenied`] → 3
    /// - everything else → [`EXIT_OTHER`]
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidPath(_) => 1,
            Error::RandomSource(_) => 2,
            Error::PermissionDenied { .. } => 3,
            _ => EXIT_OTHER,
        }
    }
}
