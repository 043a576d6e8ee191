//! Key store: the on-disk location of the secret key.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::crypto::SecretKey;
use crate::error::{Error, Result};

/// Mode for the directory holding the key: owner rwx only.
pub const DIR_MODE: u32 = 0o700;
/// Mode for the key file: owner rw only.
pub const FILE_MODE: u32 = 0o600;

/// Location of a secret key file.
///
/// `KeyStore` reads the key and prepares its directory. Writing a new key
/// is the job of [`crate::keygen::generate_key`].
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    /// Creates a new KeyStore for the given key file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the key file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if a regular file exists at the key path.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the whole key file.
    ///
    /// # Errors
    ///
    /// - [`Error::KeyNotFound`] if the file is missing
    /// - [`Error::PermissionDenied`] if it cannot be opened
    /// - [`Error::InvalidKeyLength`] if it is not exactly one key long
    pub fn load(&self) -> Result<SecretKey> {
        let data = Zeroizing::new(fs::read(&self.path).map_err(|e| Error::key_io(&self.path, e))?);

        let key = SecretKey::from_slice(&data).ok_or_else(|| Error::InvalidKeyLength {
            path: self.path.clone(),
            len: data.len(),
        })?;

        tracing::debug!(path = %self.path.display(), "loaded secret key");
        Ok(key)
    }

    /// Creates the key's parent directory, and any missing ancestors, with
    /// [`DIR_MODE`]. A directory that already exists is left as is.
    pub fn ensure_dir(&self) -> Result<()> {
        let Some(parent) = self.parent() else {
            return Ok(());
        };

        if parent.is_dir() {
            warn_if_shared(parent);
            return Ok(());
        }

        create_private_dir(parent).map_err(|e| Error::io(parent, e))?;
        tracing::debug!(dir = %parent.display(), "created key directory");
        Ok(())
    }

    /// Describes the key file without reading it.
    pub fn info(&self) -> Result<KeyFileInfo> {
        let dir_mode = match self.parent().map(fs::metadata) {
            Some(Ok(meta)) => mode_of(&meta),
            Some(Err(e)) if e.kind() == io::ErrorKind::NotFound => None,
            Some(Err(e)) => return Err(Error::io(self.parent().unwrap_or(&self.path), e)),
            None => None,
        };

        let meta = match fs::metadata(&self.path) {
            Ok(meta) => Some(meta),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(Error::io(&self.path, e)),
        };

        let exists = meta.as_ref().is_some_and(|m| m.is_file());
        let file_mode = meta.as_ref().and_then(mode_of);
        let modified = meta
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(|t| DateTime::<Local>::from(t).to_rfc3339());

        let owner_only = exists
            && file_mode.is_none_or(|m| m & 0o077 == 0)
            && dir_mode.is_none_or(|m| m & 0o077 == 0);

        Ok(KeyFileInfo {
            path: self.path.clone(),
            exists,
            size: meta.as_ref().filter(|m| m.is_file()).map(|m| m.len()),
            file_mode: file_mode.map(format_mode),
            dir_mode: dir_mode.map(format_mode),
            modified,
            owner_only,
        })
    }

    /// Parent directory of the key file, `None` for a bare file name.
    fn parent(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

/// Snapshot of a key file's location and protection.
#[derive(Debug, Clone, Serialize)]
pub struct KeyFileInfo {
    pub path: PathBuf,
    pub exists: bool,
    pub size: Option<u64>,
    pub file_mode: Option<String>,
    pub dir_mode: Option<String>,
    pub modified: Option<String>,
    pub owner_only: bool,
}

impl fmt::Display for KeyFileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unknown = || "-".to_string();

        writeln!(f, "Key file:   {}", self.path.display())?;
        writeln!(f, "Exists:     {}", self.exists)?;
        writeln!(
            f,
            "Size:       {}",
            self.size.map(|s| format!("{s} bytes")).unwrap_or_else(unknown)
        )?;
        writeln!(f, "File mode:  {}", self.file_mode.clone().unwrap_or_else(unknown))?;
        writeln!(f, "Dir mode:   {}", self.dir_mode.clone().unwrap_or_else(unknown))?;
        writeln!(f, "Modified:   {}", self.modified.clone().unwrap_or_else(unknown))?;
        write!(f, "Owner only: {}", self.owner_only)
    }
}

fn format_mode(mode: u32) -> String {
    format!("{:04o}", mode & 0o7777)
}

/// Sets `path` to `mode`. No-op where Unix modes do not exist.
#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub(crate) fn set_mode(path: &Path, _mode: u32) -> io::Result<()> {
    tracing::warn!(path = %path.display(), "file modes are not supported on this platform");
    Ok(())
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(DIR_MODE).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn mode_of(_meta: &fs::Metadata) -> Option<u32> {
    None
}

fn warn_if_shared(dir: &Path) {
    if let Some(mode) = fs::metadata(dir).ok().as_ref().and_then(mode_of) {
        if mode & 0o077 != 0 {
            tracing::warn!(
                dir = %dir.display(),
                mode = %format_mode(mode),
                "key directory is accessible to group or others"
            );
        }
    }
}
