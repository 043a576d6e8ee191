//! Key generation.
//!
//! The only code path that ever writes a key file. The key is written to a
//! private temporary file in the same directory and then hard-linked into
//! place, so the key path either does not exist or holds a complete key.
//! Linking never overwrites: two processes racing to provision the same
//! path cannot end up with different keys.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::crypto::{SecretKey, secure_random};
use crate::error::{Error, Result};
use crate::storage::{FILE_MODE, KeyStore, set_mode};

/// Generates a fresh key and writes it to `store`'s path.
///
/// # Errors
///
/// - [`Error::InvalidPath`] if the path is a directory; nothing is written
/// - [`Error::RandomSource`] if the OS random generator fails
/// - [`Error::KeyExists`] if a key file is already present
/// - [`Error::PermissionDenied`] if the directory, file, or mode change is denied
pub fn generate_key(store: &KeyStore) -> Result<()> {
    let path = store.path();

    if path.is_dir() {
        return Err(Error::InvalidPath(path.to_path_buf()));
    }

    store.ensure_dir()?;

    let key = SecretKey::generate()?;
    let tmp_path = random_tmp_path(path)?;

    let result = write_private(&tmp_path, &key).and_then(|()| publish(&tmp_path, path));
    let _ = fs::remove_file(&tmp_path);
    result?;

    sync_parent(path)?;

    tracing::info!(path = %path.display(), "generated new secret key");
    Ok(())
}

/// Generates a unique temporary file path next to the key.
///
/// Format: `<keyfile>.tmp.<randomhex>`
fn random_tmp_path(path: &Path) -> Result<PathBuf> {
    let Some(file_name) = path.file_name() else {
        return Err(Error::InvalidPath(path.to_path_buf()));
    };

    let mut buf = [0u8; 8];
    secure_random(&mut buf)?;
    let rand_string = buf.iter().map(|b| format!("{:02x}", b)).collect::<String>();

    let tmp_name = format!("{}.tmp.{}", file_name.to_string_lossy(), rand_string);
    Ok(path.with_file_name(tmp_name))
}

/// Writes the key to a new owner-only file and syncs it to disk.
fn write_private(tmp_path: &Path, key: &SecretKey) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }

    let mut file = options.open(tmp_path).map_err(|e| Error::io(tmp_path, e))?;
    write_key(&mut file, key).map_err(|e| Error::io(tmp_path, e))?;
    drop(file);

    // the umask may have narrowed the mode at creation; set it exactly
    set_mode(tmp_path, FILE_MODE).map_err(|e| Error::io(tmp_path, e))
}

fn write_key(file: &mut File, key: &SecretKey) -> io::Result<()> {
    file.write_all(key.as_bytes())?;
    file.sync_all()
}

/// Links the finished key into place. Fails if the key path already exists.
fn publish(tmp_path: &Path, path: &Path) -> Result<()> {
    fs::hard_link(tmp_path, path).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => Error::KeyExists(path.to_path_buf()),
        _ => Error::io(path, e),
    })
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        File::open(parent)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| Error::io(parent, e))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;
    use std::sync::Barrier;
    use tempfile::tempdir;

    #[cfg(unix)]
    fn running_as_root() -> bool {
        use std::os::unix::fs::MetadataExt;
        let dir = tempdir().unwrap();
        fs::metadata(dir.path()).unwrap().uid() == 0
    }

    #[test]
    fn writes_a_full_key() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path().join(".secret").join("keyfile"));

        generate_key(&store).unwrap();

        assert!(store.exists());
        assert_eq!(fs::read(store.path()).unwrap().len(), KEY_LEN);
        assert!(store.load().is_ok());
    }

    #[test]
    fn keys_are_fresh() {
        let dir = tempdir().unwrap();
        let a = KeyStore::new(dir.path().join("a"));
        let b = KeyStore::new(dir.path().join("b"));

        generate_key(&a).unwrap();
        generate_key(&b).unwrap();

        assert_ne!(a.load().unwrap().as_bytes(), b.load().unwrap().as_bytes());
    }

    #[test]
    fn tmp_file_is_removed_after_success() {
        let dir = tempdir().unwrap();
        generate_key(&KeyStore::new(dir.path().join("keyfile"))).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        assert_eq!(entries, ["keyfile"]);
    }

    #[test]
    fn tmp_paths_are_unique_siblings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keyfile");

        let a = random_tmp_path(&path).unwrap();
        let b = random_tmp_path(&path).unwrap();

        assert_ne!(a, b);
        assert_ne!(a, path);
        assert_eq!(a.parent(), path.parent());
    }

    #[test]
    fn directory_path_is_rejected_without_writes() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("keys");
        fs::create_dir(&target).unwrap();

        match generate_key(&KeyStore::new(&target)) {
            Err(e @ Error::InvalidPath(_)) => assert_eq!(e.exit_code(), 1),
            other => panic!("expected InvalidPath, got: {other:?}"),
        }
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn existing_key_is_never_overwritten() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path().join("keyfile"));
        generate_key(&store).unwrap();
        let before = fs::read(store.path()).unwrap();

        assert!(matches!(generate_key(&store), Err(Error::KeyExists(_))));
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn existing_directory_is_fine_and_neighbours_untouched() {
        let dir = tempdir().unwrap();
        let secret = dir.path().join(".secret");
        fs::create_dir(&secret).unwrap();
        fs::write(secret.join("notes"), b"unrelated").unwrap();

        generate_key(&KeyStore::new(secret.join("keyfile"))).unwrap();

        assert_eq!(fs::read(secret.join("notes")).unwrap(), b"unrelated");
    }

    #[test]
    fn parent_that_is_a_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();

        match generate_key(&KeyStore::new(blocker.join("keyfile"))) {
            Err(Error::Io { path, .. }) => assert_eq!(path, blocker),
            other => panic!("expected Io, got: {other:?}"),
        }
    }

    #[test]
    fn concurrent_generation_yields_one_complete_key() {
        const THREADS: usize = 16;

        for _ in 0..20 {
            let dir = tempdir().unwrap();
            let store = KeyStore::new(dir.path().join(".secret").join("keyfile"));
            let barrier = Barrier::new(THREADS);

            let results: Vec<Result<()>> = std::thread::scope(|s| {
                let handles: Vec<_> = (0..THREADS)
                    .map(|_| {
                        s.spawn(|| {
                            barrier.wait();
                            generate_key(&store)
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            let winners = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(winners, 1, "results: {results:?}");
            assert!(
                results
                    .iter()
                    .all(|r| matches!(r, Ok(()) | Err(Error::KeyExists(_))))
            );
            assert_eq!(fs::read(store.path()).unwrap().len(), KEY_LEN);
        }
    }

    #[cfg(unix)]
    #[test]
    fn file_and_directory_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let secret = dir.path().join(".secret");
        let store = KeyStore::new(secret.join("keyfile"));

        generate_key(&store).unwrap();

        let file_mode = fs::metadata(store.path()).unwrap().permissions().mode();
        let dir_mode = fs::metadata(&secret).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        assert_eq!(dir_mode & 0o077, 0);
    }

    #[cfg(unix)]
    #[test]
    fn read_only_directory_is_permission_denied() {
        if running_as_root() {
            return;
        }

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        set_mode(&locked, 0o500).unwrap();

        let result = generate_key(&KeyStore::new(locked.join("keyfile")));
        set_mode(&locked, 0o700).unwrap();

        match result {
            Err(e @ Error::PermissionDenied { .. }) => assert_eq!(e.exit_code(), 3),
            other => panic!("expected PermissionDenied, got: {other:?}"),
        }
        assert_eq!(fs::read_dir(&locked).unwrap().count(), 0);
    }
}
