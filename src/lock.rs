//! Vault instance lock and atomic file replacement
//!
//! - `VaultLock`: advisory exclusive lock (fs2/flock) on `<vault>/.taskvault.lock`,
//!   held by a controller for its lifetime so a second controller on the
//!   same vault fails fast instead of racing it.
//! - `write_atomic`: write a temp file in the target directory, fsync, then
//!   rename over the target. Readers see the old or the new file, never a
//!   truncated one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Error, Result};

/// Name of the lock file at the vault root
pub const LOCK_FILE: &str = ".taskvault.lock";

fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }

    // On Windows, fs2/libc can surface lock/sharing violations as "Other".
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Exclusive lock on a vault, released when dropped
#[derive(Debug)]
pub struct VaultLock {
    file: File,
    path: PathBuf,
}

impl VaultLock {
    /// Acquire the lock for `vault_root` without waiting.
    ///
    /// Returns `Error::LockFailed` if another process holds it.
    pub fn acquire(vault_root: impl AsRef<Path>) -> Result<Self> {
        let path = vault_root.as_ref().join(LOCK_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "vault lock acquired");
                Ok(VaultLock { file, path })
            }
            Err(e) if is_lock_contended(&e) => Err(Error::LockFailed(path)),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Path to the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        // Unlock the file - ignore errors during drop
        let _ = self.file.unlock();
    }
}

/// Atomically replace `path` with `data`.
///
/// The temp file lives in the same directory so the final rename stays on
/// one filesystem.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".taskvault-")
        .suffix(".tmp")
        .tempfile_in(&parent)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| Error::Io(err.error))?;

    Ok(())
}

/// Atomically replace `path` with string data
pub fn write_atomic_str(path: impl AsRef<Path>, data: &str) -> Result<()> {
    write_atomic(path, data.as_bytes())
}
