//! Atomic file replacement.
//!
//! Temp file + fsync + rename in the destination directory, so a crash mid-write
//! never leaves a half-written file behind. On Windows, rename-over-existing
//! fails, so an existing destination is moved aside first and restored on error.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Permission policy for the written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sensitivity {
    /// Inherit the default umask.
    #[default]
    Default,
    /// Owner-only read/write (0o600 on Unix). Use for anything carrying tokens.
    OwnerOnly,
}

impl Sensitivity {
    #[cfg(unix)]
    fn mode(self) -> Option<u32> {
        match self {
            Self::Default => None,
            Self::OwnerOnly => Some(0o600),
        }
    }
}

/// Atomically replace `path` with `bytes`.
pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8], sensitivity: Sensitivity) -> io::Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;

    #[cfg(unix)]
    if let Some(mode) = sensitivity.mode() {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode))?;
    }

    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    if let Err(err) = tmp.persist(path) {
        if !path.exists() {
            return Err(err.error);
        }

        // Windows: rename fails when the target exists. Move it aside, retry,
        // restore on failure.
        let backup = path.with_extension("bak");
        let _ = fs::remove_file(&backup);
        fs::rename(path, &backup)?;

        if let Err(retry_err) = err.file.persist(path) {
            let _ = fs::rename(&backup, path);
            return Err(retry_err.error);
        }
        if let Err(e) = fs::remove_file(&backup) {
            tracing::warn!(path = %backup.display(), "Failed to remove .bak after atomic write: {e}");
        }
    }

    #[cfg(unix)]
    if let Some(mode) = sensitivity.mode() {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }

    Ok(())
}
