use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting user config files.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a file as text, returning `None` when it is missing or unreadable.
///
/// Discovery code treats a file that vanished between listing and reading the
/// same as one that never existed.
pub fn read_optional(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
            None
        }
    }
}

/// List regular files in `dir`, sorted by path. Recurses into subdirectories
/// when `recursive` is set. A missing directory yields an empty list.
pub fn list_files(dir: &Path, recursive: bool) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    collect_files(dir, recursive, &mut out);
    out.sort();
    out
}

fn collect_files(dir: &Path, recursive: bool, out: &mut Vec<std::path::PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %dir.display(), error = %e, "cannot list directory");
            }
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, out);
            }
        } else if path.is_file() {
            out.push(path);
        }
    }
}

/// Whether `path` is owned by the user running this process.
///
/// Always true on platforms without unix ownership.
pub fn is_owned_by_current_user(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        match std::fs::metadata(path) {
            // SAFETY: getuid has no preconditions and cannot fail.
            Ok(meta) => meta.uid() == unsafe { libc::getuid() },
            Err(_) => false,
        }
    }
    #[cfg(not(unix))]
    {
        path.exists()
    }
}
