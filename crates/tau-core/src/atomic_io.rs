use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::{bail, Context, Result};

use crate::time_utils::current_unix_timestamp_ms;

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Replaces `path` with `content` via a synced sibling temp file and a rename.
///
/// Missing ancestor directories are created first. The temp file is removed when
/// any step fails, so the destination holds either the previous or the new content.
/// On unix the parent directory is synced after the rename so the new entry
/// survives power loss.
pub fn write_bytes_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("destination path cannot be empty");
    }
    if path.is_dir() {
        bail!("destination path '{}' is a directory", path.display());
    }

    let parent_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir)
        .with_context(|| format!("failed to create {}", parent_dir.display()))?;

    let temp_path = temp_path_for(parent_dir, path);
    let result = write_and_sync(&temp_path, content).and_then(|()| {
        fs::rename(&temp_path, path).with_context(|| {
            format!(
                "failed to rename temporary file {} to {}",
                temp_path.display(),
                path.display()
            )
        })
    });
    let result = result.and_then(|()| sync_parent_dir(parent_dir));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn temp_path_for(parent_dir: &Path, path: &Path) -> PathBuf {
    let temp_name = format!(
        ".{}.tmp-{}-{}-{}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("atomic"),
        std::process::id(),
        current_unix_timestamp_ms(),
        TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    );
    parent_dir.join(temp_name)
}

#[cfg(unix)]
pub(crate) fn sync_parent_dir(parent_dir: &Path) -> Result<()> {
    fs::File::open(parent_dir)
        .and_then(|dir| dir.sync_all())
        .with_context(|| format!("failed to sync directory {}", parent_dir.display()))
}

#[cfg(not(unix))]
pub(crate) fn sync_parent_dir(_parent_dir: &Path) -> Result<()> {
    Ok(())
}

fn write_and_sync(temp_path: &Path, content: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(temp_path)
        .with_context(|| format!("failed to open temporary file {}", temp_path.display()))?;
    file.write_all(content)
        .with_context(|| format!("failed to write temporary file {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to sync temporary file {}", temp_path.display()))?;
    Ok(())
}
