//! Phase 5: Writing to Disk
//!
//! This is the persistence step of the reconciliation pipeline. It writes the
//! staged aggregates and the rebuilt corpus from the MemoryFS to the host
//! filesystem.
//!
//! ## Process
//!
//! 1.  **Iterate Files**: Staged files are visited in path order.
//!
//! 2.  **Create Directories**: Parent directories are created as needed.
//!
//! 3.  **Atomic Replace**: Content goes to a temporary file in the destination
//!     directory, which is then renamed over the destination. A crash leaves
//!     either the old file or the new one, never a partial write.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::filesystem::MemoryFS;

/// Atomically replaces `path` with `content`.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| Error::Filesystem {
        message: format!("Failed to create directory '{}': {}", parent.display(), e),
    })?;

    let mut temp = NamedTempFile::new_in(&parent).map_err(|e| Error::Filesystem {
        message: format!(
            "Failed to create temporary file in '{}': {}",
            parent.display(),
            e
        ),
    })?;
    temp.write_all(content)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| Error::Filesystem {
            message: format!("Failed to write '{}': {}", path.display(), e),
        })?;
    temp.persist(path).map_err(|e| Error::Filesystem {
        message: format!("Failed to replace '{}': {}", path.display(), e.error),
    })?;
    Ok(())
}

/// Execute Phase 5: write every staged file under `output_path`.
pub fn execute(staged: &MemoryFS, output_path: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(staged.len());
    for (relative_path, file) in staged.files() {
        let full_path = output_path.join(relative_path);
        write_atomic(&full_path, &file.content)?;
        debug!("Wrote {} ({} bytes)", full_path.display(), file.size());
        written.push(full_path);
    }
    Ok(written)
}
