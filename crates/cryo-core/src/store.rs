//! Shared helpers for the on-disk state files.

use std::io::Write;
use std::path::Path;

use crate::error::Result;

/// Write via a temp file in the destination directory, then rename into
/// place, so readers never observe a partially written store.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
