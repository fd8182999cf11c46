//! Tar + gzip bundling of backup sources.
//!
//! Every backup source, file or directory, is bundled the same way, so
//! restore never has to guess the payload shape. Bundles live in anonymous
//! temp files that vanish on drop, including on error paths.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{CryoError, Result};

/// One entry in a bundle listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Bundle `source` into a gzipped tar, returned as a temp file rewound to
/// the start. The archive root is the source's final path component.
pub fn pack(source: &Path) -> Result<File> {
    let arcname = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CryoError::Config(format!(
                "source path '{}' has no usable final component",
                source.display()
            ))
        })?;

    let spool = tempfile::tempfile()?;
    let encoder = GzEncoder::new(spool, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    if source.is_dir() {
        builder.append_dir_all(arcname, source)?;
    } else {
        builder.append_path_with_name(source, arcname)?;
    }
    let encoder = builder.into_inner()?;
    let mut spool = encoder.finish()?;
    spool.seek(SeekFrom::Start(0))?;
    Ok(spool)
}

/// List a bundle's relative entry paths, rewinding the stream afterwards.
pub fn entries(bundle: &mut File) -> Result<Vec<TarEntry>> {
    bundle.seek(SeekFrom::Start(0))?;
    let mut listed = Vec::new();
    {
        let mut archive = tar::Archive::new(GzDecoder::new(&mut *bundle));
        for entry in archive.entries()? {
            let entry = entry?;
            let path = entry.path()?.into_owned();
            let is_dir = entry.header().entry_type().is_dir();
            listed.push(TarEntry { path, is_dir });
        }
    }
    bundle.seek(SeekFrom::Start(0))?;
    Ok(listed)
}

/// Extract a bundle into `dest`, creating the directory if missing.
///
/// Path hygiene (absolute paths, `..` components) is enforced by the tar
/// crate's own unpack protections.
pub fn unpack(bundle: &mut File, dest: &Path) -> Result<()> {
    bundle.seek(SeekFrom::Start(0))?;
    std::fs::create_dir_all(dest)?;
    let mut archive = tar::Archive::new(GzDecoder::new(&mut *bundle));
    archive.unpack(dest)?;
    Ok(())
}
