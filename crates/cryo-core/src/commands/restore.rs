//! The restore operation: resolve, retrieve, decrypt, unpack.

use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::catalog::Catalog;
use crate::cipher::StreamCipher;
use crate::config::{expand_tilde, CryoConfig};
use crate::error::{CryoError, Result};
use crate::retrieval::{RetrievalOutcome, RetrievalTracker};
use crate::tarball::{self, TarEntry};
use crate::vault::VaultStore;

/// Parameters for one restore.
pub struct RestoreRequest<'a> {
    pub name: &'a str,
    pub dest: &'a str,
    pub overwrite: bool,
    /// Block on the retrieval job instead of failing when it is pending.
    pub wait: bool,
    pub archive_id_prefix: Option<&'a str>,
    pub passphrase: Option<&'a str>,
}

#[derive(Debug)]
pub struct RestoreStats {
    pub archive_id: String,
    pub entries: usize,
}

/// Run `cryo get`.
pub fn run(
    config: &CryoConfig,
    vault: &dyn VaultStore,
    req: RestoreRequest<'_>,
) -> Result<RestoreStats> {
    let catalog = Catalog::new(config.catalog_path());
    let tracker = RetrievalTracker::new(config.jobs_path());

    let version = catalog.resolve_latest(req.name, req.archive_id_prefix)?;
    info!(
        name = req.name,
        archive_id = %version.archive_id,
        encrypted = version.encrypted,
        "restoring"
    );

    let handle = tracker.ensure_job(vault, &version.archive_id)?;

    if req.wait {
        let interval = config.retrieval.poll_interval_duration()?;
        tracker.wait_until_ready(vault, &handle, interval)?;
    }

    let mut output = match tracker.fetch_if_ready(vault, &handle)? {
        RetrievalOutcome::Ready(stream) => stream,
        RetrievalOutcome::NotReady(status) => {
            return Err(CryoError::RetrievalNotReady {
                archive_id: handle.archive_id.clone(),
                status_code: status
                    .status_code
                    .unwrap_or_else(|| "InProgress".to_string()),
            });
        }
    };

    // Spool the vault output so decryption and tar listing can seek.
    let mut fetched = tempfile::tempfile()?;
    std::io::copy(&mut output, &mut fetched)?;
    drop(output);
    fetched.seek(SeekFrom::Start(0))?;

    let mut bundle = if version.encrypted {
        let passphrase = req.passphrase.ok_or_else(|| {
            CryoError::Config(format!(
                "archive '{}' is encrypted but no passphrase is available",
                version.archive_id
            ))
        })?;
        let cipher = StreamCipher::from_passphrase(passphrase);
        let mut plain = tempfile::tempfile()?;
        cipher.decrypt(&mut fetched, &mut plain)?;
        plain
    } else {
        fetched
    };

    let dest = PathBuf::from(expand_tilde(req.dest));
    let listed = tarball::entries(&mut bundle)?;
    if !req.overwrite {
        ensure_no_collisions(&listed, &dest)?;
    }
    tarball::unpack(&mut bundle, &dest)?;

    info!(
        archive_id = %version.archive_id,
        dest = %dest.display(),
        entries = listed.len(),
        "restore complete"
    );

    Ok(RestoreStats {
        archive_id: version.archive_id,
        entries: listed.len(),
    })
}

/// All-or-nothing destination check, run over the full entry list before a
/// single byte is extracted. Existing directories are allowed (extracting
/// into a parent the archive's own root dir already lives in must not
/// trip), but any existing file or symlink in the way aborts the restore.
fn ensure_no_collisions(entries: &[TarEntry], dest: &Path) -> Result<()> {
    for entry in entries {
        let target = dest.join(&entry.path);
        if entry.is_dir {
            if target.is_file() || target.is_symlink() {
                return Err(CryoError::WouldOverwrite(target.display().to_string()));
            }
        } else if target.exists() || target.is_symlink() {
            return Err(CryoError::WouldOverwrite(target.display().to_string()));
        }
    }
    Ok(())
}
