//! The backup operation: bundle, optionally encrypt, upload, record.

use std::io::{Seek, SeekFrom};
use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use crate::catalog::{ArchiveVersion, Catalog};
use crate::cipher::StreamCipher;
use crate::config::{expand_tilde, BackupEntry, CryoConfig};
use crate::error::{CryoError, Result};
use crate::tarball;
use crate::vault::VaultStore;

/// Result of uploading one backup object.
#[derive(Debug)]
pub struct BackupOutcome {
    pub name: String,
    pub archive_id: String,
    pub description: String,
    pub uploaded_bytes: u64,
    pub encrypted: bool,
}

/// Run `cryo backup` / `cryo backuponce`: upload every configured backup
/// object, or only the one named by `only`.
pub fn run(
    config: &CryoConfig,
    vault: &dyn VaultStore,
    passphrase: Option<&str>,
    only: Option<&str>,
) -> Result<Vec<BackupOutcome>> {
    let catalog = Catalog::new(config.catalog_path());

    let selected: Vec<&BackupEntry> = match only {
        Some(name) => vec![config.entry(name).ok_or_else(|| {
            CryoError::Config(format!("no backup object named '{name}' configured"))
        })?],
        None => config.backup_objects.iter().collect(),
    };

    let mut outcomes = Vec::with_capacity(selected.len());
    for entry in selected {
        outcomes.push(backup_entry(vault, &catalog, entry, passphrase)?);
    }
    Ok(outcomes)
}

fn backup_entry(
    vault: &dyn VaultStore,
    catalog: &Catalog,
    entry: &BackupEntry,
    passphrase: Option<&str>,
) -> Result<BackupOutcome> {
    let source = PathBuf::from(expand_tilde(&entry.path));
    if !source.exists() {
        return Err(CryoError::Config(format!(
            "backup object '{}': source path '{}' does not exist",
            entry.name,
            source.display()
        )));
    }

    let description = if entry.add_date {
        format!("{}_{}", entry.name, Utc::now().format("%Y-%m-%d"))
    } else {
        entry.name.clone()
    };

    info!(
        name = %entry.name,
        source = %source.display(),
        encrypt = entry.encrypt,
        "backing up"
    );

    let mut bundle = tarball::pack(&source)?;

    let (mut upload_stream, encrypted) = if entry.encrypt {
        let passphrase = passphrase.ok_or_else(|| {
            CryoError::Config(format!(
                "backup object '{}' wants encryption but no passphrase is available",
                entry.name
            ))
        })?;
        let cipher = StreamCipher::from_passphrase(passphrase);
        let mut sealed = tempfile::tempfile()?;
        cipher.encrypt(&mut bundle, &mut sealed)?;
        (sealed, true)
    } else {
        (bundle, false)
    };

    let uploaded_bytes = upload_stream.seek(SeekFrom::End(0))?;
    upload_stream.seek(SeekFrom::Start(0))?;

    let archive_id = vault.upload(&mut upload_stream, &description)?;

    let version = ArchiveVersion {
        name: entry.name.clone(),
        archive_id: archive_id.clone(),
        created_at: Utc::now(),
        encrypted,
    };
    catalog.record_version(&version)?;

    info!(
        name = %entry.name,
        archive_id = %archive_id,
        bytes = uploaded_bytes,
        "backup recorded"
    );

    Ok(BackupOutcome {
        name: entry.name.clone(),
        archive_id,
        description,
        uploaded_bytes,
        encrypted,
    })
}
