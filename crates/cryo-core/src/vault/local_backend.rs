//! Vault backend rooted at a local directory.
//!
//! Payloads land under `archives/`, retrieval-job records under `jobs/`.
//! A local disk has no retrieval latency, so jobs are born completed and
//! polling succeeds on the first attempt. Job records that were purged
//! from the directory surface as vault errors, which callers recover from
//! by requesting a fresh job.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CryoError, Result};
use crate::store::atomic_write;
use crate::vault::{JobStatus, VaultStore};

#[derive(Debug)]
pub struct LocalVault {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct JobRecord {
    archive_id: String,
    created_at: DateTime<Utc>,
}

impl LocalVault {
    /// Open (or create) a vault directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root: PathBuf = root.into();
        fs::create_dir_all(root.join("archives"))?;
        fs::create_dir_all(root.join("jobs"))?;
        Ok(Self { root })
    }

    fn archive_path(&self, archive_id: &str) -> PathBuf {
        self.root.join("archives").join(archive_id)
    }

    fn job_path(&self, job_id: &str) -> PathBuf {
        self.root.join("jobs").join(job_id)
    }

    fn load_job(&self, job_id: &str) -> Result<JobRecord> {
        match fs::read(self.job_path(job_id)) {
            Ok(bytes) => Ok(rmp_serde::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CryoError::Vault(format!(
                "unknown retrieval job '{job_id}'"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

/// Random 128-bit hex identifier for archives and jobs.
fn fresh_id() -> String {
    let mut buf = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

impl VaultStore for LocalVault {
    fn upload(&self, payload: &mut dyn Read, description: &str) -> Result<String> {
        let archive_id = fresh_id();
        let dir = self.root.join("archives");
        // Spool into the destination directory, then rename, so a crashed
        // upload never leaves a half-written archive behind.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        std::io::copy(payload, &mut tmp)?;
        tmp.persist(self.archive_path(&archive_id))
            .map_err(|e| e.error)?;
        atomic_write(
            &dir.join(format!("{archive_id}.info")),
            description.as_bytes(),
        )?;
        debug!(archive_id, description, "archive stored in local vault");
        Ok(archive_id)
    }

    fn initiate_retrieval(&self, archive_id: &str) -> Result<String> {
        if !self.archive_path(archive_id).is_file() {
            return Err(CryoError::Vault(format!(
                "no such archive in vault: '{archive_id}'"
            )));
        }
        let job_id = fresh_id();
        let record = JobRecord {
            archive_id: archive_id.to_string(),
            created_at: Utc::now(),
        };
        atomic_write(&self.job_path(&job_id), &rmp_serde::to_vec(&record)?)?;
        debug!(archive_id, job_id, "local retrieval job created");
        Ok(job_id)
    }

    fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let record = self.load_job(job_id)?;
        Ok(JobStatus {
            completed: true,
            action: Some("ArchiveRetrieval".to_string()),
            status_code: Some("Succeeded".to_string()),
            creation_date: Some(record.created_at),
            completion_date: Some(record.created_at),
        })
    }

    fn job_output(&self, job_id: &str) -> Result<Box<dyn Read>> {
        let record = self.load_job(job_id)?;
        let file = fs::File::open(self.archive_path(&record.archive_id)).map_err(|e| {
            match e.kind() {
                std::io::ErrorKind::NotFound => CryoError::Vault(format!(
                    "archive '{}' is missing from the vault",
                    record.archive_id
                )),
                _ => CryoError::Io(e),
            }
        })?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn upload_retrieve_roundtrip() {
        let tmp = tempdir().unwrap();
        let vault = LocalVault::open(tmp.path().join("vault")).unwrap();

        let payload = b"cold bytes".to_vec();
        let archive_id = vault
            .upload(&mut Cursor::new(payload.clone()), "docs_2026-08-05")
            .unwrap();

        let job_id = vault.initiate_retrieval(&archive_id).unwrap();
        let status = vault.job_status(&job_id).unwrap();
        assert!(status.completed);
        assert_eq!(status.action.as_deref(), Some("ArchiveRetrieval"));

        let mut fetched = Vec::new();
        vault
            .job_output(&job_id)
            .unwrap()
            .read_to_end(&mut fetched)
            .unwrap();
        assert_eq!(fetched, payload);
    }

    #[test]
    fn distinct_uploads_get_distinct_ids() {
        let tmp = tempdir().unwrap();
        let vault = LocalVault::open(tmp.path().join("vault")).unwrap();
        let a = vault.upload(&mut Cursor::new(b"a".to_vec()), "a").unwrap();
        let b = vault.upload(&mut Cursor::new(b"b".to_vec()), "b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn retrieval_of_unknown_archive_fails() {
        let tmp = tempdir().unwrap();
        let vault = LocalVault::open(tmp.path().join("vault")).unwrap();
        let err = vault.initiate_retrieval("no-such-id").unwrap_err();
        assert!(matches!(err, CryoError::Vault(_)), "{err}");
    }

    #[test]
    fn status_of_purged_job_fails() {
        let tmp = tempdir().unwrap();
        let vault = LocalVault::open(tmp.path().join("vault")).unwrap();
        let err = vault.job_status("gone").unwrap_err();
        assert!(matches!(err, CryoError::Vault(_)), "{err}");
    }
}
