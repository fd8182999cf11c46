//! Vault backends: where archive payloads actually live.

pub mod local_backend;

use std::io::Read;

use chrono::{DateTime, Utc};

use crate::config::VaultConfig;
use crate::error::{CryoError, Result};

/// Live status snapshot of a retrieval job.
///
/// Refreshed from the vault on every poll and never cached or persisted
/// beyond one poll cycle; the vault, not this crate, is authoritative for
/// job state.
#[derive(Debug, Clone, Default)]
pub struct JobStatus {
    pub completed: bool,
    pub action: Option<String>,
    pub status_code: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
}

/// A cold-storage archival vault.
///
/// Uploads are durable as soon as they return. Downloads go through an
/// asynchronous retrieval job: initiate it, poll until it completes, then
/// fetch its output.
pub trait VaultStore: std::fmt::Debug {
    /// Store a payload and return the vault-assigned archive id.
    fn upload(&self, payload: &mut dyn Read, description: &str) -> Result<String>;

    /// Start an asynchronous retrieval job for an archive.
    fn initiate_retrieval(&self, archive_id: &str) -> Result<String>;

    /// Look up a job's live status.
    fn job_status(&self, job_id: &str) -> Result<JobStatus>;

    /// Stream a completed job's output payload.
    fn job_output(&self, job_id: &str) -> Result<Box<dyn Read>>;
}

/// Build a vault backend from the configuration.
///
/// A bare path or a `file://` URL selects the local directory backend; any
/// other scheme is rejected.
pub fn vault_from_config(config: &VaultConfig) -> Result<Box<dyn VaultStore>> {
    let url = crate::config::expand_tilde(config.url.trim());
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(Box::new(local_backend::LocalVault::open(path)?));
    }
    if url.contains("://") {
        return Err(CryoError::Config(format!(
            "unsupported vault backend: '{url}'"
        )));
    }
    Ok(Box::new(local_backend::LocalVault::open(url)?))
}
