//! Tracking of asynchronous vault retrieval jobs.
//!
//! A retrieval job is requested at most once per archive id: the job id is
//! persisted in a ledger, so a process restart resumes polling the same
//! remote job instead of paying for a duplicate. When the vault no longer
//! knows the persisted job (expired, purged), a fresh one is requested and
//! the ledger entry overwritten. Ledger entries are kept forever; the
//! vault, not the ledger, decides when a job is done.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::atomic_write;
use crate::vault::{JobStatus, VaultStore};

const LEDGER_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct JobLedger {
    version: u32,
    /// archive id to remote job id. Live status never lands here.
    jobs: BTreeMap<String, String>,
}

impl JobLedger {
    fn empty() -> Self {
        Self {
            version: LEDGER_FORMAT_VERSION,
            jobs: BTreeMap::new(),
        }
    }
}

/// Handle to one tracked retrieval job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub archive_id: String,
    pub job_id: String,
}

/// Outcome of asking for a job's output without blocking.
pub enum RetrievalOutcome {
    Ready(Box<dyn Read>),
    NotReady(JobStatus),
}

/// Tracks retrieval jobs across process restarts.
///
/// Holds only the ledger path; the store is opened and closed per call,
/// like the catalog. The vault is passed into each operation, so tests can
/// substitute a double.
#[derive(Debug, Clone)]
pub struct RetrievalTracker {
    path: PathBuf,
}

impl RetrievalTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Make sure a retrieval job exists for `archive_id` and return its
    /// handle. Never waits for the job to finish.
    ///
    /// A persisted job is reused when its status still loads from the
    /// vault; any reload failure falls through to requesting a new job.
    pub fn ensure_job(&self, vault: &dyn VaultStore, archive_id: &str) -> Result<JobHandle> {
        let mut ledger = self.load()?;

        if let Some(job_id) = ledger.jobs.get(archive_id) {
            match vault.job_status(job_id) {
                Ok(status) => {
                    debug!(
                        archive_id,
                        job_id,
                        completed = status.completed,
                        "reusing tracked retrieval job"
                    );
                    return Ok(JobHandle {
                        archive_id: archive_id.to_string(),
                        job_id: job_id.clone(),
                    });
                }
                Err(e) => {
                    warn!(
                        archive_id,
                        job_id,
                        error = %e,
                        "tracked retrieval job could not be reloaded; requesting a new one"
                    );
                }
            }
        }

        let job_id = vault.initiate_retrieval(archive_id)?;
        info!(archive_id, job_id, "retrieval job requested");
        ledger.jobs.insert(archive_id.to_string(), job_id.clone());
        self.save(&ledger)?;

        Ok(JobHandle {
            archive_id: archive_id.to_string(),
            job_id,
        })
    }

    /// Refresh the job's live status from the vault. Nothing is persisted.
    pub fn poll_once(&self, vault: &dyn VaultStore, handle: &JobHandle) -> Result<JobStatus> {
        vault.job_status(&handle.job_id)
    }

    /// Block until the job reports completion, polling every `interval`.
    ///
    /// There is no cutoff: cold-storage jobs take hours and the caller
    /// decides when to stop waiting. Vault errors abort the wait.
    pub fn wait_until_ready(
        &self,
        vault: &dyn VaultStore,
        handle: &JobHandle,
        interval: Duration,
    ) -> Result<JobStatus> {
        loop {
            let status = self.poll_once(vault, handle)?;
            if status.completed {
                return Ok(status);
            }
            info!(
                archive_id = %handle.archive_id,
                action = status.action.as_deref().unwrap_or("-"),
                status_code = status.status_code.as_deref().unwrap_or("-"),
                sleep_secs = interval.as_secs(),
                "retrieval job not finished yet"
            );
            std::thread::sleep(interval);
        }
    }

    /// Fetch the job's output if it has completed, otherwise report the
    /// in-flight status so the caller can decide to wait or come back.
    pub fn fetch_if_ready(
        &self,
        vault: &dyn VaultStore,
        handle: &JobHandle,
    ) -> Result<RetrievalOutcome> {
        let status = self.poll_once(vault, handle)?;
        if status.completed {
            Ok(RetrievalOutcome::Ready(vault.job_output(&handle.job_id)?))
        } else {
            Ok(RetrievalOutcome::NotReady(status))
        }
    }

    fn load(&self) -> Result<JobLedger> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(rmp_serde::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(JobLedger::empty()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, ledger: &JobLedger) -> Result<()> {
        atomic_write(&self.path, &rmp_serde::to_vec(ledger)?)
    }
}
