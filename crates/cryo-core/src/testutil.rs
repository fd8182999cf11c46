use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Mutex;

use chrono::Utc;

use crate::error::{CryoError, Result};
use crate::vault::{JobStatus, VaultStore};

/// In-memory vault for tests. Thread-safe via Mutex.
///
/// Retrieval jobs can be born pending (`with_pending_polls`) so callers
/// can exercise the not-ready path, and tracked jobs can be expired to
/// exercise self-healing. Every `job_status` call on a pending job counts
/// down one poll.
#[derive(Debug)]
pub struct MemoryVault {
    archives: Mutex<HashMap<String, Vec<u8>>>,
    jobs: Mutex<HashMap<String, JobState>>,
    pending_polls: u32,
    counter: Mutex<u64>,
}

#[derive(Debug)]
struct JobState {
    archive_id: String,
    polls_left: u32,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::with_pending_polls(0)
    }

    /// Jobs report in-progress for the first `pending_polls` status checks.
    pub fn with_pending_polls(pending_polls: u32) -> Self {
        Self {
            archives: Mutex::new(HashMap::new()),
            jobs: Mutex::new(HashMap::new()),
            pending_polls,
            counter: Mutex::new(0),
        }
    }

    /// Forget all jobs, as if the vault purged them after their window.
    pub fn expire_jobs(&self) {
        self.jobs.lock().unwrap().clear();
    }

    pub fn archive_count(&self) -> usize {
        self.archives.lock().unwrap().len()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn archive_payload(&self, archive_id: &str) -> Option<Vec<u8>> {
        self.archives.lock().unwrap().get(archive_id).cloned()
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        format!("{prefix}-{:04}", *counter)
    }
}

impl VaultStore for MemoryVault {
    fn upload(&self, payload: &mut dyn Read, _description: &str) -> Result<String> {
        let mut data = Vec::new();
        payload.read_to_end(&mut data)?;
        let archive_id = self.next_id("arch");
        self.archives
            .lock()
            .unwrap()
            .insert(archive_id.clone(), data);
        Ok(archive_id)
    }

    fn initiate_retrieval(&self, archive_id: &str) -> Result<String> {
        if !self.archives.lock().unwrap().contains_key(archive_id) {
            return Err(CryoError::Vault(format!(
                "no such archive: '{archive_id}'"
            )));
        }
        let job_id = self.next_id("job");
        self.jobs.lock().unwrap().insert(
            job_id.clone(),
            JobState {
                archive_id: archive_id.to_string(),
                polls_left: self.pending_polls,
            },
        );
        Ok(job_id)
    }

    fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| CryoError::Vault(format!("unknown job: '{job_id}'")))?;
        let completed = if job.polls_left == 0 {
            true
        } else {
            job.polls_left -= 1;
            false
        };
        Ok(JobStatus {
            completed,
            action: Some("ArchiveRetrieval".to_string()),
            status_code: Some(if completed { "Succeeded" } else { "InProgress" }.to_string()),
            creation_date: Some(Utc::now()),
            completion_date: completed.then(Utc::now),
        })
    }

    fn job_output(&self, job_id: &str) -> Result<Box<dyn Read>> {
        let jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get(job_id)
            .ok_or_else(|| CryoError::Vault(format!("unknown job: '{job_id}'")))?;
        let archives = self.archives.lock().unwrap();
        let data = archives
            .get(&job.archive_id)
            .ok_or_else(|| CryoError::Vault(format!("archive '{}' is gone", job.archive_id)))?
            .clone();
        Ok(Box::new(Cursor::new(data)))
    }
}
