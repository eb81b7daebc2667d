//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{ExtractionError, Result};
use crate::traits::store::{JobCatalog, RecordStore};
use crate::types::job::{JobRecord, JobStatus};
use crate::types::record::StoredRecord;

/// In-memory job catalog and record store.
///
/// Useful for testing and development. Not suitable for production as data
/// is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.jobs.write().unwrap().clear();
        self.records.write().unwrap().clear();
    }

    /// Number of cataloged jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.read().unwrap().len()
    }

    /// Number of persisted extraction records.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

#[async_trait]
impl JobCatalog for MemoryStore {
    async fn get_job(&self, id: &str) -> Result<Option<JobRecord>> {
        Ok(self.jobs.read().unwrap().get(id).cloned())
    }

    async fn put_job(&self, job: &JobRecord) -> Result<()> {
        self.jobs
            .write()
            .unwrap()
            .insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn update_job_status(&self, id: &str, status: JobStatus) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| ExtractionError::JobNotFound { id: id.to_string() })?;
        job.status = status;
        job.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_record(&self, id: &str) -> Result<Option<StoredRecord>> {
        Ok(self.records.read().unwrap().get(id).cloned())
    }

    async fn put_record(&self, record: &StoredRecord) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}
