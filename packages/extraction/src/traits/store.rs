//! Storage traits for the job catalog and the extraction document store.
//!
//! Split into focused traits:
//! - `JobCatalog`: discovered jobs and their lifecycle status
//! - `RecordStore`: persisted extraction documents, keyed by job id
//! - `Store`: composite trait combining both

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{ExtractionError, Result};
use crate::stores::merge::merge_records;
use crate::types::job::{JobRecord, JobStatus};
use crate::types::record::StoredRecord;

/// Catalog of discovered jobs.
#[async_trait]
pub trait JobCatalog: Send + Sync {
    /// Get a job by id.
    async fn get_job(&self, id: &str) -> Result<Option<JobRecord>>;

    /// Insert or overwrite a job.
    async fn put_job(&self, job: &JobRecord) -> Result<()>;

    /// Update a job's lifecycle status, refreshing `updated_at`.
    async fn update_job_status(&self, id: &str, status: JobStatus) -> Result<()>;
}

/// Document store for extraction records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Get a record by job id.
    async fn get_record(&self, id: &str) -> Result<Option<StoredRecord>>;

    /// Insert or overwrite a record.
    async fn put_record(&self, record: &StoredRecord) -> Result<()>;

    /// Merge-upsert: insert the record when absent, otherwise merge it into
    /// the stored one under the field-level merge policy. Returns the
    /// persisted result. Repeated upserts of the same extraction converge.
    async fn upsert_record(&self, incoming: StoredRecord) -> Result<StoredRecord> {
        let merged = match self.get_record(&incoming.id).await? {
            Some(existing) => {
                if existing.id != incoming.id {
                    return Err(ExtractionError::StorageConflict {
                        id: incoming.id,
                        reason: "stored record carries a different id than its key".into(),
                    });
                }
                merge_records(existing, incoming)
            }
            None => {
                let mut record = incoming;
                record.updated_at = Utc::now();
                record
            }
        };
        self.put_record(&merged).await?;
        Ok(merged)
    }
}

#[async_trait]
impl<T: JobCatalog + ?Sized> JobCatalog for std::sync::Arc<T> {
    async fn get_job(&self, id: &str) -> Result<Option<JobRecord>> {
        (**self).get_job(id).await
    }

    async fn put_job(&self, job: &JobRecord) -> Result<()> {
        (**self).put_job(job).await
    }

    async fn update_job_status(&self, id: &str, status: JobStatus) -> Result<()> {
        (**self).update_job_status(id, status).await
    }
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for std::sync::Arc<T> {
    async fn get_record(&self, id: &str) -> Result<Option<StoredRecord>> {
        (**self).get_record(id).await
    }

    async fn put_record(&self, record: &StoredRecord) -> Result<()> {
        (**self).put_record(record).await
    }
}

/// Composite storage trait used by the pipeline.
pub trait Store: JobCatalog + RecordStore {}

// Blanket implementation: anything implementing both is a Store
impl<T: JobCatalog + RecordStore> Store for T {}
