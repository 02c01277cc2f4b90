//! Periodic reclamation of expired uploads.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::db::UploadRepository;
use crate::file::FileStorage;
use crate::{Database, Result};

/// Records deleted per expiry query. Keeps each batch bounded; the run
/// loops until a batch comes back empty.
const SWEEP_BATCH_SIZE: i64 = 500;

/// Outcome of a single sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Metadata records removed.
    pub removed: u64,
    /// Blobs that were already gone or could not be deleted.
    pub blob_failures: u64,
}

/// Background task that purges expired records and their blobs.
///
/// Runs are idempotent: the expiry predicate and both deletions can be
/// re-evaluated safely, so a crash mid-sweep just leaves work for the
/// next run.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    db: Arc<Database>,
    storage: FileStorage,
}

impl ExpirySweeper {
    /// Create a new sweeper.
    pub fn new(db: Arc<Database>, storage: FileStorage) -> Self {
        Self { db, storage }
    }

    /// Run one sweep against the current clock.
    pub async fn run_once(&self) -> Result<SweepStats> {
        self.run_at(Utc::now().timestamp()).await
    }

    /// Run one sweep treating `now` as the current time.
    ///
    /// For each expired record the blob is deleted first, the metadata
    /// second. An orphaned blob is reclaimed by a later run; orphaned
    /// metadata would break the record-implies-blob assumption the
    /// resolution service relies on, so that order is never reversed.
    pub async fn run_at(&self, now: i64) -> Result<SweepStats> {
        let repo = UploadRepository::new(self.db.pool());
        let mut stats = SweepStats::default();

        loop {
            let batch = repo.list_expired(now, SWEEP_BATCH_SIZE).await?;
            if batch.is_empty() {
                break;
            }

            let mut removed_this_batch = 0u64;
            for record in &batch {
                match self.storage.delete(&record.stored_name) {
                    Ok(true) => {}
                    Ok(false) => {
                        // Already gone; nothing left to reclaim
                        stats.blob_failures += 1;
                        tracing::debug!(code = %record.code, "Expired blob was already gone");
                    }
                    Err(e) => {
                        stats.blob_failures += 1;
                        tracing::warn!(
                            code = %record.code,
                            error = %e,
                            "Failed to delete expired blob; will retry next sweep"
                        );
                        // Leave the record so the next run retries the blob
                        continue;
                    }
                }

                repo.delete(&record.code).await?;
                removed_this_batch += 1;
            }

            stats.removed += removed_this_batch;

            // A batch where nothing was removed can only repeat itself
            if removed_this_batch == 0 {
                break;
            }
        }

        if stats.removed > 0 {
            tracing::info!(
                removed = stats.removed,
                blob_failures = stats.blob_failures,
                "Sweep removed expired upload(s)"
            );
        }

        Ok(stats)
    }

    /// Spawn the recurring sweep task.
    ///
    /// A single task loop: each run completes before the next tick is
    /// honored, so the sweeper never overlaps itself; ticks missed while
    /// a run is in progress are skipped.
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // Skip the immediate first tick
            ticker.tick().await;

            loop {
                ticker.tick().await;

                match self.run_once().await {
                    Ok(stats) if stats.removed == 0 => {
                        tracing::debug!("Sweep found nothing expired");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Sweep run failed");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewUpload;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<Database>, FileStorage, ExpirySweeper) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        let sweeper = ExpirySweeper::new(db.clone(), storage.clone());
        (temp_dir, db, storage, sweeper)
    }

    async fn insert_upload(db: &Database, storage: &FileStorage, code: &str, expires_at: i64) -> String {
        let stored_name = storage.save(b"sweep target", "target.txt").unwrap();
        let repo = UploadRepository::new(db.pool());
        repo.insert(&NewUpload {
            code: code.to_string(),
            original_name: "target.txt".to_string(),
            stored_name: stored_name.clone(),
            mime_type: "text/plain".to_string(),
            size_bytes: 12,
            created_at: 0,
            expires_at,
        })
        .await
        .unwrap();
        stored_name
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_record_and_blob() {
        let (_tmp, db, storage, sweeper) = setup().await;

        let stored = insert_upload(&db, &storage, "expired", 100).await;

        let stats = sweeper.run_at(1_000).await.unwrap();
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.blob_failures, 0);

        assert!(!storage.exists(&stored));
        let repo = UploadRepository::new(db.pool());
        assert!(repo.get("expired").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sweep_spares_live_records() {
        let (_tmp, db, storage, sweeper) = setup().await;

        let stored = insert_upload(&db, &storage, "alive01", 2_000_000_000).await;

        let stats = sweeper.run_at(1_000).await.unwrap();
        assert_eq!(stats.removed, 0);

        assert!(storage.exists(&stored));
        let repo = UploadRepository::new(db.pool());
        assert!(repo.get("alive01").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_idempotent_across_runs() {
        let (_tmp, db, storage, sweeper) = setup().await;

        insert_upload(&db, &storage, "oncegone", 100).await;

        let first = sweeper.run_at(1_000).await.unwrap();
        assert_eq!(first.removed, 1);

        // Second run with no new uploads is a no-op
        let second = sweeper.run_at(1_000).await.unwrap();
        assert_eq!(second.removed, 0);
        assert_eq!(second.blob_failures, 0);
    }

    #[tokio::test]
    async fn test_sweep_survives_missing_blob() {
        let (_tmp, db, storage, sweeper) = setup().await;

        let stored = insert_upload(&db, &storage, "noblob1", 100).await;
        // Blob vanished out from under the record
        storage.delete(&stored).unwrap();

        let stats = sweeper.run_at(1_000).await.unwrap();
        // Record is still reclaimed; the missing blob is only noted
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.blob_failures, 1);

        let repo = UploadRepository::new(db.pool());
        assert!(repo.get("noblob1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sweep_handles_multiple_expired() {
        let (_tmp, db, storage, sweeper) = setup().await;

        for i in 0..5 {
            insert_upload(&db, &storage, &format!("batch{:02}", i), 100 + i).await;
        }
        insert_upload(&db, &storage, "later01", 2_000_000_000).await;

        let stats = sweeper.run_at(1_000).await.unwrap();
        assert_eq!(stats.removed, 5);

        let repo = UploadRepository::new(db.pool());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
