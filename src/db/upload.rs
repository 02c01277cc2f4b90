//! Upload record types and repository.
//!
//! The `uploads` table is the single source of truth for share codes:
//! existence, expiry, and download counts. Expiry is deliberately NOT
//! filtered here; callers decide what an expired record means (the
//! resolution service reports Gone, the sweeper deletes).

use sqlx::SqlitePool;

use crate::{DropError, Result};

/// A persisted upload record, keyed by share code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UploadRecord {
    /// Public share code (primary key).
    pub code: String,
    /// Original filename as supplied by the uploader. Arbitrary bytes;
    /// never used as a filesystem path.
    pub original_name: String,
    /// Opaque storage reference (UUID.ext, sharded by the blob store).
    pub stored_name: String,
    /// MIME type, best effort; `application/octet-stream` when unknown.
    pub mime_type: String,
    /// Size in bytes as persisted by the blob receiver.
    pub size_bytes: i64,
    /// Creation time, unix seconds.
    pub created_at: i64,
    /// Expiry time, unix seconds. Immutable after creation.
    pub expires_at: i64,
    /// Number of download attempts initiated.
    pub downloads: i64,
}

impl UploadRecord {
    /// Whether the record has expired at the given instant.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Data for creating a new upload record.
#[derive(Debug, Clone)]
pub struct NewUpload {
    /// Public share code.
    pub code: String,
    /// Original filename.
    pub original_name: String,
    /// Opaque storage reference.
    pub stored_name: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Creation time, unix seconds.
    pub created_at: i64,
    /// Expiry time, unix seconds.
    pub expires_at: i64,
}

/// Repository for upload record operations.
pub struct UploadRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UploadRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new upload record.
    ///
    /// Fails with [`DropError::DuplicateCode`] when the code is already
    /// taken, including by an expired record that has not been swept yet.
    pub async fn insert(&self, new: &NewUpload) -> Result<UploadRecord> {
        sqlx::query(
            "INSERT INTO uploads (code, original_name, stored_name, mime_type, size_bytes, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.code)
        .bind(&new.original_name)
        .bind(&new.stored_name)
        .bind(&new.mime_type)
        .bind(new.size_bytes)
        .bind(new.created_at)
        .bind(new.expires_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .map_or(false, |d| d.is_unique_violation())
            {
                DropError::DuplicateCode
            } else {
                DropError::Database(e.to_string())
            }
        })?;

        self.get(&new.code)
            .await?
            .ok_or_else(|| DropError::NotFound(format!("code {}", new.code)))
    }

    /// Get a record by code. Does not filter by expiry.
    pub async fn get(&self, code: &str) -> Result<Option<UploadRecord>> {
        let record = sqlx::query_as::<_, UploadRecord>(
            "SELECT code, original_name, stored_name, mime_type, size_bytes, created_at, expires_at, downloads
             FROM uploads WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| DropError::Database(e.to_string()))?;

        Ok(record)
    }

    /// Atomically increment the download counter for a code.
    ///
    /// The increment happens inside SQL, so concurrent downloads of the
    /// same code never lose a count. A no-op when the code is absent.
    pub async fn increment_downloads(&self, code: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE uploads SET downloads = downloads + 1 WHERE code = ?")
            .bind(code)
            .execute(self.pool)
            .await
            .map_err(|e| DropError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// List records whose expiry lies strictly before the given instant.
    ///
    /// Returns at most `limit` records; the sweeper calls this in a loop
    /// until the batch comes back empty, so each run is finite and each
    /// invocation restarts from the current table state.
    pub async fn list_expired(&self, before: i64, limit: i64) -> Result<Vec<UploadRecord>> {
        let records = sqlx::query_as::<_, UploadRecord>(
            "SELECT code, original_name, stored_name, mime_type, size_bytes, created_at, expires_at, downloads
             FROM uploads WHERE expires_at < ? ORDER BY expires_at LIMIT ?",
        )
        .bind(before)
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DropError::Database(e.to_string()))?;

        Ok(records)
    }

    /// Delete a record by code. Idempotent: deleting an absent code
    /// returns `false`, not an error.
    pub async fn delete(&self, code: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM uploads WHERE code = ?")
            .bind(code)
            .execute(self.pool)
            .await
            .map_err(|e| DropError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all records.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM uploads")
            .fetch_one(self.pool)
            .await
            .map_err(|e| DropError::Database(e.to_string()))?;
        Ok(count)
    }
}
