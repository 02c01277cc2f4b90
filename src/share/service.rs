//! Share service: the upload and resolution orchestration.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::code::CodeGenerator;
use crate::db::{NewUpload, UploadRecord, UploadRepository};
use crate::{Database, DropError, Result};

/// Maximum code-generation attempts before an upload fails with
/// [`DropError::CodeSpaceExhausted`]. With a 56-character alphabet and
/// 7-character codes a single collision is already vanishingly rare;
/// the bound exists so a broken generator cannot spin forever.
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// Metadata reported by the blob receiver after the bytes are on disk.
#[derive(Debug, Clone)]
pub struct BlobMeta {
    /// Original filename as supplied by the uploader.
    pub original_name: String,
    /// Opaque storage reference from the blob store.
    pub stored_name: String,
    /// Bytes actually persisted.
    pub size_bytes: i64,
    /// Declared or guessed MIME type.
    pub mime_type: String,
}

/// The derived share URLs for a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    /// Human download page, served by the static frontend.
    pub download_page: String,
    /// Direct download endpoint.
    pub direct_url: String,
}

/// Description of a newly created (or looked-up) share.
#[derive(Debug, Clone)]
pub struct ShareInfo {
    /// Public share code.
    pub code: String,
    /// Original filename.
    pub original_name: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Creation time, unix seconds.
    pub created_at: i64,
    /// Expiry time, unix seconds.
    pub expires_at: i64,
    /// Derived share URLs.
    pub links: ShareLinks,
}

/// Orchestrates upload registration and code resolution.
///
/// Holds no locks across I/O; all shared mutation goes through the
/// repository's atomic SQL operations.
#[derive(Debug, Clone)]
pub struct ShareService {
    db: Arc<Database>,
    codes: CodeGenerator,
    ttl: Duration,
    base_url: String,
}

impl ShareService {
    /// Create a new share service.
    pub fn new(db: Arc<Database>, codes: CodeGenerator, ttl: Duration, base_url: &str) -> Self {
        Self {
            db,
            codes,
            ttl,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Current time in unix seconds.
    pub fn now() -> i64 {
        Utc::now().timestamp()
    }

    /// The configured link TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Build the share URLs for a code.
    pub fn links(&self, code: &str) -> ShareLinks {
        ShareLinks {
            download_page: format!("{}/d/{}", self.base_url, code),
            direct_url: format!("{}/api/download/{}", self.base_url, code),
        }
    }

    /// Register a persisted blob and return its share info.
    ///
    /// The blob must already be on disk (receive-then-register). If the
    /// process dies between blob persist and this insert, the blob is
    /// orphaned with no record; that window is accepted and there is no
    /// reconciliation sweep — see DESIGN.md.
    pub async fn create_share(&self, meta: BlobMeta) -> Result<ShareInfo> {
        self.create_share_with(meta, || self.codes.generate()).await
    }

    /// Register a blob using the given code source.
    ///
    /// Exists so tests can force collisions with a deterministic code
    /// sequence; production callers go through [`Self::create_share`].
    pub async fn create_share_with(
        &self,
        meta: BlobMeta,
        mut code_fn: impl FnMut() -> String,
    ) -> Result<ShareInfo> {
        let repo = UploadRepository::new(self.db.pool());

        let created_at = Self::now();
        let expires_at = created_at + self.ttl.as_secs() as i64;

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = code_fn();

            let new = NewUpload {
                code: code.clone(),
                original_name: meta.original_name.clone(),
                stored_name: meta.stored_name.clone(),
                mime_type: meta.mime_type.clone(),
                size_bytes: meta.size_bytes,
                created_at,
                expires_at,
            };

            match repo.insert(&new).await {
                Ok(record) => {
                    tracing::info!(
                        code = %record.code,
                        size_bytes = record.size_bytes,
                        expires_at = record.expires_at,
                        "Registered upload"
                    );
                    return Ok(self.share_info(&record));
                }
                Err(DropError::DuplicateCode) => {
                    tracing::warn!(code = %code, attempt, "Share code collision, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(DropError::CodeSpaceExhausted(MAX_CODE_ATTEMPTS))
    }

    /// Resolve a code to its record, enforcing expiry.
    ///
    /// `now` is read once by the caller and passed in, so a single
    /// request never observes two different clocks. Expired codes are
    /// `Gone`, never `NotFound`.
    pub async fn resolve(&self, code: &str, now: i64) -> Result<UploadRecord> {
        let repo = UploadRepository::new(self.db.pool());

        let record = repo
            .get(code)
            .await?
            .ok_or_else(|| DropError::NotFound(format!("code {code}")))?;

        if record.is_expired(now) {
            return Err(DropError::Gone);
        }

        Ok(record)
    }

    /// Build the share info payload for a record.
    pub fn share_info(&self, record: &UploadRecord) -> ShareInfo {
        ShareInfo {
            code: record.code.clone(),
            original_name: record.original_name.clone(),
            size_bytes: record.size_bytes,
            created_at: record.created_at,
            expires_at: record.expires_at,
            links: self.links(&record.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_service(ttl: Duration) -> ShareService {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        ShareService::new(db, CodeGenerator::default(), ttl, "http://localhost:8080")
    }

    fn sample_meta() -> BlobMeta {
        BlobMeta {
            original_name: "report.pdf".to_string(),
            stored_name: "ab123456-0000-0000-0000-000000000000.pdf".to_string(),
            size_bytes: 10,
            mime_type: "application/pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_share() {
        let service = setup_service(Duration::from_secs(3600)).await;

        let info = service.create_share(sample_meta()).await.unwrap();

        assert_eq!(info.code.len(), 7);
        assert_eq!(info.original_name, "report.pdf");
        assert_eq!(info.size_bytes, 10);
        assert_eq!(info.expires_at, info.created_at + 3600);
        assert_eq!(
            info.links.download_page,
            format!("http://localhost:8080/d/{}", info.code)
        );
        assert_eq!(
            info.links.direct_url,
            format!("http://localhost:8080/api/download/{}", info.code)
        );
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_trimmed() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let service = ShareService::new(
            db,
            CodeGenerator::default(),
            Duration::from_secs(60),
            "https://files.example.com/",
        );

        let links = service.links("abc1234");
        assert_eq!(links.download_page, "https://files.example.com/d/abc1234");
        assert_eq!(
            links.direct_url,
            "https://files.example.com/api/download/abc1234"
        );
    }

    #[tokio::test]
    async fn test_collision_retries_with_fresh_code() {
        let service = setup_service(Duration::from_secs(3600)).await;

        // Occupy a code
        let first = service
            .create_share_with(sample_meta(), || "clashed".to_string())
            .await
            .unwrap();
        assert_eq!(first.code, "clashed");

        // Stubbed generator returns the taken code once, then a fresh one
        let mut calls = 0;
        let second = service
            .create_share_with(sample_meta(), || {
                calls += 1;
                if calls == 1 {
                    "clashed".to_string()
                } else {
                    "fresh42".to_string()
                }
            })
            .await
            .unwrap();

        assert_eq!(second.code, "fresh42");
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_code_space_exhausted_is_terminal() {
        let service = setup_service(Duration::from_secs(3600)).await;

        service
            .create_share_with(sample_meta(), || "onlyone".to_string())
            .await
            .unwrap();

        // Generator that can only ever produce the taken code
        let mut calls = 0;
        let result = service
            .create_share_with(sample_meta(), || {
                calls += 1;
                "onlyone".to_string()
            })
            .await;

        assert!(matches!(result, Err(DropError::CodeSpaceExhausted(_))));
        assert_eq!(calls, MAX_CODE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_resolve_unknown_code() {
        let service = setup_service(Duration::from_secs(3600)).await;

        let result = service.resolve("nothere", ShareService::now()).await;
        assert!(matches!(result, Err(DropError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_live_code() {
        let service = setup_service(Duration::from_secs(3600)).await;

        let info = service.create_share(sample_meta()).await.unwrap();
        let record = service.resolve(&info.code, ShareService::now()).await.unwrap();

        assert_eq!(record.code, info.code);
        assert_eq!(record.size_bytes, 10);
    }

    #[tokio::test]
    async fn test_resolve_expired_is_gone_not_notfound() {
        let service = setup_service(Duration::from_secs(1)).await;

        let info = service.create_share(sample_meta()).await.unwrap();

        // Two seconds past creation the link is expired
        let later = info.created_at + 2;
        let result = service.resolve(&info.code, later).await;
        assert!(matches!(result, Err(DropError::Gone)));
    }

    #[tokio::test]
    async fn test_resolve_at_exact_expiry_is_gone() {
        let service = setup_service(Duration::from_secs(60)).await;

        let info = service.create_share(sample_meta()).await.unwrap();

        let result = service.resolve(&info.code, info.expires_at).await;
        assert!(matches!(result, Err(DropError::Gone)));
    }
}
