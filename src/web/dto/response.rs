//! Response DTOs for the Web API.
//!
//! Payloads are flat camelCase JSON; the field sets mirror what clients
//! of the share endpoints consume.

use serde::Serialize;
use utoipa::ToSchema;

use crate::db::UploadRecord;
use crate::share::{ShareInfo, ShareLinks};

/// Response for a newly created upload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareInfoResponse {
    /// Public share code.
    pub code: String,
    /// Original filename.
    pub original_name: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Expiry time, unix seconds.
    pub expires_at: i64,
    /// Human download page URL.
    pub download_page: String,
    /// Direct download URL.
    pub direct_url: String,
}

impl From<ShareInfo> for ShareInfoResponse {
    fn from(info: ShareInfo) -> Self {
        Self {
            code: info.code,
            original_name: info.original_name,
            size_bytes: info.size_bytes,
            expires_at: info.expires_at,
            download_page: info.links.download_page,
            direct_url: info.links.direct_url,
        }
    }
}

/// Response for a code lookup.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
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
    /// Human download page URL.
    pub download_page: String,
    /// Direct download URL.
    pub direct_url: String,
}

impl LookupResponse {
    /// Build a lookup response from a record and its derived links.
    pub fn new(record: &UploadRecord, links: ShareLinks) -> Self {
        Self {
            code: record.code.clone(),
            original_name: record.original_name.clone(),
            size_bytes: record.size_bytes,
            created_at: record.created_at,
            expires_at: record.expires_at,
            download_page: links.download_page,
            direct_url: links.direct_url,
        }
    }
}
