//! API handlers for the Web API.

pub mod share;

pub use share::*;

use std::sync::Arc;

use crate::file::FileStorage;
use crate::share::ShareService;
use crate::Database;

/// Shared application state for the Web API.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Shared database handle.
    pub db: Arc<Database>,
    /// Blob storage.
    pub storage: FileStorage,
    /// Share service.
    pub shares: ShareService,
    /// Maximum accepted upload size in bytes.
    pub max_upload_size: u64,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: Arc<Database>,
        storage: FileStorage,
        shares: ShareService,
        max_upload_size: u64,
    ) -> Self {
        Self {
            db,
            storage,
            shares,
            max_upload_size,
        }
    }
}
