//! Droplink - self-hosted file sharing.
//!
//! Upload a file, get a short code and a time-limited download link.
//! Expired links answer 410 and a background sweeper reclaims their
//! records and blobs.

pub mod code;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod share;
pub mod web;

pub use code::{CodeGenerator, CODE_ALPHABET, DEFAULT_CODE_LENGTH};
pub use config::Config;
pub use db::{Database, NewUpload, UploadRecord, UploadRepository};
pub use error::{DropError, Result};
pub use file::FileStorage;
pub use share::{BlobMeta, ExpirySweeper, ShareInfo, ShareLinks, ShareService, SweepStats};
pub use web::WebServer;
