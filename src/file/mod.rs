//! Blob storage for Droplink.

mod storage;

pub use storage::FileStorage;
