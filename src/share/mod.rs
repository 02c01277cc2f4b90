//! Upload lifecycle: share creation, resolution, and expiry sweeping.

mod service;
mod sweeper;

pub use service::{BlobMeta, ShareInfo, ShareLinks, ShareService, MAX_CODE_ATTEMPTS};
pub use sweeper::{ExpirySweeper, SweepStats};
