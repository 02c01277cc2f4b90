//! Web API module for Droplink.
//!
//! REST surface for uploads, lookups, and downloads, plus the Swagger UI
//! and optional static frontend serving.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
