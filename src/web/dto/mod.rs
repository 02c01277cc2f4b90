//! Data transfer objects for the Web API.

mod response;

pub use response::{LookupResponse, ShareInfoResponse};
