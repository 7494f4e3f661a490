//! Service layer for business logic
//!
//! Shared between the HTTP API and the CLI.

mod cache_policy;
mod rankings;
mod view_statistics;

pub use cache_policy::*;
pub use rankings::*;
pub use view_statistics::*;
