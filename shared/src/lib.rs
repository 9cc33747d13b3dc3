//! Shared types for the store-server workspace
//!
//! Entity models, payload types, pagination and id/time utilities used by
//! the server crate and by the (external) web layer.

pub mod models;
pub mod pagination;
pub mod util;

// Re-exports
pub use pagination::PaginatedResponse;
pub use serde::{Deserialize, Serialize};
