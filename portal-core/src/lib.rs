//! portal-core: Shared infrastructure for the course portal client.
pub mod config;
pub mod error;
pub mod observability;

pub use error::{AppError, FieldErrors};
pub use reqwest;
pub use serde;
pub use serde_json;
pub use tracing;
pub use validator;
