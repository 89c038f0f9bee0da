//! # va-api
//!
//! REST handlers for SmartVA RS.
//!
//! Handlers stay thin: they extract the caller and the body, call the
//! matching service and shape the JSON the front end expects. Errors leave
//! through [`error::ApiError`].

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::{AppState, AuthenticatedUser};
pub use routes::router;
