//! Result type aliases

use crate::error::VaError;

/// Standard Result type for SmartVA operations
pub type VaResult<T> = Result<T, VaError>;
