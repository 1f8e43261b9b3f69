//! External collaborators: forecast lookup and AI commentary.
//!
//! Both clients are optional features. A failure never aborts the pipeline;
//! transient failures are retried once, anything else surfaces as a
//! `ServiceError` the caller downgrades to an absent result.

pub mod coach;
pub mod weather;

use crate::error::ServiceError;
use tracing::warn;

/// Run an operation, retrying exactly once when the failure is transient.
pub(crate) fn with_retry<T, F>(mut operation: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Result<T, ServiceError>,
{
    match operation() {
        Ok(value) => Ok(value),
        Err(e) if e.is_transient() => {
            warn!(error = %e, "transient service failure, retrying once");
            operation()
        }
        Err(e) => Err(e),
    }
}
