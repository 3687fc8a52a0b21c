//! Read-after-write verification.
//!
//! The backend offers no multi-statement transactions, so writes whose
//! outcome matters are confirmed by reading the affected rows back and
//! checking them against what was written.

use std::future::Future;

use thiserror::Error;

use crate::db::RepositoryError;
use crate::error::AppError;

/// A read-back disagreed with the preceding write.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{operation} verification failed: {reason}")]
pub struct VerificationError {
    /// What was being verified.
    pub operation: &'static str,
    /// How the read-back differed.
    pub reason: String,
}

impl VerificationError {
    #[must_use]
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

/// Run `read_back` and accept its result only if `check` passes.
///
/// Returns the observed value so callers can mirror it into local state.
///
/// # Errors
///
/// Returns `AppError::Repository` if the read-back itself fails.
/// Returns `AppError::Verification` if `check` rejects the observed value.
pub async fn verify_write<T, F, C>(operation: &'static str, read_back: F, check: C) -> Result<T, AppError>
where
    F: Future<Output = Result<T, RepositoryError>>,
    C: FnOnce(&T) -> Result<(), String>,
{
    let observed = read_back.await?;
    if let Err(reason) = check(&observed) {
        tracing::warn!(operation, %reason, "Write verification failed");
        return Err(VerificationError::new(operation, reason).into());
    }
    Ok(observed)
}
