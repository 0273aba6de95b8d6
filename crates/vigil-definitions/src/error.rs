//! Definitions catalog error types.

use thiserror::Error;
use tracing::error;
use vigil_store::StoreError;

/// Errors returned by the [`crate::Definitions`] facade.
#[derive(Debug, Error)]
pub enum DefinitionsError {
    /// Missing or empty required argument. Raised before any store access.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The store session is not open. Raised before any store access.
    #[error("catalog store is not ready")]
    NotReady,

    #[error("catalog store error: {0}")]
    Store(#[from] StoreError),
}

impl DefinitionsError {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, DefinitionsError::InvalidArgument(_))
    }
}

pub type DefinitionsResult<T> = Result<T, DefinitionsError>;

/// Log a store failure under the facade operation name and convert it.
pub(crate) fn store_failure(op: &'static str) -> impl FnOnce(StoreError) -> DefinitionsError {
    move |e| {
        error!(op, error = %e, "catalog store operation failed");
        DefinitionsError::Store(e)
    }
}

/// Reject empty or whitespace-only identifiers.
pub(crate) fn require(value: &str, what: &str) -> DefinitionsResult<()> {
    if value.trim().is_empty() {
        return Err(DefinitionsError::InvalidArgument(format!(
            "{what} must be not empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_blank() {
        assert!(require("  ", "TenantId").unwrap_err().is_invalid_argument());
        assert!(require("", "TriggerId").is_err());
        assert!(require("t", "TenantId").is_ok());
    }

    #[test]
    fn store_failure_wraps_error() {
        let err = store_failure("get_trigger")(StoreError::Read("disk".into()));
        assert!(matches!(err, DefinitionsError::Store(StoreError::Read(_))));
        assert!(err.to_string().contains("disk"));
    }
}
