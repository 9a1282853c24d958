//! Reconciliation error types.

use thiserror::Error;

use crate::costing::CostingError;
use crate::posting::PostingError;

/// Errors that can occur while reconciling inventory against the ledger.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// The designated inventory account is missing from the chart.
    #[error("Inventory account not configured: {0}")]
    AccountNotConfigured(String),

    /// Layer store could not be read.
    #[error(transparent)]
    Store(#[from] CostingError),

    /// Ledger could not be read.
    #[error(transparent)]
    Ledger(#[from] PostingError),
}

impl ReconciliationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotConfigured(_) => "ACCOUNT_NOT_CONFIGURED",
            Self::Store(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AccountNotConfigured(_) => false,
            Self::Store(e) => e.is_retryable(),
            Self::Ledger(e) => e.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_delegate() {
        let err = ReconciliationError::from(PostingError::LedgerUnavailable("io".into()));
        assert_eq!(err.error_code(), "LEDGER_UNAVAILABLE");
        assert!(err.is_retryable());

        let err = ReconciliationError::AccountNotConfigured("Inventory".into());
        assert_eq!(err.to_string(), "Inventory account not configured: Inventory");
        assert!(!err.is_retryable());
    }
}
