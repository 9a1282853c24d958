//! Transaction error aggregation.

use costledger_shared::AppError;
use costledger_shared::types::JournalEntryId;
use rust_decimal::Decimal;
use thiserror::Error;

use super::locks::LockError;
use crate::costing::CostingError;
use crate::posting::PostingError;

/// Any error that can fail an inventory transaction.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Costing failed.
    #[error(transparent)]
    Costing(#[from] CostingError),

    /// Rule resolution or posting failed.
    #[error(transparent)]
    Posting(#[from] PostingError),

    /// Scope locks could not be taken.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Request is malformed for its transaction type.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Deadline passed before posting.
    #[error("Transaction timed out after {elapsed_ms}ms (limit {limit_ms}ms)")]
    Timeout {
        /// Time spent.
        elapsed_ms: u128,
        /// Configured limit.
        limit_ms: u64,
    },

    /// The same reference is being processed by another worker.
    #[error("Reference {0} is already being processed")]
    ReferenceInFlight(String),

    /// Layer commit and ledger compensation both failed; the ledger holds an
    /// entry whose layer changes were discarded.
    #[error("Compensation of journal entry {entry} failed: {reason}")]
    CompensationFailed {
        /// Entry left without layer changes.
        entry: JournalEntryId,
        /// Why the reversal failed.
        reason: String,
    },
}

impl InventoryError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Costing(e) => e.error_code(),
            Self::Posting(e) => e.error_code(),
            Self::Lock(e) => e.error_code(),
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Timeout { .. } => "TRANSACTION_TIMEOUT",
            Self::ReferenceInFlight(_) => "REFERENCE_IN_FLIGHT",
            Self::CompensationFailed { .. } => "COMPENSATION_FAILED",
        }
    }

    /// Returns true if resubmitting the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Costing(e) => e.is_retryable(),
            Self::Posting(e) => e.is_retryable(),
            Self::Lock(_) | Self::Timeout { .. } | Self::ReferenceInFlight(_) => true,
            Self::InvalidRequest(_) | Self::CompensationFailed { .. } => false,
        }
    }

    /// Shortfall of an insufficient-stock failure.
    #[must_use]
    pub fn shortfall(&self) -> Option<Decimal> {
        match self {
            Self::Costing(e) => e.shortfall(),
            _ => None,
        }
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        let message = err.to_string();
        match err {
            InventoryError::Costing(
                CostingError::InsufficientStock { .. }
                | CostingError::NoOpenLayers
                | CostingError::LayerDepleted(_)
                | CostingError::MissingUnitCost,
            )
            | InventoryError::Posting(
                PostingError::NoApplicablePostingRule { .. } | PostingError::ZeroAmount(_),
            ) => Self::BusinessRule(message),
            InventoryError::Costing(
                CostingError::InvalidQuantity(_)
                | CostingError::InvalidUnitCost(_)
                | CostingError::InvalidExchangeRate(_)
                | CostingError::NoValueChange,
            )
            | InventoryError::InvalidRequest(_) => Self::Validation(message),
            InventoryError::Costing(CostingError::LayerNotFound(_))
            | InventoryError::Posting(
                PostingError::EntryNotFound(_) | PostingError::RuleNotFound(_),
            ) => Self::NotFound(message),
            InventoryError::Costing(CostingError::StaleCheckout { .. })
            | InventoryError::ReferenceInFlight(_)
            | InventoryError::Posting(
                PostingError::AlreadyReversed(_) | PostingError::DuplicateEntry(_),
            ) => Self::Conflict(message),
            InventoryError::Timeout { .. } | InventoryError::Lock(_) => Self::Timeout(message),
            InventoryError::Posting(
                PostingError::AccountNotConfigured(_) | PostingError::InvalidRule(_),
            ) => Self::Configuration(message),
            InventoryError::Posting(PostingError::LedgerUnavailable(_)) => {
                Self::ExternalService(message)
            }
            InventoryError::Costing(CostingError::StoreUnavailable)
            | InventoryError::Posting(
                PostingError::UnbalancedEntry { .. }
                | PostingError::InvalidLine(_)
                | PostingError::InsufficientLines,
            )
            | InventoryError::CompensationFailed { .. } => Self::Internal(message),
        }
    }
}
