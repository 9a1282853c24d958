//! Costing error types.

use costledger_shared::types::CostLayerId;
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::StockScope;

/// Errors that can occur while costing or mutating cost layers.
#[derive(Debug, Error)]
pub enum CostingError {
    /// Requested quantity exceeds what the eligible layers hold.
    #[error("Insufficient stock: requested {requested}, available {available}, shortfall {shortfall}")]
    InsufficientStock {
        /// Quantity requested.
        requested: Decimal,
        /// Quantity available across eligible layers.
        available: Decimal,
        /// `requested - available`.
        shortfall: Decimal,
    },

    /// Quantity must be positive.
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    /// Unit cost cannot be negative.
    #[error("Unit cost cannot be negative, got {0}")]
    InvalidUnitCost(Decimal),

    /// Exchange rate must be positive.
    #[error("Exchange rate must be positive, got {0}")]
    InvalidExchangeRate(Decimal),

    /// A positive adjustment needs a unit cost and the scope has no stock to derive one from.
    #[error("No unit cost given and no open layers to derive the current cost from")]
    MissingUnitCost,

    /// Layer does not exist in the scope.
    #[error("Cost layer not found: {0}")]
    LayerNotFound(CostLayerId),

    /// Layer is depleted and therefore immutable.
    #[error("Cost layer {0} is depleted and cannot be changed")]
    LayerDepleted(CostLayerId),

    /// No open layers to revalue.
    #[error("No open cost layers to revalue")]
    NoOpenLayers,

    /// Revaluation would not change inventory value.
    #[error("Revaluation produces no value change")]
    NoValueChange,

    /// The scope changed since it was checked out.
    #[error("Cost layers for {scope} changed since checkout (expected version {expected}, found {actual})")]
    StaleCheckout {
        /// The scope.
        scope: StockScope,
        /// Version at checkout.
        expected: u64,
        /// Version found at commit.
        actual: u64,
    },

    /// The layer store lock was poisoned by a panicking writer.
    #[error("Cost layer store is unavailable")]
    StoreUnavailable,
}

impl CostingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::InvalidUnitCost(_) => "INVALID_UNIT_COST",
            Self::InvalidExchangeRate(_) => "INVALID_EXCHANGE_RATE",
            Self::MissingUnitCost => "MISSING_UNIT_COST",
            Self::LayerNotFound(_) => "LAYER_NOT_FOUND",
            Self::LayerDepleted(_) => "LAYER_DEPLETED",
            Self::NoOpenLayers => "NO_OPEN_LAYERS",
            Self::NoValueChange => "NO_VALUE_CHANGE",
            Self::StaleCheckout { .. } => "STALE_CHECKOUT",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Insufficient stock is never retried automatically.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleCheckout { .. })
    }

    /// Returns the shortfall for an insufficient-stock error.
    #[must_use]
    pub fn shortfall(&self) -> Option<Decimal> {
        match self {
            Self::InsufficientStock { shortfall, .. } => Some(*shortfall),
            _ => None,
        }
    }
}
