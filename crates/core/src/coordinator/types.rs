//! Transaction requests, states and results.

use chrono::NaiveDate;
use costledger_shared::types::{
    CostLayerId, CostingMethod, InventoryTransactionId, LotId, PostingRuleId, ProductId,
    WarehouseId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error::InventoryError;
use crate::costing::{CostLayer, IssueCost, RevaluationResult};
use crate::posting::{ContextFields, InventoryEventType, JournalHeader};

/// Kind of inventory transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Goods received into a warehouse.
    Receive,
    /// Goods issued out of a warehouse.
    Issue,
    /// Stock count correction, signed.
    Adjustment,
    /// Unit cost change without quantity change.
    Revaluation,
    /// Goods removed as unusable.
    Writeoff,
    /// Goods moved between warehouses.
    Transfer,
}

impl TransactionType {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receive => "receive",
            Self::Issue => "issue",
            Self::Adjustment => "adjustment",
            Self::Revaluation => "revaluation",
            Self::Writeoff => "writeoff",
            Self::Transfer => "transfer",
        }
    }

    /// Posting event produced by this transaction type.
    #[must_use]
    pub fn event_type(&self) -> InventoryEventType {
        match self {
            Self::Receive => InventoryEventType::Receipt,
            Self::Issue => InventoryEventType::Issue,
            Self::Adjustment => InventoryEventType::Adjustment,
            Self::Revaluation => InventoryEventType::Revaluation,
            Self::Writeoff => InventoryEventType::Writeoff,
            Self::Transfer => InventoryEventType::Transfer,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound inventory transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Kind of transaction.
    pub transaction_type: TransactionType,
    /// Caller reference used for idempotency.
    pub reference: String,
    /// Product.
    pub product_id: ProductId,
    /// Source warehouse, or the receiving warehouse for receipts.
    pub warehouse_id: WarehouseId,
    /// Destination warehouse of a transfer.
    #[serde(default)]
    pub destination_warehouse_id: Option<WarehouseId>,
    /// Optional lot.
    #[serde(default)]
    pub lot_id: Option<LotId>,
    /// Layer to revalue; all open layers when absent.
    #[serde(default)]
    pub layer_id: Option<CostLayerId>,
    /// Quantity. Signed for adjustments, positive otherwise, ignored for revaluations.
    #[serde(default)]
    pub quantity: Decimal,
    /// Unit cost for receipts, positive adjustments and revaluations.
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    /// Currency of `unit_cost`; base currency when absent.
    #[serde(default)]
    pub currency: Option<String>,
    /// Rate to base currency; 1 when absent.
    #[serde(default)]
    pub exchange_rate: Option<Decimal>,
    /// Costing method override.
    #[serde(default)]
    pub method: Option<CostingMethod>,
    /// Business date of the transaction.
    pub transaction_date: NaiveDate,
    /// Fields for posting rule conditions.
    #[serde(default)]
    pub context: ContextFields,
    /// Optional journal description.
    #[serde(default)]
    pub description: Option<String>,
}

impl TransactionRequest {
    /// Creates a request with only the required fields set.
    #[must_use]
    pub fn new(
        transaction_type: TransactionType,
        reference: impl Into<String>,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: Decimal,
        transaction_date: NaiveDate,
    ) -> Self {
        Self {
            transaction_type,
            reference: reference.into(),
            product_id,
            warehouse_id,
            destination_warehouse_id: None,
            lot_id: None,
            layer_id: None,
            quantity,
            unit_cost: None,
            currency: None,
            exchange_rate: None,
            method: None,
            transaction_date,
            context: ContextFields::new(),
            description: None,
        }
    }
}

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Accepted, nothing computed yet.
    Received,
    /// Layer changes computed on the working copy.
    Costed,
    /// Posting rule found.
    RuleResolved,
    /// Journal stored and layer changes committed.
    Posted,
    /// Terminal failure with no visible effect.
    Failed,
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Received => "received",
            Self::Costed => "costed",
            Self::RuleResolved => "rule_resolved",
            Self::Posted => "posted",
            Self::Failed => "failed",
        })
    }
}

/// Result of a posted transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionOutcome {
    /// Transaction ID.
    pub transaction_id: InventoryTransactionId,
    /// Caller reference.
    pub reference: String,
    /// Kind of transaction.
    pub transaction_type: TransactionType,
    /// Final state (always `Posted`).
    pub state: TransactionState,
    /// Method used to deplete layers, if any were depleted.
    pub method: Option<CostingMethod>,
    /// Quantity moved.
    pub quantity: Decimal,
    /// Base-currency value moved; zero when nothing was posted.
    pub amount: Decimal,
    /// Depletion detail for outbound movements.
    pub issue_cost: Option<IssueCost>,
    /// Layers created by receipts, positive adjustments and transfers.
    pub layers_created: Vec<CostLayer>,
    /// Revaluation detail.
    pub revaluation: Option<RevaluationResult>,
    /// Rule used.
    pub rule_id: PostingRuleId,
    /// Journal entry produced; absent for movements without value.
    pub journal_entry: Option<JournalHeader>,
    /// True when returned from the idempotency registry.
    pub replayed: bool,
}

/// A transaction that ended in `Failed`.
#[derive(Debug, Error)]
#[error("Transaction {reference} failed after {failed_at}: {error}")]
pub struct TransactionFailure {
    /// Transaction ID.
    pub transaction_id: InventoryTransactionId,
    /// Caller reference.
    pub reference: String,
    /// Last state reached before failing.
    pub failed_at: TransactionState,
    /// Cause.
    #[source]
    pub error: InventoryError,
}
