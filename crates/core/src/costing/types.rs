//! Cost layer domain types.
//!
//! A cost layer records one batch of inventory received at a specific unit
//! cost. Layers are mutated only by depletion and revaluation and are never
//! removed once committed.
//!
//! Layer values are booked at ledger precision: every change to
//! `remaining_value` is exactly the amount posted for it, so the sum of
//! layer values and the inventory account move in lockstep.

use chrono::{DateTime, NaiveDate, Utc};
use costledger_shared::types::{
    CostLayerId, CostLayerTransactionId, CostingMethod, InventoryTransactionId, JournalEntryId,
    LotId, ProductId, TenantId, UserId, WarehouseId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The unit of exclusive access for layer mutations.
///
/// Field order defines the canonical lock order: tenant, then product, then warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockScope {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Product held in the scope.
    pub product_id: ProductId,
    /// Warehouse holding the stock.
    pub warehouse_id: WarehouseId,
}

impl StockScope {
    /// Creates a new scope.
    #[must_use]
    pub const fn new(tenant_id: TenantId, product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            tenant_id,
            product_id,
            warehouse_id,
        }
    }
}

impl std::fmt::Display for StockScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.tenant_id, self.product_id, self.warehouse_id)
    }
}

/// One batch of inventory received at a specific unit cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLayer {
    /// Layer ID.
    pub id: CostLayerId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Product.
    pub product_id: ProductId,
    /// Warehouse.
    pub warehouse_id: WarehouseId,
    /// Optional lot or batch.
    pub lot_id: Option<LotId>,
    /// Monotonic per product and warehouse, starting at 1.
    pub layer_sequence: u64,
    /// Date the stock was received. Drives FIFO and LIFO order.
    pub receipt_date: NaiveDate,
    /// Date the layer entered this scope. Differs from `receipt_date` only
    /// for stock moved in by a transfer.
    pub booked_on: NaiveDate,
    /// Unit cost in the receipt currency.
    pub unit_cost: Decimal,
    /// Receipt currency code.
    pub currency: String,
    /// Rate from receipt currency to base currency.
    pub exchange_rate: Decimal,
    /// Unit cost in base currency.
    pub base_unit_cost: Decimal,
    /// Quantity received.
    pub original_quantity: Decimal,
    /// Quantity still on hand.
    pub remaining_quantity: Decimal,
    /// Base-currency value booked when the layer was created.
    pub original_value: Decimal,
    /// Base-currency value still on hand.
    pub remaining_value: Decimal,
    /// True once `remaining_quantity` reached zero. The layer is then immutable.
    pub is_depleted: bool,
    /// Date the layer was fully depleted.
    pub depleted_on: Option<NaiveDate>,
    /// Caller reference of the transaction that created the layer.
    pub source_reference: String,
    /// Actor who created the layer.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl CostLayer {
    /// Booked base-currency value of the remaining quantity.
    #[must_use]
    pub fn remaining_cost(&self) -> Decimal {
        self.remaining_value
    }

    /// Booked base-currency value of the original quantity.
    #[must_use]
    pub fn original_cost(&self) -> Decimal {
        self.original_value
    }

    /// Returns true if the layer belongs to the given lot filter.
    #[must_use]
    pub fn matches_lot(&self, lot: Option<LotId>) -> bool {
        lot.is_none_or(|lot| self.lot_id == Some(lot))
    }
}

/// Input for creating a new layer.
#[derive(Debug, Clone)]
pub struct LayerReceipt {
    /// Optional lot or batch.
    pub lot_id: Option<LotId>,
    /// Date the stock was received.
    pub receipt_date: NaiveDate,
    /// Unit cost in the receipt currency.
    pub unit_cost: Decimal,
    /// Receipt currency code.
    pub currency: String,
    /// Rate from receipt currency to base currency.
    pub exchange_rate: Decimal,
    /// Quantity received (must be positive).
    pub quantity: Decimal,
    /// Caller reference of the originating transaction.
    pub source_reference: String,
    /// Actor creating the layer.
    pub created_by: UserId,
}

/// Result of depleting a single layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepletionResult {
    /// The depleted layer.
    pub layer_id: CostLayerId,
    /// Sequence of the depleted layer.
    pub layer_sequence: u64,
    /// Quantity taken from the layer, including absorbed dust.
    pub depleted_quantity: Decimal,
    /// Booked base-currency value taken out of the layer.
    pub depleted_cost: Decimal,
    /// Base-currency unit cost used.
    pub unit_cost: Decimal,
    /// Quantity left in the layer.
    pub remaining_in_layer: Decimal,
}

/// Cost of an issue, with one breakdown entry per touched layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCost {
    /// Method used.
    pub method: CostingMethod,
    /// Quantity requested.
    pub quantity: Decimal,
    /// Quantity taken from layers (differs from `quantity` only by absorbed dust).
    pub depleted_quantity: Decimal,
    /// Total base-currency cost.
    pub total_cost: Decimal,
    /// Effective base-currency unit cost.
    pub unit_cost: Decimal,
    /// Per-layer depletion audit.
    pub layer_breakdown: Vec<DepletionResult>,
}

/// Outcome of a stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustmentResult {
    /// Positive adjustment: a new layer was created.
    Increase(CostLayer),
    /// Negative adjustment: layers were depleted.
    Decrease(IssueCost),
}

impl AdjustmentResult {
    /// Base-currency value moved by the adjustment.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        match self {
            Self::Increase(layer) => layer.original_cost(),
            Self::Decrease(cost) => cost.total_cost,
        }
    }
}

/// A single layer touched by a revaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevaluedLayer {
    /// The revalued layer.
    pub layer_id: CostLayerId,
    /// Base unit cost before revaluation.
    pub previous_unit_cost: Decimal,
    /// Base unit cost after revaluation.
    pub new_unit_cost: Decimal,
    /// Remaining quantity (unchanged).
    pub quantity: Decimal,
    /// Value change of this layer.
    pub delta: Decimal,
}

/// Outcome of a revaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevaluationResult {
    /// Signed value change: positive is a gain, negative a loss.
    pub delta: Decimal,
    /// Total quantity revalued.
    pub quantity: Decimal,
    /// Touched layers.
    pub layers: Vec<RevaluedLayer>,
}

impl RevaluationResult {
    /// Returns true if the revaluation increased inventory value.
    #[must_use]
    pub fn is_gain(&self) -> bool {
        self.delta > Decimal::ZERO
    }
}

/// Kind of change recorded against a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerMovement {
    /// Quantity and value taken out of the layer.
    Depletion,
    /// Unit cost changed, quantity untouched.
    Revaluation,
}

/// Immutable audit record of one depletion or revaluation of one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLayerTransaction {
    /// Record ID.
    pub id: CostLayerTransactionId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Depleted layer.
    pub layer_id: CostLayerId,
    /// Originating inventory transaction.
    pub transaction_id: InventoryTransactionId,
    /// Caller reference of the originating transaction.
    pub source_reference: String,
    /// What happened to the layer.
    pub movement: LayerMovement,
    /// Quantity depleted; zero for revaluations.
    pub quantity: Decimal,
    /// Booked value depleted, or the signed value change of a revaluation.
    pub cost: Decimal,
    /// Base-currency unit cost used, or the new unit cost of a revaluation.
    pub unit_cost: Decimal,
    /// Business date of the movement.
    pub transaction_date: NaiveDate,
    /// Journal entry that records the financial effect; absent for
    /// movements without value.
    pub journal_entry_id: Option<JournalEntryId>,
    /// Actor.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl CostLayerTransaction {
    /// Signed change this record made to the layer's value.
    #[must_use]
    pub fn value_change(&self) -> Decimal {
        match self.movement {
            LayerMovement::Depletion => -self.cost,
            LayerMovement::Revaluation => self.cost,
        }
    }
}
