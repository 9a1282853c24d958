//! Valuation snapshot types.

use chrono::{DateTime, NaiveDate, Utc};
use costledger_shared::types::{CostingMethod, ProductId, TenantId, ValuationSnapshotId, WarehouseId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Movement classification of stock on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingBucket {
    /// Moved recently.
    Fast,
    /// Moved within the slow-moving window.
    Slow,
    /// Not moved within the slow-moving window.
    Dead,
}

impl AgingBucket {
    /// Classifies stock by days since last movement.
    #[must_use]
    pub fn classify(days_on_hand: i64, fast_days: i64, slow_days: i64) -> Self {
        if days_on_hand <= fast_days {
            Self::Fast
        } else if days_on_hand <= slow_days {
            Self::Slow
        } else {
            Self::Dead
        }
    }
}

/// Quantity and value under one valuation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodValuation {
    /// Quantity valued.
    pub quantity: Decimal,
    /// Effective unit cost.
    pub unit_cost: Decimal,
    /// Total value.
    pub total_value: Decimal,
}

impl MethodValuation {
    /// Builds a valuation from quantity and total value.
    #[must_use]
    pub fn from_total(quantity: Decimal, total_value: Decimal) -> Self {
        let unit_cost = if quantity.is_zero() {
            Decimal::ZERO
        } else {
            total_value / quantity
        };
        Self {
            quantity,
            unit_cost,
            total_value,
        }
    }
}

/// Point-in-time valuation of one product in one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationSnapshot {
    /// Row ID.
    pub id: ValuationSnapshotId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Snapshot date.
    pub as_of: NaiveDate,
    /// Product.
    pub product_id: ProductId,
    /// Warehouse.
    pub warehouse_id: WarehouseId,
    /// Quantity on hand.
    pub quantity: Decimal,
    /// Newest receipts cover on-hand.
    pub fifo: MethodValuation,
    /// Oldest receipts cover on-hand.
    pub lifo: MethodValuation,
    /// Average cost of all receipts.
    pub weighted_average: MethodValuation,
    /// Standard cost, when one is configured.
    pub standard: Option<MethodValuation>,
    /// Costing method configured for the product.
    pub active_method: CostingMethod,
    /// Book value: remaining cost of the actual layers.
    pub active_value: Decimal,
    /// FIFO value minus LIFO value.
    pub fifo_lifo_variance: Decimal,
    /// Book value minus standard value.
    pub standard_variance: Option<Decimal>,
    /// Latest receipt or depletion date.
    pub last_movement: Option<NaiveDate>,
    /// Days between last movement and `as_of`.
    pub days_on_hand: Option<i64>,
    /// Movement classification.
    pub aging: AgingBucket,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
