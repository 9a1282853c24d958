//! Reconciliation reports.

use chrono::NaiveDate;
use costledger_shared::types::{CostLayerId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where the inventory side of a reconciliation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryValueSource {
    /// Stored snapshot for the date.
    Snapshot,
    /// Committed layer state.
    Live,
}

/// Inventory value compared with the inventory account balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Tenant reconciled.
    pub tenant_id: TenantId,
    /// Reconciliation date.
    pub as_of: NaiveDate,
    /// Sum of remaining layer cost.
    pub inventory_value: Decimal,
    /// Posted balance of the inventory account.
    pub gl_value: Decimal,
    /// `inventory_value - gl_value`.
    pub variance: Decimal,
    /// True when `|variance| < epsilon`.
    pub is_balanced: bool,
    /// Source of `inventory_value`.
    pub source: InventoryValueSource,
}

impl ReconciliationReport {
    /// Variance signal for operators, present only when unbalanced.
    #[must_use]
    pub fn variance_signal(&self) -> Option<ReconciliationVariance> {
        (!self.is_balanced).then(|| ReconciliationVariance {
            tenant_id: self.tenant_id,
            as_of: self.as_of,
            inventory_value: self.inventory_value,
            gl_value: self.gl_value,
            variance: self.variance,
        })
    }
}

/// Standing data-quality signal: inventory and ledger disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationVariance {
    /// Tenant.
    pub tenant_id: TenantId,
    /// Date.
    pub as_of: NaiveDate,
    /// Inventory side.
    pub inventory_value: Decimal,
    /// Ledger side.
    pub gl_value: Decimal,
    /// Signed difference.
    pub variance: Decimal,
}

impl std::fmt::Display for ReconciliationVariance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "inventory {} vs ledger {} on {} (variance {})",
            self.inventory_value, self.gl_value, self.as_of, self.variance
        )
    }
}

/// A layer whose quantities disagree with its depletion records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerIntegrityViolation {
    /// Offending layer.
    pub layer_id: CostLayerId,
    /// Quantity received.
    pub original_quantity: Decimal,
    /// Quantity remaining.
    pub remaining_quantity: Decimal,
    /// Sum of recorded depletions.
    pub recorded_depletions: Decimal,
}

/// Outcome of a layer integrity audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Layers inspected.
    pub layers_checked: usize,
    /// Layers failing the check.
    pub violations: Vec<LayerIntegrityViolation>,
}

impl IntegrityReport {
    /// True if no layer failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}
