//! Valuation snapshots computed from committed cost layers.
//!
//! Every method is computed independently from a point-in-time copy of the
//! layers; the layers themselves are never touched.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use costledger_shared::config::{CostingConfig, ValuationConfig};
use costledger_shared::types::{TenantId, ValuationSnapshotId};
use rayon::prelude::*;
use rust_decimal::Decimal;

use super::repository::SnapshotRepository;
use super::standard::StandardCostSource;
use super::types::{AgingBucket, MethodValuation, ValuationSnapshot};
use crate::costing::{CostLayer, CostLayerStore, CostingError, ScopeLayers};

/// Materializes per-scope valuation snapshots.
pub struct ValuationSnapshotter<S> {
    store: Arc<CostLayerStore>,
    standard_costs: Arc<S>,
    repository: Arc<SnapshotRepository>,
    costing: CostingConfig,
    valuation: ValuationConfig,
}

impl<S: StandardCostSource> ValuationSnapshotter<S> {
    /// Creates a snapshotter.
    pub fn new(
        store: Arc<CostLayerStore>,
        standard_costs: Arc<S>,
        repository: Arc<SnapshotRepository>,
        costing: CostingConfig,
        valuation: ValuationConfig,
    ) -> Self {
        Self {
            store,
            standard_costs,
            repository,
            costing,
            valuation,
        }
    }

    /// Snapshot repository this snapshotter writes to.
    #[must_use]
    pub fn repository(&self) -> &Arc<SnapshotRepository> {
        &self.repository
    }

    /// Values every scope of a tenant with stock on hand and stores the rows
    /// under `as_of`, replacing any earlier run for that date.
    pub fn snapshot(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<Vec<ValuationSnapshot>, CostingError> {
        let scopes = self.store.snapshot(tenant_id)?;

        let rows: Vec<ValuationSnapshot> = scopes
            .par_iter()
            .filter_map(|layers| self.value_scope(layers, as_of))
            .collect();

        let total: Decimal = rows.iter().map(|r| r.active_value).sum();
        tracing::info!(
            tenant = %tenant_id,
            %as_of,
            rows = rows.len(),
            total_value = %total,
            "valuation snapshot taken"
        );

        self.repository.replace(tenant_id, as_of, rows.clone());
        Ok(rows)
    }

    /// Values one scope. Scopes without stock on hand produce no row.
    #[must_use]
    pub fn value_scope(&self, layers: &ScopeLayers, as_of: NaiveDate) -> Option<ValuationSnapshot> {
        let quantity = layers.on_hand();
        if quantity <= Decimal::ZERO {
            return None;
        }

        let scope = layers.scope();
        let fifo = MethodValuation::from_total(
            quantity,
            cover_with_receipts(layers.layers(), quantity, true),
        );
        let lifo = MethodValuation::from_total(
            quantity,
            cover_with_receipts(layers.layers(), quantity, false),
        );
        let weighted_average =
            MethodValuation::from_total(quantity, value_at_average(layers.layers(), quantity));
        let standard = self
            .standard_costs
            .standard_cost(scope.tenant_id, scope.product_id)
            .map(|unit_cost| MethodValuation::from_total(quantity, quantity * unit_cost));

        let active_value = layers.value();
        let days_on_hand = layers.last_movement().map(|d| (as_of - d).num_days());
        let aging = days_on_hand.map_or(AgingBucket::Dead, |days| {
            AgingBucket::classify(
                days,
                self.valuation.fast_moving_days,
                self.valuation.slow_moving_days,
            )
        });

        Some(ValuationSnapshot {
            id: ValuationSnapshotId::new(),
            tenant_id: scope.tenant_id,
            as_of,
            product_id: scope.product_id,
            warehouse_id: scope.warehouse_id,
            quantity,
            fifo,
            lifo,
            weighted_average,
            standard_variance: standard.map(|s| active_value - s.total_value),
            standard,
            active_method: self.costing.method_for(scope.product_id, None),
            active_value,
            fifo_lifo_variance: fifo.total_value - lifo.total_value,
            last_movement: layers.last_movement(),
            days_on_hand,
            aging,
            created_at: Utc::now(),
        })
    }
}

/// Values `quantity` with receipts taken newest first (`newest_first`) or
/// oldest first, each receipt contributing at most its original quantity.
fn cover_with_receipts(layers: &[CostLayer], quantity: Decimal, newest_first: bool) -> Decimal {
    let mut ordered: Vec<&CostLayer> = layers.iter().collect();
    if newest_first {
        ordered.sort_by_key(|l| Reverse((l.receipt_date, l.layer_sequence)));
    } else {
        ordered.sort_by_key(|l| (l.receipt_date, l.layer_sequence));
    }

    let mut needed = quantity;
    let mut value = Decimal::ZERO;
    for layer in ordered {
        if needed <= Decimal::ZERO {
            break;
        }
        let take = needed.min(layer.original_quantity);
        value += take * layer.base_unit_cost;
        needed -= take;
    }
    value
}

/// Values `quantity` at the average cost of every receipt.
fn value_at_average(layers: &[CostLayer], quantity: Decimal) -> Decimal {
    let received: Decimal = layers.iter().map(|l| l.original_quantity).sum();
    if received.is_zero() {
        return Decimal::ZERO;
    }
    quantity * layers.iter().map(CostLayer::original_cost).sum::<Decimal>() / received
}
