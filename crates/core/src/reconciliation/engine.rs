//! Inventory to general ledger reconciliation.
//!
//! Runs against committed state only and never takes scope locks.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use costledger_shared::types::{CostLayerId, TenantId};
use rust_decimal::Decimal;

use super::error::ReconciliationError;
use super::types::{
    IntegrityReport, InventoryValueSource, LayerIntegrityViolation, ReconciliationReport,
};
use crate::costing::{CostLayerStore, LayerMovement, ScopeLayers};
use crate::posting::{ChartOfAccounts, LedgerStore};
use crate::valuation::SnapshotRepository;

/// Compares layer value with the inventory account balance.
pub struct ReconciliationEngine<C, L> {
    store: Arc<CostLayerStore>,
    snapshots: Arc<SnapshotRepository>,
    chart: Arc<C>,
    ledger: Arc<L>,
    inventory_account: String,
    epsilon: Decimal,
}

impl<C, L> ReconciliationEngine<C, L>
where
    C: ChartOfAccounts,
    L: LedgerStore,
{
    /// Creates an engine.
    pub fn new(
        store: Arc<CostLayerStore>,
        snapshots: Arc<SnapshotRepository>,
        chart: Arc<C>,
        ledger: Arc<L>,
        inventory_account: impl Into<String>,
        epsilon: Decimal,
    ) -> Self {
        Self {
            store,
            snapshots,
            chart,
            ledger,
            inventory_account: inventory_account.into(),
            epsilon,
        }
    }

    /// Reconciles a tenant as of a date.
    ///
    /// The inventory side comes from the snapshot stored for `as_of` when one
    /// exists and from committed layers otherwise, wound back to `as_of`.
    pub fn reconcile(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<ReconciliationReport, ReconciliationError> {
        let (inventory_value, source) = match self.snapshots.snapshots_for(tenant_id, as_of) {
            Some(rows) => (
                rows.iter().map(|r| r.active_value).sum(),
                InventoryValueSource::Snapshot,
            ),
            None => (self.live_value(tenant_id, as_of)?, InventoryValueSource::Live),
        };

        let account = self
            .chart
            .resolve_account(tenant_id, &self.inventory_account)
            .ok_or_else(|| ReconciliationError::AccountNotConfigured(self.inventory_account.clone()))?;
        let gl_value = self.ledger.account_balance(tenant_id, account, as_of)?;

        let variance = inventory_value - gl_value;
        let report = ReconciliationReport {
            tenant_id,
            as_of,
            inventory_value,
            gl_value,
            variance,
            is_balanced: variance.abs() < self.epsilon,
            source,
        };

        if let Some(signal) = report.variance_signal() {
            tracing::warn!(tenant = %tenant_id, %signal, "inventory does not reconcile with ledger");
        } else {
            tracing::info!(
                tenant = %tenant_id,
                %as_of,
                inventory_value = %inventory_value,
                ?source,
                "inventory reconciled"
            );
        }
        Ok(report)
    }

    /// Booked value of committed layers as it stood at the end of `as_of`.
    ///
    /// Layers booked after `as_of` are left out, and every movement dated
    /// after it is undone on the layers that remain.
    pub fn live_value(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<Decimal, ReconciliationError> {
        let (scopes, records) = self.store.audit_view(tenant_id)?;

        let booked: HashMap<CostLayerId, Decimal> = scopes
            .iter()
            .flat_map(ScopeLayers::layers)
            .filter(|layer| layer.booked_on <= as_of)
            .map(|layer| (layer.id, layer.remaining_cost()))
            .collect();

        let later_changes: Decimal = records
            .iter()
            .filter(|r| r.transaction_date > as_of && booked.contains_key(&r.layer_id))
            .map(|r| r.value_change())
            .sum();

        Ok(booked.values().copied().sum::<Decimal>() - later_changes)
    }

    /// Checks every layer of a tenant against its depletion records.
    ///
    /// A layer passes when `remaining + recorded depletions == original` and
    /// `0 <= remaining <= original`.
    pub fn verify_layer_integrity(
        &self,
        tenant_id: TenantId,
    ) -> Result<IntegrityReport, ReconciliationError> {
        let (scopes, records) = self.store.audit_view(tenant_id)?;

        let mut depleted: HashMap<CostLayerId, Decimal> = HashMap::new();
        for record in records
            .iter()
            .filter(|r| r.movement == LayerMovement::Depletion)
        {
            *depleted.entry(record.layer_id).or_default() += record.quantity;
        }

        let mut report = IntegrityReport::default();
        for layer in scopes.iter().flat_map(ScopeLayers::layers) {
            report.layers_checked += 1;
            let recorded = depleted.get(&layer.id).copied().unwrap_or_default();
            let in_range = layer.remaining_quantity >= Decimal::ZERO
                && layer.remaining_quantity <= layer.original_quantity;
            if !in_range || layer.remaining_quantity + recorded != layer.original_quantity {
                report.violations.push(LayerIntegrityViolation {
                    layer_id: layer.id,
                    original_quantity: layer.original_quantity,
                    remaining_quantity: layer.remaining_quantity,
                    recorded_depletions: recorded,
                });
            }
        }

        if report.is_clean() {
            tracing::debug!(tenant = %tenant_id, layers = report.layers_checked, "layer integrity verified");
        } else {
            tracing::warn!(
                tenant = %tenant_id,
                violations = report.violations.len(),
                "layer integrity violations found"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing::{CostLayerTransaction, CostingEngine, LayerReceipt, StockScope};
    use crate::posting::{
        InMemoryLedger, InventoryEventType, JournalHeader, JournalLine, JournalStatus,
        StaticChartOfAccounts,
    };
    use crate::valuation::{StandardCostTable, ValuationSnapshotter};
    use chrono::Utc;
    use costledger_shared::config::{CostingConfig, ValuationConfig};
    use costledger_shared::types::{
        AccountId, CostLayerTransactionId, CostingMethod, InventoryTransactionId, JournalEntryId,
        ProductId, UserId, WarehouseId,
    };
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, d).unwrap()
    }

    struct Fixture {
        tenant: TenantId,
        scope: StockScope,
        inventory: AccountId,
        store: Arc<CostLayerStore>,
        snapshots: Arc<SnapshotRepository>,
        ledger: Arc<InMemoryLedger>,
        engine: ReconciliationEngine<StaticChartOfAccounts, InMemoryLedger>,
    }

    fn fixture() -> Fixture {
        let tenant = TenantId::new();
        let chart = Arc::new(StaticChartOfAccounts::new());
        let inventory = chart.add_account(tenant, "Inventory");
        let store = Arc::new(CostLayerStore::new());
        let snapshots = Arc::new(SnapshotRepository::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let engine = ReconciliationEngine::new(
            Arc::clone(&store),
            Arc::clone(&snapshots),
            chart,
            Arc::clone(&ledger),
            "Inventory",
            dec!(0.01),
        );
        Fixture {
            tenant,
            scope: StockScope::new(tenant, ProductId::new(), WarehouseId::new()),
            inventory,
            store,
            snapshots,
            ledger,
            engine,
        }
    }

    fn post_inventory(f: &Fixture, amount: Decimal, on: NaiveDate) {
        f.ledger
            .persist(JournalHeader {
                id: JournalEntryId::new(),
                tenant_id: f.tenant,
                posting_date: Utc::now(),
                entry_date: on,
                source_module: "inventory".to_string(),
                source_reference: "PO-1".to_string(),
                event_type: InventoryEventType::Receipt,
                rule_id: None,
                description: String::new(),
                total_debit: amount,
                total_credit: amount,
                status: JournalStatus::Draft,
                reverses: None,
                lines: vec![
                    JournalLine::debit(f.inventory, "Inventory", amount, String::new()),
                    JournalLine::credit(AccountId::new(), "Accounts Payable", amount, String::new()),
                ],
                created_by: UserId::new(),
            })
            .unwrap();
    }

    fn receive(f: &Fixture, quantity: Decimal, unit_cost: Decimal) {
        receive_on(f, quantity, unit_cost, day(1));
    }

    fn receive_on(f: &Fixture, quantity: Decimal, unit_cost: Decimal, on: NaiveDate) {
        let mut working = f.store.checkout(f.scope).unwrap();
        CostingEngine::new(dec!(0.001), 4)
            .receive(
                &mut working,
                LayerReceipt {
                    lot_id: None,
                    receipt_date: on,
                    unit_cost,
                    currency: "USD".to_string(),
                    exchange_rate: Decimal::ONE,
                    quantity,
                    source_reference: "PO-1".to_string(),
                    created_by: UserId::new(),
                },
            )
            .unwrap();
        f.store.commit(vec![working], vec![]).unwrap();
    }

    #[test]
    fn test_balanced_when_ledger_matches_layers() {
        let f = fixture();
        receive(&f, dec!(100), dec!(10));
        post_inventory(&f, dec!(1000), day(1));

        let report = f.engine.reconcile(f.tenant, day(2)).unwrap();
        assert_eq!(report.inventory_value, dec!(1000));
        assert_eq!(report.gl_value, dec!(1000));
        assert_eq!(report.variance, Decimal::ZERO);
        assert!(report.is_balanced);
        assert_eq!(report.source, InventoryValueSource::Live);
    }

    #[test]
    fn test_variance_beyond_epsilon_is_flagged() {
        let f = fixture();
        receive(&f, dec!(100), dec!(10));
        post_inventory(&f, dec!(990), day(1));

        let report = f.engine.reconcile(f.tenant, day(2)).unwrap();
        assert_eq!(report.variance, dec!(10));
        assert!(!report.is_balanced);
        assert!(report.variance_signal().is_some());
    }

    #[test]
    fn test_variance_below_epsilon_is_balanced() {
        let f = fixture();
        receive(&f, dec!(100), dec!(10));
        post_inventory(&f, dec!(999.995), day(1));
        assert!(f.engine.reconcile(f.tenant, day(2)).unwrap().is_balanced);
    }

    #[test]
    fn test_uses_snapshot_for_the_date() {
        let f = fixture();
        receive(&f, dec!(100), dec!(10));
        post_inventory(&f, dec!(1000), day(1));
        let snapshotter = ValuationSnapshotter::new(
            Arc::clone(&f.store),
            Arc::new(StandardCostTable::new()),
            Arc::clone(&f.snapshots),
            CostingConfig::default(),
            ValuationConfig::default(),
        );
        snapshotter.snapshot(f.tenant, day(2)).unwrap();

        // Later receipt is visible live but not in the day-2 snapshot.
        receive(&f, dec!(5), dec!(10));

        let report = f.engine.reconcile(f.tenant, day(2)).unwrap();
        assert_eq!(report.source, InventoryValueSource::Snapshot);
        assert_eq!(report.variance, Decimal::ZERO);
        assert!(report.is_balanced);
    }

    #[test]
    fn test_live_value_winds_back_to_the_date() {
        let f = fixture();
        receive_on(&f, dec!(10), dec!(10), day(1));
        receive_on(&f, dec!(10), dec!(10), day(10));

        let engine = CostingEngine::new(dec!(0.001), 4);
        let mut working = f.store.checkout(f.scope).unwrap();
        let cost = engine
            .compute_issue_cost(&mut working, None, dec!(4), CostingMethod::Fifo, day(12))
            .unwrap();
        let part = &cost.layer_breakdown[0];
        let record = CostLayerTransaction {
            id: CostLayerTransactionId::new(),
            tenant_id: f.tenant,
            layer_id: part.layer_id,
            transaction_id: InventoryTransactionId::new(),
            source_reference: "SO-1".to_string(),
            movement: LayerMovement::Depletion,
            quantity: part.depleted_quantity,
            cost: part.depleted_cost,
            unit_cost: part.unit_cost,
            transaction_date: day(12),
            journal_entry_id: Some(JournalEntryId::new()),
            created_by: UserId::new(),
            created_at: Utc::now(),
        };
        f.store.commit(vec![working], vec![record]).unwrap();

        assert_eq!(f.engine.live_value(f.tenant, day(5)).unwrap(), dec!(100));
        assert_eq!(f.engine.live_value(f.tenant, day(11)).unwrap(), dec!(200));
        assert_eq!(f.engine.live_value(f.tenant, day(12)).unwrap(), dec!(160));
    }

    #[test]
    fn test_missing_inventory_account() {
        let f = fixture();
        let engine = ReconciliationEngine::new(
            Arc::clone(&f.store),
            Arc::clone(&f.snapshots),
            Arc::new(StaticChartOfAccounts::new()),
            Arc::clone(&f.ledger),
            "Inventory",
            dec!(0.01),
        );
        assert!(matches!(
            engine.reconcile(f.tenant, day(2)),
            Err(ReconciliationError::AccountNotConfigured(_))
        ));
    }

    #[test]
    fn test_integrity_detects_missing_records() {
        let f = fixture();
        receive(&f, dec!(10), dec!(10));
        let layer_id = f.store.layers(f.scope).unwrap()[0].id;

        let engine = CostingEngine::new(dec!(0.001), 4);
        let mut working = f.store.checkout(f.scope).unwrap();
        let cost = engine
            .compute_issue_cost(&mut working, None, dec!(4), CostingMethod::Fifo, day(3))
            .unwrap();
        let record = CostLayerTransaction {
            id: CostLayerTransactionId::new(),
            tenant_id: f.tenant,
            layer_id,
            transaction_id: InventoryTransactionId::new(),
            source_reference: "SO-1".to_string(),
            movement: LayerMovement::Depletion,
            quantity: cost.depleted_quantity,
            cost: cost.total_cost,
            unit_cost: cost.unit_cost,
            transaction_date: day(3),
            journal_entry_id: Some(JournalEntryId::new()),
            created_by: UserId::new(),
            created_at: Utc::now(),
        };
        f.store.commit(vec![working], vec![record]).unwrap();

        let report = f.engine.verify_layer_integrity(f.tenant).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.layers_checked, 1);

        // A depletion committed without its audit record is caught.
        let mut working = f.store.checkout(f.scope).unwrap();
        engine
            .compute_issue_cost(&mut working, None, dec!(1), CostingMethod::Fifo, day(4))
            .unwrap();
        f.store.commit(vec![working], vec![]).unwrap();

        let report = f.engine.verify_layer_integrity(f.tenant).unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].recorded_depletions, dec!(4));
        assert_eq!(report.violations[0].remaining_quantity, dec!(5));
    }
}
