//! Shared fixtures for coordinator integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use costledger_core::context::StaticContext;
use costledger_core::coordinator::{
    InventoryTransactionCoordinator, TransactionOutcome, TransactionRequest, TransactionType,
};
use costledger_core::costing::{CostLayerStore, StockScope};
use costledger_core::posting::{
    InMemoryLedger, InventoryEventType, JournalPoster, LedgerStore, PostingRule,
    PostingRuleResolver, RuleConditions, StaticChartOfAccounts,
};
use costledger_shared::config::{AppConfig, CoordinatorConfig};
use costledger_shared::types::{AccountId, PostingRuleId, ProductId, TenantId, UserId, WarehouseId};
use rust_decimal::Decimal;

pub const ACCOUNTS: &[&str] = &[
    "Inventory",
    "Accounts Payable",
    "Cost of Goods Sold",
    "Damaged Goods Expense",
    "Inventory Shrinkage",
    "Inventory Adjustment Gain",
    "Inventory Adjustment Loss",
    "Revaluation Gain",
    "Revaluation Loss",
];

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

pub fn rule(
    tenant_id: TenantId,
    name: &str,
    event_type: InventoryEventType,
    conditions: RuleConditions,
    debit: &str,
    credit: &str,
    priority: i16,
) -> PostingRule {
    PostingRule {
        id: PostingRuleId::new(),
        tenant_id,
        name: name.to_string(),
        event_type,
        conditions,
        debit_account: debit.to_string(),
        credit_account: credit.to_string(),
        priority,
        valid_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        valid_to: None,
        is_active: true,
        version: 1,
        created_at: Utc::now(),
    }
}

pub fn default_rules(tenant_id: TenantId) -> Vec<PostingRule> {
    use InventoryEventType as E;
    vec![
        rule(tenant_id, "Receipt", E::Receipt, RuleConditions::any(), "Inventory", "Accounts Payable", 10),
        rule(tenant_id, "Issue", E::Issue, RuleConditions::any(), "Cost of Goods Sold", "Inventory", 10),
        rule(
            tenant_id,
            "Damaged write-off",
            E::Writeoff,
            RuleConditions::any().with("reason", "damaged"),
            "Damaged Goods Expense",
            "Inventory",
            1,
        ),
        rule(tenant_id, "Write-off", E::Writeoff, RuleConditions::any(), "Inventory Shrinkage", "Inventory", 4),
        rule(
            tenant_id,
            "Count gain",
            E::Adjustment,
            RuleConditions::any().with("adjustment_type", "positive"),
            "Inventory",
            "Inventory Adjustment Gain",
            10,
        ),
        rule(
            tenant_id,
            "Count loss",
            E::Adjustment,
            RuleConditions::any().with("adjustment_type", "negative"),
            "Inventory Adjustment Loss",
            "Inventory",
            10,
        ),
        rule(
            tenant_id,
            "Revaluation gain",
            E::Revaluation,
            RuleConditions::any().with("direction", "gain"),
            "Inventory",
            "Revaluation Gain",
            10,
        ),
        rule(
            tenant_id,
            "Revaluation loss",
            E::Revaluation,
            RuleConditions::any().with("direction", "loss"),
            "Revaluation Loss",
            "Inventory",
            10,
        ),
        rule(tenant_id, "Transfer", E::Transfer, RuleConditions::any(), "Inventory", "Inventory", 10),
    ]
}

pub struct Harness<L = InMemoryLedger> {
    pub ctx: StaticContext,
    pub product: ProductId,
    pub warehouse: WarehouseId,
    pub config: AppConfig,
    pub store: Arc<CostLayerStore>,
    pub chart: Arc<StaticChartOfAccounts>,
    pub ledger: Arc<L>,
    pub resolver: Arc<PostingRuleResolver>,
    pub coordinator: InventoryTransactionCoordinator<StaticChartOfAccounts, L>,
}

impl Harness<InMemoryLedger> {
    pub fn new() -> Self {
        Self::with_ledger(Arc::new(InMemoryLedger::new()), CoordinatorConfig::default())
    }
}

impl<L: LedgerStore> Harness<L> {
    pub fn with_ledger(ledger: Arc<L>, limits: CoordinatorConfig) -> Self {
        let ctx = StaticContext::new(TenantId::new(), UserId::new());
        let mut config = AppConfig::default();
        config.coordinator = limits;

        let chart = Arc::new(StaticChartOfAccounts::new());
        for name in ACCOUNTS {
            chart.add_account(ctx.tenant_id, name);
        }
        let store = Arc::new(CostLayerStore::new());
        let resolver = Arc::new(PostingRuleResolver::new(default_rules(ctx.tenant_id)).unwrap());
        let poster = JournalPoster::new(
            Arc::clone(&chart),
            Arc::clone(&ledger),
            config.posting.ledger_precision,
            config.posting.source_module.clone(),
        );
        let coordinator = InventoryTransactionCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&resolver),
            poster,
            config.costing.clone(),
            config.coordinator.clone(),
        );

        Self {
            ctx,
            product: ProductId::new(),
            warehouse: WarehouseId::new(),
            config,
            store,
            chart,
            ledger,
            resolver,
            coordinator,
        }
    }

    pub fn scope(&self) -> StockScope {
        StockScope::new(self.ctx.tenant_id, self.product, self.warehouse)
    }

    pub fn account(&self, name: &str) -> AccountId {
        self.chart.add_account(self.ctx.tenant_id, name)
    }

    pub fn request(
        &self,
        transaction_type: TransactionType,
        reference: &str,
        quantity: Decimal,
        on: NaiveDate,
    ) -> TransactionRequest {
        TransactionRequest::new(
            transaction_type,
            reference,
            self.product,
            self.warehouse,
            quantity,
            on,
        )
    }

    pub fn receive(
        &self,
        reference: &str,
        quantity: Decimal,
        unit_cost: Decimal,
        on: NaiveDate,
    ) -> TransactionOutcome {
        let mut request = self.request(TransactionType::Receive, reference, quantity, on);
        request.unit_cost = Some(unit_cost);
        self.coordinator.process(&self.ctx, request).unwrap()
    }

    pub fn on_hand(&self) -> Decimal {
        self.store.on_hand(self.scope()).unwrap()
    }

    pub fn inventory_balance(&self, as_of: NaiveDate) -> Decimal {
        self.ledger
            .account_balance(self.ctx.tenant_id, self.account("Inventory"), as_of)
            .unwrap()
    }
}
