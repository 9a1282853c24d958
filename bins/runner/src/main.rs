//! Costledger scenario runner.
//!
//! Pushes a JSON scenario of inventory transactions through the coordinator,
//! then snapshots, reconciles and audits the resulting books and prints a
//! JSON summary.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, TimeDelta, Utc};
use clap::Parser;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use costledger_core::context::StaticContext;
use costledger_core::coordinator::{
    InventoryTransactionCoordinator, TransactionRequest, TransactionState, TransactionType,
};
use costledger_core::costing::CostLayerStore;
use costledger_core::posting::{
    InMemoryLedger, InventoryEventType, JournalPoster, PostingRule, PostingRuleResolver,
    RuleConditions, StaticChartOfAccounts,
};
use costledger_core::reconciliation::{
    IntegrityReport, ReconciliationEngine, ReconciliationReport,
};
use costledger_core::valuation::{
    SnapshotRepository, StandardCostTable, ValuationSnapshot, ValuationSnapshotter,
};
use costledger_shared::AppConfig;
use costledger_shared::types::{JournalEntryId, PostingRuleId, ProductId, TenantId, UserId};

#[derive(Parser, Debug)]
#[command(name = "costledger", version, about = "Run an inventory costing scenario")]
struct Args {
    /// Path to the scenario JSON file
    #[arg(long)]
    scenario: PathBuf,

    /// Snapshot and reconciliation date (defaults to the last transaction date)
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    tenant_id: TenantId,
    actor_id: UserId,
    accounts: Vec<String>,
    rules: Vec<RuleSpec>,
    #[serde(default)]
    standard_costs: HashMap<ProductId, Decimal>,
    transactions: Vec<TransactionRequest>,
}

#[derive(Debug, Deserialize)]
struct RuleSpec {
    name: String,
    event_type: InventoryEventType,
    #[serde(default)]
    conditions: RuleConditions,
    debit_account: String,
    credit_account: String,
    priority: i16,
    valid_from: NaiveDate,
    #[serde(default)]
    valid_to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct Posted {
    reference: String,
    transaction_type: TransactionType,
    amount: Decimal,
    entry: Option<JournalEntryId>,
    replayed: bool,
}

#[derive(Debug, Serialize)]
struct Failed {
    reference: String,
    failed_at: TransactionState,
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct Summary {
    as_of: NaiveDate,
    posted: Vec<Posted>,
    failed: Vec<Failed>,
    snapshot: Vec<ValuationSnapshot>,
    reconciliation: ReconciliationReport,
    integrity: IntegrityReport,
}

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "costledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    let raw = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("failed to read scenario {}", args.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw).context("invalid scenario file")?;
    info!(
        transactions = scenario.transactions.len(),
        rules = scenario.rules.len(),
        "scenario loaded"
    );

    let summary = run(&config, scenario, args.as_of)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run(config: &AppConfig, scenario: Scenario, as_of: Option<NaiveDate>) -> anyhow::Result<Summary> {
    let ctx = StaticContext::new(scenario.tenant_id, scenario.actor_id);

    let chart = Arc::new(StaticChartOfAccounts::new());
    for name in &scenario.accounts {
        chart.add_account(ctx.tenant_id, name);
    }

    let loaded_at = Utc::now();
    let mut rules = Vec::with_capacity(scenario.rules.len());
    for (index, spec) in scenario.rules.into_iter().enumerate() {
        // later rules in the file count as more recent
        let offset = TimeDelta::milliseconds(i64::try_from(index)?);
        rules.push(PostingRule {
            id: PostingRuleId::new(),
            tenant_id: ctx.tenant_id,
            name: spec.name,
            event_type: spec.event_type,
            conditions: spec.conditions,
            debit_account: spec.debit_account,
            credit_account: spec.credit_account,
            priority: spec.priority,
            valid_from: spec.valid_from,
            valid_to: spec.valid_to,
            is_active: true,
            version: 1,
            created_at: loaded_at + offset,
        });
    }
    let resolver = Arc::new(PostingRuleResolver::new(rules).context("invalid posting rules")?);

    let store = Arc::new(CostLayerStore::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let poster = JournalPoster::new(
        Arc::clone(&chart),
        Arc::clone(&ledger),
        config.posting.ledger_precision,
        config.posting.source_module.clone(),
    );
    let coordinator = InventoryTransactionCoordinator::new(
        Arc::clone(&store),
        resolver,
        poster,
        config.costing.clone(),
        config.coordinator.clone(),
    );

    let as_of = as_of
        .or_else(|| scenario.transactions.iter().map(|t| t.transaction_date).max())
        .unwrap_or_else(|| Utc::now().date_naive());

    let mut posted = Vec::new();
    let mut failed = Vec::new();
    for request in scenario.transactions {
        match coordinator.process(&ctx, request) {
            Ok(outcome) => posted.push(Posted {
                reference: outcome.reference,
                transaction_type: outcome.transaction_type,
                amount: outcome.amount,
                entry: outcome.journal_entry.map(|e| e.id),
                replayed: outcome.replayed,
            }),
            Err(failure) => failed.push(Failed {
                code: failure.error.error_code(),
                message: failure.error.to_string(),
                reference: failure.reference,
                failed_at: failure.failed_at,
            }),
        }
    }
    info!(posted = posted.len(), failed = failed.len(), "transactions processed");

    let standard = Arc::new(StandardCostTable::new());
    for (product_id, unit_cost) in scenario.standard_costs {
        standard.set(ctx.tenant_id, product_id, unit_cost);
    }
    let repository = Arc::new(SnapshotRepository::new());
    let snapshotter = ValuationSnapshotter::new(
        Arc::clone(&store),
        standard,
        Arc::clone(&repository),
        config.costing.clone(),
        config.valuation.clone(),
    );
    let snapshot = snapshotter.snapshot(ctx.tenant_id, as_of)?;

    let reconciler = ReconciliationEngine::new(
        store,
        repository,
        chart,
        ledger,
        config.posting.inventory_account_name.clone(),
        config.reconciliation.epsilon,
    );
    let reconciliation = reconciler.reconcile(ctx.tenant_id, as_of)?;
    let integrity = reconciler.verify_layer_integrity(ctx.tenant_id)?;

    Ok(Summary {
        as_of,
        posted,
        failed,
        snapshot,
        reconciliation,
        integrity,
    })
}
