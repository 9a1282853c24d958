//! Property-based tests for JournalPoster.
//!
//! - Every built entry balances exactly with one-sided lines
//! - A reversal nets every account back to zero

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use costledger_shared::types::{CostLayerId, JournalEntryId, PostingRuleId, TenantId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::poster::{JournalPoster, LineSplit, PostingMetadata};
use super::ports::{ChartOfAccounts, InMemoryLedger, LedgerStore, StaticChartOfAccounts};
use super::rule::{InventoryEventType, PostingRule, RuleConditions};

/// Strategy for split amounts with more precision than the ledger keeps.
fn raw_amount() -> impl Strategy<Value = Decimal> {
    (1_000i64..100_000_000_000i64).prop_map(|v| Decimal::new(v, 7))
}

fn setup() -> (
    TenantId,
    Arc<StaticChartOfAccounts>,
    Arc<InMemoryLedger>,
    JournalPoster<StaticChartOfAccounts, InMemoryLedger>,
    PostingRule,
) {
    let tenant = TenantId::new();
    let chart = Arc::new(StaticChartOfAccounts::new());
    chart.add_account(tenant, "Inventory");
    chart.add_account(tenant, "Inventory Write-off");
    let ledger = Arc::new(InMemoryLedger::new());
    let poster = JournalPoster::new(Arc::clone(&chart), Arc::clone(&ledger), 4, "inventory");
    let rule = PostingRule {
        id: PostingRuleId::new(),
        tenant_id: tenant,
        name: "Write-off".to_string(),
        event_type: InventoryEventType::Writeoff,
        conditions: RuleConditions::any(),
        debit_account: "Inventory Write-off".to_string(),
        credit_account: "Inventory".to_string(),
        priority: 1,
        valid_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        valid_to: None,
        is_active: true,
        version: 1,
        created_at: Utc::now(),
    };
    (tenant, chart, ledger, poster, rule)
}

fn metadata(tenant_id: TenantId, splits: Vec<LineSplit>) -> PostingMetadata {
    PostingMetadata {
        entry_id: JournalEntryId::new(),
        tenant_id,
        entry_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        source_reference: "WO-1".to_string(),
        description: "Write-off".to_string(),
        event_type: InventoryEventType::Writeoff,
        created_by: UserId::new(),
        splits,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Split entries posted at their rounded total always balance.
    #[test]
    fn prop_split_entries_balance(amounts in prop::collection::vec(raw_amount(), 1..10)) {
        let (tenant, _, _, poster, rule) = setup();
        let splits: Vec<LineSplit> = amounts
            .into_iter()
            .map(|amount| LineSplit {
                amount,
                description: String::new(),
                layer_id: Some(CostLayerId::new()),
            })
            .collect();
        let total = poster.split_total(&splits);
        prop_assume!(total > Decimal::ZERO);

        let entry = poster.build(&rule, total, &metadata(tenant, splits)).unwrap();

        let debit: Decimal = entry.lines.iter().map(|l| l.debit).sum();
        let credit: Decimal = entry.lines.iter().map(|l| l.credit).sum();
        prop_assert_eq!(debit, credit);
        prop_assert_eq!(entry.total_debit, entry.total_credit);
        prop_assert!(entry.lines.iter().all(|l| l.is_one_sided()));
    }

    /// Posting then reversing leaves every account at zero.
    #[test]
    fn prop_reversal_nets_to_zero(amount in raw_amount()) {
        let (tenant, chart, ledger, poster, rule) = setup();
        let meta = metadata(tenant, vec![]);
        let entry = poster.post(&rule, amount, &meta).unwrap();
        poster.reverse(entry.id, "test", meta.entry_date, UserId::new()).unwrap();

        for name in ["Inventory", "Inventory Write-off"] {
            let account = chart.resolve_account(tenant, name).unwrap();
            prop_assert_eq!(
                ledger.account_balance(tenant, account, meta.entry_date).unwrap(),
                Decimal::ZERO
            );
        }
    }
}
