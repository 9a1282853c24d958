//! Journal construction from resolved posting rules.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use costledger_shared::types::{
    AccountId, CostLayerId, JournalEntryId, JournalLineId, TenantId, UserId,
};
use rust_decimal::Decimal;

use super::error::PostingError;
use super::journal::{JournalHeader, JournalLine, JournalStatus, validate_lines};
use super::ports::{ChartOfAccounts, LedgerStore};
use super::rule::{InventoryEventType, PostingRule};
use crate::currency::CurrencyService;

/// Part of the debit side sourced from one cost layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSplit {
    /// Amount in base currency.
    pub amount: Decimal,
    /// Line description.
    pub description: String,
    /// Source layer.
    pub layer_id: Option<CostLayerId>,
}

/// Everything about an entry that does not come from the rule.
#[derive(Debug, Clone)]
pub struct PostingMetadata {
    /// Pre-allocated entry ID.
    pub entry_id: JournalEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Caller reference.
    pub source_reference: String,
    /// Entry description.
    pub description: String,
    /// Event being posted.
    pub event_type: InventoryEventType,
    /// Actor.
    pub created_by: UserId,
    /// Optional per-layer breakdown of the debit side.
    pub splits: Vec<LineSplit>,
}

/// Builds balanced journal entries and hands them to the ledger.
pub struct JournalPoster<C, L> {
    chart: Arc<C>,
    ledger: Arc<L>,
    precision: u32,
    source_module: String,
}

impl<C, L> JournalPoster<C, L>
where
    C: ChartOfAccounts,
    L: LedgerStore,
{
    /// Creates a poster.
    pub fn new(chart: Arc<C>, ledger: Arc<L>, precision: u32, source_module: impl Into<String>) -> Self {
        Self {
            chart,
            ledger,
            precision,
            source_module: source_module.into(),
        }
    }

    /// Decimal places journal amounts are rounded to.
    #[must_use]
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Rounds an amount to ledger precision.
    #[must_use]
    pub fn round(&self, amount: Decimal) -> Decimal {
        CurrencyService::round(amount, self.precision)
    }

    /// Sum of the splits after rounding each to ledger precision.
    ///
    /// Posting this total with the same splits always balances.
    #[must_use]
    pub fn split_total(&self, splits: &[LineSplit]) -> Decimal {
        splits.iter().map(|s| self.round(s.amount)).sum()
    }

    fn account(&self, tenant_id: TenantId, name: &str) -> Result<AccountId, PostingError> {
        self.chart
            .resolve_account(tenant_id, name)
            .ok_or_else(|| PostingError::AccountNotConfigured(name.to_string()))
    }

    /// Builds the entry without storing it.
    ///
    /// Without splits the entry has exactly two lines. With splits every
    /// split becomes a debit line and the rounded amount a single credit
    /// line; the result must balance exactly.
    pub fn build(
        &self,
        rule: &PostingRule,
        amount: Decimal,
        metadata: &PostingMetadata,
    ) -> Result<JournalHeader, PostingError> {
        let amount = self.round(amount);
        if amount <= Decimal::ZERO {
            return Err(PostingError::ZeroAmount(amount));
        }

        let debit_account = self.account(metadata.tenant_id, &rule.debit_account)?;
        let credit_account = self.account(metadata.tenant_id, &rule.credit_account)?;

        let mut lines = Vec::with_capacity(metadata.splits.len().max(1) + 1);
        if metadata.splits.is_empty() {
            lines.push(JournalLine::debit(
                debit_account,
                &rule.debit_account,
                amount,
                metadata.description.clone(),
            ));
        } else {
            for split in &metadata.splits {
                let mut line = JournalLine::debit(
                    debit_account,
                    &rule.debit_account,
                    self.round(split.amount),
                    split.description.clone(),
                );
                line.layer_id = split.layer_id;
                lines.push(line);
            }
        }
        lines.push(JournalLine::credit(
            credit_account,
            &rule.credit_account,
            amount,
            metadata.description.clone(),
        ));

        let (total_debit, total_credit) = validate_lines(&lines)?;

        Ok(JournalHeader {
            id: metadata.entry_id,
            tenant_id: metadata.tenant_id,
            posting_date: Utc::now(),
            entry_date: metadata.entry_date,
            source_module: self.source_module.clone(),
            source_reference: metadata.source_reference.clone(),
            event_type: metadata.event_type,
            rule_id: Some(rule.id),
            description: metadata.description.clone(),
            total_debit,
            total_credit,
            status: JournalStatus::Draft,
            reverses: None,
            lines,
            created_by: metadata.created_by,
        })
    }

    /// Builds the entry and persists it.
    pub fn post(
        &self,
        rule: &PostingRule,
        amount: Decimal,
        metadata: &PostingMetadata,
    ) -> Result<JournalHeader, PostingError> {
        let mut entry = self.build(rule, amount, metadata)?;
        self.ledger.persist(entry.clone())?;
        entry.status = JournalStatus::Posted;

        tracing::info!(
            entry = %entry.id,
            reference = %entry.source_reference,
            event_type = %entry.event_type,
            amount = %entry.total_debit,
            lines = entry.lines.len(),
            "journal entry posted"
        );
        Ok(entry)
    }

    /// Posts an entry that offsets `original_id` line by line.
    ///
    /// Debits become credits and credits become debits. The original stays
    /// untouched; the ledger reports it as reversed.
    pub fn reverse(
        &self,
        original_id: JournalEntryId,
        reason: &str,
        entry_date: NaiveDate,
        created_by: UserId,
    ) -> Result<JournalHeader, PostingError> {
        let original = self
            .ledger
            .find(original_id)?
            .ok_or(PostingError::EntryNotFound(original_id))?;
        if original.status == JournalStatus::Reversed {
            return Err(PostingError::AlreadyReversed(original_id));
        }

        let lines: Vec<JournalLine> = original
            .lines
            .iter()
            .map(|line| JournalLine {
                id: JournalLineId::new(),
                debit: line.credit,
                credit: line.debit,
                description: format!("Reversal: {}", line.description),
                ..line.clone()
            })
            .collect();
        let (total_debit, total_credit) = validate_lines(&lines)?;

        let reversal = JournalHeader {
            id: JournalEntryId::new(),
            tenant_id: original.tenant_id,
            posting_date: Utc::now(),
            entry_date,
            source_module: original.source_module.clone(),
            source_reference: original.source_reference.clone(),
            event_type: original.event_type,
            rule_id: original.rule_id,
            description: format!("Reversal of entry {original_id}. Reason: {reason}"),
            total_debit,
            total_credit,
            status: JournalStatus::Draft,
            reverses: Some(original_id),
            lines,
            created_by,
        };

        self.ledger.persist(reversal.clone())?;
        tracing::warn!(original = %original_id, reversal = %reversal.id, reason, "journal entry reversed");
        Ok(JournalHeader {
            status: JournalStatus::Posted,
            ..reversal
        })
    }
}
