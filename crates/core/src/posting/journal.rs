//! Journal entries produced for the general ledger.

use chrono::{DateTime, NaiveDate, Utc};
use costledger_shared::types::{
    AccountId, CostLayerId, JournalEntryId, JournalLineId, PostingRuleId, TenantId, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::PostingError;
use super::rule::InventoryEventType;

/// Journal entry lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    /// Built but not stored.
    #[default]
    Draft,
    /// Stored in the ledger.
    Posted,
    /// Offset by a later reversing entry.
    Reversed,
}

/// A single debit or credit line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Line ID.
    pub id: JournalLineId,
    /// Resolved account.
    pub account_id: AccountId,
    /// Account name the rule referred to.
    pub account_name: String,
    /// Debit amount (zero on credit lines).
    pub debit: Decimal,
    /// Credit amount (zero on debit lines).
    pub credit: Decimal,
    /// Line description.
    pub description: String,
    /// Cost layer the amount came from, for split lines.
    pub layer_id: Option<CostLayerId>,
}

impl JournalLine {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, account_name: &str, amount: Decimal, description: String) -> Self {
        Self {
            id: JournalLineId::new(),
            account_id,
            account_name: account_name.to_string(),
            debit: amount,
            credit: Decimal::ZERO,
            description,
            layer_id: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, account_name: &str, amount: Decimal, description: String) -> Self {
        Self {
            id: JournalLineId::new(),
            account_id,
            account_name: account_name.to_string(),
            debit: Decimal::ZERO,
            credit: amount,
            description,
            layer_id: None,
        }
    }

    /// Debit minus credit.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.debit - self.credit
    }

    /// True if exactly one side is positive and the other zero.
    #[must_use]
    pub fn is_one_sided(&self) -> bool {
        match (self.debit.is_zero(), self.credit.is_zero()) {
            (false, true) => self.debit > Decimal::ZERO,
            (true, false) => self.credit > Decimal::ZERO,
            _ => false,
        }
    }
}

/// Ledger-facing journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalHeader {
    /// Entry ID.
    pub id: JournalEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Posting date.
    pub posting_date: DateTime<Utc>,
    /// Accounting date the balance applies to.
    pub entry_date: NaiveDate,
    /// Producing module.
    pub source_module: String,
    /// Caller reference of the originating transaction.
    pub source_reference: String,
    /// Event that produced the entry.
    pub event_type: InventoryEventType,
    /// Rule used, if any.
    pub rule_id: Option<PostingRuleId>,
    /// Entry description.
    pub description: String,
    /// Sum of debits.
    pub total_debit: Decimal,
    /// Sum of credits.
    pub total_credit: Decimal,
    /// Lifecycle status.
    pub status: JournalStatus,
    /// Original entry this one reverses.
    pub reverses: Option<JournalEntryId>,
    /// Lines.
    pub lines: Vec<JournalLine>,
    /// Actor.
    pub created_by: UserId,
}

impl JournalHeader {
    /// True if the stored totals agree.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }

    /// Net effect on one account.
    #[must_use]
    pub fn net_for(&self, account_id: AccountId) -> Decimal {
        self.lines
            .iter()
            .filter(|l| l.account_id == account_id)
            .map(JournalLine::net)
            .sum()
    }
}

/// Checks the double-entry invariants and returns `(total_debit, total_credit)`.
///
/// Every line must carry exactly one positive side, there must be at least
/// two lines, and the totals must be equal with zero tolerance.
pub fn validate_lines(lines: &[JournalLine]) -> Result<(Decimal, Decimal), PostingError> {
    if lines.len() < 2 {
        return Err(PostingError::InsufficientLines);
    }

    if let Some(index) = lines.iter().position(|l| !l.is_one_sided()) {
        return Err(PostingError::InvalidLine(index));
    }

    let debit: Decimal = lines.iter().map(|l| l.debit).sum();
    let credit: Decimal = lines.iter().map(|l| l.credit).sum();
    if debit != credit {
        return Err(PostingError::UnbalancedEntry { debit, credit });
    }

    Ok((debit, credit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn debit(amount: Decimal) -> JournalLine {
        JournalLine::debit(AccountId::new(), "COGS", amount, String::new())
    }

    fn credit(amount: Decimal) -> JournalLine {
        JournalLine::credit(AccountId::new(), "Inventory", amount, String::new())
    }

    #[test]
    fn test_balanced_lines_pass() {
        let lines = vec![debit(dec!(1000)), debit(dec!(240)), credit(dec!(1240))];
        assert_eq!(validate_lines(&lines).unwrap(), (dec!(1240), dec!(1240)));
    }

    #[test]
    fn test_unbalanced_lines_fail() {
        let lines = vec![debit(dec!(100)), credit(dec!(99.9999))];
        assert!(matches!(
            validate_lines(&lines),
            Err(PostingError::UnbalancedEntry { .. })
        ));
    }

    #[rstest]
    #[case(Decimal::ZERO, Decimal::ZERO)]
    #[case(dec!(5), dec!(5))]
    #[case(dec!(-5), Decimal::ZERO)]
    fn test_line_must_be_one_sided(#[case] debit_amount: Decimal, #[case] credit_amount: Decimal) {
        let mut bad = debit(dec!(1));
        bad.debit = debit_amount;
        bad.credit = credit_amount;
        let lines = vec![credit(dec!(1)), bad];
        assert!(matches!(validate_lines(&lines), Err(PostingError::InvalidLine(1))));
    }

    #[test]
    fn test_single_line_is_rejected() {
        assert!(matches!(
            validate_lines(&[debit(dec!(1))]),
            Err(PostingError::InsufficientLines)
        ));
    }

    #[test]
    fn test_net_for_account() {
        let account = AccountId::new();
        let header = JournalHeader {
            id: JournalEntryId::new(),
            tenant_id: TenantId::new(),
            posting_date: Utc::now(),
            entry_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            source_module: "inventory".to_string(),
            source_reference: "SO-1".to_string(),
            event_type: InventoryEventType::Issue,
            rule_id: None,
            description: String::new(),
            total_debit: dec!(10),
            total_credit: dec!(10),
            status: JournalStatus::Posted,
            reverses: None,
            lines: vec![
                debit(dec!(10)),
                JournalLine::credit(account, "Inventory", dec!(10), String::new()),
            ],
            created_by: UserId::new(),
        };
        assert!(header.is_balanced());
        assert_eq!(header.net_for(account), dec!(-10));
    }
}
