//! Posting error types for rule resolution and journal construction.

use costledger_shared::types::{JournalEntryId, PostingRuleId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::rule::InventoryEventType;

/// Why rule resolution produced no rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatchReason {
    /// No active, valid rule satisfied the conditions.
    NoCandidates,
    /// Several rules tie on priority and creation time.
    Ambiguous,
}

impl std::fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCandidates => f.write_str("no matching rule"),
            Self::Ambiguous => f.write_str("ambiguous match"),
        }
    }
}

/// Errors that can occur while resolving rules or posting journal entries.
#[derive(Debug, Error)]
pub enum PostingError {
    // ========== Resolution Errors ==========
    /// No single applicable posting rule.
    #[error("No applicable posting rule for {event_type}: {reason}")]
    NoApplicablePostingRule {
        /// The event being posted.
        event_type: InventoryEventType,
        /// Why resolution failed.
        reason: NoMatchReason,
    },

    /// Rule configuration is invalid.
    #[error("Invalid posting rule: {0}")]
    InvalidRule(String),

    /// Rule does not exist.
    #[error("Posting rule not found: {0}")]
    RuleNotFound(PostingRuleId),

    // ========== Journal Errors ==========
    /// Chart of accounts has no account with this name.
    #[error("Account not configured: {0}")]
    AccountNotConfigured(String),

    /// Lines do not balance.
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// Total debit.
        debit: Decimal,
        /// Total credit.
        credit: Decimal,
    },

    /// Posting amount must be positive.
    #[error("Posting amount must be positive, got {0}")]
    ZeroAmount(Decimal),

    /// A line has both or neither side set, or a negative side.
    #[error("Journal line {0} must carry exactly one positive side")]
    InvalidLine(usize),

    /// Entry needs at least two lines.
    #[error("Journal entry must have at least 2 lines")]
    InsufficientLines,

    // ========== Ledger Errors ==========
    /// Entry not found in the ledger.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Entry was already reversed.
    #[error("Journal entry {0} is already reversed")]
    AlreadyReversed(JournalEntryId),

    /// Entry already stored.
    #[error("Journal entry {0} already exists")]
    DuplicateEntry(JournalEntryId),

    /// Ledger storage failed.
    #[error("Ledger storage unavailable: {0}")]
    LedgerUnavailable(String),
}

impl PostingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoApplicablePostingRule { .. } => "NO_APPLICABLE_POSTING_RULE",
            Self::InvalidRule(_) => "INVALID_POSTING_RULE",
            Self::RuleNotFound(_) => "POSTING_RULE_NOT_FOUND",
            Self::AccountNotConfigured(_) => "ACCOUNT_NOT_CONFIGURED",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::ZeroAmount(_) => "ZERO_AMOUNT",
            Self::InvalidLine(_) => "INVALID_JOURNAL_LINE",
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::EntryNotFound(_) => "JOURNAL_ENTRY_NOT_FOUND",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::DuplicateEntry(_) => "DUPLICATE_JOURNAL_ENTRY",
            Self::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Only storage failures are transient; configuration and balance
    /// errors need an operator.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerUnavailable(_))
    }
}
