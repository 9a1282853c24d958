//! Rule-driven double-entry posting.
//!
//! This module implements:
//! - Posting rules with exact-match conditions
//! - Rule resolution by priority and recency
//! - Balanced journal construction and reversal
//! - The chart of accounts and ledger storage seams

pub mod error;
pub mod journal;
pub mod ports;
pub mod poster;
pub mod resolver;
pub mod rule;

#[cfg(test)]
mod poster_props;

pub use error::{NoMatchReason, PostingError};
pub use journal::{JournalHeader, JournalLine, JournalStatus, validate_lines};
pub use ports::{ChartOfAccounts, InMemoryLedger, LedgerStore, StaticChartOfAccounts};
pub use poster::{JournalPoster, LineSplit, PostingMetadata};
pub use resolver::PostingRuleResolver;
pub use rule::{ContextFields, FieldValue, InventoryEventType, PostingRule, Predicate, RuleConditions};
