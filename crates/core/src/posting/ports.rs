//! Collaborators the posting layer depends on.
//!
//! The chart of accounts and ledger storage live outside this crate. The
//! in-memory implementations back the tests and the batch runner.

use std::sync::{PoisonError, RwLock};

use chrono::NaiveDate;
use costledger_shared::types::{AccountId, JournalEntryId, TenantId};
use dashmap::DashMap;
use rust_decimal::Decimal;

use super::error::PostingError;
use super::journal::{JournalHeader, JournalStatus, validate_lines};

/// Resolves account names to identifiers.
pub trait ChartOfAccounts: Send + Sync {
    /// Returns the account for `name`, or `None` if it is not configured.
    fn resolve_account(&self, tenant_id: TenantId, name: &str) -> Option<AccountId>;
}

/// Durable journal storage.
pub trait LedgerStore: Send + Sync {
    /// Appends a balanced entry.
    fn persist(&self, entry: JournalHeader) -> Result<(), PostingError>;

    /// Looks up an entry with its current status.
    fn find(&self, id: JournalEntryId) -> Result<Option<JournalHeader>, PostingError>;

    /// Net debit balance of an account over entries dated on or before `as_of`.
    fn account_balance(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        as_of: NaiveDate,
    ) -> Result<Decimal, PostingError>;
}

/// Chart of accounts held in memory.
#[derive(Debug, Default)]
pub struct StaticChartOfAccounts {
    accounts: DashMap<(TenantId, String), AccountId>,
}

impl StaticChartOfAccounts {
    /// Creates an empty chart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account and returns its ID. Re-registering a name keeps the first ID.
    pub fn add_account(&self, tenant_id: TenantId, name: &str) -> AccountId {
        *self
            .accounts
            .entry((tenant_id, name.to_string()))
            .or_insert_with(AccountId::new)
    }

    /// Registers an account under a known ID.
    pub fn insert(&self, tenant_id: TenantId, name: &str, account_id: AccountId) {
        self.accounts.insert((tenant_id, name.to_string()), account_id);
    }
}

impl ChartOfAccounts for StaticChartOfAccounts {
    fn resolve_account(&self, tenant_id: TenantId, name: &str) -> Option<AccountId> {
        self.accounts
            .get(&(tenant_id, name.to_string()))
            .map(|entry| *entry.value())
    }
}

/// Append-only ledger held in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: RwLock<Vec<JournalHeader>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries of a tenant in insertion order, with current status.
    #[must_use]
    pub fn entries(&self, tenant_id: TenantId) -> Vec<JournalHeader> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .map(|e| Self::with_status(&entries, e))
            .collect()
    }

    /// Entries produced for a caller reference.
    #[must_use]
    pub fn entries_for_reference(&self, tenant_id: TenantId, reference: &str) -> Vec<JournalHeader> {
        self.entries(tenant_id)
            .into_iter()
            .filter(|e| e.source_reference == reference)
            .collect()
    }

    fn with_status(all: &[JournalHeader], entry: &JournalHeader) -> JournalHeader {
        let mut entry = entry.clone();
        if all.iter().any(|e| e.reverses == Some(entry.id)) {
            entry.status = JournalStatus::Reversed;
        }
        entry
    }
}

impl LedgerStore for InMemoryLedger {
    fn persist(&self, mut entry: JournalHeader) -> Result<(), PostingError> {
        let (debit, credit) = validate_lines(&entry.lines)?;
        if debit != entry.total_debit || credit != entry.total_credit {
            return Err(PostingError::UnbalancedEntry {
                debit: entry.total_debit,
                credit: entry.total_credit,
            });
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(PostingError::DuplicateEntry(entry.id));
        }
        if let Some(original) = entry.reverses {
            if !entries.iter().any(|e| e.id == original) {
                return Err(PostingError::EntryNotFound(original));
            }
            if entries.iter().any(|e| e.reverses == Some(original)) {
                return Err(PostingError::AlreadyReversed(original));
            }
        }

        entry.status = JournalStatus::Posted;
        entries.push(entry);
        Ok(())
    }

    fn find(&self, id: JournalEntryId) -> Result<Option<JournalHeader>, PostingError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| Self::with_status(&entries, e)))
    }

    fn account_balance(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        as_of: NaiveDate,
    ) -> Result<Decimal, PostingError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.entry_date <= as_of)
            .map(|e| e.net_for(account_id))
            .sum())
    }
}
