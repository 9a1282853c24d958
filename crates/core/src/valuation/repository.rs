//! Snapshot history keyed by tenant and date.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::NaiveDate;
use costledger_shared::types::TenantId;

use super::types::ValuationSnapshot;

/// In-memory snapshot history.
///
/// Storing a date replaces that date's rows; other dates are untouched.
#[derive(Debug, Default)]
pub struct SnapshotRepository {
    by_date: RwLock<BTreeMap<(TenantId, NaiveDate), Vec<ValuationSnapshot>>>,
}

impl SnapshotRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the rows of one date.
    pub fn replace(&self, tenant_id: TenantId, as_of: NaiveDate, rows: Vec<ValuationSnapshot>) {
        self.by_date
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((tenant_id, as_of), rows);
    }

    /// Rows of exactly one date.
    #[must_use]
    pub fn snapshots_for(&self, tenant_id: TenantId, as_of: NaiveDate) -> Option<Vec<ValuationSnapshot>> {
        self.by_date
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(tenant_id, as_of))
            .cloned()
    }

    /// Most recent snapshot on or before `as_of`.
    #[must_use]
    pub fn latest_before(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Option<(NaiveDate, Vec<ValuationSnapshot>)> {
        self.by_date
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .range((tenant_id, NaiveDate::MIN)..=(tenant_id, as_of))
            .next_back()
            .map(|((_, date), rows)| (*date, rows.clone()))
    }

    /// Dates with a snapshot, oldest first.
    #[must_use]
    pub fn dates(&self, tenant_id: TenantId) -> Vec<NaiveDate> {
        self.by_date
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|(tenant, _)| *tenant == tenant_id)
            .map(|(_, date)| *date)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_replace_and_history() {
        let repo = SnapshotRepository::new();
        let tenant = TenantId::new();
        repo.replace(tenant, day(1), vec![]);
        repo.replace(tenant, day(3), vec![]);
        repo.replace(TenantId::new(), day(2), vec![]);

        assert_eq!(repo.dates(tenant), vec![day(1), day(3)]);
        assert_eq!(repo.latest_before(tenant, day(2)).map(|(d, _)| d), Some(day(1)));
        assert_eq!(repo.latest_before(tenant, day(3)).map(|(d, _)| d), Some(day(3)));
        assert!(repo.snapshots_for(tenant, day(2)).is_none());
        assert!(repo.latest_before(TenantId::new(), day(5)).is_none());
    }
}
