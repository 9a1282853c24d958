//! Caller-reference deduplication.

use costledger_shared::types::TenantId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::types::TransactionOutcome;

#[derive(Debug, Clone)]
enum Slot {
    InFlight,
    Completed(Box<TransactionOutcome>),
}

/// Result of claiming a reference.
#[derive(Debug)]
pub enum Claim {
    /// First time seen; the caller owns processing.
    Fresh,
    /// Already posted; the stored outcome.
    Completed(Box<TransactionOutcome>),
    /// Another worker is processing the same reference.
    InFlight,
}

/// Outcomes keyed by `(tenant, reference)`.
///
/// Failed transactions release their claim so the caller can retry.
#[derive(Debug, Default)]
pub struct IdempotencyRegistry {
    slots: DashMap<(TenantId, String), Slot>,
}

impl IdempotencyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims a reference.
    pub fn claim(&self, tenant_id: TenantId, reference: &str) -> Claim {
        match self.slots.entry((tenant_id, reference.to_string())) {
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::InFlight);
                Claim::Fresh
            }
            Entry::Occupied(occupied) => match occupied.get() {
                Slot::InFlight => Claim::InFlight,
                Slot::Completed(outcome) => Claim::Completed(outcome.clone()),
            },
        }
    }

    /// Stores the outcome of a posted transaction.
    pub fn complete(&self, tenant_id: TenantId, reference: &str, outcome: TransactionOutcome) {
        self.slots.insert(
            (tenant_id, reference.to_string()),
            Slot::Completed(Box::new(outcome)),
        );
    }

    /// Drops an in-flight claim after a failure.
    pub fn release(&self, tenant_id: TenantId, reference: &str) {
        self.slots
            .remove_if(&(tenant_id, reference.to_string()), |_, slot| {
                matches!(slot, Slot::InFlight)
            });
    }

    /// Stored outcome of a reference, if posted.
    #[must_use]
    pub fn outcome(&self, tenant_id: TenantId, reference: &str) -> Option<TransactionOutcome> {
        self.slots
            .get(&(tenant_id, reference.to_string()))
            .and_then(|slot| match slot.value() {
                Slot::Completed(outcome) => Some((**outcome).clone()),
                Slot::InFlight => None,
            })
    }
}
