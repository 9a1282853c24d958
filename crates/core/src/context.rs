//! Tenant and actor context supplied by the caller.

use costledger_shared::types::{TenantId, UserId};

/// Supplies the current tenant and actor for stamping created records.
pub trait AuditContext: Send + Sync {
    /// Current tenant.
    fn tenant_id(&self) -> TenantId;
    /// Current actor.
    fn actor_id(&self) -> UserId;
}

/// Fixed tenant and actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticContext {
    /// Tenant.
    pub tenant_id: TenantId,
    /// Actor.
    pub actor_id: UserId,
}

impl StaticContext {
    /// Creates a context.
    #[must_use]
    pub const fn new(tenant_id: TenantId, actor_id: UserId) -> Self {
        Self {
            tenant_id,
            actor_id,
        }
    }
}

impl AuditContext for StaticContext {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn actor_id(&self) -> UserId {
        self.actor_id
    }
}
