//! Shared cost layer storage.
//!
//! Writers check out a working copy of a scope while holding its lock and
//! commit it back together with the layer movement records. Readers take
//! point-in-time copies and never see uncommitted work.

use std::collections::HashMap;
use std::sync::RwLock;

use costledger_shared::types::{CostLayerId, TenantId};
use rust_decimal::Decimal;

use super::error::CostingError;
use super::layers::ScopeLayers;
use super::types::{CostLayer, CostLayerTransaction, StockScope};

/// In-memory cost layer store keyed by stock scope.
#[derive(Debug, Default)]
pub struct CostLayerStore {
    scopes: RwLock<HashMap<StockScope, ScopeLayers>>,
    movements: RwLock<Vec<CostLayerTransaction>>,
}

impl CostLayerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a working copy of a scope.
    ///
    /// Callers must hold the scope lock from checkout until commit.
    pub fn checkout(&self, scope: StockScope) -> Result<ScopeLayers, CostingError> {
        let scopes = self
            .scopes
            .read()
            .map_err(|_| CostingError::StoreUnavailable)?;
        Ok(scopes
            .get(&scope)
            .cloned()
            .unwrap_or_else(|| ScopeLayers::new(scope)))
    }

    /// Atomically replaces the given scopes and appends the movement records.
    ///
    /// Fails without changing anything if any scope was committed by someone
    /// else since its checkout.
    pub fn commit(
        &self,
        worksets: Vec<ScopeLayers>,
        movements: Vec<CostLayerTransaction>,
    ) -> Result<(), CostingError> {
        let mut scopes = self
            .scopes
            .write()
            .map_err(|_| CostingError::StoreUnavailable)?;
        let mut log = self
            .movements
            .write()
            .map_err(|_| CostingError::StoreUnavailable)?;

        for working in &worksets {
            let actual = scopes.get(&working.scope()).map_or(0, ScopeLayers::version);
            if actual != working.version() {
                return Err(CostingError::StaleCheckout {
                    scope: working.scope(),
                    expected: working.version(),
                    actual,
                });
            }
        }

        for mut working in worksets {
            working.set_version(working.version() + 1);
            scopes.insert(working.scope(), working);
        }
        log.extend(movements);
        Ok(())
    }

    /// Point-in-time copy of every scope of a tenant.
    pub fn snapshot(&self, tenant_id: TenantId) -> Result<Vec<ScopeLayers>, CostingError> {
        let scopes = self
            .scopes
            .read()
            .map_err(|_| CostingError::StoreUnavailable)?;
        let mut copy: Vec<ScopeLayers> = scopes
            .values()
            .filter(|s| s.scope().tenant_id == tenant_id)
            .cloned()
            .collect();
        copy.sort_by_key(ScopeLayers::scope);
        Ok(copy)
    }

    /// Point-in-time copy of a tenant's scopes together with its movement records.
    pub fn audit_view(
        &self,
        tenant_id: TenantId,
    ) -> Result<(Vec<ScopeLayers>, Vec<CostLayerTransaction>), CostingError> {
        let scopes = self
            .scopes
            .read()
            .map_err(|_| CostingError::StoreUnavailable)?;
        let log = self
            .movements
            .read()
            .map_err(|_| CostingError::StoreUnavailable)?;

        let layers = scopes
            .values()
            .filter(|s| s.scope().tenant_id == tenant_id)
            .cloned()
            .collect();
        let records = log
            .iter()
            .filter(|d| d.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok((layers, records))
    }

    /// Committed layers of a scope in sequence order.
    pub fn layers(&self, scope: StockScope) -> Result<Vec<CostLayer>, CostingError> {
        let scopes = self
            .scopes
            .read()
            .map_err(|_| CostingError::StoreUnavailable)?;
        Ok(scopes
            .get(&scope)
            .map(|s| s.layers().to_vec())
            .unwrap_or_default())
    }

    /// Committed on-hand quantity of a scope.
    pub fn on_hand(&self, scope: StockScope) -> Result<Decimal, CostingError> {
        let scopes = self
            .scopes
            .read()
            .map_err(|_| CostingError::StoreUnavailable)?;
        Ok(scopes.get(&scope).map_or(Decimal::ZERO, ScopeLayers::on_hand))
    }

    /// Movement records of one layer, oldest first.
    pub fn movements_for_layer(
        &self,
        layer_id: CostLayerId,
    ) -> Result<Vec<CostLayerTransaction>, CostingError> {
        let log = self
            .movements
            .read()
            .map_err(|_| CostingError::StoreUnavailable)?;
        Ok(log
            .iter()
            .filter(|d| d.layer_id == layer_id)
            .cloned()
            .collect())
    }
}
