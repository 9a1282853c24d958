//! Standard cost lookup.

use costledger_shared::types::{ProductId, TenantId};
use dashmap::DashMap;
use rust_decimal::Decimal;

/// Supplies the standard unit cost of a product.
pub trait StandardCostSource: Send + Sync {
    /// Standard base-currency unit cost, or `None` if the product has none.
    fn standard_cost(&self, tenant_id: TenantId, product_id: ProductId) -> Option<Decimal>;
}

/// Standard costs held in memory.
#[derive(Debug, Default)]
pub struct StandardCostTable {
    costs: DashMap<(TenantId, ProductId), Decimal>,
}

impl StandardCostTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the standard cost of a product.
    pub fn set(&self, tenant_id: TenantId, product_id: ProductId, unit_cost: Decimal) {
        self.costs.insert((tenant_id, product_id), unit_cost);
    }
}

impl StandardCostSource for StandardCostTable {
    fn standard_cost(&self, tenant_id: TenantId, product_id: ProductId) -> Option<Decimal> {
        self.costs.get(&(tenant_id, product_id)).map(|c| *c.value())
    }
}
