//! Application configuration management.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{CostingMethod, ProductId};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Costing configuration.
    #[serde(default)]
    pub costing: CostingConfig,
    /// Journal posting configuration.
    #[serde(default)]
    pub posting: PostingConfig,
    /// Transaction coordinator configuration.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Valuation snapshot configuration.
    #[serde(default)]
    pub valuation: ValuationConfig,
    /// Reconciliation configuration.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

/// Costing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CostingConfig {
    /// Method used when neither the request nor a product override names one.
    #[serde(default)]
    pub default_method: CostingMethod,
    /// Remainders below this quantity are treated as fully depleted.
    #[serde(default = "default_dust_epsilon")]
    pub dust_epsilon: Decimal,
    /// Functional (base) currency code.
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    /// Per-product costing method overrides.
    #[serde(default)]
    pub product_methods: HashMap<ProductId, CostingMethod>,
}

impl CostingConfig {
    /// Resolves the active costing method for a product.
    ///
    /// A request override wins, then the product override, then the default.
    #[must_use]
    pub fn method_for(&self, product_id: ProductId, requested: Option<CostingMethod>) -> CostingMethod {
        requested
            .or_else(|| self.product_methods.get(&product_id).copied())
            .unwrap_or(self.default_method)
    }
}

impl Default for CostingConfig {
    fn default() -> Self {
        Self {
            default_method: CostingMethod::default(),
            dust_epsilon: default_dust_epsilon(),
            base_currency: default_base_currency(),
            product_methods: HashMap::new(),
        }
    }
}

fn default_dust_epsilon() -> Decimal {
    Decimal::new(1, 3) // 0.001 units
}

fn default_base_currency() -> String {
    "USD".to_string()
}

/// Journal posting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PostingConfig {
    /// Decimal places journal line amounts are rounded to.
    #[serde(default = "default_ledger_precision")]
    pub ledger_precision: u32,
    /// Chart of accounts name of the designated inventory account.
    #[serde(default = "default_inventory_account_name")]
    pub inventory_account_name: String,
    /// Source module stamped on every journal header.
    #[serde(default = "default_source_module")]
    pub source_module: String,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            ledger_precision: default_ledger_precision(),
            inventory_account_name: default_inventory_account_name(),
            source_module: default_source_module(),
        }
    }
}

fn default_ledger_precision() -> u32 {
    4
}

fn default_inventory_account_name() -> String {
    "Inventory".to_string()
}

fn default_source_module() -> String {
    "inventory".to_string()
}

/// Transaction coordinator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Maximum time to wait for the scope locks of a transaction.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Maximum time from receipt to posting before a transaction fails.
    #[serde(default = "default_transaction_timeout_ms")]
    pub transaction_timeout_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            transaction_timeout_ms: default_transaction_timeout_ms(),
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_transaction_timeout_ms() -> u64 {
    30_000
}

/// Valuation snapshot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ValuationConfig {
    /// Stock moved within this many days is fast moving.
    #[serde(default = "default_fast_moving_days")]
    pub fast_moving_days: i64,
    /// Stock moved within this many days is slow moving; older stock is dead.
    #[serde(default = "default_slow_moving_days")]
    pub slow_moving_days: i64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            fast_moving_days: default_fast_moving_days(),
            slow_moving_days: default_slow_moving_days(),
        }
    }
}

fn default_fast_moving_days() -> i64 {
    30
}

fn default_slow_moving_days() -> i64 {
    90
}

/// Reconciliation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Largest absolute variance still reported as balanced.
    #[serde(default = "default_reconciliation_epsilon")]
    pub epsilon: Decimal,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            epsilon: default_reconciliation_epsilon(),
        }
    }
}

fn default_reconciliation_epsilon() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("COSTLEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.costing.default_method, CostingMethod::Fifo);
        assert_eq!(config.costing.dust_epsilon, dec!(0.001));
        assert_eq!(config.costing.base_currency, "USD");
        assert_eq!(config.posting.ledger_precision, 4);
        assert_eq!(config.posting.inventory_account_name, "Inventory");
        assert_eq!(config.coordinator.lock_timeout_ms, 5_000);
        assert_eq!(config.valuation.fast_moving_days, 30);
        assert_eq!(config.valuation.slow_moving_days, 90);
        assert_eq!(config.reconciliation.epsilon, dec!(0.01));
    }

    #[test]
    fn test_method_for_precedence() {
        let product = ProductId::new();
        let mut costing = CostingConfig::default();
        assert_eq!(costing.method_for(product, None), CostingMethod::Fifo);

        costing.product_methods.insert(product, CostingMethod::Lifo);
        assert_eq!(costing.method_for(product, None), CostingMethod::Lifo);
        assert_eq!(
            costing.method_for(product, Some(CostingMethod::WeightedAverage)),
            CostingMethod::WeightedAverage
        );
        assert_eq!(costing.method_for(ProductId::new(), None), CostingMethod::Fifo);
    }

    #[test]
    fn test_load_with_env_overrides() {
        temp_env::with_vars(
            [
                ("COSTLEDGER__COSTING__DEFAULT_METHOD", Some("lifo")),
                ("COSTLEDGER__COORDINATOR__LOCK_TIMEOUT_MS", Some("250")),
                ("COSTLEDGER__POSTING__INVENTORY_ACCOUNT_NAME", Some("Stock")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.costing.default_method, CostingMethod::Lifo);
                assert_eq!(config.coordinator.lock_timeout_ms, 250);
                assert_eq!(config.posting.inventory_account_name, "Stock");
                assert_eq!(config.valuation.slow_moving_days, 90);
            },
        );
    }
}
