//! Inventory reconciliation and layer auditing.
//!
//! This module implements:
//! - Inventory value versus inventory account balance
//! - Variance signals for operators
//! - Layer quantity integrity against depletion records

pub mod engine;
pub mod error;
pub mod types;

pub use engine::ReconciliationEngine;
pub use error::ReconciliationError;
pub use types::{
    IntegrityReport, InventoryValueSource, LayerIntegrityViolation, ReconciliationReport,
    ReconciliationVariance,
};
