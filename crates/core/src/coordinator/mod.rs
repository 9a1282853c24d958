//! Inventory transaction coordination.
//!
//! This module implements:
//! - The per-transaction state machine from receipt to posting
//! - Canonically ordered per-scope locks
//! - Idempotent replay by caller reference
//! - Compensation when the ledger and layer store disagree

pub mod error;
pub mod idempotency;
pub mod locks;
pub mod service;
pub mod types;

pub use error::InventoryError;
pub use idempotency::{Claim, IdempotencyRegistry};
pub use locks::{LockError, ScopeGuard, ScopeLockManager};
pub use service::InventoryTransactionCoordinator;
pub use types::{
    TransactionFailure, TransactionOutcome, TransactionRequest, TransactionState, TransactionType,
};
