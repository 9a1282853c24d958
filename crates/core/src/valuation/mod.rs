//! Point-in-time inventory valuation.
//!
//! This module implements:
//! - FIFO, LIFO, weighted-average and standard-cost valuation of on-hand stock
//! - Aging classification from the last movement date
//! - Snapshot history per tenant and date

pub mod repository;
pub mod snapshotter;
pub mod standard;
pub mod types;

pub use repository::SnapshotRepository;
pub use snapshotter::ValuationSnapshotter;
pub use standard::{StandardCostSource, StandardCostTable};
pub use types::{AgingBucket, MethodValuation, ValuationSnapshot};
