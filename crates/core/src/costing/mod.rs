//! Cost layer management and inventory costing.
//!
//! This module implements:
//! - Cost layers and their ordered per-scope sets
//! - FIFO, LIFO and weighted-average issue costing
//! - Adjustments and revaluations
//! - The shared layer store with versioned commits

pub mod engine;
pub mod error;
pub mod layers;
pub mod store;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::{AdjustmentInput, CostingEngine, RevaluationInput};
pub use error::CostingError;
pub use layers::ScopeLayers;
pub use store::CostLayerStore;
pub use types::{
    AdjustmentResult, CostLayer, CostLayerTransaction, DepletionResult, IssueCost, LayerMovement,
    LayerReceipt, RevaluationResult, RevaluedLayer, StockScope,
};
