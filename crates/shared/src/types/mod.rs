//! Common types used across the application.

pub mod id;
pub mod method;

pub use id::*;
pub use method::CostingMethod;
