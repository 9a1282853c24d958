//! Base-currency conversion and rounding.

pub mod service;

pub use service::{CurrencyService, UNIT_COST_PRECISION};
