//! Core business logic for Costledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Collaborators such as the chart of accounts, ledger storage and standard
//! costs are injected through traits.
//!
//! # Modules
//!
//! - `costing` - Cost layers and FIFO, LIFO and weighted-average costing
//! - `currency` - Base-currency conversion and rounding
//! - `posting` - Posting rules, rule resolution and journal construction
//! - `valuation` - Point-in-time valuation snapshots and aging
//! - `reconciliation` - Inventory value against the general ledger
//! - `coordinator` - Locked, idempotent transaction processing
//! - `context` - Tenant and actor context

pub mod context;
pub mod coordinator;
pub mod costing;
pub mod currency;
pub mod posting;
pub mod reconciliation;
pub mod valuation;
