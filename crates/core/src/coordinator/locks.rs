//! Exclusive per-scope locks.
//!
//! A transaction takes all of its scopes up front in canonical order and
//! releases them together when the guard drops.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::costing::StockScope;

/// Errors that can occur while acquiring scope locks.
#[derive(Debug, Error)]
pub enum LockError {
    /// The scope stayed locked past the deadline.
    #[error("Timed out after {waited_ms}ms waiting for lock on {scope}")]
    Timeout {
        /// Scope that could not be taken.
        scope: StockScope,
        /// Time spent waiting.
        waited_ms: u128,
    },
}

impl LockError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "LOCK_TIMEOUT",
        }
    }
}

/// Lock table keyed by stock scope.
#[derive(Debug, Default)]
pub struct ScopeLockManager {
    held: Mutex<HashSet<StockScope>>,
    released: Condvar,
}

impl ScopeLockManager {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every scope, sorted and deduplicated, waiting at most `timeout` in total.
    ///
    /// On timeout every scope already taken is released again.
    pub fn acquire(
        &self,
        scopes: &[StockScope],
        timeout: Duration,
    ) -> Result<ScopeGuard<'_>, LockError> {
        let mut ordered = scopes.to_vec();
        ordered.sort();
        ordered.dedup();

        let started = Instant::now();
        let deadline = started + timeout;
        let mut guard = ScopeGuard {
            manager: self,
            scopes: Vec::with_capacity(ordered.len()),
        };

        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        for scope in ordered {
            while held.contains(&scope) {
                let now = Instant::now();
                if now >= deadline {
                    drop(held);
                    return Err(LockError::Timeout {
                        scope,
                        waited_ms: started.elapsed().as_millis(),
                    });
                }
                held = self
                    .released
                    .wait_timeout(held, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
            held.insert(scope);
            guard.scopes.push(scope);
        }
        drop(held);

        tracing::trace!(scopes = guard.scopes.len(), "scope locks acquired");
        Ok(guard)
    }

    /// True if the scope is currently locked.
    #[must_use]
    pub fn is_locked(&self, scope: &StockScope) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(scope)
    }

    fn release(&self, scopes: &[StockScope]) {
        if scopes.is_empty() {
            return;
        }
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        for scope in scopes {
            held.remove(scope);
        }
        drop(held);
        self.released.notify_all();
    }
}

/// Holds a set of scope locks until dropped.
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    manager: &'a ScopeLockManager,
    scopes: Vec<StockScope>,
}

impl ScopeGuard<'_> {
    /// Scopes held, in acquisition order.
    #[must_use]
    pub fn scopes(&self) -> &[StockScope] {
        &self.scopes
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.manager.release(&self.scopes);
    }
}
