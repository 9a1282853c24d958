//! Inventory transaction coordinator.
//!
//! Drives a transaction through `Received → Costed → RuleResolved → Posted`.
//! Layer changes are staged on working copies checked out under the scope
//! locks and committed only after the journal entry is stored, so a failure
//! at any step leaves neither layers nor ledger changed. Movements without
//! value (free receipts, zero-cost stock) commit their layer changes and
//! reach `Posted` without a journal entry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use costledger_shared::config::{CoordinatorConfig, CostingConfig};
use costledger_shared::types::{
    CostLayerTransactionId, CostingMethod, InventoryTransactionId, JournalEntryId, TenantId,
    UserId,
};
use rust_decimal::Decimal;

use super::error::InventoryError;
use super::idempotency::{Claim, IdempotencyRegistry};
use super::locks::ScopeLockManager;
use super::types::{
    TransactionFailure, TransactionOutcome, TransactionRequest, TransactionState, TransactionType,
};
use crate::context::AuditContext;
use crate::costing::{
    AdjustmentInput, AdjustmentResult, CostLayer, CostLayerStore, CostLayerTransaction,
    CostingEngine, CostingError, IssueCost, LayerMovement, LayerReceipt, RevaluationInput,
    RevaluationResult, ScopeLayers, StockScope,
};
use crate::posting::{
    ChartOfAccounts, ContextFields, JournalHeader, JournalPoster, LedgerStore, LineSplit,
    PostingMetadata, PostingRuleResolver,
};

/// Layer changes staged for one transaction.
#[derive(Debug, Default)]
struct Costed {
    amount: Decimal,
    method: Option<CostingMethod>,
    issue_cost: Option<IssueCost>,
    layers_created: Vec<CostLayer>,
    revaluation: Option<RevaluationResult>,
    splits: Vec<LineSplit>,
}

/// Serializes, costs and posts inventory transactions.
pub struct InventoryTransactionCoordinator<C, L> {
    store: Arc<CostLayerStore>,
    resolver: Arc<PostingRuleResolver>,
    poster: JournalPoster<C, L>,
    engine: CostingEngine,
    locks: ScopeLockManager,
    idempotency: IdempotencyRegistry,
    costing: CostingConfig,
    limits: CoordinatorConfig,
}

impl<C, L> InventoryTransactionCoordinator<C, L>
where
    C: ChartOfAccounts,
    L: LedgerStore,
{
    /// Creates a coordinator over shared layer storage and posting collaborators.
    pub fn new(
        store: Arc<CostLayerStore>,
        resolver: Arc<PostingRuleResolver>,
        poster: JournalPoster<C, L>,
        costing: CostingConfig,
        limits: CoordinatorConfig,
    ) -> Self {
        let engine = CostingEngine::new(costing.dust_epsilon, poster.precision());
        Self {
            store,
            resolver,
            poster,
            engine,
            locks: ScopeLockManager::new(),
            idempotency: IdempotencyRegistry::new(),
            costing,
            limits,
        }
    }

    /// Layer storage shared with snapshotting and reconciliation.
    #[must_use]
    pub fn store(&self) -> &Arc<CostLayerStore> {
        &self.store
    }

    /// Rule resolver used for posting.
    #[must_use]
    pub fn resolver(&self) -> &Arc<PostingRuleResolver> {
        &self.resolver
    }

    /// Stored outcome of a posted reference.
    #[must_use]
    pub fn outcome(&self, tenant_id: TenantId, reference: &str) -> Option<TransactionOutcome> {
        self.idempotency.outcome(tenant_id, reference)
    }

    /// Processes one transaction to `Posted` or `Failed`.
    ///
    /// A reference that was already posted returns the stored outcome with
    /// `replayed` set and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns a [`TransactionFailure`] carrying the last state reached and
    /// the originating error. No layer or ledger change is visible afterwards.
    pub fn process(
        &self,
        ctx: &impl AuditContext,
        request: TransactionRequest,
    ) -> Result<TransactionOutcome, TransactionFailure> {
        let tenant_id = ctx.tenant_id();
        let transaction_id = InventoryTransactionId::new();

        match self.idempotency.claim(tenant_id, &request.reference) {
            Claim::Fresh => {}
            Claim::Completed(outcome) => {
                tracing::debug!(
                    reference = %request.reference,
                    transaction = %outcome.transaction_id,
                    "reference already posted, replaying outcome"
                );
                let mut outcome = *outcome;
                outcome.replayed = true;
                return Ok(outcome);
            }
            Claim::InFlight => {
                return Err(TransactionFailure {
                    transaction_id,
                    reference: request.reference.clone(),
                    failed_at: TransactionState::Received,
                    error: InventoryError::ReferenceInFlight(request.reference),
                });
            }
        }

        tracing::debug!(
            transaction = %transaction_id,
            reference = %request.reference,
            transaction_type = %request.transaction_type,
            state = %TransactionState::Received,
            "transaction received"
        );

        let mut state = TransactionState::Received;
        match self.run(ctx, transaction_id, &request, &mut state) {
            Ok(outcome) => {
                self.idempotency
                    .complete(tenant_id, &request.reference, outcome.clone());
                Ok(outcome)
            }
            Err(error) => {
                self.idempotency.release(tenant_id, &request.reference);
                if matches!(error, InventoryError::CompensationFailed { .. }) {
                    tracing::error!(
                        transaction = %transaction_id,
                        reference = %request.reference,
                        error = %error,
                        "transaction failed and could not be compensated"
                    );
                } else {
                    tracing::warn!(
                        transaction = %transaction_id,
                        reference = %request.reference,
                        failed_at = %state,
                        code = error.error_code(),
                        error = %error,
                        "transaction rejected"
                    );
                }
                Err(TransactionFailure {
                    transaction_id,
                    reference: request.reference,
                    failed_at: state,
                    error,
                })
            }
        }
    }

    fn run(
        &self,
        ctx: &impl AuditContext,
        transaction_id: InventoryTransactionId,
        request: &TransactionRequest,
        state: &mut TransactionState,
    ) -> Result<TransactionOutcome, InventoryError> {
        let started = Instant::now();
        let tenant_id = ctx.tenant_id();
        let actor = ctx.actor_id();

        let source = StockScope::new(tenant_id, request.product_id, request.warehouse_id);
        let destination = Self::destination_scope(tenant_id, request)?;
        let scopes: Vec<StockScope> = std::iter::once(source).chain(destination).collect();

        let _guard = self
            .locks
            .acquire(&scopes, Duration::from_millis(self.limits.lock_timeout_ms))?;

        let mut source_layers = self.store.checkout(source)?;
        let mut destination_layers = destination.map(|s| self.store.checkout(s)).transpose()?;

        let costed = self.cost(request, actor, &mut source_layers, destination_layers.as_mut())?;
        *state = TransactionState::Costed;
        tracing::debug!(
            transaction = %transaction_id,
            amount = %costed.amount,
            state = %state,
            "transaction costed"
        );

        let event_type = request.transaction_type.event_type();
        let context = Self::enrich_context(request, &costed);
        let rule = self
            .resolver
            .resolve(tenant_id, event_type, &context, request.transaction_date)?;
        *state = TransactionState::RuleResolved;
        tracing::debug!(
            transaction = %transaction_id,
            rule = %rule.id,
            rule_name = %rule.name,
            state = %state,
            "posting rule resolved"
        );

        self.check_deadline(started)?;

        let journal_entry = if costed.amount.is_zero() {
            tracing::debug!(
                transaction = %transaction_id,
                reference = %request.reference,
                "movement carries no value, nothing to post"
            );
            None
        } else {
            let metadata = PostingMetadata {
                entry_id: JournalEntryId::new(),
                tenant_id,
                entry_date: request.transaction_date,
                source_reference: request.reference.clone(),
                description: request.description.clone().unwrap_or_else(|| {
                    format!("Inventory {} {}", request.transaction_type, request.reference)
                }),
                event_type,
                created_by: actor,
                splits: costed.splits.clone(),
            };
            Some(self.poster.post(&rule, costed.amount, &metadata)?)
        };

        let movements = Self::movement_records(
            tenant_id,
            transaction_id,
            request,
            actor,
            journal_entry.as_ref().map(|e| e.id),
            &costed,
        );
        let mut worksets = vec![source_layers];
        worksets.extend(destination_layers);
        if let Err(err) = self.store.commit(worksets, movements) {
            return Err(match &journal_entry {
                Some(entry) => self.compensate(entry, request, actor, err.into()),
                None => err.into(),
            });
        }
        *state = TransactionState::Posted;

        tracing::info!(
            transaction = %transaction_id,
            reference = %request.reference,
            transaction_type = %request.transaction_type,
            entry = ?journal_entry.as_ref().map(|e| e.id),
            amount = %costed.amount,
            elapsed_ms = started.elapsed().as_millis(),
            "inventory transaction posted"
        );

        Ok(TransactionOutcome {
            transaction_id,
            reference: request.reference.clone(),
            transaction_type: request.transaction_type,
            state: TransactionState::Posted,
            method: costed.method,
            quantity: Self::moved_quantity(request, &costed),
            amount: costed.amount,
            issue_cost: costed.issue_cost,
            layers_created: costed.layers_created,
            revaluation: costed.revaluation,
            rule_id: rule.id,
            journal_entry,
            replayed: false,
        })
    }

    fn destination_scope(
        tenant_id: TenantId,
        request: &TransactionRequest,
    ) -> Result<Option<StockScope>, InventoryError> {
        if request.transaction_type != TransactionType::Transfer {
            return Ok(None);
        }
        let to = request.destination_warehouse_id.ok_or_else(|| {
            InventoryError::InvalidRequest("transfer requires destination_warehouse_id".into())
        })?;
        if to == request.warehouse_id {
            return Err(InventoryError::InvalidRequest(
                "transfer source and destination warehouse must differ".into(),
            ));
        }
        Ok(Some(StockScope::new(tenant_id, request.product_id, to)))
    }

    /// Applies the request to the working copies.
    fn cost(
        &self,
        request: &TransactionRequest,
        actor: UserId,
        source: &mut ScopeLayers,
        destination: Option<&mut ScopeLayers>,
    ) -> Result<Costed, InventoryError> {
        let method = self.costing.method_for(request.product_id, request.method);
        let currency = request
            .currency
            .clone()
            .unwrap_or_else(|| self.costing.base_currency.clone());
        let exchange_rate = request.exchange_rate.unwrap_or(Decimal::ONE);

        match request.transaction_type {
            TransactionType::Receive => {
                let unit_cost = request.unit_cost.ok_or_else(|| {
                    InventoryError::InvalidRequest("receipt requires unit_cost".into())
                })?;
                let layer = self.engine.receive(
                    source,
                    LayerReceipt {
                        lot_id: request.lot_id,
                        receipt_date: request.transaction_date,
                        unit_cost,
                        currency,
                        exchange_rate,
                        quantity: request.quantity,
                        source_reference: request.reference.clone(),
                        created_by: actor,
                    },
                )?;
                Ok(Costed {
                    amount: layer.original_cost(),
                    layers_created: vec![layer],
                    ..Costed::default()
                })
            }
            TransactionType::Issue | TransactionType::Writeoff => {
                let cost = self.engine.compute_issue_cost(
                    source,
                    request.lot_id,
                    request.quantity,
                    method,
                    request.transaction_date,
                )?;
                Ok(self.depleted(cost))
            }
            TransactionType::Adjustment => {
                let result = self.engine.adjust(
                    source,
                    AdjustmentInput {
                        quantity: request.quantity,
                        lot_id: request.lot_id,
                        unit_cost: request.unit_cost,
                        currency,
                        exchange_rate,
                        method,
                        date: request.transaction_date,
                        reference: request.reference.clone(),
                        created_by: actor,
                    },
                )?;
                Ok(match result {
                    AdjustmentResult::Increase(layer) => Costed {
                        amount: layer.original_cost(),
                        layers_created: vec![layer],
                        ..Costed::default()
                    },
                    AdjustmentResult::Decrease(cost) => self.depleted(cost),
                })
            }
            TransactionType::Revaluation => {
                let unit_cost = request.unit_cost.ok_or_else(|| {
                    InventoryError::InvalidRequest("revaluation requires unit_cost".into())
                })?;
                let result = self.engine.revalue(
                    source,
                    &RevaluationInput {
                        layer_id: request.layer_id,
                        lot_id: request.lot_id,
                        unit_cost,
                        currency,
                        exchange_rate,
                    },
                )?;
                Ok(Costed {
                    amount: result.delta.abs(),
                    revaluation: Some(result),
                    ..Costed::default()
                })
            }
            TransactionType::Transfer => {
                let destination = destination.ok_or_else(|| {
                    InventoryError::InvalidRequest("transfer requires destination_warehouse_id".into())
                })?;
                let cost = self.engine.compute_issue_cost(
                    source,
                    request.lot_id,
                    request.quantity,
                    method,
                    request.transaction_date,
                )?;

                let mut created = Vec::with_capacity(cost.layer_breakdown.len());
                for part in &cost.layer_breakdown {
                    let origin = source
                        .layer(part.layer_id)
                        .ok_or(CostingError::LayerNotFound(part.layer_id))?;
                    created.push(destination.transfer_in(
                        origin,
                        part,
                        request.transaction_date,
                        &request.reference,
                        actor,
                    ));
                }

                let mut costed = self.depleted(cost);
                costed.layers_created = created;
                Ok(costed)
            }
        }
    }

    /// Costed result of a depletion, with one debit split per touched layer.
    fn depleted(&self, cost: IssueCost) -> Costed {
        let splits: Vec<LineSplit> = cost
            .layer_breakdown
            .iter()
            .filter(|part| !part.depleted_cost.is_zero())
            .map(|part| LineSplit {
                amount: part.depleted_cost,
                description: format!(
                    "Layer {}: {} @ {}",
                    part.layer_sequence, part.depleted_quantity, part.unit_cost
                ),
                layer_id: Some(part.layer_id),
            })
            .collect();

        Costed {
            amount: self.poster.split_total(&splits),
            method: Some(cost.method),
            issue_cost: Some(cost),
            splits,
            ..Costed::default()
        }
    }

    /// Caller context plus derived fields the caller did not set.
    fn enrich_context(request: &TransactionRequest, costed: &Costed) -> ContextFields {
        let mut context = request.context.clone();
        context
            .entry("transaction_type".to_string())
            .or_insert_with(|| request.transaction_type.as_str().into());

        match request.transaction_type {
            TransactionType::Adjustment => {
                let kind = if request.quantity > Decimal::ZERO {
                    "positive"
                } else {
                    "negative"
                };
                context
                    .entry("adjustment_type".to_string())
                    .or_insert_with(|| kind.into());
            }
            TransactionType::Revaluation => {
                if let Some(revaluation) = &costed.revaluation {
                    let direction = if revaluation.is_gain() { "gain" } else { "loss" };
                    context
                        .entry("direction".to_string())
                        .or_insert_with(|| direction.into());
                }
            }
            _ => {}
        }
        context
    }

    fn check_deadline(&self, started: Instant) -> Result<(), InventoryError> {
        let elapsed = started.elapsed();
        if elapsed > Duration::from_millis(self.limits.transaction_timeout_ms) {
            return Err(InventoryError::Timeout {
                elapsed_ms: elapsed.as_millis(),
                limit_ms: self.limits.transaction_timeout_ms,
            });
        }
        Ok(())
    }

    /// Audit records for every depleted or revalued layer.
    fn movement_records(
        tenant_id: TenantId,
        transaction_id: InventoryTransactionId,
        request: &TransactionRequest,
        actor: UserId,
        journal_entry_id: Option<JournalEntryId>,
        costed: &Costed,
    ) -> Vec<CostLayerTransaction> {
        let created_at = Utc::now();
        let record = |layer_id, movement, quantity, cost, unit_cost| CostLayerTransaction {
            id: CostLayerTransactionId::new(),
            tenant_id,
            layer_id,
            transaction_id,
            source_reference: request.reference.clone(),
            movement,
            quantity,
            cost,
            unit_cost,
            transaction_date: request.transaction_date,
            journal_entry_id,
            created_by: actor,
            created_at,
        };

        let mut records = Vec::new();
        if let Some(cost) = &costed.issue_cost {
            for part in &cost.layer_breakdown {
                records.push(record(
                    part.layer_id,
                    LayerMovement::Depletion,
                    part.depleted_quantity,
                    part.depleted_cost,
                    part.unit_cost,
                ));
            }
        }
        if let Some(revaluation) = &costed.revaluation {
            for layer in &revaluation.layers {
                records.push(record(
                    layer.layer_id,
                    LayerMovement::Revaluation,
                    Decimal::ZERO,
                    layer.delta,
                    layer.new_unit_cost,
                ));
            }
        }
        records
    }

    /// Reverses a stored entry whose layer changes could not be committed.
    fn compensate(
        &self,
        entry: &JournalHeader,
        request: &TransactionRequest,
        actor: UserId,
        cause: InventoryError,
    ) -> InventoryError {
        tracing::warn!(
            entry = %entry.id,
            reference = %request.reference,
            error = %cause,
            "layer commit failed, reversing journal entry"
        );
        match self.poster.reverse(
            entry.id,
            &format!("layer commit failed: {cause}"),
            request.transaction_date,
            actor,
        ) {
            Ok(reversal) => {
                tracing::warn!(
                    entry = %entry.id,
                    reversal = %reversal.id,
                    "journal entry compensated"
                );
                cause
            }
            Err(err) => InventoryError::CompensationFailed {
                entry: entry.id,
                reason: err.to_string(),
            },
        }
    }

    fn moved_quantity(request: &TransactionRequest, costed: &Costed) -> Decimal {
        match (&costed.issue_cost, &costed.revaluation) {
            (_, Some(revaluation)) => revaluation.quantity,
            (Some(cost), None) if request.transaction_type != TransactionType::Adjustment => {
                cost.quantity
            }
            _ => request.quantity,
        }
    }
}
