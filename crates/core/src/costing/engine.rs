//! Costing engine: FIFO, LIFO and weighted-average depletion.
//!
//! The engine is stateless apart from the dust threshold and the precision
//! layer values are booked at, and operates on a checked-out
//! [`ScopeLayers`] working copy.

use chrono::NaiveDate;
use costledger_shared::types::{CostLayerId, CostingMethod, LotId, UserId};
use rust_decimal::Decimal;

use super::error::CostingError;
use super::layers::ScopeLayers;
use super::types::{
    AdjustmentResult, CostLayer, DepletionResult, IssueCost, LayerReceipt, RevaluationResult,
    RevaluedLayer,
};
use crate::currency::CurrencyService;

/// Decimal places kept for pro-rata quantity shares.
const SHARE_PRECISION: u32 = 6;

/// Input for a stock adjustment.
#[derive(Debug, Clone)]
pub struct AdjustmentInput {
    /// Signed quantity: positive adds stock, negative removes it.
    pub quantity: Decimal,
    /// Optional lot.
    pub lot_id: Option<LotId>,
    /// Unit cost for positive adjustments; current cost is used when absent.
    pub unit_cost: Option<Decimal>,
    /// Currency of `unit_cost`.
    pub currency: String,
    /// Rate from `currency` to base currency.
    pub exchange_rate: Decimal,
    /// Method for negative adjustments.
    pub method: CostingMethod,
    /// Adjustment date.
    pub date: NaiveDate,
    /// Caller reference.
    pub reference: String,
    /// Actor.
    pub created_by: UserId,
}

/// Input for a revaluation.
#[derive(Debug, Clone)]
pub struct RevaluationInput {
    /// Revalue only this layer when set.
    pub layer_id: Option<CostLayerId>,
    /// Restrict to a lot when revaluing all open layers.
    pub lot_id: Option<LotId>,
    /// New unit cost in `currency`.
    pub unit_cost: Decimal,
    /// Currency of `unit_cost`.
    pub currency: String,
    /// Rate from `currency` to base currency.
    pub exchange_rate: Decimal,
}

/// Stateless costing engine.
#[derive(Debug, Clone, Copy)]
pub struct CostingEngine {
    dust_epsilon: Decimal,
    value_precision: u32,
}

impl CostingEngine {
    /// Creates an engine with the given dust threshold.
    ///
    /// Layer values are booked at `value_precision` decimal places, which
    /// must match the ledger precision of the journals posted for them.
    #[must_use]
    pub const fn new(dust_epsilon: Decimal, value_precision: u32) -> Self {
        Self {
            dust_epsilon,
            value_precision,
        }
    }

    /// Decimal places layer values are booked at.
    #[must_use]
    pub const fn value_precision(&self) -> u32 {
        self.value_precision
    }

    /// Records a receipt as a new layer.
    pub fn receive(
        &self,
        layers: &mut ScopeLayers,
        receipt: LayerReceipt,
    ) -> Result<CostLayer, CostingError> {
        if receipt.quantity <= Decimal::ZERO {
            return Err(CostingError::InvalidQuantity(receipt.quantity));
        }
        if receipt.unit_cost < Decimal::ZERO {
            return Err(CostingError::InvalidUnitCost(receipt.unit_cost));
        }
        if !CurrencyService::is_valid_rate(receipt.exchange_rate) {
            return Err(CostingError::InvalidExchangeRate(receipt.exchange_rate));
        }
        Ok(layers.create_layer(receipt, self.value_precision))
    }

    /// Computes and applies the cost of issuing `quantity`.
    ///
    /// Fails with `InsufficientStock` before touching any layer when the
    /// eligible layers cannot cover the request.
    pub fn compute_issue_cost(
        &self,
        layers: &mut ScopeLayers,
        lot: Option<LotId>,
        quantity: Decimal,
        method: CostingMethod,
        on: NaiveDate,
    ) -> Result<IssueCost, CostingError> {
        if quantity <= Decimal::ZERO {
            return Err(CostingError::InvalidQuantity(quantity));
        }

        let available = layers.available_quantity(lot);
        if available < quantity {
            return Err(CostingError::InsufficientStock {
                requested: quantity,
                available,
                shortfall: quantity - available,
            });
        }

        let breakdown = match method {
            CostingMethod::Fifo | CostingMethod::Lifo => {
                self.deplete_ordered(layers, lot, quantity, method, on)?
            }
            CostingMethod::WeightedAverage => {
                self.deplete_weighted_average(layers, lot, quantity, on)?
            }
        };

        let depleted_quantity: Decimal = breakdown.iter().map(|b| b.depleted_quantity).sum();
        let total_cost: Decimal = breakdown.iter().map(|b| b.depleted_cost).sum();
        let unit_cost = if depleted_quantity.is_zero() {
            Decimal::ZERO
        } else {
            total_cost / depleted_quantity
        };

        Ok(IssueCost {
            method,
            quantity,
            depleted_quantity,
            total_cost,
            unit_cost,
            layer_breakdown: breakdown,
        })
    }

    fn deplete_ordered(
        &self,
        layers: &mut ScopeLayers,
        lot: Option<LotId>,
        quantity: Decimal,
        method: CostingMethod,
        on: NaiveDate,
    ) -> Result<Vec<DepletionResult>, CostingError> {
        let order: Vec<CostLayerId> = layers
            .available_layers(method, lot, Some(quantity))
            .iter()
            .map(|l| l.id)
            .collect();

        let mut needed = quantity;
        let mut breakdown = Vec::with_capacity(order.len());
        for layer_id in order {
            if needed <= Decimal::ZERO {
                break;
            }
            let result =
                layers.deplete_layer(layer_id, needed, on, self.dust_epsilon, self.value_precision)?;
            needed -= result.depleted_quantity;
            breakdown.push(result);
        }
        Ok(breakdown)
    }

    /// Reduces every open layer pro rata to its remaining quantity.
    ///
    /// Each share is charged at its own layer's cost, so the issue as a
    /// whole is priced at the blended average of the open layers.
    fn deplete_weighted_average(
        &self,
        layers: &mut ScopeLayers,
        lot: Option<LotId>,
        quantity: Decimal,
        on: NaiveDate,
    ) -> Result<Vec<DepletionResult>, CostingError> {
        let open: Vec<(CostLayerId, Decimal)> = layers
            .available_layers(CostingMethod::WeightedAverage, lot, None)
            .iter()
            .map(|l| (l.id, l.remaining_quantity))
            .collect();
        let total: Decimal = open.iter().map(|(_, remaining)| *remaining).sum();

        let mut allocated = Decimal::ZERO;
        let mut breakdown = Vec::with_capacity(open.len());
        let last = open.len().saturating_sub(1);
        for (index, (layer_id, remaining)) in open.into_iter().enumerate() {
            // The last layer takes the remainder so the shares sum exactly.
            let share = if index == last {
                quantity - allocated
            } else {
                (quantity * remaining / total).round_dp(SHARE_PRECISION)
            }
            .min(remaining);

            if share <= Decimal::ZERO {
                continue;
            }
            let result =
                layers.deplete_layer(layer_id, share, on, self.dust_epsilon, self.value_precision)?;
            allocated += result.depleted_quantity;
            breakdown.push(result);
        }
        Ok(breakdown)
    }

    /// Base-currency weighted average cost of the open layers.
    #[must_use]
    pub fn current_unit_cost(layers: &ScopeLayers, lot: Option<LotId>) -> Option<Decimal> {
        let open = layers.available_layers(CostingMethod::WeightedAverage, lot, None);
        let quantity: Decimal = open.iter().map(|l| l.remaining_quantity).sum();
        if quantity.is_zero() {
            return None;
        }
        let value: Decimal = open.iter().map(|l| l.remaining_cost()).sum();
        Some(value / quantity)
    }

    /// Applies a signed stock adjustment.
    ///
    /// Positive adjustments create a layer at the given cost, or at the
    /// current average cost in base currency. Negative adjustments deplete
    /// with the requested method.
    pub fn adjust(
        &self,
        layers: &mut ScopeLayers,
        input: AdjustmentInput,
    ) -> Result<AdjustmentResult, CostingError> {
        if input.quantity.is_zero() {
            return Err(CostingError::InvalidQuantity(input.quantity));
        }

        if input.quantity < Decimal::ZERO {
            let cost = self.compute_issue_cost(
                layers,
                input.lot_id,
                input.quantity.abs(),
                input.method,
                input.date,
            )?;
            return Ok(AdjustmentResult::Decrease(cost));
        }

        let (unit_cost, currency, exchange_rate) = match input.unit_cost {
            Some(cost) => (cost, input.currency, input.exchange_rate),
            None => {
                let current = Self::current_unit_cost(layers, input.lot_id)
                    .ok_or(CostingError::MissingUnitCost)?;
                (current, input.currency, Decimal::ONE)
            }
        };

        let layer = self.receive(
            layers,
            LayerReceipt {
                lot_id: input.lot_id,
                receipt_date: input.date,
                unit_cost,
                currency,
                exchange_rate,
                quantity: input.quantity,
                source_reference: input.reference,
                created_by: input.created_by,
            },
        )?;
        Ok(AdjustmentResult::Increase(layer))
    }

    /// Changes the unit cost of one or all open layers without touching quantities.
    pub fn revalue(
        &self,
        layers: &mut ScopeLayers,
        input: &RevaluationInput,
    ) -> Result<RevaluationResult, CostingError> {
        if input.unit_cost < Decimal::ZERO {
            return Err(CostingError::InvalidUnitCost(input.unit_cost));
        }
        if !CurrencyService::is_valid_rate(input.exchange_rate) {
            return Err(CostingError::InvalidExchangeRate(input.exchange_rate));
        }

        let targets: Vec<CostLayerId> = match input.layer_id {
            Some(id) => vec![id],
            None => layers
                .available_layers(CostingMethod::Fifo, input.lot_id, None)
                .iter()
                .map(|l| l.id)
                .collect(),
        };
        if targets.is_empty() {
            return Err(CostingError::NoOpenLayers);
        }

        let mut revalued = Vec::with_capacity(targets.len());
        for layer_id in targets {
            let (previous_unit_cost, delta) = layers.revalue_layer(
                layer_id,
                input.unit_cost,
                input.exchange_rate,
                &input.currency,
                self.value_precision,
            )?;
            let layer = layers
                .layer(layer_id)
                .ok_or(CostingError::LayerNotFound(layer_id))?;
            revalued.push(RevaluedLayer {
                layer_id,
                previous_unit_cost,
                new_unit_cost: layer.base_unit_cost,
                quantity: layer.remaining_quantity,
                delta,
            });
        }

        let delta: Decimal = revalued.iter().map(|r| r.delta).sum();
        if delta.is_zero() {
            return Err(CostingError::NoValueChange);
        }

        Ok(RevaluationResult {
            delta,
            quantity: revalued.iter().map(|r| r.quantity).sum(),
            layers: revalued,
        })
    }
}
