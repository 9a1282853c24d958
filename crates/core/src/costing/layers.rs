//! Ordered cost layers of a single stock scope.
//!
//! `ScopeLayers` is both the committed state held by the store and the
//! working copy a transaction mutates while it holds the scope lock.

use chrono::{NaiveDate, Utc};
use costledger_shared::types::{CostLayerId, CostingMethod, LotId, UserId};
use rust_decimal::Decimal;

use super::error::CostingError;
use super::types::{CostLayer, DepletionResult, LayerReceipt, StockScope};
use crate::currency::CurrencyService;

/// The ordered set of cost layers for one product and warehouse.
#[derive(Debug, Clone)]
pub struct ScopeLayers {
    scope: StockScope,
    layers: Vec<CostLayer>,
    next_sequence: u64,
    version: u64,
    last_movement: Option<NaiveDate>,
}

impl ScopeLayers {
    /// Creates an empty scope at version 0.
    #[must_use]
    pub fn new(scope: StockScope) -> Self {
        Self {
            scope,
            layers: Vec::new(),
            next_sequence: 1,
            version: 0,
            last_movement: None,
        }
    }

    /// The scope these layers belong to.
    #[must_use]
    pub fn scope(&self) -> StockScope {
        self.scope
    }

    /// Committed version this copy was taken from.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// All layers in sequence order, depleted ones included.
    #[must_use]
    pub fn layers(&self) -> &[CostLayer] {
        &self.layers
    }

    /// Date of the latest receipt or depletion.
    #[must_use]
    pub fn last_movement(&self) -> Option<NaiveDate> {
        self.last_movement
    }

    /// Looks up a layer by ID.
    #[must_use]
    pub fn layer(&self, id: CostLayerId) -> Option<&CostLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Appends a new layer with the next sequence number.
    ///
    /// The layer value is booked at `precision` decimal places.
    pub fn create_layer(&mut self, receipt: LayerReceipt, precision: u32) -> CostLayer {
        let base_unit_cost = CurrencyService::to_base(receipt.unit_cost, receipt.exchange_rate);
        let value = CurrencyService::round(receipt.quantity * base_unit_cost, precision);
        let layer = CostLayer {
            id: CostLayerId::new(),
            tenant_id: self.scope.tenant_id,
            product_id: self.scope.product_id,
            warehouse_id: self.scope.warehouse_id,
            lot_id: receipt.lot_id,
            layer_sequence: self.next_sequence,
            receipt_date: receipt.receipt_date,
            booked_on: receipt.receipt_date,
            base_unit_cost,
            unit_cost: receipt.unit_cost,
            currency: receipt.currency,
            exchange_rate: receipt.exchange_rate,
            original_quantity: receipt.quantity,
            remaining_quantity: receipt.quantity,
            original_value: value,
            remaining_value: value,
            is_depleted: false,
            depleted_on: None,
            source_reference: receipt.source_reference,
            created_by: receipt.created_by,
            created_at: Utc::now(),
        };

        self.next_sequence += 1;
        self.touch(receipt.receipt_date);
        self.layers.push(layer.clone());
        layer
    }

    /// Books stock depleted from `origin` in another scope as a new layer.
    ///
    /// The new layer keeps the origin's lot, costs and receipt date and
    /// carries exactly the value taken out of the origin.
    pub fn transfer_in(
        &mut self,
        origin: &CostLayer,
        depletion: &DepletionResult,
        on: NaiveDate,
        source_reference: &str,
        created_by: UserId,
    ) -> CostLayer {
        let layer = CostLayer {
            id: CostLayerId::new(),
            tenant_id: self.scope.tenant_id,
            product_id: self.scope.product_id,
            warehouse_id: self.scope.warehouse_id,
            lot_id: origin.lot_id,
            layer_sequence: self.next_sequence,
            receipt_date: origin.receipt_date,
            booked_on: on,
            base_unit_cost: origin.base_unit_cost,
            unit_cost: origin.unit_cost,
            currency: origin.currency.clone(),
            exchange_rate: origin.exchange_rate,
            original_quantity: depletion.depleted_quantity,
            remaining_quantity: depletion.depleted_quantity,
            original_value: depletion.depleted_cost,
            remaining_value: depletion.depleted_cost,
            is_depleted: false,
            depleted_on: None,
            source_reference: source_reference.to_string(),
            created_by,
            created_at: Utc::now(),
        };

        self.next_sequence += 1;
        self.touch(on);
        self.layers.push(layer.clone());
        layer
    }

    /// Open layers in depletion order.
    ///
    /// FIFO orders by `(receipt_date, layer_sequence)` ascending, LIFO
    /// descending. Weighted average does not select layers and gets FIFO
    /// order. With `limit_quantity`, accumulation stops as soon as the
    /// selected layers cover it.
    #[must_use]
    pub fn available_layers(
        &self,
        method: CostingMethod,
        lot: Option<LotId>,
        limit_quantity: Option<Decimal>,
    ) -> Vec<&CostLayer> {
        let mut open: Vec<&CostLayer> = self
            .layers
            .iter()
            .filter(|l| !l.is_depleted && l.matches_lot(lot))
            .collect();

        match method {
            CostingMethod::Fifo | CostingMethod::WeightedAverage => {
                open.sort_by_key(|l| (l.receipt_date, l.layer_sequence));
            }
            CostingMethod::Lifo => {
                open.sort_by_key(|l| std::cmp::Reverse((l.receipt_date, l.layer_sequence)));
            }
        }

        let Some(limit) = limit_quantity else {
            return open;
        };

        let mut covered = Decimal::ZERO;
        let mut selected = Vec::new();
        for layer in open {
            if covered >= limit {
                break;
            }
            covered += layer.remaining_quantity;
            selected.push(layer);
        }
        selected
    }

    /// Quantity held by open layers matching the lot filter.
    #[must_use]
    pub fn available_quantity(&self, lot: Option<LotId>) -> Decimal {
        self.layers
            .iter()
            .filter(|l| !l.is_depleted && l.matches_lot(lot))
            .map(|l| l.remaining_quantity)
            .sum()
    }

    /// Total remaining quantity.
    #[must_use]
    pub fn on_hand(&self) -> Decimal {
        self.layers.iter().map(|l| l.remaining_quantity).sum()
    }

    /// Total booked base-currency value on hand.
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.layers.iter().map(CostLayer::remaining_cost).sum()
    }

    /// Depletes up to `quantity` from one layer.
    ///
    /// Depletion is clamped to the layer's remaining quantity; the caller
    /// loops across layers for the rest. A remainder below `dust_epsilon` is
    /// absorbed into the depletion and the layer is closed.
    ///
    /// The depleted value is rounded to `precision`. Closing a layer takes
    /// whatever value it has left, so a fully depleted layer is worth zero.
    pub fn deplete_layer(
        &mut self,
        layer_id: CostLayerId,
        quantity: Decimal,
        on: NaiveDate,
        dust_epsilon: Decimal,
        precision: u32,
    ) -> Result<DepletionResult, CostingError> {
        if quantity <= Decimal::ZERO {
            return Err(CostingError::InvalidQuantity(quantity));
        }

        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == layer_id)
            .ok_or(CostingError::LayerNotFound(layer_id))?;

        if layer.is_depleted {
            return Err(CostingError::LayerDepleted(layer_id));
        }

        let mut depleted = quantity.min(layer.remaining_quantity);
        let mut remaining = layer.remaining_quantity - depleted;
        if remaining > Decimal::ZERO && remaining < dust_epsilon {
            depleted += remaining;
            remaining = Decimal::ZERO;
        }

        let depleted_cost = if remaining.is_zero() {
            layer.remaining_value
        } else {
            CurrencyService::round(depleted * layer.base_unit_cost, precision)
                .min(layer.remaining_value)
        };

        layer.remaining_quantity = remaining;
        layer.remaining_value -= depleted_cost;
        if remaining.is_zero() {
            layer.is_depleted = true;
            layer.depleted_on = Some(on);
        }

        let result = DepletionResult {
            layer_id,
            layer_sequence: layer.layer_sequence,
            depleted_quantity: depleted,
            depleted_cost,
            unit_cost: layer.base_unit_cost,
            remaining_in_layer: remaining,
        };

        self.touch(on);
        Ok(result)
    }

    /// Sets a new unit cost on an open layer and returns the previous base
    /// unit cost and the booked value change.
    pub fn revalue_layer(
        &mut self,
        layer_id: CostLayerId,
        unit_cost: Decimal,
        exchange_rate: Decimal,
        currency: &str,
        precision: u32,
    ) -> Result<(Decimal, Decimal), CostingError> {
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == layer_id)
            .ok_or(CostingError::LayerNotFound(layer_id))?;

        if layer.is_depleted {
            return Err(CostingError::LayerDepleted(layer_id));
        }

        let previous = layer.base_unit_cost;
        let new_base = CurrencyService::to_base(unit_cost, exchange_rate);
        let new_value = CurrencyService::round(layer.remaining_quantity * new_base, precision);
        let delta = new_value - layer.remaining_value;
        layer.unit_cost = unit_cost;
        layer.exchange_rate = exchange_rate;
        layer.currency = currency.to_string();
        layer.base_unit_cost = new_base;
        layer.remaining_value = new_value;

        Ok((previous, delta))
    }

    fn touch(&mut self, on: NaiveDate) {
        if self.last_movement.is_none_or(|last| on > last) {
            self.last_movement = Some(on);
        }
    }
}
