//! Currency service for base-currency conversion and ledger rounding.
//!
//! Cost layers keep the unit cost in the receipt currency together with the
//! exchange rate; every valuation and posting works on the base-currency
//! equivalent produced here.

use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// Decimal places kept for base-currency unit costs.
pub const UNIT_COST_PRECISION: u32 = 4;

/// Currency service for conversion operations.
///
/// Provides methods for converting amounts into the base currency using
/// Banker's Rounding (MidpointNearestEven) strategy.
pub struct CurrencyService;

impl CurrencyService {
    /// Convert a unit cost into the base currency.
    ///
    /// Uses `RoundingStrategy::MidpointNearestEven` (Banker's Rounding) at
    /// [`UNIT_COST_PRECISION`] decimal places.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use costledger_core::currency::CurrencyService;
    ///
    /// let result = CurrencyService::to_base(dec!(10), dec!(1.5));
    /// assert_eq!(result, dec!(15.0000));
    /// ```
    #[must_use]
    pub fn to_base(amount: Decimal, rate: Decimal) -> Decimal {
        Self::round(amount * rate, UNIT_COST_PRECISION)
    }

    /// Round a decimal value using Banker's Rounding.
    #[must_use]
    pub fn round(value: Decimal, decimal_places: u32) -> Decimal {
        value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
    }

    /// Returns true if the exchange rate can be applied.
    #[must_use]
    pub fn is_valid_rate(rate: Decimal) -> bool {
        rate > Decimal::ZERO
    }
}
