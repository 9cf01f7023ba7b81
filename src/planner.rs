//! Trade sizing: fiat budget → base-asset amount
//!
//! All fiat arithmetic stays in [`Decimal`]. [`to_base_units`] is the only
//! place a fiat-derived quantity becomes an integer amount; nothing past the
//! planner ever sees a fractional value.

use crate::oracle::PriceQuote;
use crate::tokens::NATIVE_DECIMALS;
use crate::{Error, Result};
use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount in an asset's smallest indivisible unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(U256);

impl Amount {
    pub const fn from_base_units(units: U256) -> Self {
        Self(units)
    }

    pub fn base_units(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed fiat range `[min, max]` to spend on one swap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiatBudget {
    pub min: Decimal,
    pub max: Decimal,
}

impl FiatBudget {
    pub fn new(min: Decimal, max: Decimal) -> Result<Self> {
        let budget = Self { min, max };
        budget.validate()?;
        Ok(budget)
    }

    /// Require `0 < min <= max`
    pub fn validate(&self) -> Result<()> {
        if self.min <= Decimal::ZERO || self.max <= Decimal::ZERO {
            return Err(Error::InvalidBudget(format!(
                "bounds must be positive (min={}, max={})",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(Error::InvalidBudget(format!(
                "min {} exceeds max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Converts fiat budgets into amounts of one asset
#[derive(Debug, Clone, Copy)]
pub struct AmountPlanner {
    decimals: u8,
}

impl AmountPlanner {
    pub fn new(decimals: u8) -> Self {
        Self { decimals }
    }

    /// Planner for the chain's native asset (18 decimals)
    pub fn native() -> Self {
        Self::new(NATIVE_DECIMALS)
    }

    /// Interpolate `fraction` of the way from `min/price` to `max/price`.
    ///
    /// `fraction = 0` yields the budget floor, `fraction = 1` the ceiling.
    /// The result is truncated to whole base units.
    pub fn plan_amount(
        &self,
        budget: &FiatBudget,
        price: &PriceQuote,
        fraction: Decimal,
    ) -> Result<Amount> {
        budget.validate()?;
        if price.fiat_per_unit <= Decimal::ZERO {
            return Err(Error::InvalidPrice(format!(
                "price must be positive, got {}",
                price.fiat_per_unit
            )));
        }
        if fraction < Decimal::ZERO || fraction > Decimal::ONE {
            return Err(Error::InvalidArgument(format!(
                "fraction must be within [0, 1], got {}",
                fraction
            )));
        }

        let min_units = budget
            .min
            .checked_div(price.fiat_per_unit)
            .ok_or_else(|| Error::InvalidBudget("min / price overflows".to_string()))?;
        let max_units = budget
            .max
            .checked_div(price.fiat_per_unit)
            .ok_or_else(|| Error::InvalidBudget("max / price overflows".to_string()))?;

        let units = (max_units - min_units)
            .checked_mul(fraction)
            .and_then(|span| min_units.checked_add(span))
            .ok_or_else(|| Error::InvalidBudget("interpolated amount overflows".to_string()))?;

        let base_units = to_base_units(units, self.decimals)?;
        if base_units.is_zero() {
            return Err(Error::InvalidBudget(format!(
                "{} units is below the smallest base unit",
                units
            )));
        }

        Ok(Amount::from_base_units(base_units))
    }
}

/// Convert a non-negative decimal amount into integer base units, truncating
/// anything finer than `decimals` places.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::InvalidArgument(format!(
            "cannot convert negative amount {} to base units",
            amount
        )));
    }

    // amount = mantissa * 10^-scale
    let mantissa = U256::from(amount.mantissa().unsigned_abs());
    let scale = amount.scale();
    let decimals = u32::from(decimals);
    let ten = U256::from(10u8);

    let units = if scale <= decimals {
        ten.checked_pow(U256::from(decimals - scale))
            .and_then(|factor| mantissa.checked_mul(factor))
    } else {
        ten.checked_pow(U256::from(scale - decimals))
            .map(|divisor| mantissa / divisor)
    };
    units.ok_or_else(|| {
        Error::InvalidArgument(format!(
            "{} does not fit in 256 bits at {} decimals",
            amount, decimals
        ))
    })
}
