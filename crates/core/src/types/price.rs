//! Store prices using decimal arithmetic.
//!
//! Prices are always Brazilian reais. The products service stores them as
//! JSON numbers, so the wire form is a float while the in-memory form is a
//! [`Decimal`] rounded to cents.

use core::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors produced when parsing an operator-entered price.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// The input is not a number.
    #[error("Por favor, insira um preço válido.")]
    NotANumber,
    /// The value is zero or negative.
    #[error("O preço deve ser maior que zero.")]
    NotPositive,
}

/// A positive price in reais, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Parse an operator-entered price such as `"5.49"` or `"5,49"`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotANumber`] for non-numeric input and
    /// [`PriceError::NotPositive`] when the rounded value is not above zero.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let normalized = input.trim().replace(',', ".");
        let amount = Decimal::from_str(&normalized).map_err(|_| PriceError::NotANumber)?;
        Self::try_from(amount)
    }

    /// The amount in reais.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if rounded <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        Ok(Self(rounded))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R$ {:.2}", self.0)
    }
}
