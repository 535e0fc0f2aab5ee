//! Product price.
//!
//! Prices are stored by the backend as a floating-point `numeric` column and
//! compared as `f64`. There is no currency handling: the storefront sells in
//! a single local currency and always renders two fraction digits.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`] from user input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is empty or only whitespace.
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a number.
    #[error("price must be a number")]
    NotANumber,
    /// The input is NaN or infinite.
    #[error("price must be finite")]
    NotFinite,
    /// The input is below zero.
    #[error("price cannot be negative")]
    Negative,
}

/// A non-negative product price.
///
/// ```
/// use panaderia_core::Price;
///
/// let price = Price::parse("2.5").unwrap();
/// assert_eq!(price.to_string(), "$2.50");
///
/// assert!(Price::parse("").is_err());
/// assert!(Price::parse("abc").is_err());
/// assert!(Price::parse("-1").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(f64);

impl Price {
    /// Create a price from a raw amount without validation.
    ///
    /// Used for values that come back from the backend, which already
    /// enforces its own column constraints.
    #[must_use]
    pub const fn new(amount: f64) -> Self {
        Self(amount)
    }

    /// Parse a price typed into the admin form.
    ///
    /// Surrounding whitespace is ignored. A comma decimal separator is not
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank, not numeric, not finite, or
    /// negative.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let amount: f64 = trimmed.parse().map_err(|_| PriceError::NotANumber)?;
        if !amount.is_finite() {
            return Err(PriceError::NotFinite);
        }
        if amount < 0.0 {
            return Err(PriceError::Negative);
        }

        Ok(Self(amount))
    }

    /// The raw amount.
    #[must_use]
    pub const fn amount(&self) -> f64 {
        self.0
    }

    /// Amount rounded to two fraction digits without the currency sign,
    /// suitable for pre-filling a form input.
    #[must_use]
    pub fn to_input_value(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
