//! Money amounts and percentage discounts.
//!
//! Prices are stored in the catalog as `numeric(10, 2)` in the store's single
//! currency, so [`Price`] is a validated, non-negative [`Decimal`] rather than
//! an amount/currency pair.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors raised when constructing a [`Price`] or [`DiscountRate`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices can be zero (free e-books) but never negative.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// Discount rates are percentages.
    #[error("discount rate must be between 0 and 100 (got {0})")]
    RateOutOfRange(Decimal),
}

/// A non-negative amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// The zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Validate and wrap an amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units, rounded to cents.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self((self.0 * Decimal::from(quantity)).round_dp(2))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// A percentage discount in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct DiscountRate(Decimal);

impl DiscountRate {
    /// Validate and wrap a percentage.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::RateOutOfRange`] outside `[0, 100]`.
    pub fn new(percent: Decimal) -> Result<Self, PriceError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(PriceError::RateOutOfRange(percent));
        }
        Ok(Self(percent))
    }

    /// The percentage value.
    #[must_use]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    /// Apply the discount to a price, rounding half-up to cents.
    #[must_use]
    pub fn apply(&self, price: Price) -> Price {
        let factor = (Decimal::ONE_HUNDRED - self.0) / Decimal::ONE_HUNDRED;
        let discounted =
            (price.0 * factor).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Price(discounted)
    }
}

impl TryFrom<Decimal> for DiscountRate {
    type Error = PriceError;

    fn try_from(percent: Decimal) -> Result<Self, Self::Error> {
        Self::new(percent)
    }
}

impl From<DiscountRate> for Decimal {
    fn from(rate: DiscountRate) -> Self {
        rate.0
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use rust_decimal::Decimal;
    use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
    use sqlx::{Decode, Encode, Postgres, Type};

    use super::{DiscountRate, Price};

    macro_rules! numeric_newtype {
        ($name:ident) => {
            impl Type<Postgres> for $name {
                fn type_info() -> PgTypeInfo {
                    <Decimal as Type<Postgres>>::type_info()
                }

                fn compatible(ty: &PgTypeInfo) -> bool {
                    <Decimal as Type<Postgres>>::compatible(ty)
                }
            }

            impl<'r> Decode<'r, Postgres> for $name {
                fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                    let amount = <Decimal as Decode<Postgres>>::decode(value)?;
                    Ok(Self::new(amount)?)
                }
            }

            impl Encode<'_, Postgres> for $name {
                fn encode_by_ref(
                    &self,
                    buf: &mut PgArgumentBuffer,
                ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                    <Decimal as Encode<Postgres>>::encode_by_ref(&self.0, buf)
                }
            }
        };
    }

    numeric_newtype!(Price);
    numeric_newtype!(DiscountRate);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal")
    }

    #[test]
    fn test_price_rejects_negative() {
        assert!(Price::new(dec("-0.01")).is_err());
        assert!(Price::new(Decimal::ZERO).is_ok());
        assert!(Price::new(dec("12.50")).is_ok());
    }

    #[test]
    fn test_price_deserializes_from_number_or_string() {
        let a: Price = serde_json::from_str("10").expect("number");
        let b: Price = serde_json::from_str("\"10.00\"").expect("string");
        assert_eq!(a, b);
        assert!(serde_json::from_str::<Price>("\"-3\"").is_err());
    }

    #[test]
    fn test_price_times_and_display() {
        let price = Price::new(dec("9.99")).expect("valid");
        assert_eq!(price.times(3).amount(), dec("29.97"));
        assert_eq!(price.to_string(), "$9.99");
    }

    #[test]
    fn test_discount_rate_bounds() {
        assert!(DiscountRate::new(dec("-1")).is_err());
        assert!(DiscountRate::new(dec("100.5")).is_err());
        assert!(DiscountRate::new(dec("0")).is_ok());
        assert!(DiscountRate::new(dec("100")).is_ok());
    }

    #[test]
    fn test_discount_apply_rounds_to_cents() {
        let rate = DiscountRate::new(dec("15")).expect("valid");
        let price = Price::new(dec("19.99")).expect("valid");
        assert_eq!(rate.apply(price).amount(), dec("16.99"));

        let full = DiscountRate::new(dec("100")).expect("valid");
        assert_eq!(full.apply(price), Price::ZERO);
    }
}
