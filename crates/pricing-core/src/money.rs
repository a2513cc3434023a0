//! # Money Types
//!
//! Amounts are kept as integers in the smallest currency unit (cents for USD),
//! rates in basis points. No floating point arithmetic happens on amounts
//! once they are constructed.

use crate::error::{PricingError, PricingResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
    CHF,
    MXN,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::CAD => "cad",
            Currency::AUD => "aud",
            Currency::CHF => "chf",
            Currency::MXN => "mxn",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, most others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Display symbol used when formatting amounts
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
            Currency::CHF => "CHF ",
            Currency::MXN => "MX$",
        }
    }

    /// Convert a decimal amount to the smallest currency unit (cents, etc.)
    pub fn to_minor_units(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_minor_units(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// A proportional rate in basis points (1/100 of a percent).
///
/// `Rate::from_bps(1000)` is 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rate {
    bps: u32,
}

impl Rate {
    pub const ZERO: Rate = Rate { bps: 0 };

    pub fn from_bps(bps: u32) -> Self {
        Self { bps }
    }

    /// Create a rate from a percentage such as `19.0` or `2.5`
    pub fn from_percent(percent: f64) -> PricingResult<Self> {
        if !percent.is_finite() || percent < 0.0 {
            return Err(PricingError::Configuration(format!(
                "rate must be a non-negative percentage, got {percent}"
            )));
        }
        let bps = (percent * 100.0).round();
        if bps > u32::MAX as f64 {
            return Err(PricingError::Configuration(format!(
                "rate {percent}% is out of range"
            )));
        }
        Ok(Self { bps: bps as u32 })
    }

    pub fn bps(&self) -> u32 {
        self.bps
    }

    pub fn as_percent(&self) -> f64 {
        self.bps as f64 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.bps == 0
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.bps % 100 == 0 {
            write!(f, "{}%", self.bps / 100)
        } else {
            write!(f, "{:.2}%", self.as_percent())
        }
    }
}

/// Integer division rounding half away from zero
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

/// Amount with value in smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in smallest currency unit (cents for USD)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create money from a decimal amount
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_minor_units(amount),
            currency,
        }
    }

    /// Create money from the smallest unit (cents)
    pub fn from_minor(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_minor_units(self.amount)
    }

    /// Format for display (e.g., "$10.00")
    pub fn display(&self) -> String {
        let symbol = self.currency.symbol();
        if self.currency.decimal_places() == 0 {
            format!("{}{}", symbol, self.amount)
        } else {
            format!("{}{:.2}", symbol, self.as_decimal())
        }
    }

    fn ensure_currency(&self, other: &Money) -> PricingResult<()> {
        if self.currency != other.currency {
            return Err(PricingError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(())
    }

    fn overflow(&self, op: &str) -> PricingError {
        PricingError::InvalidAmount {
            message: format!("{op} overflows {}", self.display()),
        }
    }

    pub fn checked_add(&self, other: &Money) -> PricingResult<Money> {
        self.ensure_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| self.overflow("addition"))?;
        Ok(Money::from_minor(amount, self.currency))
    }

    pub fn checked_sub(&self, other: &Money) -> PricingResult<Money> {
        self.ensure_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or_else(|| self.overflow("subtraction"))?;
        Ok(Money::from_minor(amount, self.currency))
    }

    /// Multiply a unit amount by a quantity
    pub fn times(&self, quantity: u32) -> PricingResult<Money> {
        let amount = self
            .amount
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| self.overflow("multiplication"))?;
        Ok(Money::from_minor(amount, self.currency))
    }

    /// The share of this amount given by `rate`, e.g. the tax on a net amount
    pub fn apply_rate(&self, rate: Rate) -> PricingResult<Money> {
        let share = div_round(i128::from(self.amount) * i128::from(rate.bps()), 10_000);
        let amount = i64::try_from(share).map_err(|_| self.overflow("rate application"))?;
        Ok(Money::from_minor(amount, self.currency))
    }

    /// The share of `rate` already contained in this gross amount,
    /// i.e. `self - self / (1 + rate)`
    pub fn contained_rate(&self, rate: Rate) -> Money {
        let net = div_round(
            self.amount as i128 * 10_000,
            10_000 + rate.bps() as i128,
        );
        Money::from_minor(self.amount - net as i64, self.currency)
    }

    /// Compare two amounts of the same currency
    pub fn compare(&self, other: &Money) -> PricingResult<Ordering> {
        self.ensure_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// Sum amounts that must all be in `currency`
    pub fn sum<'a, I>(currency: Currency, amounts: I) -> PricingResult<Money>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_conversion() {
        let usd = Currency::USD;
        assert_eq!(usd.to_minor_units(10.99), 1099);
        assert_eq!(usd.from_minor_units(1099), 10.99);

        let jpy = Currency::JPY;
        assert_eq!(jpy.to_minor_units(1000.0), 1000);
        assert_eq!(jpy.from_minor_units(1000), 1000.0);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(29.99, Currency::USD).display(), "$29.99");
        assert_eq!(Money::new(19.99, Currency::EUR).to_string(), "€19.99");
        assert_eq!(Money::from_minor(500, Currency::JPY).display(), "¥500");
    }

    #[test]
    fn test_arithmetic_rejects_mixed_currencies() {
        let usd = Money::new(1.0, Currency::USD);
        let eur = Money::new(1.0, Currency::EUR);

        assert!(matches!(
            usd.checked_add(&eur),
            Err(PricingError::CurrencyMismatch { .. })
        ));
        assert_eq!(usd.checked_add(&usd).unwrap().amount, 200);
        assert_eq!(usd.checked_sub(&usd).unwrap(), Money::zero(Currency::USD));
    }

    #[test]
    fn test_times_quantity() {
        let unit = Money::new(10.0, Currency::USD);
        assert_eq!(unit.times(2).unwrap().amount, 2000);
        assert!(Money::from_minor(i64::MAX, Currency::USD).times(2).is_err());
    }

    #[test]
    fn test_apply_rate_rounds_half_away_from_zero() {
        let rate = Rate::from_bps(1000);
        assert_eq!(Money::new(20.0, Currency::USD).apply_rate(rate).unwrap().amount, 200);

        // 0.05 * 10% = 0.005 -> 0.01
        assert_eq!(Money::from_minor(5, Currency::USD).apply_rate(rate).unwrap().amount, 1);
        assert_eq!(Money::from_minor(-5, Currency::USD).apply_rate(rate).unwrap().amount, -1);
    }

    #[test]
    fn test_apply_rate_overflow() {
        let huge = Money::from_minor(i64::MAX, Currency::USD);

        let err = huge.apply_rate(Rate::from_bps(u32::MAX)).unwrap_err();
        assert!(matches!(err, PricingError::InvalidAmount { .. }));

        // A rate below 100% never overflows
        assert!(huge.apply_rate(Rate::from_bps(9_999)).is_ok());
    }

    #[test]
    fn test_contained_rate() {
        // 119.00 gross at 19% contains 19.00
        let gross = Money::new(119.0, Currency::EUR);
        assert_eq!(gross.contained_rate(Rate::from_bps(1900)).amount, 1900);
        assert!(gross.contained_rate(Rate::ZERO).is_zero());
    }

    #[test]
    fn test_rate_from_percent() {
        assert_eq!(Rate::from_percent(10.0).unwrap().bps(), 1000);
        assert_eq!(Rate::from_percent(2.5).unwrap().bps(), 250);
        assert!(Rate::from_percent(-1.0).is_err());
        assert!(Rate::from_percent(f64::NAN).is_err());
        assert_eq!(Rate::from_bps(1900).to_string(), "19%");
        assert_eq!(Rate::from_bps(250).to_string(), "2.50%");
    }

    #[test]
    fn test_sum() {
        let amounts = [
            Money::new(10.0, Currency::USD),
            Money::new(2.5, Currency::USD),
        ];
        assert_eq!(Money::sum(Currency::USD, &amounts).unwrap().amount, 1250);
        assert!(Money::sum(Currency::EUR, &amounts).is_err());
        assert!(Money::sum(Currency::USD, std::iter::empty()).unwrap().is_zero());
    }
}
