//! Money amounts using decimal arithmetic.
//!
//! Prices, delivery fees, ad budgets and plan prices are all stored as
//! [`Decimal`] in the currency's standard unit (reais, not centavos).

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes the dashboard deals in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Brazilian real. Every plan and menu is priced in BRL.
    #[default]
    BRL,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Symbol printed before the amount.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::BRL => "R$",
            Self::USD => "$",
            Self::EUR => "€",
        }
    }

    /// Decimal and thousands separators for this currency's locale.
    const fn separators(self) -> (char, char) {
        match self {
            Self::BRL | Self::EUR => (',', '.'),
            Self::USD => ('.', ','),
        }
    }
}

/// An amount with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// An amount in Brazilian reais.
    #[must_use]
    pub const fn brl(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::BRL)
    }

    /// Build from an integer number of cents.
    #[must_use]
    pub fn from_cents(cents: i64, currency: CurrencyCode) -> Self {
        Self::new(Decimal::new(cents, 2), currency)
    }

    /// True when the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

impl fmt::Display for Money {
    /// Formats as the locale expects, e.g. `R$ 1.500,00` or `$ 1,500.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (decimal_sep, thousands_sep) = self.currency.separators();
        let rounded = format!("{:.2}", self.amount.abs());
        let (whole, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(thousands_sep);
            }
            grouped.push(digit);
        }

        let sign = if self.is_negative() { "-" } else { "" };
        write!(
            f,
            "{sign}{} {grouped}{decimal_sep}{frac}",
            self.currency.symbol()
        )
    }
}
