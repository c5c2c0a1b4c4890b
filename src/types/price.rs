//! Fixed-point price representation.
//!
//! Prices carry four decimal places and are stored as an integer count of
//! 1/10000 of a currency unit, so every arithmetic operation on money is
//! exact. Floating point appears only in derived statistics (imbalance,
//! spread in basis points), never in the books or the ledger.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of minor units per whole currency unit (four decimal places).
pub const PRICE_SCALE: u64 = 10_000;

/// Maximum number of fractional digits accepted by the decimal parser.
const MAX_DECIMALS: usize = 4;

/// Errors produced when parsing a decimal price string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceParseError {
    /// The input string was empty or contained only a sign.
    #[error("empty price string")]
    Empty,

    /// A character other than digits and a single decimal point was found.
    #[error("invalid character {0:?} in price string")]
    InvalidDigit(char),

    /// More than four fractional digits were supplied; the conversion
    /// would not be lossless.
    #[error("price has more than {MAX_DECIMALS} decimal places")]
    TooManyDecimals,

    /// The value does not fit in the internal 64-bit representation.
    #[error("price overflows the internal representation")]
    Overflow,

    /// Prices are non-negative; a leading minus sign is rejected.
    #[error("negative prices are not representable")]
    Negative,
}

/// A non-negative price in minor units (1/10000 of a unit).
///
/// `Price` is `Copy` and totally ordered, which makes it usable directly as
/// a key in the per-side level maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(u64);

impl Price {
    /// The zero price.
    pub const ZERO: Price = Price(0);

    /// Build a price from a raw count of minor units.
    #[inline]
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Price(minor)
    }

    /// Build a price from whole currency units.
    #[inline]
    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Price(units * PRICE_SCALE)
    }

    /// The raw count of minor units.
    #[inline]
    #[must_use]
    pub const fn minor(self) -> u64 {
        self.0
    }

    /// The raw count of minor units as a signed value, for P&L arithmetic.
    #[inline]
    #[must_use]
    pub const fn minor_i64(self) -> i64 {
        self.0 as i64
    }

    /// Whether this price is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Midpoint of two prices, floored to the nearest minor unit.
    ///
    /// The floor keeps the result an exact integer so the same value can be
    /// used for mark-to-mid accounting without rounding drift.
    #[inline]
    #[must_use]
    pub const fn midpoint(self, other: Price) -> Price {
        Price((self.0 + other.0) / 2)
    }

    /// Absolute difference between two prices.
    #[inline]
    #[must_use]
    pub const fn abs_diff(self, other: Price) -> Price {
        Price(self.0.abs_diff(other.0))
    }

    /// The price as a floating-point number of whole units.
    ///
    /// Only for derived statistics and display; never feed this back into
    /// book or ledger state.
    #[inline]
    #[must_use]
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04}", self.0 / PRICE_SCALE, self.0 % PRICE_SCALE)
    }
}

impl FromStr for Price {
    type Err = PriceParseError;

    /// Parse a decimal string losslessly into minor units.
    ///
    /// Accepts at most four fractional digits; anything finer is rejected
    /// rather than rounded. `"10"`, `"10.5"` and `"10.5000"` all parse to
    /// the same price.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(PriceParseError::Negative);
        }
        let s = s.strip_prefix('+').unwrap_or(s);
        if s.is_empty() {
            return Err(PriceParseError::Empty);
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(PriceParseError::Empty);
        }
        if frac_part.len() > MAX_DECIMALS {
            return Err(PriceParseError::TooManyDecimals);
        }

        let mut minor: u64 = 0;
        for c in int_part.chars() {
            let d = c.to_digit(10).ok_or(PriceParseError::InvalidDigit(c))? as u64;
            minor = minor
                .checked_mul(10)
                .and_then(|m| m.checked_add(d))
                .ok_or(PriceParseError::Overflow)?;
        }
        minor = minor
            .checked_mul(PRICE_SCALE)
            .ok_or(PriceParseError::Overflow)?;

        let mut frac: u64 = 0;
        for c in frac_part.chars() {
            let d = c.to_digit(10).ok_or(PriceParseError::InvalidDigit(c))? as u64;
            frac = frac * 10 + d;
        }
        frac *= 10u64.pow((MAX_DECIMALS - frac_part.len()) as u32);

        minor.checked_add(frac).map(Price).ok_or(PriceParseError::Overflow)
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct PriceVisitor;

impl Visitor<'_> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a decimal price string with at most four decimals")
    }

    fn visit_str<E>(self, v: &str) -> Result<Price, E>
    where
        E: de::Error,
    {
        v.parse().map_err(de::Error::custom)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Price, E>
    where
        E: de::Error,
    {
        v.checked_mul(PRICE_SCALE)
            .map(Price)
            .ok_or_else(|| de::Error::custom(PriceParseError::Overflow))
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(PriceVisitor)
    }
}
