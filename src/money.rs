//! Exact monetary values in integer minor units.
//!
//! Money is stored as a signed 64-bit count of minor units (cents). All
//! arithmetic in the crate is integer arithmetic: amounts are never
//! accumulated as floating point, so batch totals are exact no matter how
//! many line items the batch contains.
//!
//! Decimal strings are a boundary representation only. Parsing and
//! formatting round-trip losslessly:
//!
//! ```
//! use batch_kit::Money;
//! use std::str::FromStr;
//!
//! let m = Money::from_str("1234.56").unwrap();
//! assert_eq!(m.minor_units(), 123_456);
//! assert_eq!(m.to_string(), "1234.56");
//! assert_eq!(Money::from_str(&m.to_string()).unwrap(), m);
//! ```
//!
//! # Serde
//!
//! `Money` serializes transparently as its minor-unit integer. Backends
//! that speak decimal strings convert explicitly via `FromStr`/`Display`
//! at the edge, keeping the machine representation unambiguous.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A monetary amount in integer minor units (cents).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Money = Money(0);

    /// Construct from a raw minor-unit count.
    pub const fn from_minor_units(units: i64) -> Self {
        Money(units)
    }

    /// The raw minor-unit count.
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// True for amounts below zero.
    ///
    /// A negative amount reaching the aggregator is flagged as a blocking
    /// issue; it never silently reduces a batch total.
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Overflow-checked addition.
    ///
    /// # Errors
    /// Returns `Error::Overflow` if the sum does not fit in `i64`.
    pub fn checked_add(self, other: Money) -> Result<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| Error::Overflow(format!("{} + {}", self.0, other.0)))
    }

    /// Sum an iterator of amounts with overflow checking.
    ///
    /// # Errors
    /// Returns `Error::Overflow` if any partial sum does not fit in `i64`.
    pub fn sum<I: IntoIterator<Item = Money>>(amounts: I) -> Result<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl fmt::Display for Money {
    /// Render as a decimal string with two fractional digits: `"-3.05"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = Error;

    /// Parse a decimal string into minor units, exactly.
    ///
    /// Accepts an optional leading `-`, thousands separators (`,`), and at
    /// most two fractional digits: `"1,234.5"` parses as `123450` minor
    /// units. Rejects anything that would lose precision.
    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim().replace(',', "");
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.as_str()),
        };
        if digits.is_empty() {
            return Err(Error::InvalidAmount(s.to_string()));
        }

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if frac_part.len() > 2
            || !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
            || (int_part.is_empty() && frac_part.is_empty())
        {
            return Err(Error::InvalidAmount(s.to_string()));
        }

        let units: i64 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| Error::InvalidAmount(s.to_string()))?
        };
        // ".5" means 50 minor units, ".05" means 5
        let cents: i64 = match frac_part.len() {
            0 => 0,
            1 => frac_part.parse::<i64>().map_err(|_| Error::InvalidAmount(s.to_string()))? * 10,
            _ => frac_part
                .parse()
                .map_err(|_| Error::InvalidAmount(s.to_string()))?,
        };

        let magnitude = units
            .checked_mul(100)
            .and_then(|u| u.checked_add(cents))
            .ok_or_else(|| Error::InvalidAmount(s.to_string()))?;

        Ok(Money(if negative { -magnitude } else { magnitude }))
    }
}
