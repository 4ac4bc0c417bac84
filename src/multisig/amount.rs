//! Exact-precision transfer amounts
//!
//! Amounts are fixed-point decimals with [`DECIMALS`] fractional digits,
//! held as integer minor units. They are parsed from and rendered as decimal
//! strings and never pass through floating point.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits carried by an [`Amount`]
pub const DECIMALS: u32 = 8;

/// Minor units per whole unit
pub const UNIT: u64 = 10u64.pow(DECIMALS);

/// Errors produced when parsing or combining amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount: {0}")]
    Invalid(String),
    #[error("amount has more than 8 fractional digits")]
    TooPrecise,
    #[error("amount overflows")]
    Overflow,
}

/// A non-negative decimal amount in minor units
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Build from raw minor units
    pub const fn from_minor_units(units: u64) -> Self {
        Self(units)
    }

    /// Build from a whole number of units
    pub fn from_units(units: u64) -> Result<Self, AmountError> {
        units
            .checked_mul(UNIT)
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    pub const fn minor_units(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::Invalid(s.to_string()));
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(AmountError::Invalid(s.to_string()));
        }
        if frac.len() > DECIMALS as usize {
            return Err(AmountError::TooPrecise);
        }

        let whole_units: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| AmountError::Overflow)?
        };

        let mut frac_units: u64 = 0;
        if !frac.is_empty() {
            let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
            frac_units = padded
                .parse()
                .map_err(|_| AmountError::Invalid(s.to_string()))?;
        }

        whole_units
            .checked_mul(UNIT)
            .and_then(|w| w.checked_add(frac_units))
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:0width$}", frac, width = DECIMALS as usize);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        let amount: Amount = "10.00".parse().unwrap();
        assert_eq!(amount.minor_units(), 10 * UNIT);

        let amount: Amount = "0.00000001".parse().unwrap();
        assert_eq!(amount.minor_units(), 1);

        let amount: Amount = ".5".parse().unwrap();
        assert_eq!(amount.minor_units(), UNIT / 2);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!("".parse::<Amount>(), Err(AmountError::Empty));
        assert!(matches!("-1".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert!(matches!("1e5".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert!(matches!(".".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert!(matches!("1.2.3".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert_eq!(
            "0.000000001".parse::<Amount>(),
            Err(AmountError::TooPrecise)
        );
        assert_eq!(
            "184467440737.09551616".parse::<Amount>(),
            Err(AmountError::Overflow)
        );
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!("10.00".parse::<Amount>().unwrap().to_string(), "10");
        assert_eq!("10.50".parse::<Amount>().unwrap().to_string(), "10.5");
        assert_eq!("0.00000001".parse::<Amount>().unwrap().to_string(), "0.00000001");
    }

    #[test]
    fn test_serde_as_string() {
        let amount: Amount = "2.25".parse().unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"2.25\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Amount::from_units(5).unwrap();
        let b = Amount::from_units(3).unwrap();
        assert_eq!(a.checked_sub(b), Some(Amount::from_units(2).unwrap()));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(Amount::from_minor_units(u64::MAX).checked_add(b), None);
    }
}
