//! Money amounts in minor currency units.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul};
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;

/// Amount in the smallest currency unit (e.g. paise, cents).
///
/// The backend stores two-decimal values and may emit them as JSON numbers or
/// decimal strings (`"1250.00"`); both deserialize here. Serialization emits a
/// JSON number of major units.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    /// `None` when `major` does not fit in minor units.
    pub fn checked_from_major(major: i64) -> Option<Self> {
        major.checked_mul(100).map(Self)
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    fn checked_from_f64(value: f64) -> Option<Self> {
        let minor = (value * 100.0).round();
        (minor.is_finite() && minor >= i64::MIN as f64 && minor < i64::MAX as f64)
            .then(|| Self(minor as i64))
    }

    fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Amount {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(DomainError::invalid_amount(format!("'{s}' is empty")));
        }
        if frac.len() > 2 {
            return Err(DomainError::invalid_amount(format!(
                "'{s}' has more than two decimal places"
            )));
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(DomainError::invalid_amount(format!("'{s}' is not a number")));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|e| DomainError::invalid_amount(format!("'{s}': {e}")))?
        };
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().unwrap_or(0) * 10,
            _ => frac.parse::<i64>().unwrap_or(0),
        };

        let minor = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(|| DomainError::invalid_amount(format!("'{s}' overflows")))?;

        Ok(Self(if negative { -minor } else { minor }))
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Mul<u32> for Amount {
    type Output = Amount;

    fn mul(self, rhs: u32) -> Self::Output {
        Amount(self.0 * i64::from(rhs))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_i64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.as_f64())
        }
    }
}

/// Any amount shape the backend emits.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum RawAmount {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawAmount {
    /// `None` for a blank string.
    pub(crate) fn resolve(self) -> Result<Option<Amount>, DomainError> {
        match self {
            RawAmount::Integer(n) => Amount::checked_from_major(n)
                .map(Some)
                .ok_or_else(|| DomainError::invalid_amount(format!("{n} overflows"))),
            RawAmount::Float(f) => Amount::checked_from_f64(f)
                .map(Some)
                .ok_or_else(|| DomainError::invalid_amount(format!("{f} is out of range"))),
            RawAmount::Text(s) if s.trim().is_empty() => Ok(None),
            RawAmount::Text(s) => s.parse().map(Some),
        }
    }
}

/// `null` and `""` read as zero.
impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<RawAmount>::deserialize(deserializer)? {
            None => Ok(Amount::ZERO),
            Some(raw) => Ok(raw
                .resolve()
                .map_err(serde::de::Error::custom)?
                .unwrap_or(Amount::ZERO)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("1250.00".parse::<Amount>().unwrap(), Amount::from_minor(125_000));
        assert_eq!("12.5".parse::<Amount>().unwrap(), Amount::from_minor(1_250));
        assert_eq!("-3".parse::<Amount>().unwrap(), Amount::from_minor(-300));
        assert_eq!(".75".parse::<Amount>().unwrap(), Amount::from_minor(75));
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!("1.234".parse::<Amount>().is_err());
        assert!("abc".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let a: Amount = serde_json::from_str("100").unwrap();
        let b: Amount = serde_json::from_str("100.0").unwrap();
        let c: Amount = serde_json::from_str("\"100.00\"").unwrap();
        assert_eq!(a, Amount::from_major(100));
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn oversized_numbers_are_errors_not_overflows() {
        assert!(serde_json::from_str::<Amount>("100000000000000000").is_err());
        assert!(serde_json::from_str::<Amount>("1e300").is_err());
        assert!(serde_json::from_str::<Amount>("\"100000000000000000\"").is_err());
        assert_eq!(Amount::checked_from_major(i64::MAX), None);
    }

    #[test]
    fn null_and_blank_read_as_zero() {
        assert_eq!(serde_json::from_str::<Amount>("null").unwrap(), Amount::ZERO);
        assert_eq!(serde_json::from_str::<Amount>("\" \"").unwrap(), Amount::ZERO);
    }

    #[test]
    fn serializes_major_units() {
        assert_eq!(serde_json::to_string(&Amount::from_major(200)).unwrap(), "200");
        assert_eq!(serde_json::to_string(&Amount::from_minor(1_050)).unwrap(), "10.5");
    }

    #[test]
    fn display_pads_minor_units() {
        assert_eq!(Amount::from_minor(1_005).to_string(), "10.05");
        assert_eq!(Amount::from_minor(-5).to_string(), "-0.05");
    }
}
