//! Repair cost amounts
//!
//! Costs are kept as whole cents so a quoted amount reads back exactly as it
//! was entered. Stored as an INTEGER column.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// A non-negative amount with two fraction digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cost(i64);

impl Cost {
    pub const ZERO: Cost = Cost(0);

    pub fn from_cents(cents: i64) -> crate::Result<Self> {
        if cents < 0 {
            return Err(Error::validation("repair cost cannot be negative"));
        }
        Ok(Cost(cents))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Format with a currency symbol and thousands separators: `$1,234.50`
    pub fn format_with(&self, symbol: &str) -> String {
        let whole = (self.0 / 100).to_string();
        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        format!("{}{}.{:02}", symbol, grouped, self.0 % 100)
    }
}

impl TryFrom<f64> for Cost {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(Error::validation(format!("invalid repair cost: {}", value)));
        }
        Cost::from_cents((value * 100.0).round() as i64)
    }
}

impl std::str::FromStr for Cost {
    type Err = Error;

    /// Accepts `150`, `150.5`, `150.50`, `$150,50` and `$1,234.50` as printed by
    /// [`Cost::format_with`]. A lone `,` is a decimal separator; before a `.`
    /// commas separate thousands. At most two fraction digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || Error::validation(format!("invalid repair cost: {:?}", s));

        if raw.starts_with('-') {
            return Err(Error::validation("repair cost cannot be negative"));
        }
        let raw = raw.strip_prefix('$').unwrap_or(raw).trim();
        if raw.is_empty() {
            return Err(invalid());
        }

        let ungrouped;
        let raw = match raw.rfind('.') {
            Some(dot) if raw[..dot].contains(',') => {
                let mut groups = raw[..dot].split(',');
                let lead_ok = groups.next().is_some_and(|g| (1..=3).contains(&g.len()));
                if !lead_ok || !groups.all(|g| g.len() == 3) {
                    return Err(invalid());
                }
                ungrouped = raw.replace(',', "");
                ungrouped.as_str()
            }
            _ => raw,
        };

        let (whole, frac) = match raw.find(['.', ',']) {
            Some(pos) => (&raw[..pos], &raw[pos + 1..]),
            None => (raw, ""),
        };
        if frac.len() > 2
            || (whole.is_empty() && frac.is_empty())
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(invalid)?;
        Cost::from_cents(cents)
    }
}

impl std::fmt::Display for Cost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Cost {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Cost {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Cost::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl ToSql for Cost {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Cost {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let cents = i64::column_result(value)?;
        if cents < 0 {
            return Err(FromSqlError::OutOfRange(cents));
        }
        Ok(Cost(cents))
    }
}
