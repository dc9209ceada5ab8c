//! Canonical employee identifier
//!
//! Every write and lookup path goes through [`EmployeeId::parse`], which
//! accepts the legacy spellings (`emp_001`, `emp-1`, `Emp001`) and always
//! yields `EMP` followed by at least three digits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const PREFIX: &str = "EMP";
const MAX_DIGITS: usize = 9;

/// Error returned for identifiers that cannot be normalized
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid employee id: {0:?}")]
pub struct InvalidEmployeeId(pub String);

/// Canonical employee identifier, e.g. `EMP001`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "String", into = "String")]
#[sqlx(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
    /// Normalize a raw identifier into canonical form
    pub fn parse(raw: &str) -> Result<Self, InvalidEmployeeId> {
        let invalid = || InvalidEmployeeId(raw.to_string());

        let upper = raw.trim().to_ascii_uppercase();
        let rest = upper.strip_prefix(PREFIX).ok_or_else(invalid)?;
        let digits = rest.trim_start_matches(['_', '-']);

        if digits.is_empty()
            || digits.len() > MAX_DIGITS
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let number: u64 = digits.parse().map_err(|_| invalid())?;
        if number == 0 {
            return Err(invalid());
        }

        Ok(Self::from_number(number))
    }

    /// Build an identifier from a sequence number
    pub fn from_number(number: u64) -> Self {
        EmployeeId(format!("{PREFIX}{number:03}"))
    }

    /// The numeric part of the identifier
    pub fn number(&self) -> u64 {
        self.0[PREFIX.len()..].parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EmployeeId {
    type Err = InvalidEmployeeId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EmployeeId {
    type Error = InvalidEmployeeId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmployeeId> for String {
    fn from(id: EmployeeId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_formats_normalize() {
        for raw in ["EMP001", "emp_001", "emp-1", "Emp001", " EMP1 ", "EMP_0001"] {
            assert_eq!(EmployeeId::parse(raw).unwrap().as_str(), "EMP001", "{raw}");
        }
    }

    #[test]
    fn test_wide_numbers_keep_all_digits() {
        assert_eq!(EmployeeId::parse("emp_1234").unwrap().as_str(), "EMP1234");
        assert_eq!(EmployeeId::from_number(42).as_str(), "EMP042");
        assert_eq!(EmployeeId::parse("EMP042").unwrap().number(), 42);
    }

    #[test]
    fn test_rejects_garbage() {
        for raw in ["", "EMP", "EMP_", "E001", "EMP0", "EMPabc", "001", "EMP1234567890"] {
            assert!(EmployeeId::parse(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn test_serde_normalizes_on_deserialize() {
        let id: EmployeeId = serde_json::from_str("\"emp_007\"").unwrap();
        assert_eq!(id.as_str(), "EMP007");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"EMP007\"");
        assert!(serde_json::from_str::<EmployeeId>("\"nope\"").is_err());
    }
}
