use std::fmt;

use crate::error::HarnessError;

pub const REFERENCE_DELIMITER: &str = "::";

/// A parsed `<unit>::<entry-point>` handler reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerReference {
    pub unit: String,
    pub entry_point: String,
}

impl HandlerReference {
    /// Splits `reference` on the single `::` delimiter. Any other delimiter
    /// count, or an empty side, is a malformed reference.
    pub fn parse(reference: &str) -> Result<Self, HarnessError> {
        let malformed = || HarnessError::MalformedReference {
            reference: reference.to_string(),
        };

        if reference.matches(REFERENCE_DELIMITER).count() != 1 {
            return Err(malformed());
        }

        let Some((unit, entry_point)) = reference.split_once(REFERENCE_DELIMITER) else {
            return Err(malformed());
        };

        if unit.is_empty() || entry_point.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            unit: unit.to_string(),
            entry_point: entry_point.to_string(),
        })
    }
}

impl fmt::Display for HandlerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{REFERENCE_DELIMITER}{}", self.unit, self.entry_point)
    }
}
