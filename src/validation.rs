//! Order number validation.
//!
//! Order numbers are externally supplied digit strings checked with the
//! Luhn algorithm. The field is private to force validation through `new()`:
//! a function that takes an `OrderNumber` can rely on the format holding.

use std::fmt;

/// Validation errors for order numbers
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Order number must be 1-32 digits: got {actual} characters")]
    InvalidLength { actual: usize },

    #[error("Order number must contain only digits: got '{got}'")]
    NotNumeric { got: String },

    #[error("Order number failed the Luhn check: '{got}'")]
    LuhnCheckFailed { got: String },
}

/// Validated order number (digits only, Luhn-valid)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Create a new validated OrderNumber
    ///
    /// # Validation Rules
    /// - 1-32 characters after trimming
    /// - ASCII digits only
    /// - Luhn checksum must hold
    pub fn new(number: &str) -> Result<Self, ValidationError> {
        let number = number.trim();

        if number.is_empty() || number.len() > 32 {
            return Err(ValidationError::InvalidLength {
                actual: number.len(),
            });
        }

        if !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::NotNumeric {
                got: number.to_string(),
            });
        }

        if !luhn_valid(number) {
            return Err(ValidationError::LuhnCheckFailed {
                got: number.to_string(),
            });
        }

        Ok(Self(number.to_string()))
    }

    /// Get the validated number as &str
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into owned String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Luhn checksum over an all-digit string.
fn luhn_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .rev()
        .enumerate()
        .map(|(i, c)| {
            let d = c.to_digit(10).unwrap_or(0);
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}
