//! Postal code (CEP) and region code types.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PostalCode`] or [`RegionCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PostalCodeError {
    /// The input string is empty.
    #[error("postal code cannot be empty")]
    Empty,
    /// The input does not contain exactly eight digits.
    #[error("postal code must have {expected} digits (got {got})")]
    WrongLength {
        /// Required digit count.
        expected: usize,
        /// Digits found in the input.
        got: usize,
    },
    /// The input contains something other than digits and one hyphen.
    #[error("postal code may only contain digits and a hyphen")]
    InvalidCharacter,
    /// A region code that is not two ASCII letters.
    #[error("region code must be two letters")]
    InvalidRegion,
}

/// An eight-digit postal code.
///
/// Accepts the masked (`01310-100`) and the bare (`01310100`) form and stores
/// the bare digits.
///
/// ## Examples
///
/// ```
/// use vitrine_core::PostalCode;
///
/// assert_eq!(PostalCode::parse("01310-100").unwrap().as_str(), "01310100");
/// assert!(PostalCode::parse("0131010").is_err());
/// assert!(PostalCode::parse("01310-10a").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    /// Number of digits in a postal code.
    pub const DIGITS: usize = 8;

    /// Parse a `PostalCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Is empty
    /// - Contains characters other than digits, a hyphen or surrounding whitespace
    /// - Does not have exactly eight digits
    pub fn parse(s: &str) -> Result<Self, PostalCodeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PostalCodeError::Empty);
        }

        if trimmed.chars().any(|c| !(c.is_ascii_digit() || c == '-')) {
            return Err(PostalCodeError::InvalidCharacter);
        }

        let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != Self::DIGITS {
            return Err(PostalCodeError::WrongLength {
                expected: Self::DIGITS,
                got: digits.len(),
            });
        }

        Ok(Self(digits))
    }

    /// Returns the bare digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the masked form, e.g. `01310-100`.
    #[must_use]
    pub fn masked(&self) -> String {
        let (head, tail) = self.0.split_at(5);
        format!("{head}-{tail}")
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl std::str::FromStr for PostalCode {
    type Err = PostalCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PostalCode {
    type Error = PostalCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PostalCode> for String {
    fn from(code: PostalCode) -> Self {
        code.0
    }
}

impl AsRef<str> for PostalCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Two-letter region (state) code, stored upper-case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct RegionCode(String);

impl RegionCode {
    /// Parse a region code such as `sp` or `RJ`.
    ///
    /// # Errors
    ///
    /// Returns [`PostalCodeError::InvalidRegion`] unless the trimmed input is
    /// exactly two ASCII letters.
    pub fn parse(s: &str) -> Result<Self, PostalCodeError> {
        let trimmed = s.trim();
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(PostalCodeError::InvalidRegion)
        }
    }

    /// Returns the upper-case code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RegionCode {
    type Error = PostalCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegionCode> for String {
    fn from(code: RegionCode) -> Self {
        code.0
    }
}
