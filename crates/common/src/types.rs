use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of an authoritative customer row.
///
/// The write store generates it; the sync message carries it as decimal
/// text and the read model uses that same text as the document key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(i64);

impl CustomerId {
    /// Wraps a raw identifier produced by the write store.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CustomerId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<CustomerId> for i64 {
    fn from(id: CustomerId) -> Self {
        id.0
    }
}

/// Error returned when text is not a decimal customer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{input}' is not a valid customer id: {source}")]
pub struct ParseCustomerIdError {
    pub input: String,
    #[source]
    pub source: ParseIntError,
}

impl FromStr for CustomerId {
    type Err = ParseCustomerIdError;

    /// Parses decimal text, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|source| ParseCustomerIdError {
                input: s.to_string(),
                source,
            })
    }
}
