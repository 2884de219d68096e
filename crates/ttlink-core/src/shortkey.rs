use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The opaque token identifying a short link.
///
/// Keys handed in by callers must be non-empty and free of whitespace.
/// Generated keys come from a trusted generator and skip the check.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortKey(String);

impl ShortKey {
    /// Parses a caller-supplied key.
    pub fn parse(key: &str) -> std::result::Result<Self, ValidationError> {
        Self::validate(key)?;
        Ok(Self(key.to_owned()))
    }

    /// Creates a `ShortKey` without validation.
    ///
    /// Use this only for keys produced by trusted internal sources
    /// (e.g. key generators that are guaranteed to produce valid output).
    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the short key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn validate(key: &str) -> std::result::Result<(), ValidationError> {
        if key.trim().is_empty() {
            return Err(ValidationError::InvalidShortKey(
                "short key must not be empty".to_string(),
            ));
        }

        if key.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidShortKey(format!(
                "short key must not contain whitespace: '{}'",
                key
            )));
        }

        Ok(())
    }
}

impl Display for ShortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
