//! Validated primitive types shared by the lab result crates.
//!
//! - [`NonEmptyText`]: trimmed text with at least one non-whitespace character.
//! - [`TestKey`]: a normalized laboratory test identifier used to match observations against
//!   configured critical thresholds.
//!
//! Both serialize as plain strings and re-validate on deserialization.

use serde::{Deserialize, Serialize};

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    #[error("Text cannot be empty")]
    Empty,
}

fn trimmed_non_empty(input: &str) -> Result<&str, TextError> {
    match input.trim() {
        "" => Err(TextError::Empty),
        trimmed => Ok(trimmed),
    }
}

// ============================================================================
// NonEmptyText
// ============================================================================

/// Text that is never empty, trimmed on construction.
///
/// Used for identifiers that downstream systems cannot accept blank, such as a patient ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyText(String);

impl NonEmptyText {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        trimmed_non_empty(input.as_ref()).map(|s| Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NonEmptyText {
    type Error = TextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyText> for String {
    fn from(value: NonEmptyText) -> Self {
        value.0
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// TestKey
// ============================================================================

/// Normalized laboratory test identifier.
///
/// Observation codes and display names arrive in whatever case the sending laboratory uses
/// (`GLU`, `glu`, ` Glucose `). A `TestKey` is the trimmed, ASCII-uppercased form, so that
/// `pH`, `PH` and `ph` all address the same threshold entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TestKey(String);

impl TestKey {
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if the input is empty after trimming.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        trimmed_non_empty(input.as_ref()).map(|s| Self(s.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TestKey {
    type Error = TextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TestKey> for String {
    fn from(value: TestKey) -> Self {
        value.0
    }
}

impl std::fmt::Display for TestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
