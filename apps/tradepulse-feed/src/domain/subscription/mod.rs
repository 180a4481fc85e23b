//! Subscription Types
//!
//! Domain types for per-user watchlists. The subscription set is owned by an
//! external user directory; these types only describe it.
//!
//! # Design
//!
//! - A [`SubscriptionSet`] has no duplicates and iterates in sorted order, so
//!   every response carries the same canonical ordering.
//! - A [`UserId`] is an e-mail address normalised by trimming and lower-casing.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::instrument::Symbol;

// =============================================================================
// User Identifier
// =============================================================================

/// Normalised user identifier (e-mail address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Normalise a raw identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::MissingField`] if the input is blank.
    pub fn parse(raw: &str) -> Result<Self, SubscriptionError> {
        let normalised = raw.trim().to_lowercase();
        if normalised.is_empty() {
            return Err(SubscriptionError::MissingField("email"));
        }
        Ok(Self(normalised))
    }

    /// The normalised identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Subscription Set
// =============================================================================

/// A user's subscribed symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionSet {
    symbols: BTreeSet<Symbol>,
}

impl SubscriptionSet {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            symbols: BTreeSet::new(),
        }
    }

    /// Add a symbol. Returns `true` if it was not present.
    pub fn insert(&mut self, symbol: impl Into<Symbol>) -> bool {
        self.symbols.insert(symbol.into())
    }

    /// Remove a symbol. Returns `true` if it was present.
    pub fn remove(&mut self, symbol: &str) -> bool {
        self.symbols.remove(symbol)
    }

    /// Check membership.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    /// Iterate in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// Symbols in canonical order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Symbol> {
        self.symbols.iter().cloned().collect()
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl<S: Into<Symbol>> FromIterator<S> for SubscriptionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Rejections from subscribe/unsubscribe.
///
/// Every variant means nothing was changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    /// Symbol is not part of the instrument universe.
    #[error("invalid ticker symbol: {0}")]
    InvalidSymbol(Symbol),

    /// User is unknown to the directory.
    #[error("user not found: {0}")]
    NotFound(UserId),

    /// A required request field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The directory could not be reached or failed to store the change.
    #[error("user directory failure: {0}")]
    Directory(String),
}

impl SubscriptionError {
    /// Short label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSymbol(_) => "invalid_symbol",
            Self::NotFound(_) => "not_found",
            Self::MissingField(_) => "missing_field",
            Self::Directory(_) => "directory",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_is_normalised() {
        let id = UserId::parse("  A@X.com ").unwrap();
        assert_eq!(id.as_str(), "a@x.com");
    }

    #[test]
    fn blank_user_id_is_rejected() {
        assert_eq!(
            UserId::parse("   "),
            Err(SubscriptionError::MissingField("email"))
        );
    }

    #[test]
    fn set_has_no_duplicates() {
        let mut set = SubscriptionSet::new();
        assert!(set.insert("GOOG"));
        assert!(!set.insert("GOOG"));
        assert_eq!(set.to_vec(), vec!["GOOG".to_string()]);
    }

    #[test]
    fn set_iterates_sorted() {
        let set: SubscriptionSet = ["TSLA", "GOOG", "AMZN"].into_iter().collect();
        assert_eq!(set.to_vec(), vec!["AMZN", "GOOG", "TSLA"]);
    }

    #[test]
    fn set_serializes_as_array() {
        let set: SubscriptionSet = ["NVDA", "GOOG"].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["GOOG","NVDA"]"#);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut set: SubscriptionSet = ["GOOG"].into_iter().collect();
        assert!(!set.remove("META"));
        assert_eq!(set.len(), 1);
    }
}
