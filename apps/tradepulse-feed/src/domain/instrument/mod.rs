//! Instrument Universe
//!
//! The fixed set of tradable symbols served by the feed. The universe is
//! configuration data: it is built once at process start and never changes.

use std::sync::Arc;

use serde::Serialize;

// =============================================================================
// Types
// =============================================================================

/// A ticker symbol (e.g. `GOOG`).
pub type Symbol = String;

/// Standard universe entries as `(symbol, display name)`, in display order.
const STANDARD_INSTRUMENTS: [(&str, &str); 5] = [
    ("GOOG", "Alphabet Inc."),
    ("TSLA", "Tesla Inc."),
    ("AMZN", "Amazon.com Inc."),
    ("META", "Meta Platforms Inc."),
    ("NVDA", "NVIDIA Corporation"),
];

/// A tradable instrument with display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instrument {
    /// Unique ticker symbol.
    pub symbol: Symbol,
    /// Human-readable company name.
    pub name: String,
}

impl Instrument {
    /// Create a new instrument.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

// =============================================================================
// Universe
// =============================================================================

/// Immutable, ordered set of instruments.
///
/// Symbols are unique; duplicates passed to [`Universe::from_instruments`]
/// keep the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    instruments: Vec<Instrument>,
}

/// Shared universe reference.
pub type SharedUniverse = Arc<Universe>;

impl Default for Universe {
    fn default() -> Self {
        Self::standard()
    }
}

impl Universe {
    /// The five-instrument universe the feed ships with.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_instruments(
            STANDARD_INSTRUMENTS
                .iter()
                .map(|(symbol, name)| Instrument::new(*symbol, *name)),
        )
    }

    /// Build a universe from arbitrary instruments.
    #[must_use]
    pub fn from_instruments(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        let mut unique: Vec<Instrument> = Vec::new();
        for instrument in instruments {
            if !unique.iter().any(|i| i.symbol == instrument.symbol) {
                unique.push(instrument);
            }
        }
        Self {
            instruments: unique,
        }
    }

    /// Check whether a symbol belongs to the universe.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.instruments.iter().any(|i| i.symbol == symbol)
    }

    /// Look up an instrument by symbol.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.symbol == symbol)
    }

    /// Iterate over instruments in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }

    /// Iterate over symbols in display order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.iter().map(|i| i.symbol.as_str())
    }

    /// Number of instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Whether the universe has no instruments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
