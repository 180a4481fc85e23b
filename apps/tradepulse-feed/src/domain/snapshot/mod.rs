//! Price Snapshot Types
//!
//! A snapshot is the full set of prices produced by one generator tick.
//! Two representations exist:
//!
//! - [`PriceSnapshot`]: server-side, typed prices, one entry per universe symbol.
//! - [`RawSnapshot`]: client-side, prices as received on the wire (unparsed text),
//!   so malformed entries can be skipped per symbol.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::instrument::{Symbol, Universe};

/// Number of fractional digits carried by every price.
pub const PRICE_SCALE: u32 = 2;

/// Format a price with exactly two fractional digits (e.g. `"432.17"`).
#[must_use]
pub fn format_price(price: Decimal) -> String {
    format!("{:.2}", price.round_dp(PRICE_SCALE))
}

// =============================================================================
// Server-side Snapshot
// =============================================================================

/// Prices for the whole universe at one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSnapshot {
    sequence: u64,
    generated_at: DateTime<Utc>,
    prices: BTreeMap<Symbol, Decimal>,
}

impl PriceSnapshot {
    /// Create a snapshot for tick `sequence`.
    #[must_use]
    pub const fn new(
        sequence: u64,
        generated_at: DateTime<Utc>,
        prices: BTreeMap<Symbol, Decimal>,
    ) -> Self {
        Self {
            sequence,
            generated_at,
            prices,
        }
    }

    /// Tick sequence number (monotonic per generator).
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// When the snapshot was generated.
    #[must_use]
    pub const fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// All prices keyed by symbol.
    #[must_use]
    pub const fn prices(&self) -> &BTreeMap<Symbol, Decimal> {
        &self.prices
    }

    /// Price for one symbol.
    #[must_use]
    pub fn price(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// True when the snapshot has exactly one entry per universe symbol.
    #[must_use]
    pub fn covers(&self, universe: &Universe) -> bool {
        self.prices.len() == universe.len()
            && universe.symbols().all(|s| self.prices.contains_key(s))
    }
}

// =============================================================================
// Wire-level Snapshot
// =============================================================================

/// A snapshot as received by a client: symbol to unparsed price text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSnapshot {
    entries: BTreeMap<Symbol, String>,
}

impl RawSnapshot {
    /// Create from already-collected entries.
    #[must_use]
    pub const fn new(entries: BTreeMap<Symbol, String>) -> Self {
        Self { entries }
    }

    /// Entries keyed by symbol.
    #[must_use]
    pub const fn entries(&self) -> &BTreeMap<Symbol, String> {
        &self.entries
    }

    /// Iterate over `(symbol, raw price)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &String)> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S, P> FromIterator<(S, P)> for RawSnapshot
where
    S: Into<Symbol>,
    P: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (S, P)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(s, p)| (s.into(), p.into()))
                .collect(),
        }
    }
}

impl From<&PriceSnapshot> for RawSnapshot {
    fn from(snapshot: &PriceSnapshot) -> Self {
        snapshot
            .prices()
            .iter()
            .map(|(symbol, price)| (symbol.clone(), format_price(*price)))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
