//! Bounded price history.

use std::collections::VecDeque;

use rust_decimal::Decimal;

/// Maximum number of prices kept per symbol.
pub const HISTORY_CAPACITY: usize = 12;

/// FIFO window of the most recent prices for one symbol.
///
/// Length never exceeds [`HISTORY_CAPACITY`]; pushing onto a full window
/// evicts the oldest price.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryWindow {
    prices: VecDeque<Decimal>,
}

impl HistoryWindow {
    /// Create an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prices: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Append a price, evicting from the front past capacity.
    pub fn push(&mut self, price: Decimal) {
        self.prices.push_back(price);
        while self.prices.len() > HISTORY_CAPACITY {
            self.prices.pop_front();
        }
    }

    /// Prices oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Decimal> {
        self.prices.iter()
    }

    /// Prices oldest first, collected.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Decimal> {
        self.prices.iter().copied().collect()
    }

    /// Most recent price.
    #[must_use]
    pub fn latest(&self) -> Option<Decimal> {
        self.prices.back().copied()
    }

    /// Number of prices held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
