//! Price Generator
//!
//! Produces one [`PriceSnapshot`] per tick for the whole universe. Every
//! price is an independent uniform draw from `[100.00, 1000.00)` on a
//! two-decimal grid; draws carry no memory of earlier ticks.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use super::instrument::{SharedUniverse, Symbol};
use super::snapshot::{PRICE_SCALE, PriceSnapshot};

/// Lowest price a draw can produce, in cents (inclusive).
pub const MIN_PRICE_CENTS: i64 = 10_000;

/// Upper price bound, in cents (exclusive).
pub const MAX_PRICE_CENTS: i64 = 100_000;

/// Errors raised while generating a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The universe has no instruments to price.
    #[error("instrument universe is empty")]
    EmptyUniverse,

    /// The tick sequence counter cannot advance further.
    #[error("tick sequence exhausted")]
    SequenceExhausted,
}

/// Random snapshot generator for a fixed universe.
#[derive(Debug)]
pub struct PriceGenerator<R = StdRng> {
    universe: SharedUniverse,
    rng: R,
    next_sequence: u64,
}

impl PriceGenerator<StdRng> {
    /// Create a generator seeded from the operating system.
    #[must_use]
    pub fn new(universe: SharedUniverse) -> Self {
        Self::with_rng(universe, StdRng::from_os_rng())
    }

    /// Create a deterministic generator (same seed, same prices).
    #[must_use]
    pub fn seeded(universe: SharedUniverse, seed: u64) -> Self {
        Self::with_rng(universe, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> PriceGenerator<R> {
    /// Create a generator drawing from the given RNG.
    #[must_use]
    pub const fn with_rng(universe: SharedUniverse, rng: R) -> Self {
        Self {
            universe,
            rng,
            next_sequence: 1,
        }
    }

    /// Produce the next snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] if the universe is empty or the sequence
    /// counter overflows.
    pub fn tick(&mut self) -> Result<PriceSnapshot, GenerationError> {
        if self.universe.is_empty() {
            return Err(GenerationError::EmptyUniverse);
        }

        let sequence = self.next_sequence;
        self.next_sequence = sequence
            .checked_add(1)
            .ok_or(GenerationError::SequenceExhausted)?;

        let universe = SharedUniverse::clone(&self.universe);
        let prices: BTreeMap<Symbol, Decimal> = universe
            .symbols()
            .map(|symbol| (symbol.to_string(), self.draw_price()))
            .collect();

        Ok(PriceSnapshot::new(sequence, Utc::now(), prices))
    }

    /// Sequence number the next snapshot will carry.
    #[must_use]
    pub const fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    fn draw_price(&mut self) -> Decimal {
        let cents = self.rng.random_range(MIN_PRICE_CENTS..MAX_PRICE_CENTS);
        Decimal::new(cents, PRICE_SCALE)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::instrument::Universe;

    #[test]
    fn every_snapshot_covers_the_universe() {
        let universe = Arc::new(Universe::standard());
        let mut generator = PriceGenerator::seeded(Arc::clone(&universe), 7);

        for _ in 0..50 {
            let snapshot = generator.tick().unwrap();
            assert!(snapshot.covers(&universe));
        }
    }

    #[test]
    fn prices_stay_in_range_with_two_decimals() {
        let universe = Arc::new(Universe::standard());
        let mut generator = PriceGenerator::seeded(universe, 42);
        let min = Decimal::new(MIN_PRICE_CENTS, 2);
        let max = Decimal::new(MAX_PRICE_CENTS, 2);

        for _ in 0..500 {
            for price in generator.tick().unwrap().prices().values() {
                assert!(*price >= min, "{price} below range");
                assert!(*price < max, "{price} above range");
                assert_eq!(price.scale(), 2);
            }
        }
    }

    #[test]
    fn sequence_increases_by_one() {
        let mut generator = PriceGenerator::seeded(Arc::new(Universe::standard()), 1);
        let first = generator.tick().unwrap();
        let second = generator.tick().unwrap();
        assert_eq!(first.sequence(), 1);
        assert_eq!(second.sequence(), 2);
        assert_eq!(generator.next_sequence(), 3);
    }

    #[test]
    fn same_seed_same_prices() {
        let universe = Arc::new(Universe::standard());
        let mut a = PriceGenerator::seeded(Arc::clone(&universe), 99);
        let mut b = PriceGenerator::seeded(universe, 99);
        assert_eq!(a.tick().unwrap().prices(), b.tick().unwrap().prices());
    }

    #[test]
    fn empty_universe_is_an_error() {
        let mut generator =
            PriceGenerator::seeded(Arc::new(Universe::from_instruments(Vec::new())), 1);
        assert!(matches!(
            generator.tick(),
            Err(GenerationError::EmptyUniverse)
        ));
    }
}
