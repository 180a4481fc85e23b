//! Price Source Port (Driver Port)

use rand::Rng;

use crate::domain::pricing::{GenerationError, PriceGenerator};
use crate::domain::snapshot::PriceSnapshot;

/// Produces one snapshot per tick.
pub trait PriceSourcePort: Send {
    /// Produce the next snapshot.
    ///
    /// # Errors
    ///
    /// A [`GenerationError`] means the tick is lost.
    fn next_snapshot(&mut self) -> Result<PriceSnapshot, GenerationError>;
}

impl<R: Rng + Send> PriceSourcePort for PriceGenerator<R> {
    fn next_snapshot(&mut self) -> Result<PriceSnapshot, GenerationError> {
        self.tick()
    }
}
