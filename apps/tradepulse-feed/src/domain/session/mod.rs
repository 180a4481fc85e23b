//! Client Session and State Reducer
//!
//! Turns the raw snapshot stream of one connection into display state:
//! current price, delta against the previously observed price, and a
//! bounded history per symbol.
//!
//! # Design
//!
//! - [`reduce`] is a pure transition `(ClientState, RawSnapshot) -> ClientState`
//!   with no event-loop binding.
//! - [`ClientSession`] wraps it in the connection state machine
//!   `Disconnected -> Connected -> Receiving -> Disconnected`.
//! - The previous-price cache is private to [`ClientState`], so each
//!   connection carries its own and nothing leaks between connections.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::history::HistoryWindow;
use super::instrument::Symbol;
use super::snapshot::RawSnapshot;

// =============================================================================
// State Types
// =============================================================================

/// Display state for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceState {
    /// Latest observed price.
    pub price: Decimal,
    /// `price` minus the previously observed price (0 on first observation).
    pub delta: Decimal,
}

/// Derived per-connection state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientState {
    prices: BTreeMap<Symbol, PriceState>,
    history: BTreeMap<Symbol, HistoryWindow>,
    previous_known: BTreeMap<Symbol, Decimal>,
    snapshots_applied: u64,
}

impl ClientState {
    /// Display state for a symbol.
    #[must_use]
    pub fn price_state(&self, symbol: &str) -> Option<PriceState> {
        self.prices.get(symbol).copied()
    }

    /// Display state for every observed symbol.
    #[must_use]
    pub const fn prices(&self) -> &BTreeMap<Symbol, PriceState> {
        &self.prices
    }

    /// History window for a symbol.
    #[must_use]
    pub fn history(&self, symbol: &str) -> Option<&HistoryWindow> {
        self.history.get(symbol)
    }

    /// Number of snapshots reduced into this state.
    #[must_use]
    pub const fn snapshots_applied(&self) -> u64 {
        self.snapshots_applied
    }

    /// Whether nothing has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// A snapshot entry that could not be applied and was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Symbol whose price was rejected.
    pub symbol: Symbol,
    /// The raw value as received.
    pub raw: String,
}

/// Result of reducing one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// The new state.
    pub state: ClientState,
    /// Entries skipped because their price did not parse or its delta overflowed.
    pub skipped: Vec<SkippedEntry>,
}

// =============================================================================
// Reducer
// =============================================================================

/// Parse a wire price. Accepts plain and scientific decimal notation.
#[must_use]
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Apply one snapshot to a connection's state.
///
/// Symbols are processed independently: a price that does not parse, or
/// whose delta overflows, is reported in [`Reduction::skipped`] and leaves
/// that symbol's price, history and cache untouched.
#[must_use]
pub fn reduce(mut state: ClientState, snapshot: &RawSnapshot) -> Reduction {
    let mut skipped = Vec::new();

    for (symbol, raw) in snapshot.iter() {
        let Some(price) = parse_price(raw) else {
            skipped.push(SkippedEntry {
                symbol: symbol.clone(),
                raw: raw.clone(),
            });
            continue;
        };

        let previous = state.previous_known.get(symbol).copied().unwrap_or(price);
        let Some(delta) = price.checked_sub(previous) else {
            skipped.push(SkippedEntry {
                symbol: symbol.clone(),
                raw: raw.clone(),
            });
            continue;
        };

        state
            .prices
            .insert(symbol.clone(), PriceState { price, delta });
        state.previous_known.insert(symbol.clone(), price);
        state.history.entry(symbol.clone()).or_default().push(price);
    }

    state.snapshots_applied += 1;

    Reduction { state, skipped }
}

// =============================================================================
// Session State Machine
// =============================================================================

/// Connection phase of a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No connection; holds no state.
    #[default]
    Disconnected,
    /// Connected, no snapshot received yet.
    Connected,
    /// At least one snapshot received.
    Receiving,
}

impl SessionPhase {
    /// Phase name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Receiving => "receiving",
        }
    }
}

/// Session transition errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A snapshot arrived while disconnected.
    #[error("session is not connected")]
    NotConnected,

    /// `connect` called on a live session.
    #[error("session is already connected")]
    AlreadyConnected,
}

/// Per-connection context owning the reducer state.
#[derive(Debug, Default)]
pub struct ClientSession {
    phase: SessionPhase,
    state: ClientState,
}

impl ClientSession {
    /// Create a disconnected session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the connection established. State always starts cold.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyConnected`] unless disconnected.
    pub fn connect(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Disconnected {
            return Err(SessionError::AlreadyConnected);
        }
        self.state = ClientState::default();
        self.phase = SessionPhase::Connected;
        Ok(())
    }

    /// Reduce one snapshot into the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] while disconnected; state is
    /// not touched.
    pub fn apply(&mut self, snapshot: &RawSnapshot) -> Result<Vec<SkippedEntry>, SessionError> {
        if self.phase == SessionPhase::Disconnected {
            return Err(SessionError::NotConnected);
        }

        let reduction = reduce(std::mem::take(&mut self.state), snapshot);
        self.state = reduction.state;
        self.phase = SessionPhase::Receiving;
        Ok(reduction.skipped)
    }

    /// Close the connection and discard all derived state.
    pub fn disconnect(&mut self) {
        self.phase = SessionPhase::Disconnected;
        self.state = ClientState::default();
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Current derived state.
    #[must_use]
    pub const fn state(&self) -> &ClientState {
        &self.state
    }
}

// =============================================================================
// Tests
// =============================================================================
