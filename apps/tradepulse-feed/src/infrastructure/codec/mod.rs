//! Snapshot Codec
//!
//! JSON encoding for the real-time channel.
//!
//! A frame is a single JSON object mapping symbol to price text with exactly
//! two fractional digits:
//!
//! ```json
//! {"AMZN":"512.40","GOOG":"432.17","META":"871.05","NVDA":"230.99","TSLA":"118.02"}
//! ```
//!
//! The tick sequence and generation time stay on the server.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::snapshot::{PriceSnapshot, RawSnapshot};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame was valid JSON but not an object.
    #[error("invalid snapshot format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for snapshot frames.
#[derive(Debug, Default, Clone)]
pub struct JsonSnapshotCodec;

impl JsonSnapshotCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode a snapshot as a wire frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self, snapshot: &PriceSnapshot) -> Result<String, CodecError> {
        let raw = RawSnapshot::from(snapshot);
        Ok(serde_json::to_string(raw.entries())?)
    }

    /// Decode a wire frame into unparsed entries.
    ///
    /// Values are kept as text so the reducer decides what a bad price is.
    /// JSON strings are taken verbatim; numbers keep their literal form;
    /// anything else is passed through as its JSON text and will fail to
    /// parse as a price.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object.
    pub fn decode(&self, text: &str) -> Result<RawSnapshot, CodecError> {
        let value: Value = serde_json::from_str(text.trim())?;

        let Value::Object(map) = value else {
            let trimmed = text.trim();
            return Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {}",
                trimmed.chars().take(50).collect::<String>()
            )));
        };

        let entries: BTreeMap<String, String> = map
            .into_iter()
            .map(|(symbol, value)| {
                let raw = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    other => other.to_string(),
                };
                (symbol, raw)
            })
            .collect();

        Ok(RawSnapshot::new(entries))
    }
}

// =============================================================================
// Tests
// =============================================================================
