//! Viseme events emitted during speech synthesis

use serde::{Deserialize, Serialize};

/// Speech SDKs report audio offsets in 100-nanosecond ticks
pub const TICKS_PER_MILLISECOND: u64 = 10_000;

/// One articulation unit: which mouth shape, and when relative to synthesis start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisemeEvent {
    /// Mouth-shape category, 0-14 for the standard inventory
    pub id: u32,
    /// Milliseconds since synthesis start
    pub offset_ms: f64,
}

impl VisemeEvent {
    pub fn new(id: u32, offset_ms: f64) -> Self {
        // Offsets are non-negative; NaN and negatives collapse to 0
        let offset_ms = if offset_ms.is_finite() && offset_ms > 0.0 {
            offset_ms
        } else {
            0.0
        };
        Self { id, offset_ms }
    }

    /// Build an event from an SDK audio offset expressed in 100ns ticks
    pub fn from_ticks(id: u32, audio_offset_ticks: u64) -> Self {
        Self::new(id, audio_offset_ticks as f64 / TICKS_PER_MILLISECOND as f64)
    }
}
