//! Bounded history buffer operations.
//!
//! The glucose history is an ordered `Vec` capped at a configured maximum.
//! When an appended batch would overflow the cap, the oldest entries of the
//! *existing* buffer are dropped first; the incoming batch is never
//! truncated. These are pure functions; the reducer owns the coupling to the
//! missed-readings counter.

use glucolink_types::GlucoseReading;
use uuid::Uuid;

/// Append a batch to the buffer, evicting the oldest existing entries when
/// the combined length would exceed `max`.
#[must_use]
pub fn append(
    existing: Vec<GlucoseReading>,
    batch: Vec<GlucoseReading>,
    max: usize,
) -> Vec<GlucoseReading> {
    let over_limit = (existing.len() + batch.len()).saturating_sub(max);

    let mut merged: Vec<GlucoseReading> = existing.into_iter().skip(over_limit).collect();
    merged.extend(batch);
    merged
}

/// Remove at most one reading matching `id`. A missing id is a no-op.
#[must_use]
pub fn remove(existing: Vec<GlucoseReading>, id: Uuid) -> Vec<GlucoseReading> {
    existing.into_iter().filter(|r| r.id != id).collect()
}
