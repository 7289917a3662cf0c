//! Aggregate score calculator
//!
//! Pure derivation of the global score and phase from a registry snapshot.
//! Nothing is cached; callers recompute on demand.

use crate::models::{GlobalSummary, Phase, RoomEntry, RoomStatus};

/// Compute the global score and phase
///
/// - `Idle` iff there are no entries
/// - `Analyzing` iff any entry is still analyzing
/// - `Results` otherwise
///
/// The score is the mean of completed scores rounded half away from zero.
/// Errored entries are excluded from the mean; with no completed entries
/// the score is 0.
pub fn compute_global(entries: &[RoomEntry]) -> GlobalSummary {
    let phase = if entries.is_empty() {
        Phase::Idle
    } else if entries.iter().any(|e| e.status() == RoomStatus::Analyzing) {
        Phase::Analyzing
    } else {
        Phase::Results
    };

    let (sum, count) = entries
        .iter()
        .filter_map(|e| e.result())
        .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r.score), count + 1));

    GlobalSummary {
        score: rounded_mean(sum, count),
        phase,
    }
}

/// Integer mean with half-away-from-zero rounding (all inputs are non-negative)
fn rounded_mean(sum: u64, count: u64) -> u8 {
    if count == 0 {
        return 0;
    }
    let mean = (2 * sum + count) / (2 * count);
    // Each score is <= 100, so the mean is too
    mean.min(100) as u8
}
