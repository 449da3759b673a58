//! Recency decisions: cache freshness, file priority order, and the
//! "recent edit" label.

use std::cmp::Reverse;
use std::time::{Duration, SystemTime};

use super::types::FileInfo;

/// Elapsed time from `then` to `now`. A timestamp in the future counts as zero.
pub fn age(then: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(then).unwrap_or(Duration::ZERO)
}

/// Whether an artifact last modified at `mod_time` may be reused.
///
/// A zero `ttl` forces regeneration regardless of age.
pub fn is_fresh(mod_time: SystemTime, now: SystemTime, ttl: Duration) -> bool {
    !ttl.is_zero() && age(mod_time, now) < ttl
}

/// Sort files most-recently-modified first. Ties are broken by name so the
/// order is deterministic.
pub fn sort_by_recency(files: &mut [FileInfo]) {
    files.sort_by(|a, b| {
        Reverse(a.mod_time)
            .cmp(&Reverse(b.mod_time))
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// The recent edit for a baseline run: the head of a recency-sorted list, if
/// it was modified within `window` of `now`.
pub fn recent_edit(sorted: &[FileInfo], now: SystemTime, window: Duration) -> Option<&str> {
    sorted
        .first()
        .filter(|f| age(f.mod_time, now) < window)
        .map(|f| f.name.as_str())
}
