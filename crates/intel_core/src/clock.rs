//! Simulated time. The operation runs from a fixed epoch; the caller supplies
//! wall-clock milliseconds and a speed multiplier.

use chrono::{DateTime, Utc};

use crate::{Elapsed, TimeSpeed};

/// `2025-11-01T00:00:00Z`.
pub const EPOCH_MS: i64 = 1_761_955_200_000;

pub const MINUTE_MS: i64 = 60_000;
pub const HOUR_MS: i64 = 3_600_000;
pub const DAY_MS: i64 = 86_400_000;

/// Elapsed counters at wall time `now_ms`. Times before the epoch clamp to zero.
pub fn elapsed_at(now_ms: i64, speed: TimeSpeed) -> Elapsed {
    let millis = now_ms
        .saturating_sub(EPOCH_MS)
        .max(0)
        .saturating_mul(i64::from(speed.get()));
    Elapsed {
        millis,
        minutes: whole_units(millis, MINUTE_MS),
        hours: whole_units(millis, HOUR_MS),
        days: whole_units(millis, DAY_MS),
    }
}

fn whole_units(millis: i64, unit: i64) -> u64 {
    u64::try_from(millis / unit).unwrap_or_default()
}

/// Wall time `elapsed_ms` after the epoch.
pub fn sim_time(elapsed_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(EPOCH_MS.saturating_add(elapsed_ms)).unwrap_or_default()
}

/// Wall time at the start of simulated minute `minute`.
pub fn minute_time(minute: u64) -> DateTime<Utc> {
    let offset = i64::try_from(minute)
        .unwrap_or(i64::MAX / MINUTE_MS)
        .saturating_mul(MINUTE_MS);
    sim_time(offset)
}

pub fn time_at(now_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now_ms).unwrap_or_default()
}
