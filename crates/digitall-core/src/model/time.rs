// ── Epoch normalisation ──
//
// The subscription API does not document whether its epoch fields are
// seconds or milliseconds. Every display path goes through
// `normalize_epoch_to_date` so the heuristic lives in exactly one place.

use chrono::{DateTime, Utc};

/// Values below this are read as seconds, at or above as milliseconds.
///
/// Known failure window: second-precision dates after the year 33658 and
/// millisecond-precision dates before 2001-09-09 are misread.
pub const EPOCH_SECONDS_THRESHOLD: f64 = 1e12;

/// Interpret `value` as a seconds-or-milliseconds epoch.
///
/// Returns `None` for non-finite input or a timestamp chrono cannot
/// represent.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
pub fn normalize_epoch_to_date(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value < EPOCH_SECONDS_THRESHOLD {
        value * 1000.0
    } else {
        value
    };
    if millis.abs() > 8.64e15 {
        return None;
    }
    DateTime::from_timestamp_millis(millis.round() as i64)
}
