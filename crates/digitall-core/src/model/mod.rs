// ── Domain model ──
//
// Canonical types for a resolved subscription. The API is loosely typed, so
// every known field is optional or defaulted and unknown fields are kept in
// an extension bag.

pub mod account;
pub mod time;

pub use account::{AccountSnapshot, AccountStatus, TimeValue};
pub use time::{EPOCH_SECONDS_THRESHOLD, normalize_epoch_to_date};
