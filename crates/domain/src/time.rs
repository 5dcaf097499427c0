//! Time and timestamp helpers.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC timestamp used for `observed_at`, event times, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// How long ago `observed_at` was, relative to `at`.
///
/// The cache never expires entries; callers use this to judge staleness.
/// Observations stamped in the future (clock skew) count as fresh.
#[must_use]
pub fn age(observed_at: Timestamp, at: Timestamp) -> Duration {
    (at - observed_at).to_std().unwrap_or(Duration::ZERO)
}
