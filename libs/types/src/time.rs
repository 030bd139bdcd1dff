//! Timestamp helpers
//!
//! All persisted timestamps are Unix nanoseconds as `i64`.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as Unix nanoseconds
pub fn unix_nanos_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
