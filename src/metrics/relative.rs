//! Human-relative "time ago" labels.

use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Label the time elapsed between `then` and `now`.
///
/// `now` is always supplied by the caller; timestamps in the future read as
/// "Just now".
pub fn relative_label(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    label_for_elapsed((now - then).num_seconds())
}

/// Label an elapsed duration given in whole seconds.
pub fn label_for_elapsed(elapsed_secs: i64) -> String {
    let secs = elapsed_secs.max(0);

    if secs < MINUTE {
        "Just now".to_string()
    } else if secs < HOUR {
        ago(secs / MINUTE, "minute")
    } else if secs < DAY {
        ago(secs / HOUR, "hour")
    } else {
        ago(secs / DAY, "day")
    }
}

fn ago(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}
