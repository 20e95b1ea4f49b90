use std::fmt;

use chrono::{DateTime, Duration, LocalResult, TimeZone, Utc};

const MILLIS_IN_A_DAY: i64 = 86_400_000;

// Payloads can carry arbitrary epochs; past this horizon the exact count is
// meaningless and unchecked day arithmetic would overflow the calendar.
const MAX_DAYS_TO_UNLOCK: i64 = 36_500;

/// 23:59:59.999 of `now`'s calendar day, in `now`'s time zone.
pub fn end_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let wall = now
        .date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .expect("23:59:59.999 is a valid wall clock time");

    match now.timezone().from_local_datetime(&wall) {
        LocalResult::Single(instant) => instant,
        LocalResult::Ambiguous(_, latest) => latest,
        // A transition swallowed the last wall-clock minute of the day.
        LocalResult::None => now.clone(),
    }
}

/// Whole days until `start_at`, anchored on the end of `now`'s calendar day.
///
/// Zero means "present as available": either `start_at` has passed, or it
/// falls later on the current day. Anchoring on the end of day keeps anything
/// that unlocks tomorrow at exactly 1, no matter how the clock advances
/// within today.
pub fn days_to_unlock<Tz: TimeZone>(now: &DateTime<Tz>, start_at: DateTime<Utc>) -> u32 {
    if now.with_timezone(&Utc) > start_at {
        return 0;
    }

    let midnight = end_of_day(now).with_timezone(&Utc);
    let remaining_ms = start_at.signed_duration_since(midnight).num_milliseconds();
    if remaining_ms <= 0 {
        return 0;
    }

    (1 + remaining_ms / MILLIS_IN_A_DAY).min(MAX_DAYS_TO_UNLOCK) as u32
}

/// User-facing label for a locked task: "tomorrow", or "on Jun 05".
///
/// Calling this for an already-unlocked task is a caller bug; it is reported
/// and a safe label is returned instead of panicking.
pub fn unlock_label<Tz: TimeZone>(days_to_unlock: u32, now: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    if days_to_unlock == 0 {
        tracing::error!("unlock_label called for a task that is already available");
        return "Now".to_string();
    }

    if days_to_unlock == 1 {
        return "tomorrow".to_string();
    }

    let unlock_date = now.clone() + Duration::days(i64::from(days_to_unlock));
    format!("on {}", unlock_date.format("%b %d"))
}
