//! Timezone-local calendar dates.
//!
//! All day records are keyed by the calendar date in the *user's* timezone,
//! never UTC. Day offsets use calendar arithmetic on the zone-local date,
//! so crossing a daylight-saving transition shifts exactly one calendar
//! day, not 23 or 25 hours.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

/// A resolved local calendar day.
///
/// `fallback` is set when the requested timezone identifier was not
/// recognized and UTC was used instead. Callers surface that as a
/// warning; an unknown timezone must never fail the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDay {
    pub date: NaiveDate,
    pub fallback: bool,
}

impl LocalDay {
    /// Resolve the local date for `timezone`, offset by `offset_days`
    /// calendar days, as of now.
    pub fn resolve(timezone: &str, offset_days: i64) -> Self {
        Self::resolve_at(Utc::now(), timezone, offset_days)
    }

    /// Resolve against an explicit instant (tests pin this).
    pub fn resolve_at(now: DateTime<Utc>, timezone: &str, offset_days: i64) -> Self {
        let (base, fallback) = match timezone.parse::<Tz>() {
            Ok(tz) => (now.with_timezone(&tz).date_naive(), false),
            Err(_) => (now.date_naive(), true),
        };
        let date = shift_days(base, offset_days);
        Self { date, fallback }
    }

    /// `YYYY-MM-DD`, the storage key format.
    pub fn to_key(self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

fn shift_days(date: NaiveDate, offset_days: i64) -> NaiveDate {
    if offset_days >= 0 {
        date.checked_add_days(Days::new(offset_days as u64))
    } else {
        date.checked_sub_days(Days::new(offset_days.unsigned_abs()))
    }
    .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn tokyo_is_already_tomorrow_late_utc_evening() {
        // 2025-06-01 16:30 UTC is 2025-06-02 01:30 in Tokyo.
        let day = LocalDay::resolve_at(instant(2025, 6, 1, 16, 30), "Asia/Tokyo", 0);
        assert_eq!(day.to_key(), "2025-06-02");
        assert!(!day.fallback);
    }

    #[test]
    fn new_york_is_still_yesterday_early_utc_morning() {
        // 2025-06-02 03:00 UTC is 2025-06-01 23:00 in New York.
        let day = LocalDay::resolve_at(instant(2025, 6, 2, 3, 0), "America/New_York", 0);
        assert_eq!(day.to_key(), "2025-06-01");
    }

    #[test]
    fn negative_offset_crosses_dst_start_cleanly() {
        // 2025-03-09 is the US spring-forward date. 06:30 UTC is
        // 01:30 EST that morning; minus one calendar day is 03-08.
        let now = instant(2025, 3, 9, 6, 30);
        let today = LocalDay::resolve_at(now, "America/New_York", 0);
        let yesterday = LocalDay::resolve_at(now, "America/New_York", -1);
        assert_eq!(today.to_key(), "2025-03-09");
        assert_eq!(yesterday.to_key(), "2025-03-08");
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let day = LocalDay::resolve_at(instant(2025, 6, 1, 16, 30), "Mars/Olympus_Mons", 0);
        assert_eq!(day.to_key(), "2025-06-01");
        assert!(day.fallback);
    }

    #[test]
    fn positive_offset_advances_a_day() {
        let day = LocalDay::resolve_at(instant(2025, 12, 31, 12, 0), "UTC", 1);
        assert_eq!(day.to_key(), "2026-01-01");
    }
}
