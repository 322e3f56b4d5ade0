//! Accrual period math.
//!
//! Interest becomes due once per week at a fixed anchor instant: Monday
//! 10:00 UTC. Periods are never persisted; they are derived from an
//! account's `last_interest_at` and an explicit `now`, so every function
//! here is pure and deterministic under test.

use chrono::{DateTime, Duration, Utc};

/// Monday 1970-01-05 10:00:00 UTC, the first anchor after the Unix epoch.
const ANCHOR_EPOCH_SECONDS: i64 = 4 * 86_400 + 10 * 3_600;

const WEEK_SECONDS: i64 = 7 * 86_400;

/// The most recent anchor instant at or before `now`.
#[must_use]
pub fn current_anchor(now: DateTime<Utc>) -> DateTime<Utc> {
    let offset = (now.timestamp() - ANCHOR_EPOCH_SECONDS).rem_euclid(WEEK_SECONDS);
    now - Duration::seconds(offset) - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos()))
}

/// The ordered set of anchor instants owed interest, oldest first.
///
/// An account that has never accrued owes exactly the current anchor: the
/// cycle it lives in has started (`current_anchor` never returns a future
/// instant), and earlier cycles predate the account's interest life.
///
/// An account that has accrued before owes every anchor strictly after
/// `last`, stepping one full period at a time, up to and including the
/// current anchor. `last` is normally itself an anchor instant, but the
/// enumeration only assumes it is some instant inside a past cycle.
#[must_use]
pub fn due_periods(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let current = current_anchor(now);

    let Some(last) = last else {
        return vec![current];
    };

    let mut due = Vec::new();
    let mut next = current_anchor(last) + Duration::weeks(1);
    while next <= current {
        due.push(next);
        next += Duration::weeks(1);
    }
    due
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    // 2026-01-05 is a Monday.
    fn monday(week: i64) -> DateTime<Utc> {
        utc(2026, 1, 5, 10, 0) + Duration::weeks(week)
    }

    #[test]
    fn anchor_is_most_recent_monday_ten_utc() {
        // Friday afternoon points back to the Monday of the same week.
        assert_eq!(current_anchor(utc(2026, 1, 9, 15, 30)), monday(0));
        // Monday 09:59 is still inside the previous cycle.
        assert_eq!(current_anchor(utc(2026, 1, 5, 9, 59)), monday(-1));
        // Monday 10:00 exactly starts the new cycle.
        assert_eq!(current_anchor(monday(0)), monday(0));
        // Sunday night still belongs to the previous Monday.
        assert_eq!(current_anchor(utc(2026, 1, 11, 23, 59)), monday(0));
    }

    #[test]
    fn never_accrued_owes_only_the_current_anchor() {
        assert_eq!(due_periods(None, utc(2026, 1, 9, 15, 0)), vec![monday(0)]);
        assert_eq!(due_periods(None, monday(3)), vec![monday(3)]);
    }

    #[test]
    fn up_to_date_account_owes_nothing() {
        assert!(due_periods(Some(monday(0)), utc(2026, 1, 9, 15, 0)).is_empty());
        assert!(due_periods(Some(monday(0)), monday(0)).is_empty());
    }

    #[test]
    fn one_elapsed_period_owes_one_anchor() {
        assert_eq!(
            due_periods(Some(monday(0)), utc(2026, 1, 13, 8, 0)),
            vec![monday(1)]
        );
    }

    #[test]
    fn missed_periods_enumerate_oldest_first() {
        assert_eq!(
            due_periods(Some(monday(0)), monday(3) + Duration::hours(2)),
            vec![monday(1), monday(2), monday(3)]
        );
    }

    #[test]
    fn mid_week_last_instant_owes_from_the_next_anchor() {
        // Imported history can leave `last` between anchors.
        let last = utc(2026, 1, 7, 12, 0);
        assert_eq!(
            due_periods(Some(last), monday(2) + Duration::minutes(1)),
            vec![monday(1), monday(2)]
        );
    }
}
