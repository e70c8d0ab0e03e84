//! Rating-trend analytics for the owner dashboard.
//!
//! Everything here is a pure function over rating creation events: the
//! storage layer supplies the rows, this module does the window math. No
//! writes, no clock reads; callers pass `now` so the half-open period
//! windows are deterministic and testable.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::RatingEvent;

/// One calendar day with at least one rating. Days without ratings are
/// omitted from the series, not zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub count: i64,
    pub avg_rating: f64,
}

/// Count and mean score over one comparison window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodStats {
    pub total_ratings: i64,
    pub average_rating: f64,
}

/// Deltas between the current and previous windows.
///
/// Percentage fields are pre-formatted strings with one decimal, or the
/// literal `"N/A"` when the previous window is empty; the average delta is
/// formatted to two decimals. The stringly sentinel is the wire contract
/// existing clients parse, so it stays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodChanges {
    pub rating_count_change: i64,
    pub rating_count_percentage: String,
    pub average_rating_change: String,
    pub average_rating_percentage: String,
}

/// Current-versus-previous trend block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trends {
    pub current_period: PeriodStats,
    pub previous_period: PeriodStats,
    pub changes: PeriodChanges,
}

/// One row of the 1-to-5 star breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownEntry {
    pub rating: i32,
    pub count: i64,
    pub percentage: String,
}

fn stats_over<'a, I>(events: I) -> PeriodStats
where
    I: IntoIterator<Item = &'a RatingEvent>,
{
    let mut count = 0_i64;
    let mut sum = 0_i64;
    for event in events {
        count += 1;
        sum += i64::from(event.score.as_i32());
    }
    let average_rating = if count == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        {
            sum as f64 / count as f64
        }
    };
    PeriodStats {
        total_ratings: count,
        average_rating,
    }
}

/// Percent change from `previous` to `current`, one decimal, with the
/// `"N/A"` sentinel guarding division by zero.
fn percent_change(current: f64, previous: f64) -> String {
    if previous > 0.0 {
        format!("{:.1}", (current - previous) / previous * 100.0)
    } else {
        "N/A".to_owned()
    }
}

/// Group rating events into per-day (count, mean) buckets, date ascending.
///
/// Callers fetch events since their window start; this only aggregates.
#[must_use]
pub fn ratings_over_time(events: &[RatingEvent]) -> Vec<DailyBucket> {
    let mut days: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
    for event in events {
        let entry = days.entry(event.date()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += i64::from(event.score.as_i32());
    }
    days.into_iter()
        .map(|(date, (count, sum))| DailyBucket {
            date,
            count,
            #[allow(clippy::cast_precision_loss)]
            avg_rating: sum as f64 / count as f64,
        })
        .collect()
}

/// Compare the last `period_days` against the `period_days` before that.
///
/// The windows are half-open and adjacent: current is
/// `[now - period, now)`, previous is `[now - 2*period, now - period)`.
/// A rating created at exactly `now - period` counts toward the current
/// window. `events` must cover at least `[now - 2*period, now)`.
#[must_use]
pub fn period_comparison(events: &[RatingEvent], now: DateTime<Utc>, period_days: u32) -> Trends {
    let period = Duration::days(i64::from(period_days));
    let current_start = now - period;
    let previous_start = now - period - period;

    let current = stats_over(
        events
            .iter()
            .filter(|e| e.created_at >= current_start && e.created_at < now),
    );
    let previous = stats_over(
        events
            .iter()
            .filter(|e| e.created_at >= previous_start && e.created_at < current_start),
    );

    #[allow(clippy::cast_precision_loss)]
    let (current_count, previous_count) = (current.total_ratings as f64, previous.total_ratings as f64);

    Trends {
        changes: PeriodChanges {
            rating_count_change: current.total_ratings - previous.total_ratings,
            rating_count_percentage: percent_change(current_count, previous_count),
            average_rating_change: format!(
                "{:.2}",
                current.average_rating - previous.average_rating
            ),
            average_rating_percentage: percent_change(
                current.average_rating,
                previous.average_rating,
            ),
        },
        current_period: current,
        previous_period: previous,
    }
}

/// Per-star breakdown of a store's ratings, always five rows, 1 through 5.
#[must_use]
pub fn rating_breakdown(events: &[RatingEvent]) -> Vec<BreakdownEntry> {
    let total = events.len() as i64;
    (1..=5)
        .map(|star| {
            let count = events
                .iter()
                .filter(|e| e.score.as_i32() == star)
                .count() as i64;
            let percentage = if total > 0 {
                #[allow(clippy::cast_precision_loss)]
                {
                    format!("{:.1}", count as f64 / total as f64 * 100.0)
                }
            } else {
                "0.0".to_owned()
            };
            BreakdownEntry {
                rating: star,
                count,
                percentage,
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use storerate_core::Score;

    fn event(score: i32, created_at: DateTime<Utc>) -> RatingEvent {
        RatingEvent {
            score: Score::new(score).unwrap(),
            created_at,
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-08-30T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_daily_buckets_are_sparse_and_ascending() {
        let n = now();
        let events = vec![
            event(5, n - Duration::days(10)),
            event(3, n - Duration::days(10)),
            // Nothing between day -10 and day -2.
            event(4, n - Duration::days(2)),
        ];
        let buckets = ratings_over_time(&events);
        assert_eq!(buckets.len(), 2);
        assert!(buckets[0].date < buckets[1].date);
        assert_eq!(buckets[0].count, 2);
        assert!((buckets[0].avg_rating - 4.0).abs() < 1e-9);
        assert_eq!(buckets[1].count, 1);
    }

    #[test]
    fn test_rating_at_exact_period_boundary_is_current() {
        let n = now();
        let events = vec![event(5, n - Duration::days(7))];
        let trends = period_comparison(&events, n, 7);
        assert_eq!(trends.current_period.total_ratings, 1);
        assert_eq!(trends.previous_period.total_ratings, 0);
    }

    #[test]
    fn test_windows_are_adjacent_without_overlap() {
        let n = now();
        let events = vec![
            event(4, n - Duration::days(7) - Duration::seconds(1)),
            event(2, n - Duration::days(14)),
            event(5, n - Duration::days(14) - Duration::seconds(1)),
        ];
        let trends = period_comparison(&events, n, 7);
        // One just over the boundary and one at exactly -2p are previous;
        // anything older falls outside both windows.
        assert_eq!(trends.current_period.total_ratings, 0);
        assert_eq!(trends.previous_period.total_ratings, 2);
    }

    #[test]
    fn test_empty_previous_period_yields_sentinel() {
        let n = now();
        let events = vec![
            event(5, n - Duration::days(10)),
            event(4, n - Duration::days(10)),
            event(5, n - Duration::days(10)),
        ];
        let trends = period_comparison(&events, n, 30);
        assert_eq!(trends.current_period.total_ratings, 3);
        assert!((trends.current_period.average_rating - 14.0 / 3.0).abs() < 1e-9);
        assert_eq!(trends.previous_period.total_ratings, 0);
        assert!((trends.previous_period.average_rating - 0.0).abs() < f64::EPSILON);
        assert_eq!(trends.changes.rating_count_change, 3);
        assert_eq!(trends.changes.rating_count_percentage, "N/A");
        assert_eq!(trends.changes.average_rating_percentage, "N/A");
        assert_eq!(trends.changes.average_rating_change, "4.67");
    }

    #[test]
    fn test_percent_changes_formatted_to_one_decimal() {
        let n = now();
        let mut events = vec![
            event(4, n - Duration::days(3)),
            event(4, n - Duration::days(3)),
            event(4, n - Duration::days(3)),
        ];
        events.extend([event(2, n - Duration::days(10)), event(4, n - Duration::days(10))]);
        let trends = period_comparison(&events, n, 7);
        assert_eq!(trends.current_period.total_ratings, 3);
        assert_eq!(trends.previous_period.total_ratings, 2);
        assert_eq!(trends.changes.rating_count_change, 1);
        assert_eq!(trends.changes.rating_count_percentage, "50.0");
        // Average moved from 3.0 to 4.0.
        assert_eq!(trends.changes.average_rating_change, "1.00");
        assert_eq!(trends.changes.average_rating_percentage, "33.3");
    }

    #[test]
    fn test_no_events_yields_zeroed_periods() {
        let trends = period_comparison(&[], now(), 30);
        assert_eq!(trends.current_period.total_ratings, 0);
        assert!((trends.current_period.average_rating - 0.0).abs() < f64::EPSILON);
        assert_eq!(trends.changes.rating_count_change, 0);
        assert_eq!(trends.changes.rating_count_percentage, "N/A");
    }

    #[test]
    fn test_breakdown_covers_all_stars() {
        let n = now();
        let events = vec![
            event(5, n),
            event(5, n),
            event(4, n),
            event(3, n),
        ];
        let breakdown = rating_breakdown(&events);
        assert_eq!(breakdown.len(), 5);
        assert_eq!(breakdown[0].rating, 1);
        assert_eq!(breakdown[0].count, 0);
        assert_eq!(breakdown[0].percentage, "0.0");
        assert_eq!(breakdown[4].rating, 5);
        assert_eq!(breakdown[4].count, 2);
        assert_eq!(breakdown[4].percentage, "50.0");
    }

    #[test]
    fn test_breakdown_of_empty_store() {
        let breakdown = rating_breakdown(&[]);
        assert!(breakdown.iter().all(|b| b.count == 0 && b.percentage == "0.0"));
    }
}
