//! Frequency inference from ex-date spacing.
//!
//! Used when a source gives dates and amounts but no payment schedule.
//! Each event looks at the gap to its neighbours: the next event by default,
//! the previous one when that neighbour's amount is clearly closer (special
//! or irregular distributions tend to sit next to a very different amount).

use chrono::NaiveDate;

use crate::domain::Frequency;

/// How much closer (relative difference) the previous amount must be to win.
const PREV_BIAS: f64 = 0.05;

/// Map a gap in days between consecutive ex-dates to a frequency.
pub fn frequency_from_gap(days: i64) -> Frequency {
    match days {
        d if d <= 0 => Frequency::Monthly,
        d if d < 10 => Frequency::Weekly,
        d if d < 20 => Frequency::BiWeekly,
        d if d < 25 => Frequency::SemiMonthly,
        d if d < 60 => Frequency::Monthly,
        d if d < 130 => Frequency::Quarterly,
        d if d < 250 => Frequency::SemiAnnual,
        _ => Frequency::Annual,
    }
}

/// Relative difference in `[0, 1]`.
fn rel_diff(a: f64, b: f64) -> f64 {
    let m = a.abs().max(b.abs());
    if m == 0.0 {
        0.0
    } else {
        (a - b).abs() / m
    }
}

/// Infer a frequency for each `(ex_date, amount)` pair.
///
/// Input must be sorted by date ascending; the output is index-aligned with it.
/// A lone event defaults to monthly.
pub fn infer_frequencies(events: &[(NaiveDate, f64)]) -> Vec<Frequency> {
    (0..events.len())
        .map(|i| {
            let (date, amount) = events[i];
            let prev = i.checked_sub(1).map(|j| events[j]);
            let next = events.get(i + 1).copied();

            let gap = match (prev, next) {
                (Some((pd, pa)), Some((nd, na))) => {
                    if rel_diff(amount, pa) + PREV_BIAS < rel_diff(amount, na) {
                        (date - pd).num_days()
                    } else {
                        (nd - date).num_days()
                    }
                }
                (None, Some((nd, _))) => (nd - date).num_days(),
                (Some((pd, _)), None) => (date - pd).num_days(),
                (None, None) => 0,
            };
            frequency_from_gap(gap)
        })
        .collect()
}
