use crate::error::{CalendarError, CalendarResult};
use crate::holiday::HolidayDates;
use crate::pattern::WeekdayPattern;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use tracing::warn;

fn days_until(from: Weekday, to: Weekday) -> u64 {
    let from = i64::from(from.num_days_from_sunday());
    let to = i64::from(to.num_days_from_sunday());
    (to - from).rem_euclid(7) as u64
}

fn days_since(from: Weekday, to: Weekday) -> u64 {
    days_until(to, from)
}

/// Earliest date on or after `on_or_after` that falls on the pattern's first
/// weekday (Monday for MW, Tuesday for TR).
pub fn first_class_day(on_or_after: NaiveDate, pattern: WeekdayPattern) -> NaiveDate {
    let delta = days_until(on_or_after.weekday(), pattern.first());
    on_or_after
        .checked_add_days(Days::new(delta))
        .unwrap_or(on_or_after)
}

/// Bounded form of [`first_class_day`] used when anchoring a calendar.
pub fn resolve_epoch(
    start: NaiveDate,
    pattern: WeekdayPattern,
    max_attempts: usize,
) -> CalendarResult<NaiveDate> {
    start
        .iter_days()
        .take(max_attempts)
        .find(|date| date.weekday() == pattern.first())
        .ok_or(CalendarError::NoEpoch { start, pattern })
}

/// Zero-based meeting index of `date` counted from `epoch`.
///
/// Returns `None` when either date is off the pattern. Dates before the epoch
/// get negative numbers.
pub fn class_day_number(date: NaiveDate, epoch: NaiveDate, pattern: WeekdayPattern) -> Option<i64> {
    if !pattern.matches(date) || !pattern.matches(epoch) {
        return None;
    }
    let weeks = (date - epoch).num_days().div_euclid(7);
    if date.weekday() == epoch.weekday() {
        Some(2 * weeks)
    } else {
        Some(2 * weeks + 1)
    }
}

/// Inverse of [`class_day_number`] for non-negative `n`.
pub fn date_for_class_day(n: i64, epoch: NaiveDate, pattern: WeekdayPattern) -> Option<NaiveDate> {
    if n < 0 || !pattern.matches(epoch) {
        return None;
    }
    let weeks = u64::try_from(n / 2).ok()?;
    let target = if n % 2 == 0 {
        epoch.weekday()
    } else if epoch.weekday() == pattern.first() {
        pattern.second()
    } else {
        pattern.first()
    };
    let week_start = epoch.checked_add_days(Days::new(weeks.checked_mul(7)?))?;
    week_start.checked_add_days(Days::new(days_until(week_start.weekday(), target)))
}

/// Pattern weekday and not a holiday.
pub fn is_class_day(date: NaiveDate, pattern: WeekdayPattern, holidays: &HolidayDates) -> bool {
    pattern.matches(date) && !holidays.contains(date)
}

fn pattern_day_on_or_after(date: NaiveDate, pattern: WeekdayPattern) -> Option<NaiveDate> {
    let delta = pattern
        .weekdays()
        .into_iter()
        .map(|weekday| days_until(date.weekday(), weekday))
        .min()?;
    date.checked_add_days(Days::new(delta))
}

fn pattern_day_on_or_before(date: NaiveDate, pattern: WeekdayPattern) -> Option<NaiveDate> {
    let delta = pattern
        .weekdays()
        .into_iter()
        .map(|weekday| days_since(date.weekday(), weekday))
        .min()?;
    date.checked_sub_days(Days::new(delta))
}

/// Next class day strictly after `after`, skipping holidays.
///
/// Each holiday skipped counts as one attempt; `None` once `max_attempts`
/// pattern days have all been holidays.
pub fn next_class_day(
    after: NaiveDate,
    pattern: WeekdayPattern,
    holidays: &HolidayDates,
    max_attempts: usize,
) -> Option<NaiveDate> {
    let mut candidate = after.succ_opt()?;
    for _ in 0..max_attempts {
        candidate = pattern_day_on_or_after(candidate, pattern)?;
        if !holidays.contains(candidate) {
            return Some(candidate);
        }
        candidate = candidate.succ_opt()?;
    }
    warn!(%after, %pattern, max_attempts, "no class day found after date");
    None
}

/// Previous class day strictly before `before`, skipping holidays.
pub fn previous_class_day(
    before: NaiveDate,
    pattern: WeekdayPattern,
    holidays: &HolidayDates,
    max_attempts: usize,
) -> Option<NaiveDate> {
    let mut candidate = before.pred_opt()?;
    for _ in 0..max_attempts {
        candidate = pattern_day_on_or_before(candidate, pattern)?;
        if !holidays.contains(candidate) {
            return Some(candidate);
        }
        candidate = candidate.pred_opt()?;
    }
    warn!(%before, %pattern, max_attempts, "no class day found before date");
    None
}

/// Snap a picked semester start onto the nearest sensible pattern weekday.
///
/// MW: Tue/Thu step back one day, Fri steps back to Wed, Sat/Sun step forward
/// to Mon. TR: Mon/Wed step forward one day, Fri steps back to Thu, Sat/Sun
/// step forward to Tue.
pub fn align_to_pattern(date: NaiveDate, pattern: WeekdayPattern) -> NaiveDate {
    let shift: i64 = match (pattern, date.weekday()) {
        (WeekdayPattern::MondayWednesday, Weekday::Tue | Weekday::Thu) => -1,
        (WeekdayPattern::MondayWednesday, Weekday::Fri) => -2,
        (WeekdayPattern::MondayWednesday, Weekday::Sat) => 2,
        (WeekdayPattern::MondayWednesday, Weekday::Sun) => 1,
        (WeekdayPattern::TuesdayThursday, Weekday::Mon | Weekday::Wed) => 1,
        (WeekdayPattern::TuesdayThursday, Weekday::Fri) => -1,
        (WeekdayPattern::TuesdayThursday, Weekday::Sat) => 3,
        (WeekdayPattern::TuesdayThursday, Weekday::Sun) => 2,
        _ => 0,
    };
    let magnitude = Days::new(shift.unsigned_abs());
    let shifted = if shift < 0 {
        date.checked_sub_days(magnitude)
    } else {
        date.checked_add_days(magnitude)
    };
    shifted.unwrap_or(date)
}
