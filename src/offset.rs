use crate::class_day::{class_day_number, date_for_class_day, resolve_epoch};
use crate::config::SearchLimits;
use crate::error::CalendarResult;
use crate::holiday::{HolidayDates, HolidayTable};
use crate::item::{AssignmentItem, ClassMeetingItem};
use crate::pattern::WeekdayPattern;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A value produced by a bounded search, flagged when the bound was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounded<T> {
    pub value: T,
    pub degraded: bool,
}

impl<T> Bounded<T> {
    pub fn exact(value: T) -> Self {
        Self {
            value,
            degraded: false,
        }
    }

    pub fn degraded(value: T) -> Self {
        Self {
            value,
            degraded: true,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Bounded<U> {
        Bounded {
            value: f(self.value),
            degraded: self.degraded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedHoliday {
    pub date: NaiveDate,
    pub class_day: i64,
}

/// Holiday meetings of a source calendar, sorted by class-day number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayIndex(Vec<IndexedHoliday>);

impl HolidayIndex {
    pub fn entries(&self) -> &[IndexedHoliday] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of indexed holidays strictly before `class_day`
    pub fn count_before(&self, class_day: i64) -> usize {
        self.0.partition_point(|holiday| holiday.class_day < class_day)
    }
}

pub fn build_holiday_adjusted_index(
    meetings: &[ClassMeetingItem],
    epoch: NaiveDate,
    pattern: WeekdayPattern,
) -> HolidayIndex {
    let mut entries: Vec<IndexedHoliday> = meetings
        .iter()
        .filter(|meeting| meeting.is_holiday())
        .filter_map(|meeting| {
            class_day_number(meeting.date, epoch, pattern).map(|class_day| IndexedHoliday {
                date: meeting.date,
                class_day,
            })
        })
        .collect();
    entries.sort_by_key(|holiday| (holiday.class_day, holiday.date));
    entries.dedup_by_key(|holiday| holiday.date);
    HolidayIndex(entries)
}

/// Re-anchor a source class-day number to teaching days actually elapsed.
pub fn adjust_for_skipped_holidays(class_day: i64, index: &HolidayIndex) -> i64 {
    class_day - index.count_before(class_day) as i64
}

/// Move `class_day` forward until it resolves to a non-holiday date in the
/// target calendar. Falls back to the original number, flagged, when
/// `max_attempts` consecutive class days are all holidays.
pub fn push_past_target_holidays(
    class_day: i64,
    target_epoch: NaiveDate,
    pattern: WeekdayPattern,
    holidays: &HolidayDates,
    max_attempts: usize,
) -> Bounded<i64> {
    let mut candidate = class_day;
    for _ in 0..max_attempts {
        let Some(date) = date_for_class_day(candidate, target_epoch, pattern) else {
            break;
        };
        if !holidays.contains(date) {
            if candidate != class_day {
                debug!(from = class_day, to = candidate, %date, "pushed class day past holiday");
            }
            return Bounded::exact(candidate);
        }
        candidate += 1;
    }
    warn!(class_day, %target_epoch, max_attempts, "could not find non-holiday class day");
    Bounded::degraded(class_day)
}

/// Everything needed to move dates from one semester to another.
#[derive(Debug, Clone)]
pub struct TranslationContext {
    pub source_epoch: NaiveDate,
    pub target_epoch: NaiveDate,
    pub pattern: WeekdayPattern,
    pub source_holidays: HolidayIndex,
    pub target_holidays: HolidayDates,
    pub limits: SearchLimits,
}

impl TranslationContext {
    pub fn new(
        source_meetings: &[ClassMeetingItem],
        source_epoch: NaiveDate,
        target_epoch: NaiveDate,
        pattern: WeekdayPattern,
        target_holidays: HolidayDates,
        limits: SearchLimits,
    ) -> Self {
        Self {
            source_holidays: build_holiday_adjusted_index(source_meetings, source_epoch, pattern),
            source_epoch,
            target_epoch,
            pattern,
            target_holidays,
            limits,
        }
    }

    fn raw_offset(&self, source_date: NaiveDate) -> Option<NaiveDate> {
        self.target_epoch
            .checked_add_signed(source_date.signed_duration_since(self.source_epoch))
    }

    /// Calendar-day offset placement. Flagged when the offset overflows and
    /// the source date is kept.
    fn offset_placement(&self, source_date: NaiveDate, degraded: bool) -> Bounded<NaiveDate> {
        match self.raw_offset(source_date) {
            Some(date) if degraded => Bounded::degraded(date),
            Some(date) => Bounded::exact(date),
            None => {
                warn!(%source_date, "calendar-day offset out of range");
                Bounded::degraded(source_date)
            }
        }
    }
}

/// Translate one source date into the target semester.
///
/// Pattern days move by class-day number so they keep the teaching rhythm.
/// Any other date (weekend deadlines, Fridays) keeps its calendar-day offset
/// from the first class day, as do pattern days before the source epoch.
pub fn translate_date(source_date: NaiveDate, ctx: &TranslationContext) -> Bounded<NaiveDate> {
    let Some(class_day) = class_day_number(source_date, ctx.source_epoch, ctx.pattern) else {
        return ctx.offset_placement(source_date, false);
    };

    let adjusted = adjust_for_skipped_holidays(class_day, &ctx.source_holidays);
    if adjusted < 0 {
        return ctx.offset_placement(source_date, false);
    }

    let pushed = push_past_target_holidays(
        adjusted,
        ctx.target_epoch,
        ctx.pattern,
        &ctx.target_holidays,
        ctx.limits.holiday_skip_attempts,
    );
    match date_for_class_day(pushed.value, ctx.target_epoch, ctx.pattern) {
        Some(date) => Bounded {
            value: date,
            degraded: pushed.degraded,
        },
        None => ctx.offset_placement(source_date, true),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OffsetItem {
    Assignment(AssignmentItem),
    ClassMeeting(ClassMeetingItem),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetSummary {
    pub source_epoch: NaiveDate,
    pub target_epoch: NaiveDate,
    pub pattern: WeekdayPattern,
    pub source_holiday_count: usize,
    pub degraded_count: usize,
}

/// Translated calendar for a (source epoch, target epoch, pattern) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetCalendar {
    pub items: Vec<OffsetItem>,
    pub summary: OffsetSummary,
}

impl OffsetCalendar {
    pub fn degraded(&self) -> bool {
        self.summary.degraded_count > 0
    }

    pub fn assignments(&self) -> impl Iterator<Item = &AssignmentItem> {
        self.items.iter().filter_map(|item| match item {
            OffsetItem::Assignment(assignment) => Some(assignment),
            OffsetItem::ClassMeeting(_) => None,
        })
    }

    pub fn meetings(&self) -> impl Iterator<Item = &ClassMeetingItem> {
        self.items.iter().filter_map(|item| match item {
            OffsetItem::ClassMeeting(meeting) => Some(meeting),
            OffsetItem::Assignment(_) => None,
        })
    }
}

#[tracing::instrument(
    skip(assignments, meetings, target_holidays, limits),
    fields(assignments = assignments.len(), meetings = meetings.len())
)]
pub fn build_offset_calendar(
    assignments: &[AssignmentItem],
    meetings: &[ClassMeetingItem],
    source_epoch: NaiveDate,
    target_epoch: NaiveDate,
    pattern: WeekdayPattern,
    target_holidays: &HolidayDates,
    limits: SearchLimits,
) -> OffsetCalendar {
    let ctx = TranslationContext::new(
        meetings,
        source_epoch,
        target_epoch,
        pattern,
        target_holidays.clone(),
        limits,
    );
    debug!(
        source_holidays = ctx.source_holidays.len(),
        "built source holiday index"
    );

    let mut degraded_count = 0;
    let mut translate = |date: Option<NaiveDate>| {
        date.map(|date| {
            let translated = translate_date(date, &ctx);
            if translated.degraded {
                degraded_count += 1;
            }
            translated.value
        })
    };

    let mut items = Vec::with_capacity(assignments.len() + meetings.len());
    for assignment in assignments.iter().filter(|a| !a.is_class_starts_marker()) {
        items.push(OffsetItem::Assignment(AssignmentItem {
            name: assignment.name.clone(),
            start_date: translate(assignment.start_date),
            start_time: assignment.start_time.clone(),
            due_date: translate(assignment.due_date),
            due_time: assignment.due_time.clone(),
        }));
    }

    for meeting in meetings.iter().filter(|m| !m.is_holiday()) {
        if let Some(date) = translate(Some(meeting.date)) {
            items.push(OffsetItem::ClassMeeting(meeting.with_date(date)));
        }
    }

    if degraded_count > 0 {
        warn!(degraded_count, "offset calendar has degraded placements");
    }

    OffsetCalendar {
        items,
        summary: OffsetSummary {
            source_epoch,
            target_epoch,
            pattern,
            source_holiday_count: ctx.source_holidays.len(),
            degraded_count,
        },
    }
}

/// Translate a whole course calendar from one semester start to another.
///
/// Both starts are normalized to the pattern's first weekday on or after the
/// given date.
pub fn translate_calendar(
    assignments: &[AssignmentItem],
    meetings: &[ClassMeetingItem],
    pattern: WeekdayPattern,
    source_start: NaiveDate,
    target_start: NaiveDate,
    target_holidays: &HolidayTable,
    limits: SearchLimits,
) -> CalendarResult<OffsetCalendar> {
    let source_epoch = resolve_epoch(source_start, pattern, limits.holiday_skip_attempts)?;
    let target_epoch = resolve_epoch(target_start, pattern, limits.holiday_skip_attempts)?;
    Ok(build_offset_calendar(
        assignments,
        meetings,
        source_epoch,
        target_epoch,
        pattern,
        &target_holidays.dates(),
        limits,
    ))
}

/// Best guess at when the source semester started: the earliest meeting,
/// then the class-starts marker, then the earliest assignment date.
pub fn infer_source_start(
    assignments: &[AssignmentItem],
    meetings: &[ClassMeetingItem],
) -> Option<NaiveDate> {
    meetings
        .iter()
        .map(|meeting| meeting.date)
        .min()
        .or_else(|| {
            assignments
                .iter()
                .find(|assignment| assignment.is_class_starts_marker())
                .and_then(|marker| marker.start_date)
        })
        .or_else(|| {
            assignments
                .iter()
                .filter_map(AssignmentItem::earliest_date)
                .min()
        })
}

fn shift_date_tr_to_mw(date: NaiveDate) -> NaiveDate {
    let Some(shifted) = date.pred_opt() else {
        return date;
    };
    let back = match shifted.weekday() {
        Weekday::Fri => 2,
        Weekday::Sat => 3,
        _ => 0,
    };
    shifted.checked_sub_days(Days::new(back)).unwrap_or(shifted)
}

/// Copy a Tuesday/Thursday course's assignments onto a Monday/Wednesday
/// course: every date steps back a day, Friday and Saturday results land on
/// Wednesday instead.
pub fn shift_tr_to_mw(assignments: &[AssignmentItem]) -> Vec<AssignmentItem> {
    assignments
        .iter()
        .map(|assignment| AssignmentItem {
            start_date: assignment.start_date.map(shift_date_tr_to_mw),
            due_date: assignment.due_date.map(shift_date_tr_to_mw),
            ..assignment.clone()
        })
        .collect()
}
