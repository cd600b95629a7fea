use crate::pattern::WeekdayPattern;
use chrono::NaiveDate;

/// Hard failures of the date engine. Stale moves and exhausted searches are
/// reported through statuses instead, see [`crate::cascade::MoveStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("could not determine a weekday pattern from course schedule '{schedule}'")]
    UnresolvedPattern { schedule: String },

    #[error("no {pattern} class day found on or after {start}")]
    NoEpoch {
        start: NaiveDate,
        pattern: WeekdayPattern,
    },

    #[error("course {course_id} has no dated items to anchor its calendar")]
    MissingStartDate { course_id: String },
}

pub type CalendarResult<T> = Result<T, CalendarError>;
