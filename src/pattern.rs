use crate::error::CalendarError;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The pair of weekdays a course meets on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeekdayPattern {
    #[serde(rename = "MW")]
    MondayWednesday,
    #[serde(rename = "TR")]
    TuesdayThursday,
}

impl WeekdayPattern {
    pub const ALL: [WeekdayPattern; 2] = [
        WeekdayPattern::MondayWednesday,
        WeekdayPattern::TuesdayThursday,
    ];

    /// Earlier meeting day of the week
    pub fn first(self) -> Weekday {
        match self {
            WeekdayPattern::MondayWednesday => Weekday::Mon,
            WeekdayPattern::TuesdayThursday => Weekday::Tue,
        }
    }

    /// Later meeting day of the week
    pub fn second(self) -> Weekday {
        match self {
            WeekdayPattern::MondayWednesday => Weekday::Wed,
            WeekdayPattern::TuesdayThursday => Weekday::Thu,
        }
    }

    pub fn weekdays(self) -> [Weekday; 2] {
        [self.first(), self.second()]
    }

    pub fn contains(self, weekday: Weekday) -> bool {
        weekday == self.first() || weekday == self.second()
    }

    pub fn matches(self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeekdayPattern::MondayWednesday => "MW",
            WeekdayPattern::TuesdayThursday => "TR",
        }
    }

    /// Pattern a single date belongs to, if it is a Monday through Thursday.
    pub fn of_date(date: NaiveDate) -> Option<Self> {
        Self::ALL.into_iter().find(|pattern| pattern.matches(date))
    }

    /// Resolve the pattern from a course schedule string such as
    /// `"MW 11:00-12:20"` or `"TTH 8:00-9:20"`.
    pub fn from_course_schedule(schedule: &str) -> Result<Self, CalendarError> {
        let token = schedule
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        let pattern = if token.starts_with("MW") {
            Some(WeekdayPattern::MondayWednesday)
        } else if token.starts_with("TTH") || token.starts_with("TR") {
            Some(WeekdayPattern::TuesdayThursday)
        } else {
            None
        };
        pattern.ok_or_else(|| CalendarError::UnresolvedPattern {
            schedule: schedule.to_string(),
        })
    }
}

impl fmt::Display for WeekdayPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeekdayPattern {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_course_schedule(s.trim())
    }
}
