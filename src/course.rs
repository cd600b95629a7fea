use crate::error::CalendarResult;
use crate::item::{AssignmentItem, ClassMeetingItem};
use crate::pattern::WeekdayPattern;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    /// Meeting string such as `"MW 11:00-12:20"` or `"TTH 8:00-9:20"`.
    pub schedule: String,
}

impl Course {
    pub fn new(id: impl Into<String>, schedule: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            schedule: schedule.into(),
        }
    }

    pub fn pattern(&self) -> CalendarResult<WeekdayPattern> {
        WeekdayPattern::from_course_schedule(&self.schedule)
    }

    /// Built-in course list
    pub fn defaults() -> Vec<Course> {
        vec![
            Course::new("FM 4103", "MW 11:00-12:20"),
            Course::new("CA 4105", "MW 9:30-10:50"),
            Course::new("CA 4201", "TTH 8:00-9:20"),
            Course::new("FM 4202", "TTH 11:00-12:20"),
            Course::new("CA 4203", "TTH 9:30-10:50"),
        ]
    }
}

/// The stored calendar of one course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCalendar {
    pub course_id: String,
    #[serde(default)]
    pub assignments: Vec<AssignmentItem>,
    #[serde(default)]
    pub meetings: Vec<ClassMeetingItem>,
    /// Translated assignments the user accepted for the next semester.
    #[serde(default)]
    pub accepted_future: Vec<AssignmentItem>,
}

impl CourseCalendar {
    pub fn new(course_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty() && self.meetings.is_empty() && self.accepted_future.is_empty()
    }

    /// Drop every assignment or meeting dated within `start..=end`.
    /// Returns the number of items removed.
    pub fn clear_range(&mut self, start: NaiveDate, end: NaiveDate) -> usize {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let before = self.assignments.len() + self.meetings.len() + self.accepted_future.len();
        self.assignments.retain(|item| !item.touches_range(start, end));
        self.accepted_future
            .retain(|item| !item.touches_range(start, end));
        self.meetings
            .retain(|meeting| meeting.date < start || meeting.date > end);
        before - (self.assignments.len() + self.meetings.len() + self.accepted_future.len())
    }
}
