use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Name of the assignment row that marks the first day of class.
pub const CLASS_STARTS_MARKER: &str = "Class starts";

const HOLIDAY_KEYWORDS: [&str; 13] = [
    "thanksgiving",
    "labor day",
    "holiday",
    "christmas",
    "new year",
    "easter",
    "memorial day",
    "independence day",
    "presidents day",
    "martin luther king",
    "mlk day",
    "spring break",
    "offices closed",
];

/// A gradable task. Not tied to a class meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_time: Option<String>,
}

impl AssignmentItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_date: None,
            start_time: None,
            due_date: None,
            due_time: None,
        }
    }

    pub fn with_start(mut self, date: NaiveDate, time: Option<&str>) -> Self {
        self.start_date = Some(date);
        self.start_time = time.map(str::to_string);
        self
    }

    pub fn with_due(mut self, date: NaiveDate, time: Option<&str>) -> Self {
        self.due_date = Some(date);
        self.due_time = time.map(str::to_string);
        self
    }

    pub fn is_class_starts_marker(&self) -> bool {
        self.name.trim() == CLASS_STARTS_MARKER
    }

    /// Earliest of the start and due dates
    pub fn earliest_date(&self) -> Option<NaiveDate> {
        match (self.start_date, self.due_date) {
            (Some(start), Some(due)) => Some(start.min(due)),
            (start, due) => start.or(due),
        }
    }

    pub fn touches_range(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let in_range = |date: Option<NaiveDate>| date.is_some_and(|d| start <= d && d <= end);
        in_range(self.start_date) || in_range(self.due_date)
    }
}

/// Manual date and time edits for one assignment. Fields left as `None`
/// keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOverride {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_time: Option<String>,
}

impl AssignmentOverride {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.start_time.is_none()
            && self.due_date.is_none()
            && self.due_time.is_none()
    }

    pub fn apply_to(&self, item: &mut AssignmentItem) {
        if let Some(date) = self.start_date {
            item.start_date = Some(date);
        }
        if let Some(time) = &self.start_time {
            item.start_time = Some(time.clone());
        }
        if let Some(date) = self.due_date {
            item.due_date = Some(date);
        }
        if let Some(time) = &self.due_time {
            item.due_time = Some(time.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingKind {
    Regular,
    Quiz,
    Test,
    Exam,
    Holiday,
}

impl MeetingKind {
    /// Infer the kind of a class meeting from its description text.
    pub fn classify(description: &str) -> Self {
        let lower = description.to_lowercase();
        if HOLIDAY_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
            MeetingKind::Holiday
        } else if lower.contains("final") {
            MeetingKind::Exam
        } else if lower.contains("test") {
            MeetingKind::Test
        } else if lower.contains("quiz") {
            MeetingKind::Quiz
        } else {
            MeetingKind::Regular
        }
    }

    /// Holidays and final exams never move
    pub fn is_fixed(self) -> bool {
        matches!(self, MeetingKind::Holiday | MeetingKind::Exam)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MeetingKind::Regular => "regular",
            MeetingKind::Quiz => "quiz",
            MeetingKind::Test => "test",
            MeetingKind::Exam => "exam",
            MeetingKind::Holiday => "holiday",
        }
    }
}

/// One entry of the class-meeting calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMeetingItem {
    pub date: NaiveDate,
    pub description: String,
}

impl ClassMeetingItem {
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            date,
            description: description.into(),
        }
    }

    pub fn kind(&self) -> MeetingKind {
        MeetingKind::classify(&self.description)
    }

    pub fn is_fixed(&self) -> bool {
        self.kind().is_fixed()
    }

    pub fn is_holiday(&self) -> bool {
        self.kind() == MeetingKind::Holiday
    }

    pub fn with_date(&self, date: NaiveDate) -> Self {
        Self {
            date,
            description: self.description.clone(),
        }
    }
}
