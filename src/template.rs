use crate::course::{Course, CourseCalendar};
use crate::item::{AssignmentItem, ClassMeetingItem};
use crate::pattern::WeekdayPattern;
use crate::semester::Semester;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const TEMPLATE_ID_PREFIX: &str = "default-";

/// A saved course calendar that can seed other courses of the same type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarTemplate {
    pub id: String,
    pub name: String,
    /// Subject family, e.g. `College Algebra`.
    pub course_type: String,
    #[serde(default)]
    pub pattern: Option<WeekdayPattern>,
    pub semester: Semester,
    #[serde(default)]
    pub assignments: Vec<AssignmentItem>,
    #[serde(default)]
    pub meetings: Vec<ClassMeetingItem>,
    pub created_at: DateTime<Utc>,
}

impl CalendarTemplate {
    /// Snapshot a stored calendar. Accepted future assignments are not part
    /// of a template.
    pub fn from_calendar(
        id: String,
        name: &str,
        course: &Course,
        semester: Semester,
        calendar: &CourseCalendar,
    ) -> Self {
        Self {
            id,
            name: name.trim().to_string(),
            course_type: course_type_for(&course.id),
            pattern: course.pattern().ok(),
            semester,
            assignments: calendar.assignments.clone(),
            meetings: calendar.meetings.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Subject family of a course id: `CA …` is College Algebra and `FM …` is
/// Finite Math. Anything else is its own type.
pub fn course_type_for(course_id: &str) -> String {
    if course_id.starts_with("CA") {
        "College Algebra".to_string()
    } else if course_id.starts_with("FM") {
        "Finite Math".to_string()
    } else {
        course_id.to_string()
    }
}

/// Stable id derived from a template name, so saving under the same name
/// overwrites. `None` when the name has no letters or digits.
pub fn template_id(name: &str) -> Option<String> {
    let mut slug = String::new();
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        None
    } else {
        Some(format!("{TEMPLATE_ID_PREFIX}{slug}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    pub course_type: Option<String>,
    pub pattern: Option<WeekdayPattern>,
    pub semester: Option<Semester>,
}

impl TemplateFilter {
    pub fn matches(&self, template: &CalendarTemplate) -> bool {
        self.course_type
            .as_deref()
            .is_none_or(|course_type| template.course_type == course_type)
            && self
                .pattern
                .is_none_or(|pattern| template.pattern == Some(pattern))
            && self
                .semester
                .is_none_or(|semester| template.semester == semester)
    }
}
