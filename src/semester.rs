use crate::item::AssignmentItem;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Semester {
    Spring,
    Summer1,
    Summer2,
    Fall,
}

impl Semester {
    /// Semester a date belongs to. July 15 sits between the two summer terms.
    pub fn of(date: NaiveDate) -> Option<Self> {
        match (date.month(), date.day()) {
            (1..=5, _) => Some(Semester::Spring),
            (6, _) | (7, 1..=14) => Some(Semester::Summer1),
            (7, 16..) | (8, 1..=23) => Some(Semester::Summer2),
            (8, 24..) | (9..=12, _) => Some(Semester::Fall),
            _ => None,
        }
    }

    /// Inclusive first and last day of the semester in `year`
    pub fn date_range(self, year: i32) -> Option<(NaiveDate, NaiveDate)> {
        let (start, end) = match self {
            Semester::Spring => ((1, 1), (5, 31)),
            Semester::Summer1 => ((6, 1), (7, 14)),
            Semester::Summer2 => ((7, 16), (8, 23)),
            Semester::Fall => ((8, 24), (12, 31)),
        };
        Some((
            NaiveDate::from_ymd_opt(year, start.0, start.1)?,
            NaiveDate::from_ymd_opt(year, end.0, end.1)?,
        ))
    }

    /// First day of the semester containing `date`, or `date` itself for the
    /// July 15 gap.
    pub fn start_of(date: NaiveDate) -> NaiveDate {
        Self::of(date)
            .and_then(|semester| semester.date_range(date.year()))
            .map(|(start, _)| start)
            .unwrap_or(date)
    }

    pub fn label(self, year: i32) -> String {
        format!("{self} {year}")
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Semester::Spring => "Spring",
            Semester::Summer1 => "Summer 1",
            Semester::Summer2 => "Summer 2",
            Semester::Fall => "Fall",
        };
        f.write_str(name)
    }
}

impl FromStr for Semester {
    type Err = String;

    /// Accepts `Spring`, `Summer 1`, `summer1`, `Summer2`, `Fall`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "spring" => Ok(Semester::Spring),
            "summer1" => Ok(Semester::Summer1),
            "summer2" => Ok(Semester::Summer2),
            "fall" => Ok(Semester::Fall),
            _ => Err(format!("unknown semester '{s}'")),
        }
    }
}

/// Suggested start of the semester after the one `assignments` belong to:
/// a fall calendar suggests January 15 of the next year, a spring calendar
/// August 15 of the same year.
pub fn default_future_start(assignments: &[AssignmentItem]) -> Option<NaiveDate> {
    let dates: Vec<NaiveDate> = assignments
        .iter()
        .flat_map(|assignment| [assignment.start_date, assignment.due_date])
        .flatten()
        .collect();

    let fall = dates.iter().filter(|date| date.month() >= 8).min();
    let spring = dates.iter().filter(|date| date.month() <= 5).min();

    let (year, month) = match (fall, spring) {
        (Some(fall), _) => (fall.year() + 1, 1),
        (None, Some(spring)) => (spring.year(), 8),
        (None, None) => {
            let earliest = dates.iter().min()?;
            if earliest.month() >= 8 {
                (earliest.year() + 1, 1)
            } else {
                (earliest.year(), 8)
            }
        }
    };
    NaiveDate::from_ymd_opt(year, month, 15)
}
