use crate::cascade::{MoveOutcome, MoveStatus, move_meeting_item};
use crate::class_day::{align_to_pattern, class_day_number, resolve_epoch};
use crate::config::PlannerConfig;
use crate::course::{Course, CourseCalendar};
use crate::error::CalendarError;
use crate::holiday::HolidayTable;
use crate::item::AssignmentOverride;
use crate::offset::{OffsetCalendar, infer_source_start, shift_tr_to_mw, translate_calendar};
use crate::pattern::WeekdayPattern;
use crate::persistence::{
    CalendarRepository, KeyValueStore, StoreError, load_assignments_csv, load_meetings_csv,
};
use crate::semester::{Semester, default_future_start};
use crate::template::{CalendarTemplate, TemplateFilter, template_id};
use chrono::{Datelike, Days, NaiveDate};
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, warn};

/// Span of target-semester dates whose holidays are applied to a plan.
const TARGET_HORIZON_DAYS: u64 = 183;

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown course {0}")]
    UnknownCourse(String),
    #[error("no calendar stored for course {0}")]
    NoCalendar(String),
    #[error("course {course_id} has no assignment named '{name}'")]
    UnknownAssignment { course_id: String, name: String },
    #[error("no template stored under {0}")]
    NoTemplate(String),
    #[error("{0} does not fall in any semester")]
    NoSemester(NaiveDate),
    #[error("cannot copy a {from} calendar onto a {to} course")]
    IncompatiblePatterns {
        from: WeekdayPattern,
        to: WeekdayPattern,
    },
}

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Course calendars, their stored state, and the engine operations that
/// act on them.
pub struct Planner<S> {
    repository: CalendarRepository<S>,
    config: PlannerConfig,
}

impl<S: KeyValueStore> Planner<S> {
    pub fn new(store: S, config: PlannerConfig) -> Self {
        Self {
            repository: CalendarRepository::new(store),
            config,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn courses(&self) -> &[Course] {
        &self.config.courses
    }

    pub fn course(&self, course_id: &str) -> PlannerResult<&Course> {
        self.config
            .course(course_id)
            .ok_or_else(|| PlannerError::UnknownCourse(course_id.to_string()))
    }

    fn pattern(&self, course_id: &str) -> PlannerResult<WeekdayPattern> {
        Ok(self.course(course_id)?.pattern()?)
    }

    /// Course ids with a stored calendar.
    pub fn stored_course_ids(&self) -> PlannerResult<Vec<String>> {
        Ok(self.repository.course_ids()?)
    }

    pub fn save_calendar(&self, calendar: &CourseCalendar) -> PlannerResult<()> {
        self.course(&calendar.course_id)?;
        self.repository.save(calendar)?;
        info!(
            course = %calendar.course_id,
            assignments = calendar.assignments.len(),
            meetings = calendar.meetings.len(),
            "saved calendar"
        );
        Ok(())
    }

    pub fn load_calendar(&self, course_id: &str) -> PlannerResult<Option<CourseCalendar>> {
        Ok(self.repository.load(course_id)?)
    }

    fn require_calendar(&self, course_id: &str) -> PlannerResult<CourseCalendar> {
        self.load_calendar(course_id)?
            .ok_or_else(|| PlannerError::NoCalendar(course_id.to_string()))
    }

    pub fn delete_calendar(&self, course_id: &str) -> PlannerResult<bool> {
        let removed = self.repository.delete(course_id)?;
        if removed {
            info!(course = %course_id, "deleted calendar");
        }
        Ok(removed)
    }

    /// Read both CSV tables for a course and store them, keeping any
    /// previously accepted future assignments.
    pub fn import_csv<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        course_id: &str,
        assignments_path: P,
        meetings_path: Q,
    ) -> PlannerResult<CourseCalendar> {
        self.course(course_id)?;
        let mut calendar = self
            .load_calendar(course_id)?
            .unwrap_or_else(|| CourseCalendar::new(course_id));
        calendar.assignments = load_assignments_csv(assignments_path)?;
        calendar.meetings = load_meetings_csv(meetings_path)?;
        self.save_calendar(&calendar)?;
        Ok(calendar)
    }

    fn source_start(&self, calendar: &CourseCalendar) -> PlannerResult<NaiveDate> {
        infer_source_start(&calendar.assignments, &calendar.meetings).ok_or_else(|| {
            PlannerError::Calendar(CalendarError::MissingStartDate {
                course_id: calendar.course_id.clone(),
            })
        })
    }

    /// Holiday table for `year`, honouring configured overrides.
    pub fn holidays(&self, year: i32) -> HolidayTable {
        self.config.holidays_for_year(year)
    }

    /// Label of the configured holiday covering `date`.
    pub fn holiday_label(&self, date: NaiveDate) -> Option<String> {
        self.holidays(date.year())
            .label_for(date)
            .map(str::to_string)
    }

    /// Class-day number of `date` in the stored calendar's semester.
    pub fn class_day(&self, course_id: &str, date: NaiveDate) -> PlannerResult<Option<i64>> {
        let pattern = self.pattern(course_id)?;
        let calendar = self.require_calendar(course_id)?;
        let start = self.source_start(&calendar)?;
        let epoch = resolve_epoch(start, pattern, self.config.limits.holiday_skip_attempts)?;
        Ok(class_day_number(date, epoch, pattern))
    }

    /// Translate the stored calendar onto a semester starting at
    /// `target_start`. Nothing is written.
    #[tracing::instrument(skip(self))]
    pub fn plan_future(
        &self,
        course_id: &str,
        target_start: NaiveDate,
    ) -> PlannerResult<OffsetCalendar> {
        let pattern = self.pattern(course_id)?;
        let calendar = self.require_calendar(course_id)?;
        let source_start = self.source_start(&calendar)?;
        let horizon = target_start
            .checked_add_days(Days::new(TARGET_HORIZON_DAYS))
            .unwrap_or(target_start);
        let holidays = self.config.holidays_between(target_start, horizon);

        let planned = translate_calendar(
            &calendar.assignments,
            &calendar.meetings,
            pattern,
            source_start,
            target_start,
            &holidays,
            self.config.limits,
        )?;
        info!(
            course = %course_id,
            %source_start,
            target_epoch = %planned.summary.target_epoch,
            items = planned.items.len(),
            "planned future calendar"
        );
        Ok(planned)
    }

    /// Start date to offer when planning the next semester: the semester
    /// after the stored assignments', snapped onto the course pattern.
    pub fn suggested_target_start(&self, course_id: &str) -> PlannerResult<NaiveDate> {
        let pattern = self.pattern(course_id)?;
        let calendar = self.require_calendar(course_id)?;
        let suggested = default_future_start(&calendar.assignments).ok_or_else(|| {
            CalendarError::MissingStartDate {
                course_id: course_id.to_string(),
            }
        })?;
        Ok(align_to_pattern(suggested, pattern))
    }

    /// Translate several courses at once. Each result is independent.
    pub fn plan_many(
        &self,
        course_ids: &[String],
        target_start: NaiveDate,
    ) -> Vec<(String, PlannerResult<OffsetCalendar>)> {
        course_ids
            .par_iter()
            .map(|course_id| (course_id.clone(), self.plan_future(course_id, target_start)))
            .collect()
    }

    /// Store the translated assignments as the course's accepted future.
    pub fn accept_future(
        &self,
        course_id: &str,
        planned: &OffsetCalendar,
    ) -> PlannerResult<usize> {
        let mut calendar = self.require_calendar(course_id)?;
        calendar.accepted_future = planned.assignments().cloned().collect();
        let accepted = calendar.accepted_future.len();
        self.save_calendar(&calendar)?;
        Ok(accepted)
    }

    /// Cascade-move a meeting in the stored calendar. An exhausted cascade
    /// still stores the best placement it reached.
    #[tracing::instrument(skip(self))]
    pub fn move_meeting(
        &mut self,
        course_id: &str,
        source: NaiveDate,
        target: NaiveDate,
        item_key: Option<&str>,
    ) -> PlannerResult<MoveOutcome> {
        let pattern = self.pattern(course_id)?;
        let mut calendar = self.require_calendar(course_id)?;

        let first = calendar
            .meetings
            .iter()
            .map(|meeting| meeting.date)
            .chain([source, target])
            .min()
            .unwrap_or(source);
        let last = calendar
            .meetings
            .iter()
            .map(|meeting| meeting.date)
            .chain([source, target])
            .max()
            .unwrap_or(target);
        let horizon = last
            .checked_add_days(Days::new(TARGET_HORIZON_DAYS))
            .unwrap_or(last);
        let holidays = self.config.holidays_between(first, horizon).dates();

        let outcome = move_meeting_item(
            &calendar.meetings,
            source,
            target,
            pattern,
            &holidays,
            item_key,
            self.config.limits,
        );
        match outcome.status {
            MoveStatus::Moved | MoveStatus::Exhausted => {
                if outcome.is_degraded() {
                    warn!(course = %course_id, "cascade exhausted, saving best placement");
                }
                calendar.meetings = outcome.meetings.clone();
                self.save_calendar(&calendar)?;
            }
            MoveStatus::Unchanged | MoveStatus::NotFound => {}
        }
        Ok(outcome)
    }

    /// Drop items dated within `start..=end` from the stored calendar.
    pub fn clear_range(
        &self,
        course_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PlannerResult<usize> {
        let mut calendar = self.require_calendar(course_id)?;
        let removed = calendar.clear_range(start, end);
        if removed > 0 {
            self.save_calendar(&calendar)?;
        }
        info!(course = %course_id, %start, %end, removed, "cleared date range");
        Ok(removed)
    }

    /// Clear the semester containing `containing`, or the stored calendar's
    /// own semester when no date is given.
    pub fn clear_semester(
        &self,
        course_id: &str,
        containing: Option<NaiveDate>,
    ) -> PlannerResult<(Semester, usize)> {
        let date = match containing {
            Some(date) => date,
            None => self.source_start(&self.require_calendar(course_id)?)?,
        };
        let semester = Semester::of(date).ok_or(PlannerError::NoSemester(date))?;
        let (start, end) = semester
            .date_range(date.year())
            .ok_or(PlannerError::NoSemester(date))?;
        let removed = self.clear_range(course_id, start, end)?;
        Ok((semester, removed))
    }

    /// Apply a manual date/time edit to every assignment named `name`, in
    /// both the current and the accepted future lists.
    pub fn override_assignment(
        &self,
        course_id: &str,
        name: &str,
        edit: &AssignmentOverride,
    ) -> PlannerResult<usize> {
        let mut calendar = self.require_calendar(course_id)?;
        let mut updated = 0;
        for item in calendar
            .assignments
            .iter_mut()
            .chain(calendar.accepted_future.iter_mut())
            .filter(|item| item.name == name)
        {
            edit.apply_to(item);
            updated += 1;
        }
        if updated == 0 {
            return Err(PlannerError::UnknownAssignment {
                course_id: course_id.to_string(),
                name: name.to_string(),
            });
        }
        if !edit.is_empty() {
            self.save_calendar(&calendar)?;
        }
        info!(course = %course_id, name, updated, "overrode assignment dates");
        Ok(updated)
    }

    /// Seed `target_id` with the assignments of `source_id`. A Tuesday/Thursday
    /// source copied onto a Monday/Wednesday course has its dates shifted.
    pub fn copy_assignments(&self, source_id: &str, target_id: &str) -> PlannerResult<usize> {
        let from = self.pattern(source_id)?;
        let to = self.pattern(target_id)?;
        let source = self.require_calendar(source_id)?;
        let assignments = match (from, to) {
            _ if from == to => source.assignments,
            (WeekdayPattern::TuesdayThursday, WeekdayPattern::MondayWednesday) => {
                shift_tr_to_mw(&source.assignments)
            }
            _ => return Err(PlannerError::IncompatiblePatterns { from, to }),
        };
        let mut target = self
            .load_calendar(target_id)?
            .unwrap_or_else(|| CourseCalendar::new(target_id));
        target.assignments = assignments;
        target.accepted_future.clear();
        let copied = target.assignments.len();
        self.save_calendar(&target)?;
        info!(source = %source_id, target = %target_id, copied, "copied assignments");
        Ok(copied)
    }

    /// Save the stored calendar of `course_id` as a template. The semester
    /// defaults to the one the calendar starts in.
    pub fn save_template(
        &self,
        course_id: &str,
        name: &str,
        semester: Option<Semester>,
    ) -> PlannerResult<CalendarTemplate> {
        let course = self.course(course_id)?;
        let calendar = self.require_calendar(course_id)?;
        let id = template_id(name).ok_or_else(|| {
            StoreError::InvalidData(format!("template name '{name}' has no letters or digits"))
        })?;
        let semester = semester
            .or_else(|| self.source_start(&calendar).ok().and_then(Semester::of))
            .unwrap_or(Semester::Fall);
        let template = CalendarTemplate::from_calendar(id, name, course, semester, &calendar);
        self.repository.save_template(&template)?;
        info!(template = %template.id, course = %course_id, "saved template");
        Ok(template)
    }

    pub fn templates(&self, filter: &TemplateFilter) -> PlannerResult<Vec<CalendarTemplate>> {
        Ok(self
            .repository
            .templates()?
            .into_iter()
            .filter(|template| filter.matches(template))
            .collect())
    }

    pub fn template(&self, id: &str) -> PlannerResult<Option<CalendarTemplate>> {
        Ok(self.repository.load_template(id)?)
    }

    pub fn delete_template(&self, id: &str) -> PlannerResult<bool> {
        Ok(self.repository.delete_template(id)?)
    }

    /// Replace the calendar of `course_id` with a template's items.
    pub fn apply_template(&self, id: &str, course_id: &str) -> PlannerResult<CourseCalendar> {
        let to = self.pattern(course_id)?;
        let template = self
            .template(id)?
            .ok_or_else(|| PlannerError::NoTemplate(id.to_string()))?;
        if let Some(from) = template.pattern.filter(|from| *from != to) {
            return Err(PlannerError::IncompatiblePatterns { from, to });
        }
        let mut calendar = CourseCalendar::new(course_id);
        calendar.assignments = template.assignments;
        calendar.meetings = template.meetings;
        self.save_calendar(&calendar)?;
        Ok(calendar)
    }
}
