pub mod cascade;
pub mod class_day;
pub mod config;
pub mod course;
pub mod error;
pub mod holiday;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod item;
pub mod offset;
pub mod pattern;
pub mod persistence;
pub mod planner;
pub mod semester;
pub mod template;

pub use cascade::{MoveOutcome, MoveStatus, Relocation, move_meeting_item};
pub use class_day::{
    align_to_pattern, class_day_number, date_for_class_day, first_class_day, is_class_day,
    next_class_day, previous_class_day, resolve_epoch,
};
pub use config::{PlannerConfig, SearchLimits};
pub use course::{Course, CourseCalendar};
pub use error::{CalendarError, CalendarResult};
pub use holiday::{HolidayDates, HolidayRecord, HolidaySpan, HolidayTable};
pub use item::{AssignmentItem, AssignmentOverride, ClassMeetingItem, MeetingKind};
pub use offset::{
    Bounded, OffsetCalendar, OffsetItem, OffsetSummary, build_offset_calendar,
    infer_source_start, translate_calendar,
};
pub use pattern::WeekdayPattern;
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteStore;
pub use persistence::{
    CalendarRepository, JsonFileStore, KeyValueStore, MemoryStore, StoreError, StoreResult,
};
pub use planner::{Planner, PlannerError, PlannerResult};
pub use semester::Semester;
pub use template::{CalendarTemplate, TemplateFilter};
