use crate::course::CourseCalendar;
use crate::template::CalendarTemplate;
use serde_json::Error as SerdeJsonError;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("no value stored under '{0}'")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Flat string key-value storage. Implementations use interior mutability so
/// a store can be shared behind `&self`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn put(&self, key: &str, value: &str) -> StoreResult<()>;
    /// Returns whether a value was removed
    fn delete(&self, key: &str) -> StoreResult<bool>;
    /// Stored keys starting with `prefix`, sorted
    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        (**self).delete(key)
    }

    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        (**self).keys(prefix)
    }
}

const CALENDAR_PREFIX: &str = "courseCalendars/";
const TEMPLATE_PREFIX: &str = "templates/";

pub fn validate_calendar(calendar: &CourseCalendar) -> StoreResult<()> {
    if calendar.course_id.trim().is_empty() {
        return Err(StoreError::InvalidData(
            "calendar requires a non-empty course id".into(),
        ));
    }
    for (idx, assignment) in calendar
        .assignments
        .iter()
        .chain(calendar.accepted_future.iter())
        .enumerate()
    {
        if assignment.name.trim().is_empty() {
            return Err(StoreError::InvalidData(format!(
                "course {} assignment #{} requires a name",
                calendar.course_id, idx
            )));
        }
    }
    for meeting in &calendar.meetings {
        if meeting.description.trim().is_empty() {
            return Err(StoreError::InvalidData(format!(
                "course {} meeting on {} requires a description",
                calendar.course_id, meeting.date
            )));
        }
    }
    Ok(())
}

pub fn validate_template(template: &CalendarTemplate) -> StoreResult<()> {
    if template.id.trim().is_empty() || template.name.trim().is_empty() {
        return Err(StoreError::InvalidData(
            "template requires an id and a name".into(),
        ));
    }
    if template.meetings.is_empty() {
        return Err(StoreError::InvalidData(format!(
            "template {} has no class meetings",
            template.id
        )));
    }
    Ok(())
}

/// Typed course calendars on top of a [`KeyValueStore`].
pub struct CalendarRepository<S> {
    store: S,
}

impl<S: KeyValueStore> CalendarRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn key(course_id: &str) -> String {
        format!("{CALENDAR_PREFIX}{course_id}")
    }

    pub fn save(&self, calendar: &CourseCalendar) -> StoreResult<()> {
        validate_calendar(calendar)?;
        let json = serde_json::to_string(calendar)?;
        self.store.put(&Self::key(&calendar.course_id), &json)
    }

    pub fn load(&self, course_id: &str) -> StoreResult<Option<CourseCalendar>> {
        let Some(json) = self.store.get(&Self::key(course_id))? else {
            return Ok(None);
        };
        let calendar: CourseCalendar = serde_json::from_str(&json)?;
        validate_calendar(&calendar)?;
        if calendar.course_id != course_id {
            return Err(StoreError::InvalidData(format!(
                "calendar stored under {course_id} belongs to {}",
                calendar.course_id
            )));
        }
        Ok(Some(calendar))
    }

    pub fn delete(&self, course_id: &str) -> StoreResult<bool> {
        self.store.delete(&Self::key(course_id))
    }

    pub fn course_ids(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .store
            .keys(CALENDAR_PREFIX)?
            .into_iter()
            .filter_map(|key| key.strip_prefix(CALENDAR_PREFIX).map(str::to_string))
            .collect())
    }

    pub fn save_template(&self, template: &CalendarTemplate) -> StoreResult<()> {
        validate_template(template)?;
        let json = serde_json::to_string(template)?;
        self.store
            .put(&format!("{TEMPLATE_PREFIX}{}", template.id), &json)
    }

    pub fn load_template(&self, id: &str) -> StoreResult<Option<CalendarTemplate>> {
        let Some(json) = self.store.get(&format!("{TEMPLATE_PREFIX}{id}"))? else {
            return Ok(None);
        };
        let template: CalendarTemplate = serde_json::from_str(&json)?;
        if template.id != id {
            return Err(StoreError::InvalidData(format!(
                "template stored under {id} is {}",
                template.id
            )));
        }
        Ok(Some(template))
    }

    pub fn delete_template(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(&format!("{TEMPLATE_PREFIX}{id}"))
    }

    /// All stored templates, ordered by id.
    pub fn templates(&self) -> StoreResult<Vec<CalendarTemplate>> {
        let mut templates = Vec::new();
        for key in self.store.keys(TEMPLATE_PREFIX)? {
            if let Some(json) = self.store.get(&key)? {
                templates.push(serde_json::from_str(&json)?);
            }
        }
        Ok(templates)
    }
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    JsonFileStore, export_offset_csv, load_assignments_csv, load_meetings_csv, parse_date_text,
    read_assignments_csv, read_meetings_csv,
};
pub use memory::MemoryStore;
