use crate::course::Course;
use crate::holiday::{HolidayRecord, HolidayTable};
use crate::persistence::{StoreError, StoreResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "CLASS_CALENDAR_CONFIG";
/// Environment variable overriding the store location.
pub const STORE_ENV: &str = "CLASS_CALENDAR_STORE";

/// Iteration caps for every bounded search in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// Pattern days a holiday-skipping search may inspect.
    pub holiday_skip_attempts: usize,
    /// Displacements a single cascade move may perform.
    pub cascade_hops: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            holiday_skip_attempts: 100,
            cascade_hops: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    pub courses: Vec<Course>,
    /// Per-year replacements for the built-in academic holiday table.
    pub holidays: BTreeMap<i32, Vec<HolidayRecord>>,
    pub limits: SearchLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            courses: Course::defaults(),
            holidays: BTreeMap::new(),
            limits: SearchLimits::default(),
            store_path: None,
        }
    }
}

impl PlannerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let file = File::open(path)?;
        let config: PlannerConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> StoreResult<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Config from `CLASS_CALENDAR_CONFIG` when set, defaults otherwise.
    /// `CLASS_CALENDAR_STORE` overrides `store_path` either way.
    pub fn from_env() -> StoreResult<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim())?,
            _ => Self::default(),
        };
        if let Ok(path) = std::env::var(STORE_ENV) {
            if !path.trim().is_empty() {
                config.store_path = Some(PathBuf::from(path.trim()));
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.limits.holiday_skip_attempts == 0 {
            return Err(StoreError::InvalidData(
                "limits.holiday_skip_attempts must be at least 1".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for course in &self.courses {
            if course.id.trim().is_empty() {
                return Err(StoreError::InvalidData("course id must not be empty".into()));
            }
            if !seen.insert(course.id.as_str()) {
                return Err(StoreError::InvalidData(format!(
                    "duplicate course id {}",
                    course.id
                )));
            }
        }
        Ok(())
    }

    pub fn course(&self, course_id: &str) -> Option<&Course> {
        self.courses.iter().find(|course| course.id == course_id)
    }

    /// Holiday table for one year: the configured override when present,
    /// the built-in academic table otherwise.
    pub fn holidays_for_year(&self, year: i32) -> HolidayTable {
        match self.holidays.get(&year) {
            Some(records) => HolidayTable::from_records(records.iter().cloned()),
            None => HolidayTable::academic_year(year),
        }
    }

    /// Holiday table covering every year touched by `start..=end`.
    pub fn holidays_between(&self, start: NaiveDate, end: NaiveDate) -> HolidayTable {
        let (first, last) = if start <= end {
            (start.year(), end.year())
        } else {
            (end.year(), start.year())
        };
        let mut table = HolidayTable::new();
        for year in first..=last {
            table.extend(self.holidays_for_year(year).records().iter().cloned());
        }
        table
    }
}
