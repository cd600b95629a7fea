use super::{KeyValueStore, StoreError, StoreResult};
use crate::item::{AssignmentItem, ClassMeetingItem};
use crate::offset::OffsetCalendar;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Key-value store persisted as one pretty-printed JSON object.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StoreResult<BTreeMap<String, String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_reader(file)?)
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> StoreResult<()> {
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, values)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        let removed = values.remove(key).is_some();
        if removed {
            self.write_all(&values)?;
        }
        Ok(removed)
    }

    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let _guard = self.lock.lock();
        Ok(self
            .read_all()?
            .into_keys()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }
}

#[derive(Default, Serialize, Deserialize)]
struct AssignmentCsvRecord {
    #[serde(rename = "Item Name")]
    name: String,
    #[serde(rename = "Start Date", default)]
    start_date: String,
    #[serde(rename = "Start Time", default)]
    start_time: String,
    #[serde(rename = "Due Date", default)]
    due_date: String,
    #[serde(rename = "Due Time", default)]
    due_time: String,
}

impl AssignmentCsvRecord {
    fn into_item(self) -> StoreResult<AssignmentItem> {
        Ok(AssignmentItem {
            start_date: parse_date_text(&self.start_date)?,
            start_time: parse_string_option(self.start_time),
            due_date: parse_date_text(&self.due_date)?,
            due_time: parse_string_option(self.due_time),
            name: self.name.trim().to_string(),
        })
    }
}

impl From<&AssignmentItem> for AssignmentCsvRecord {
    fn from(item: &AssignmentItem) -> Self {
        Self {
            name: item.name.clone(),
            start_date: format_us_date(item.start_date),
            start_time: item.start_time.clone().unwrap_or_default(),
            due_date: format_us_date(item.due_date),
            due_time: item.due_time.clone().unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct MeetingCsvRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description")]
    description: String,
}

impl MeetingCsvRecord {
    fn into_item(self) -> StoreResult<ClassMeetingItem> {
        let date = parse_date_text(&self.date)?.ok_or_else(|| {
            StoreError::InvalidData(format!("meeting '{}' has no date", self.description))
        })?;
        Ok(ClassMeetingItem::new(date, self.description.trim()))
    }
}

fn require_headers<R: Read>(
    reader: &mut csv::Reader<R>,
    kind: &str,
    required: &[&str],
    expected: &str,
) -> StoreResult<()> {
    let headers = reader.headers()?;
    let missing = required
        .iter()
        .any(|name| !headers.iter().any(|header| header.trim() == *name));
    if missing {
        return Err(StoreError::InvalidData(format!(
            "{kind} CSV has incorrect format: expected '{expected}', got '{}'",
            headers.iter().collect::<Vec<_>>().join(", ")
        )));
    }
    Ok(())
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

/// Parse an assignment table with columns
/// `Item Name, Start Date, Start Time, Due Date, Due Time`.
pub fn read_assignments_csv<R: Read>(reader: R) -> StoreResult<Vec<AssignmentItem>> {
    let mut reader = csv_reader(reader);
    require_headers(
        &mut reader,
        "assignment",
        &["Item Name", "Start Date"],
        "Item Name, Start Date, Start Time, Due Date, Due Time",
    )?;
    let mut items = Vec::new();
    for record in reader.deserialize::<AssignmentCsvRecord>() {
        let record = record?;
        if record.name.trim().is_empty() {
            continue;
        }
        items.push(record.into_item()?);
    }
    match items.first() {
        None => Err(StoreError::InvalidData("no assignments found".into())),
        Some(first) if first.name.contains("Introduction") => Err(StoreError::InvalidData(
            format!("assignment CSV contains class schedule data (got '{}')", first.name),
        )),
        Some(_) => Ok(items),
    }
}

/// Parse a class-meeting table with columns `Date, Description`.
pub fn read_meetings_csv<R: Read>(reader: R) -> StoreResult<Vec<ClassMeetingItem>> {
    let mut reader = csv_reader(reader);
    require_headers(
        &mut reader,
        "class schedule",
        &["Date", "Description"],
        "Date, Description",
    )?;
    let mut items = Vec::new();
    for record in reader.deserialize::<MeetingCsvRecord>() {
        let record = record?;
        if record.date.trim().is_empty() && record.description.trim().is_empty() {
            continue;
        }
        items.push(record.into_item()?);
    }
    match items.first() {
        None => Err(StoreError::InvalidData(
            "no class schedule items found".into(),
        )),
        Some(first) if first.description.contains("First Assignment") => {
            Err(StoreError::InvalidData(format!(
                "class schedule CSV contains assignment data (got '{}')",
                first.description
            )))
        }
        Some(_) => Ok(items),
    }
}

pub fn load_assignments_csv<P: AsRef<Path>>(path: P) -> StoreResult<Vec<AssignmentItem>> {
    read_assignments_csv(File::open(path)?)
}

pub fn load_meetings_csv<P: AsRef<Path>>(path: P) -> StoreResult<Vec<ClassMeetingItem>> {
    read_meetings_csv(File::open(path)?)
}

pub fn write_assignments_csv<'a, W, I>(writer: W, items: I) -> StoreResult<()>
where
    W: Write,
    I: IntoIterator<Item = &'a AssignmentItem>,
{
    let mut writer = csv::Writer::from_writer(writer);
    let mut wrote_any = false;
    for item in items {
        writer.serialize(AssignmentCsvRecord::from(item))?;
        wrote_any = true;
    }
    if !wrote_any {
        writer.write_record(["Item Name", "Start Date", "Start Time", "Due Date", "Due Time"])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_meetings_csv<'a, W, I>(writer: W, items: I) -> StoreResult<()>
where
    W: Write,
    I: IntoIterator<Item = &'a ClassMeetingItem>,
{
    let mut writer = csv::Writer::from_writer(writer);
    let mut wrote_any = false;
    for item in items {
        writer.serialize(MeetingCsvRecord {
            date: item.date.format("%Y-%m-%d").to_string(),
            description: item.description.clone(),
        })?;
        wrote_any = true;
    }
    if !wrote_any {
        writer.write_record(["Date", "Description"])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a translated calendar back out as the two import tables.
pub fn export_offset_csv<P: AsRef<Path>, Q: AsRef<Path>>(
    calendar: &OffsetCalendar,
    assignments_path: P,
    meetings_path: Q,
) -> StoreResult<()> {
    write_assignments_csv(File::create(assignments_path)?, calendar.assignments())?;
    write_meetings_csv(File::create(meetings_path)?, calendar.meetings())?;
    Ok(())
}

/// Accepts `MM-DD-YYYY` and `YYYY-MM-DD`; blank input is `None`.
pub fn parse_date_text(input: &str) -> StoreResult<Option<NaiveDate>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%m-%d-%Y"))
        .map(Some)
        .map_err(|e| StoreError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn format_us_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%m-%d-%Y").to_string())
        .unwrap_or_default()
}

fn parse_string_option(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.trim().to_string())
    }
}
