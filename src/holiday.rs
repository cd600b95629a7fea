use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HolidaySpan {
    Single {
        date: NaiveDate,
    },
    Range {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

/// A closure day (or inclusive run of days) from the yearly holiday table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRecord {
    pub label: String,
    #[serde(flatten)]
    pub span: HolidaySpan,
}

impl HolidayRecord {
    pub fn single(label: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            label: label.into(),
            span: HolidaySpan::Single { date },
        }
    }

    pub fn range(label: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let (start_date, end_date) = if start_date <= end_date {
            (start_date, end_date)
        } else {
            (end_date, start_date)
        };
        Self {
            label: label.into(),
            span: HolidaySpan::Range {
                start_date,
                end_date,
            },
        }
    }

    pub fn first_date(&self) -> NaiveDate {
        match self.span {
            HolidaySpan::Single { date } => date,
            HolidaySpan::Range { start_date, .. } => start_date,
        }
    }

    /// Every calendar date covered by the record
    pub fn dates(&self) -> Vec<NaiveDate> {
        match self.span {
            HolidaySpan::Single { date } => vec![date],
            HolidaySpan::Range {
                start_date,
                end_date,
            } => start_date
                .iter_days()
                .take_while(|day| *day <= end_date)
                .collect(),
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        match self.span {
            HolidaySpan::Single { date: day } => day == date,
            HolidaySpan::Range {
                start_date,
                end_date,
            } => start_date <= date && date <= end_date,
        }
    }
}

/// Expanded lookup set of holiday dates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayDates(BTreeSet<NaiveDate>);

impl HolidayDates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }

    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.0.insert(date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<NaiveDate> for HolidayDates {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<NaiveDate> for HolidayDates {
    fn extend<I: IntoIterator<Item = NaiveDate>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Static holiday table, independent of any one course calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolidayTable {
    records: Vec<HolidayRecord>,
}

impl HolidayTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = HolidayRecord>,
    {
        let mut table = Self::new();
        table.extend(records);
        table
    }

    /// Default academic closures for one calendar year
    pub fn academic_year(year: i32) -> Self {
        let mut table = Self::new();
        table.add_academic_year(year);
        table
    }

    fn add_academic_year(&mut self, year: i32) {
        // Martin Luther King Jr. Day (3rd Monday in January)
        if let Some(date) = Self::nth_weekday(year, 1, Weekday::Mon, 3) {
            self.push(HolidayRecord::single(
                "Martin Luther King Jr. Holiday (Offices Closed)",
                date,
            ));
        }

        if let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(year, 3, 16),
            NaiveDate::from_ymd_opt(year, 3, 22),
        ) {
            self.push(HolidayRecord::range(
                "Spring Break (Offices Closed)",
                start,
                end,
            ));
        }

        // Thanksgiving (4th Thursday in November) and the Wednesday before it
        if let Some(thursday) = Self::nth_weekday(year, 11, Weekday::Thu, 4) {
            self.push(HolidayRecord::range(
                "Thanksgiving Holiday",
                thursday - Duration::days(1),
                thursday,
            ));
        }
    }

    /// Helper: Find the nth occurrence of a weekday in a month
    fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
        let mut date = NaiveDate::from_ymd_opt(year, month, 1)?;
        let mut count = 0;

        while date.month() == month {
            if date.weekday() == weekday {
                count += 1;
                if count == n {
                    return Some(date);
                }
            }
            date = date + Duration::days(1);
        }
        None
    }

    pub fn push(&mut self, record: HolidayRecord) {
        self.records.push(record);
        self.records.sort_by_key(HolidayRecord::first_date);
    }

    pub fn add_holiday(&mut self, label: impl Into<String>, date: NaiveDate) {
        self.push(HolidayRecord::single(label, date));
    }

    pub fn add_range(&mut self, label: impl Into<String>, start: NaiveDate, end: NaiveDate) {
        self.push(HolidayRecord::range(label, start, end));
    }

    pub fn extend<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = HolidayRecord>,
    {
        self.records.extend(records);
        self.records.sort_by_key(HolidayRecord::first_date);
    }

    pub fn records(&self) -> &[HolidayRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn label_for(&self, date: NaiveDate) -> Option<&str> {
        self.records
            .iter()
            .find(|record| record.covers(date))
            .map(|record| record.label.as_str())
    }

    pub fn dates(&self) -> HolidayDates {
        self.records.iter().flat_map(HolidayRecord::dates).collect()
    }
}
