/// JSON import and export of board tasks
///
/// Both directions use the same record shape, with dates reduced to a
/// day-of-month and the month given by name:
///
/// ```json
/// {
///   "title": "Design landing page",
///   "description": "Hero, pricing, FAQ",
///   "start": 3,
///   "end": 14,
///   "status": "pending",
///   "month": "March",
///   "year": 2025
/// }
/// ```
///
/// `task_title` / `task_description` are accepted as aliases on import.
///
/// # Import semantics
///
/// Each record is validated on its own. Invalid records are dropped from the
/// batch and reported back as skipped; the batch only fails as a whole when it
/// is empty or when no record survives validation.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::month::Month;
use super::status::TaskStatus;
use crate::models::task::Task;

/// Earliest year accepted on import
pub const MIN_YEAR: i32 = 1970;

/// Latest year accepted on import
pub const MAX_YEAR: i32 = 9999;

/// Longest accepted task title (matches the column width)
pub const MAX_TITLE_LENGTH: usize = 255;

/// A record as it appears in an import file
#[derive(Debug, Clone, Deserialize)]
struct RawRecord {
    #[serde(alias = "task_title")]
    title: String,

    #[serde(alias = "task_description", default)]
    description: String,

    start: u32,

    end: u32,

    #[serde(default)]
    status: Option<String>,

    month: String,

    year: i32,
}

/// A validated record, ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedTask {
    pub title: String,
    pub description: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub status: TaskStatus,
    pub month: Month,
    pub year: i32,
}

/// Why a single record was dropped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Malformed record: {0}")]
    Malformed(String),

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Title exceeds {MAX_TITLE_LENGTH} characters")]
    TitleTooLong,

    #[error("Unknown month: {0}")]
    UnknownMonth(String),

    #[error("Year {0} is out of range")]
    YearOutOfRange(i32),

    #[error("Day {day} is not a valid day of {month} {year}")]
    DayOutOfRange { day: u32, month: Month, year: i32 },

    #[error("Start day {start} is after end day {end}")]
    StartAfterEnd { start: u32, end: u32 },

    #[error("Unknown status: {0}")]
    UnknownStatus(String),
}

/// A dropped record and its position in the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Zero-based index in the submitted array
    pub index: usize,

    /// Human-readable reason
    pub reason: String,
}

/// Outcome of validating a batch that contains at least one good record
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub accepted: Vec<ImportedTask>,
    pub skipped: Vec<SkippedRecord>,
}

/// Batch-level import failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("Import batch is empty")]
    EmptyBatch,

    #[error("None of the {0} records in the import batch are valid")]
    NoValidRecords(usize),
}

/// Validates one import record
pub fn validate_record(value: &JsonValue) -> Result<ImportedTask, RecordError> {
    let raw: RawRecord = RawRecord::deserialize(value)
        .map_err(|e| RecordError::Malformed(e.to_string()))?;

    let title = raw.title.trim().to_string();
    if title.is_empty() {
        return Err(RecordError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(RecordError::TitleTooLong);
    }

    let month: Month = raw
        .month
        .parse()
        .map_err(|_| RecordError::UnknownMonth(raw.month.clone()))?;

    if !(MIN_YEAR..=MAX_YEAR).contains(&raw.year) {
        return Err(RecordError::YearOutOfRange(raw.year));
    }

    let days = month.days_in(raw.year);
    for day in [raw.start, raw.end] {
        if !(1..=days).contains(&day) {
            return Err(RecordError::DayOutOfRange {
                day,
                month,
                year: raw.year,
            });
        }
    }

    if raw.start > raw.end {
        return Err(RecordError::StartAfterEnd {
            start: raw.start,
            end: raw.end,
        });
    }

    let status = match raw.status.as_deref() {
        None => TaskStatus::Pending,
        Some(s) => TaskStatus::parse(s).ok_or_else(|| RecordError::UnknownStatus(s.to_string()))?,
    };

    let out_of_range = || RecordError::DayOutOfRange {
        day: raw.end,
        month,
        year: raw.year,
    };
    let start = month.date(raw.year, raw.start).ok_or_else(out_of_range)?;
    let end = month.date(raw.year, raw.end).ok_or_else(out_of_range)?;

    Ok(ImportedTask {
        title,
        description: raw.description,
        start,
        end,
        status,
        month,
        year: raw.year,
    })
}

/// Validates a whole batch, dropping bad records
///
/// # Errors
///
/// - [`ImportError::EmptyBatch`] if `records` is empty
/// - [`ImportError::NoValidRecords`] if every record was dropped
pub fn validate_batch(records: &[JsonValue]) -> Result<ImportBatch, ImportError> {
    if records.is_empty() {
        return Err(ImportError::EmptyBatch);
    }

    let mut batch = ImportBatch::default();
    for (index, value) in records.iter().enumerate() {
        match validate_record(value) {
            Ok(task) => batch.accepted.push(task),
            Err(reason) => {
                tracing::debug!(index, reason = %reason, "Dropping invalid import record");
                batch.skipped.push(SkippedRecord {
                    index,
                    reason: reason.to_string(),
                });
            }
        }
    }

    if batch.accepted.is_empty() {
        return Err(ImportError::NoValidRecords(records.len()));
    }

    Ok(batch)
}

/// A task as written to an export file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub title: String,
    pub description: String,
    pub start: u32,
    pub end: u32,
    pub status: TaskStatus,
    pub month: Month,
    pub year: i32,
}

impl From<&Task> for ExportRecord {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            start: task.start_date.day(),
            end: task.end_date.day(),
            status: task.status,
            month: task.month,
            year: task.year,
        }
    }
}

/// Download file name for a project's export, e.g. `Launch_tasks_2025.json`
pub fn export_file_name(project_name: &str, year: i32) -> String {
    let safe: String = project_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();

    format!("{}_tasks_{}.json", safe, year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(start: u32, end: u32) -> JsonValue {
        json!({
            "task_title": "Ship it",
            "task_description": "Release build",
            "start": start,
            "end": end,
            "status": "pending",
            "month": "April",
            "year": 2025
        })
    }

    #[test]
    fn test_valid_record() {
        let task = validate_record(&record(3, 14)).unwrap();
        assert_eq!(task.title, "Ship it");
        assert_eq!(task.description, "Release build");
        assert_eq!(task.month, Month::April);
        assert_eq!(task.start, NaiveDate::from_ymd_opt(2025, 4, 3).unwrap());
        assert_eq!(task.end, NaiveDate::from_ymd_opt(2025, 4, 14).unwrap());
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_plain_field_names_accepted() {
        let value = json!({
            "title": "Plan",
            "start": 1,
            "end": 2,
            "month": "january",
            "year": 2026
        });
        let task = validate_record(&value).unwrap();
        assert_eq!(task.title, "Plan");
        assert_eq!(task.description, "");
        assert_eq!(task.month, Month::January);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_day_out_of_range() {
        // April has 30 days
        assert!(matches!(
            validate_record(&record(3, 31)),
            Err(RecordError::DayOutOfRange { day: 31, .. })
        ));
        assert!(matches!(
            validate_record(&record(0, 5)),
            Err(RecordError::DayOutOfRange { day: 0, .. })
        ));
    }

    #[test]
    fn test_leap_day() {
        let mut value = record(29, 29);
        value["month"] = json!("February");
        value["year"] = json!(2024);
        assert!(validate_record(&value).is_ok());

        value["year"] = json!(2025);
        assert!(validate_record(&value).is_err());
    }

    #[test]
    fn test_rejects_bad_fields() {
        let mut value = record(1, 2);
        value["month"] = json!("Smarch");
        assert!(matches!(validate_record(&value), Err(RecordError::UnknownMonth(_))));

        let mut value = record(1, 2);
        value["status"] = json!("done");
        assert!(matches!(validate_record(&value), Err(RecordError::UnknownStatus(_))));

        let mut value = record(1, 2);
        value["year"] = json!(1800);
        assert!(matches!(validate_record(&value), Err(RecordError::YearOutOfRange(1800))));

        let mut value = record(1, 2);
        value["task_title"] = json!("   ");
        assert_eq!(validate_record(&value), Err(RecordError::EmptyTitle));

        assert!(matches!(
            validate_record(&record(9, 2)),
            Err(RecordError::StartAfterEnd { start: 9, end: 2 })
        ));

        assert!(matches!(
            validate_record(&json!("not an object")),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(
            validate_record(&json!({"title": "x", "start": -1, "end": 2, "month": "May", "year": 2025})),
            Err(RecordError::Malformed(_))
        ));
    }

    #[test]
    fn test_batch_drops_invalid_records() {
        let records = vec![record(1, 5), record(10, 31), record(6, 8)];
        let batch = validate_batch(&records).unwrap();

        assert_eq!(batch.accepted.len(), 2);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].index, 1);
    }

    #[test]
    fn test_all_invalid_batch_rejected() {
        let records = vec![record(10, 31), json!(42)];
        assert_eq!(validate_batch(&records).unwrap_err(), ImportError::NoValidRecords(2));
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert_eq!(validate_batch(&[]).unwrap_err(), ImportError::EmptyBatch);
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("Launch", 2025), "Launch_tasks_2025.json");
        assert_eq!(export_file_name("Q1 plan/v2", 2025), "Q1_plan_v2_tasks_2025.json");
    }
}
