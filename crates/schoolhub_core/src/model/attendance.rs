//! Attendance status and calendar-day normalization.
//!
//! # Invariants
//! - Attendance entries are keyed by calendar day, never by timestamp.
//! - Persisted days use ISO `YYYY-MM-DD` text.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Attendance outcome for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }
}

impl Display for AttendanceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// One entry of a teacher attendance log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Truncates a timestamp to its calendar day.
pub fn calendar_day(at: NaiveDateTime) -> NaiveDate {
    at.date()
}

pub fn day_to_db(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

pub fn day_from_db(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DAY_FORMAT).ok()
}

/// Inserts or overwrites the entry for `date` and keeps the log sorted.
///
/// Returns `true` when an existing entry was overwritten.
pub fn upsert_entry(log: &mut Vec<AttendanceEntry>, date: NaiveDate, status: AttendanceStatus) -> bool {
    match log.binary_search_by(|entry| entry.date.cmp(&date)) {
        Ok(index) => {
            log[index].status = status;
            true
        }
        Err(index) => {
            log.insert(index, AttendanceEntry { date, status });
            false
        }
    }
}
