//! Call Log Reader.
//!
//! Reads the single most recent row from the device call history. The default
//! provider is an Android-style SQLite call log (`calls` table), opened
//! read-only on every read so a freshly committed row is always visible.
//!
//! ```text
//! calls(number TEXT, duration INTEGER, date INTEGER, subscription_id TEXT?)
//! ```

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Result, TrackerError};
use crate::types::CallEvent;

const CALLS_TABLE: &str = "calls";
const NUMBER_COLUMN: &str = "number";
const DURATION_COLUMN: &str = "duration";
const DATE_COLUMN: &str = "date";
const SLOT_COLUMN: &str = "subscription_id";

/// Queryable store of past calls, newest first.
///
/// Implementations block; the pipeline calls them from `spawn_blocking`.
pub trait CallHistory: Send + Sync {
    /// Returns the most recent call, `NoRecordsAvailable` when history is
    /// empty, or `MalformedRecord` when a required field is unreadable.
    fn latest(&self) -> Result<CallEvent>;
}

pub struct SqliteCallLog {
    path: PathBuf,
}

impl SqliteCallLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Connection::open_with_flags(&self.path, flags).map_err(|source| TrackerError::CallLog {
            context: format!("opening {}", self.path.display()),
            source,
        })
    }
}

impl CallHistory for SqliteCallLog {
    fn latest(&self) -> Result<CallEvent> {
        let conn = self.open()?;
        let columns = table_columns(&conn)?;

        if columns.is_empty() {
            return Err(TrackerError::MalformedRecord {
                details: format!("table `{}` not found", CALLS_TABLE),
            });
        }
        for required in [NUMBER_COLUMN, DURATION_COLUMN, DATE_COLUMN] {
            if !columns.contains(required) {
                return Err(TrackerError::MalformedRecord {
                    details: format!("column `{}` missing", required),
                });
            }
        }

        // The slot column is device dependent; select NULL when it is absent.
        let slot_expr = if columns.contains(SLOT_COLUMN) {
            SLOT_COLUMN
        } else {
            "NULL"
        };
        let sql = format!(
            "SELECT {}, {}, {}, {} FROM {} ORDER BY {} DESC LIMIT 1",
            NUMBER_COLUMN, DURATION_COLUMN, DATE_COLUMN, slot_expr, CALLS_TABLE, DATE_COLUMN
        );

        let row = conn
            .query_row(&sql, [], |row| {
                Ok(RawCallRow {
                    number: text_value(row.get_ref(0)?),
                    duration: integer_value(row.get_ref(1)?),
                    date: integer_value(row.get_ref(2)?),
                    slot: text_value(row.get_ref(3)?),
                })
            })
            .optional()
            .map_err(|source| TrackerError::CallLog {
                context: "querying latest call".to_string(),
                source,
            })?;

        match row {
            Some(row) => row.into_event(),
            None => Err(TrackerError::NoRecordsAvailable),
        }
    }
}

fn table_columns(conn: &Connection) -> Result<HashSet<String>> {
    let map_err = |source: rusqlite::Error| TrackerError::CallLog {
        context: "reading call-log schema".to_string(),
        source,
    };
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", CALLS_TABLE))
        .map_err(map_err)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(map_err)?;

    let mut columns = HashSet::new();
    for name in names {
        columns.insert(name.map_err(map_err)?.to_ascii_lowercase());
    }
    Ok(columns)
}

/// Untyped view of the top row before validation.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct RawCallRow {
    pub number: Option<String>,
    pub duration: Option<i64>,
    pub date: Option<i64>,
    pub slot: Option<String>,
}

impl RawCallRow {
    /// A NULL number is kept as an empty string (private/unknown caller);
    /// a NULL or negative duration, or a NULL date, makes the row malformed.
    pub(crate) fn into_event(self) -> Result<CallEvent> {
        let duration = match self.duration {
            Some(value) if value >= 0 => value as u64,
            Some(value) => {
                return Err(TrackerError::MalformedRecord {
                    details: format!("negative duration {}", value),
                })
            }
            None => {
                return Err(TrackerError::MalformedRecord {
                    details: "duration is null".to_string(),
                })
            }
        };
        let timestamp = self.date.ok_or_else(|| TrackerError::MalformedRecord {
            details: "date is null".to_string(),
        })?;

        Ok(CallEvent {
            phone_number: self.number.unwrap_or_default(),
            duration_seconds: duration,
            timestamp,
            carrier_slot: self.slot.filter(|slot| !slot.trim().is_empty()),
        })
    }
}

fn text_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

fn integer_value(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(n) => Some(n),
        ValueRef::Real(f) => Some(f as i64),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_log(dir: &Path, schema: &str) -> PathBuf {
        let path = dir.join("calllog.db");
        let conn = Connection::open(&path).expect("open db");
        conn.execute_batch(schema).expect("create schema");
        path
    }

    const ANDROID_SCHEMA: &str = "CREATE TABLE calls (\
        _id INTEGER PRIMARY KEY, number TEXT, duration INTEGER, date INTEGER, \
        subscription_id TEXT);";

    #[test]
    fn latest_returns_newest_row() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = create_log(temp_dir.path(), ANDROID_SCHEMA);
        let conn = Connection::open(&path).expect("open");
        conn.execute_batch(
            "INSERT INTO calls (number, duration, date, subscription_id) VALUES \
             ('+15550000001', 12, 1000, '1'), \
             ('+15550000002', 0, 3000, '2'), \
             ('+15550000003', 7, 2000, NULL);",
        )
        .expect("seed");

        let event = SqliteCallLog::new(path).latest().expect("latest");
        assert_eq!(
            event,
            CallEvent {
                phone_number: "+15550000002".to_string(),
                duration_seconds: 0,
                timestamp: 3000,
                carrier_slot: Some("2".to_string()),
            }
        );
    }

    #[test]
    fn empty_history_reports_no_records() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = create_log(temp_dir.path(), ANDROID_SCHEMA);

        let err = SqliteCallLog::new(path).latest().unwrap_err();
        assert!(matches!(err, TrackerError::NoRecordsAvailable));
    }

    #[test]
    fn missing_slot_column_is_not_an_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = create_log(
            temp_dir.path(),
            "CREATE TABLE calls (number TEXT, duration INTEGER, date INTEGER);\
             INSERT INTO calls VALUES ('+15550000009', 30, 5000);",
        );

        let event = SqliteCallLog::new(path).latest().expect("latest");
        assert_eq!(event.carrier_slot, None);
        assert_eq!(event.duration_seconds, 30);
    }

    #[test]
    fn missing_duration_column_is_malformed() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = create_log(
            temp_dir.path(),
            "CREATE TABLE calls (number TEXT, date INTEGER);\
             INSERT INTO calls VALUES ('+15550000009', 5000);",
        );

        let err = SqliteCallLog::new(path).latest().unwrap_err();
        assert!(matches!(err, TrackerError::MalformedRecord { .. }));
    }

    #[test]
    fn missing_table_is_malformed() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = create_log(temp_dir.path(), "CREATE TABLE other (x INTEGER);");

        let err = SqliteCallLog::new(path).latest().unwrap_err();
        assert!(matches!(err, TrackerError::MalformedRecord { .. }));
    }

    #[test]
    fn unopenable_log_is_a_call_log_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("does-not-exist.db");

        let err = SqliteCallLog::new(path).latest().unwrap_err();
        assert!(matches!(err, TrackerError::CallLog { .. }));
    }

    #[test]
    fn raw_row_validation() {
        let row = RawCallRow {
            number: None,
            duration: Some(5),
            date: Some(10),
            slot: Some("  ".to_string()),
        };
        let event = row.into_event().expect("valid");
        assert_eq!(event.phone_number, "");
        assert_eq!(event.carrier_slot, None);

        let null_duration = RawCallRow {
            number: Some("1".to_string()),
            date: Some(10),
            ..RawCallRow::default()
        };
        assert!(matches!(
            null_duration.into_event(),
            Err(TrackerError::MalformedRecord { .. })
        ));

        let negative = RawCallRow {
            number: Some("1".to_string()),
            duration: Some(-1),
            date: Some(10),
            slot: None,
        };
        assert!(matches!(
            negative.into_event(),
            Err(TrackerError::MalformedRecord { .. })
        ));

        let null_date = RawCallRow {
            number: Some("1".to_string()),
            duration: Some(1),
            ..RawCallRow::default()
        };
        assert!(matches!(
            null_date.into_event(),
            Err(TrackerError::MalformedRecord { .. })
        ));
    }
}
