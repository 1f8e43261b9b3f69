//! Keyed persistence for profile, workouts and the daily table.
//!
//! The engine depends only on the `TrainingStore` trait; `SqliteStore` is
//! the bundled implementation. Stress and metric values are stored as
//! decimal text so a reloaded table is bit-identical to the computed one.
//! The daily table is only ever replaced wholesale, inside one transaction,
//! so a failed recompute can never corrupt previously persisted state.

use crate::error::{Result, StoreError};
use crate::models::{AthleteProfile, DailyLoad, SourceKind, WorkoutRecord};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Load/save contract the engine consumes
pub trait TrainingStore {
    /// At-most-one-profile semantics
    fn load_profile(&self) -> Result<Option<AthleteProfile>>;
    fn save_profile(&mut self, profile: &AthleteProfile) -> Result<()>;

    fn load_workouts(&self, range: Option<(NaiveDate, NaiveDate)>) -> Result<Vec<WorkoutRecord>>;

    /// Append new workouts, silently skipping records whose natural key is
    /// already present so re-imports stay idempotent. Returns the number
    /// actually inserted.
    fn append_workouts(&mut self, records: &[WorkoutRecord]) -> Result<usize>;

    fn load_daily_loads(&self) -> Result<Vec<DailyLoad>>;

    /// Write-once-replace-whole
    fn replace_daily_loads(&mut self, table: &[DailyLoad]) -> Result<()>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::from)?;
        let store = SqliteStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        let store = SqliteStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS profile (
                     id INTEGER PRIMARY KEY CHECK (id = 1),
                     data TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS workouts (
                     id TEXT PRIMARY KEY,
                     natural_key TEXT UNIQUE NOT NULL,
                     date TEXT NOT NULL,
                     distance_meters TEXT NOT NULL,
                     duration_seconds INTEGER NOT NULL,
                     avg_heart_rate INTEGER,
                     source_kind TEXT NOT NULL,
                     source TEXT
                 );
                 CREATE INDEX IF NOT EXISTS idx_workouts_date ON workouts(date);
                 CREATE TABLE IF NOT EXISTS daily_loads (
                     date TEXT PRIMARY KEY,
                     actual_stress TEXT NOT NULL,
                     planned_stress TEXT,
                     ctl TEXT NOT NULL,
                     atl TEXT NOT NULL,
                     tsb TEXT NOT NULL,
                     projected_ctl TEXT NOT NULL,
                     projected_atl TEXT NOT NULL,
                     projected_tsb TEXT NOT NULL
                 );",
            )
            .map_err(StoreError::from)?;
        Ok(())
    }
}

fn source_kind_from_str(value: &str) -> std::result::Result<SourceKind, rusqlite::Error> {
    match value {
        "track" => Ok(SourceKind::TrackFile),
        "fit" => Ok(SourceKind::FitnessFile),
        "manual" => Ok(SourceKind::ManualEntry),
        other => Err(rusqlite::Error::InvalidColumnType(
            0,
            format!("source_kind {other}"),
            rusqlite::types::Type::Text,
        )),
    }
}

fn decimal_column(
    row: &rusqlite::Row<'_>,
    index: usize,
) -> std::result::Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;
    Decimal::from_str(&text).map_err(|_| {
        rusqlite::Error::InvalidColumnType(index, text, rusqlite::types::Type::Text)
    })
}

impl TrainingStore for SqliteStore {
    fn load_profile(&self) -> Result<Option<AthleteProfile>> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM profile WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(StoreError::from)?;

        match data {
            Some(json) => {
                let profile = serde_json::from_str(&json)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    fn save_profile(&mut self, profile: &AthleteProfile) -> Result<()> {
        let json = serde_json::to_string(profile)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.conn
            .execute(
                "INSERT INTO profile (id, data) VALUES (1, ?1)
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data",
                params![json],
            )
            .map_err(StoreError::from)?;
        Ok(())
    }

    fn load_workouts(&self, range: Option<(NaiveDate, NaiveDate)>) -> Result<Vec<WorkoutRecord>> {
        let map_row = |row: &rusqlite::Row<'_>| -> std::result::Result<WorkoutRecord, rusqlite::Error> {
            let kind: String = row.get(5)?;
            Ok(WorkoutRecord {
                id: row.get(0)?,
                date: row.get(1)?,
                distance_meters: decimal_column(row, 2)?,
                duration_seconds: row.get(3)?,
                avg_heart_rate: row.get(4)?,
                source_kind: source_kind_from_str(&kind)?,
                source: row.get(6)?,
            })
        };

        let sql_base = "SELECT id, date, distance_meters, duration_seconds, avg_heart_rate,
                        source_kind, source FROM workouts";
        let records = match range {
            Some((from, to)) => {
                let mut stmt = self
                    .conn
                    .prepare(&format!(
                        "{sql_base} WHERE date >= ?1 AND date <= ?2 ORDER BY date"
                    ))
                    .map_err(StoreError::from)?;
                let rows = stmt
                    .query_map(params![from, to], map_row)
                    .map_err(StoreError::from)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(StoreError::from)?
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{sql_base} ORDER BY date"))
                    .map_err(StoreError::from)?;
                let rows = stmt.query_map([], map_row).map_err(StoreError::from)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(StoreError::from)?
            }
        };

        Ok(records)
    }

    fn append_workouts(&mut self, records: &[WorkoutRecord]) -> Result<usize> {
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO workouts
                     (id, natural_key, date, distance_meters, duration_seconds,
                      avg_heart_rate, source_kind, source)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(StoreError::from)?;
            for record in records {
                let count = stmt
                    .execute(params![
                        record.id,
                        record.natural_key(),
                        record.date,
                        record.distance_meters.to_string(),
                        record.duration_seconds,
                        record.avg_heart_rate,
                        record.source_kind.as_str(),
                        record.source,
                    ])
                    .map_err(StoreError::from)?;
                inserted += count;
            }
        }
        tx.commit().map_err(StoreError::from)?;
        debug!(inserted, total = records.len(), "appended workouts");
        Ok(inserted)
    }

    fn load_daily_loads(&self) -> Result<Vec<DailyLoad>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT date, actual_stress, planned_stress, ctl, atl, tsb,
                        projected_ctl, projected_atl, projected_tsb
                 FROM daily_loads ORDER BY date",
            )
            .map_err(StoreError::from)?;

        let rows = stmt
            .query_map([], |row| {
                let planned: Option<String> = row.get(2)?;
                let planned = match planned {
                    Some(text) => Some(Decimal::from_str(&text).map_err(|_| {
                        rusqlite::Error::InvalidColumnType(2, text, rusqlite::types::Type::Text)
                    })?),
                    None => None,
                };
                Ok(DailyLoad {
                    date: row.get(0)?,
                    actual_stress: decimal_column(row, 1)?,
                    planned_stress: planned,
                    ctl: decimal_column(row, 3)?,
                    atl: decimal_column(row, 4)?,
                    tsb: decimal_column(row, 5)?,
                    projected_ctl: decimal_column(row, 6)?,
                    projected_atl: decimal_column(row, 7)?,
                    projected_tsb: decimal_column(row, 8)?,
                })
            })
            .map_err(StoreError::from)?;

        Ok(rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)?)
    }

    fn replace_daily_loads(&mut self, table: &[DailyLoad]) -> Result<()> {
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        tx.execute("DELETE FROM daily_loads", [])
            .map_err(StoreError::from)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO daily_loads
                     (date, actual_stress, planned_stress, ctl, atl, tsb,
                      projected_ctl, projected_atl, projected_tsb)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )
                .map_err(StoreError::from)?;
            for day in table {
                stmt.execute(params![
                    day.date,
                    day.actual_stress.to_string(),
                    day.planned_stress.map(|v| v.to_string()),
                    day.ctl.to_string(),
                    day.atl.to_string(),
                    day.tsb.to_string(),
                    day.projected_ctl.to_string(),
                    day.projected_atl.to_string(),
                    day.projected_tsb.to_string(),
                ])
                .map_err(StoreError::from)?;
            }
        }
        tx.commit().map_err(StoreError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(date: NaiveDate, duration: u32) -> WorkoutRecord {
        WorkoutRecord {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            distance_meters: dec!(8046.72),
            duration_seconds: duration,
            avg_heart_rate: Some(150),
            source_kind: SourceKind::ManualEntry,
            source: Some("history.csv".to_string()),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    #[test]
    fn test_profile_round_trip_and_single_row() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load_profile().unwrap().is_none());

        let mut profile = AthleteProfile::new();
        profile.lthr = Some(170);
        store.save_profile(&profile).unwrap();

        profile.lthr = Some(172);
        store.save_profile(&profile).unwrap();

        let loaded = store.load_profile().unwrap().unwrap();
        assert_eq!(loaded.lthr, Some(172));
    }

    #[test]
    fn test_append_is_idempotent_on_natural_key() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let first = record(day(1), 1800);
        // Same date, duration and distance, different id: a re-import.
        let duplicate = record(day(1), 1800);
        let other = record(day(2), 2400);

        assert_eq!(store.append_workouts(&[first]).unwrap(), 1);
        assert_eq!(store.append_workouts(&[duplicate, other]).unwrap(), 1);
        assert_eq!(store.load_workouts(None).unwrap().len(), 2);
    }

    #[test]
    fn test_load_workouts_by_range() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .append_workouts(&[record(day(1), 1800), record(day(10), 1900), record(day(20), 2000)])
            .unwrap();

        let some = store
            .load_workouts(Some((day(5), day(15))))
            .unwrap();
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].date, day(10));
    }

    #[test]
    fn test_daily_loads_replace_wholesale_bit_identical() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        let mut first = DailyLoad::new(day(1), dec!(65), Some(dec!(40)));
        first.ctl = dec!(65);
        first.atl = dec!(65);
        let second = DailyLoad::new(day(2), Decimal::ZERO, None);
        store.replace_daily_loads(&[first.clone(), second.clone()]).unwrap();

        let loaded = store.load_daily_loads().unwrap();
        assert_eq!(loaded, vec![first, second.clone()]);

        // A new recompute replaces everything previously stored.
        store.replace_daily_loads(&[second.clone()]).unwrap();
        assert_eq!(store.load_daily_loads().unwrap(), vec![second]);
    }
}
