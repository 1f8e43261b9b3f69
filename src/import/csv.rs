//! Tabular history normalizer.
//!
//! Accepts delimited exports with named columns in any order, tolerating the
//! header variations seen across watch and platform exports. A file without
//! a recognized date column fails outright; any other malformed row is
//! rejected record-by-record and reported in the warning list so bulk
//! ingestion survives isolated bad rows.

use crate::error::{ImportWarning, Result, StrideError};
use crate::import::{NormalizedFile, Normalizer};
use crate::models::{SourceKind, WorkoutRecord, METERS_PER_MILE};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

pub struct CsvNormalizer {
    column_mapping: HashMap<String, &'static str>,
}

impl CsvNormalizer {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        Self::add_mapping(&mut column_mapping, "date", &["date", "workout_date", "day"]);
        Self::add_mapping(
            &mut column_mapping,
            "distance",
            &["distance", "distance_miles", "dist", "miles"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "duration",
            &[
                "duration",
                "total_time",
                "running_time",
                "moving_time",
                "time",
            ],
        );
        Self::add_mapping(
            &mut column_mapping,
            "heart_rate",
            &["heart_rate", "hr", "avg_hr", "avg_heart_rate", "bpm"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "activity_type",
            &["type", "activity_type", "sport"],
        );

        Self { column_mapping }
    }

    fn add_mapping(
        mapping: &mut HashMap<String, &'static str>,
        standard: &'static str,
        variations: &[&str],
    ) {
        for variation in variations {
            mapping.insert((*variation).to_string(), standard);
        }
    }

    fn normalize_column_name(&self, name: &str) -> Option<&'static str> {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        self.column_mapping.get(&normalized).copied()
    }
}

impl Default for CsvNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer for CsvNormalizer {
    fn can_import(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }

    fn normalize(&self, path: &Path) -> Result<NormalizedFile> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| StrideError::Parse {
                file: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let headers = reader
            .headers()
            .map_err(|e| StrideError::Parse {
                file: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .clone();

        let columns: HashMap<usize, &'static str> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| self.normalize_column_name(h).map(|name| (i, name)))
            .collect();

        if !columns.values().any(|name| *name == "date") {
            return Err(StrideError::Parse {
                file: path.to_path_buf(),
                reason: "missing required date column".to_string(),
            });
        }

        let mut output = NormalizedFile::default();
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());

        for (index, result) in reader.records().enumerate() {
            let row = index + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    output.warnings.push(ImportWarning {
                        file: path.to_path_buf(),
                        row: Some(row),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let mut date = None;
            let mut distance_miles = None;
            let mut duration_seconds = None;
            let mut avg_heart_rate = None;
            let mut activity_type = None;

            for (i, value) in record.iter().enumerate() {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                match columns.get(&i) {
                    Some(&"date") => date = parse_date(value),
                    Some(&"distance") => distance_miles = Decimal::from_str(value).ok(),
                    Some(&"duration") => duration_seconds = parse_duration(value),
                    Some(&"heart_rate") => {
                        avg_heart_rate = value.parse::<f64>().ok().map(|hr| hr.round() as u16)
                    }
                    Some(&"activity_type") => activity_type = Some(value.to_string()),
                    _ => {}
                }
            }

            // Histories mix sports; only running rows feed the engine.
            if let Some(kind) = &activity_type {
                if !kind.to_lowercase().contains("run") {
                    continue;
                }
            }

            let date = match date {
                Some(date) => date,
                None => {
                    output.warnings.push(ImportWarning {
                        file: path.to_path_buf(),
                        row: Some(row),
                        reason: "malformed or missing date".to_string(),
                    });
                    continue;
                }
            };

            let duration_seconds = match duration_seconds {
                Some(seconds) if seconds > 0 => seconds,
                _ => {
                    output.warnings.push(ImportWarning {
                        file: path.to_path_buf(),
                        row: Some(row),
                        reason: "malformed or missing duration".to_string(),
                    });
                    continue;
                }
            };

            let distance_meters = match distance_miles {
                Some(miles) if miles >= Decimal::ZERO => {
                    miles * Decimal::from_f64(METERS_PER_MILE).unwrap_or(Decimal::ZERO)
                }
                _ => {
                    output.warnings.push(ImportWarning {
                        file: path.to_path_buf(),
                        row: Some(row),
                        reason: "malformed or missing distance".to_string(),
                    });
                    continue;
                }
            };

            output.records.push(WorkoutRecord {
                id: Uuid::new_v4().to_string(),
                date,
                distance_meters,
                duration_seconds,
                avg_heart_rate,
                source_kind: SourceKind::ManualEntry,
                source: source.clone(),
            });
        }

        Ok(output)
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    None
}

/// Parse duration strings in the shapes history exports use:
/// `1:02:03`, `30:00`, `0h:30m:00s`, `45m`, `1h 5m`.
pub fn parse_duration(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let lower = value.to_lowercase();
    if lower.contains(':') && !lower.contains('h') && !lower.contains('m') {
        let parts: Vec<&str> = lower.split(':').collect();
        let numbers: Option<Vec<u32>> = parts.iter().map(|p| p.parse().ok()).collect();
        return match numbers?.as_slice() {
            [h, m, s] => total_seconds(*h, *m, *s),
            [m, s] => total_seconds(0, *m, *s),
            _ => None,
        };
    }

    let mut hours = 0u32;
    let mut minutes = 0u32;
    let mut seconds = 0u32;
    let mut matched = false;
    for part in lower
        .replace(':', " ")
        .replace('h', "h ")
        .replace('m', "m ")
        .replace('s', "s ")
        .split_whitespace()
    {
        let (digits, unit) = part.split_at(part.len().saturating_sub(1));
        let amount: u32 = digits.parse().ok()?;
        match unit {
            "h" => hours = amount,
            "m" => minutes = amount,
            "s" => seconds = amount,
            _ => return None,
        }
        matched = true;
    }

    if matched {
        total_seconds(hours, minutes, seconds)
    } else {
        None
    }
}

/// Checked so an absurd-but-parseable value rejects the row instead of
/// overflowing.
fn total_seconds(hours: u32, minutes: u32, seconds: u32) -> Option<u32> {
    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}
