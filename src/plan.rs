//! Training-plan parsing.
//!
//! A plan is delimited text with a date column plus either a structured
//! description column (tokens like `5E`, `2miT`, `30minE`) or per-code
//! distance/time columns (`E_Miles`, `T_Miles`, `E_Minutes`, ...). Column
//! order is irrelevant and header names tolerate common variations. A file
//! without a recognizable date column fails outright; a malformed row is
//! rejected on its own and reported, never aborting the rest of the file.

use crate::error::{ImportWarning, Result, StrideError, ValidationError};
use crate::models::{PlanSegment, PlannedWorkout, SegmentQuantity, METERS_PER_MILE};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::debug;

/// Intensity codes that per-code plan columns are probed for
const COLUMN_CODES: &[&str] = &["E", "M", "T", "I", "R"];

/// Result of parsing one plan file
#[derive(Debug, Clone)]
pub struct ParsedPlan {
    pub workouts: Vec<PlannedWorkout>,

    /// Row-level rejects; the file as a whole still parsed
    pub warnings: Vec<ImportWarning>,
}

/// Parse a training-plan CSV file.
pub fn parse_plan_file(path: &Path) -> Result<ParsedPlan> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| StrideError::Parse {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| StrideError::Parse {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })?
        .iter()
        .map(normalize_header)
        .collect();

    let date_col = headers
        .iter()
        .position(|h| h == "date")
        .ok_or_else(|| StrideError::Parse {
            file: path.to_path_buf(),
            reason: "missing required date column".to_string(),
        })?;

    let description_col = headers
        .iter()
        .position(|h| matches!(h.as_str(), "description" | "workout" | "original_description"));
    let total_miles_col = headers.iter().position(|h| h == "total_miles");

    // (code, column index, distance or time)
    let mut code_cols: Vec<(String, usize, bool)> = Vec::new();
    for code in COLUMN_CODES {
        let lower = code.to_lowercase();
        for (i, header) in headers.iter().enumerate() {
            if *header == format!("{lower}_miles") || *header == format!("{lower}_pace_miles") {
                code_cols.push((code.to_string(), i, true));
            }
            if *header == format!("{lower}_minutes") || *header == format!("{lower}_pace_time_min")
            {
                code_cols.push((code.to_string(), i, false));
            }
        }
    }

    let mut workouts = Vec::new();
    let mut warnings = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let row = index + 2; // one-based, after the header
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warnings.push(ImportWarning {
                    file: path.to_path_buf(),
                    row: Some(row),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let date = match record.get(date_col).map(parse_plan_date) {
            Some(Ok(date)) => date,
            _ => {
                warnings.push(ImportWarning {
                    file: path.to_path_buf(),
                    row: Some(row),
                    reason: "malformed or missing date".to_string(),
                });
                continue;
            }
        };

        let description = description_col
            .and_then(|i| record.get(i))
            .unwrap_or("")
            .trim()
            .to_string();

        let segments = if !description.is_empty() {
            match parse_description(&description, row) {
                Ok(segments) => segments,
                Err(e) => {
                    warnings.push(ImportWarning {
                        file: path.to_path_buf(),
                        row: Some(row),
                        reason: e.to_string(),
                    });
                    continue;
                }
            }
        } else {
            segments_from_columns(&record, &code_cols)
        };

        if segments.is_empty() {
            // Rest day rows are fine; they simply contribute no planned stress.
            debug!(row, "plan row has no segments");
            continue;
        }

        let total_miles = total_miles_col
            .and_then(|i| record.get(i))
            .and_then(|v| Decimal::from_str(v.trim()).ok())
            .unwrap_or_else(|| segment_miles(&segments));

        workouts.push(PlannedWorkout {
            date,
            description: if description.is_empty() {
                summarize_segments(&segments)
            } else {
                description
            },
            segments,
            total_distance_meters: total_miles
                * Decimal::from_f64(METERS_PER_MILE).unwrap_or(Decimal::ZERO),
            source_row: row,
        });
    }

    Ok(ParsedPlan { workouts, warnings })
}

/// Parse a structured description into segments.
///
/// Tokens are separated by whitespace or `+`; each is a quantity followed by
/// an intensity code: `5E` (miles), `5.5M`, `2miT`, `30minE`.
pub fn parse_description(
    description: &str,
    row: usize,
) -> std::result::Result<Vec<PlanSegment>, ValidationError> {
    let mut segments = Vec::new();

    for token in description.split(|c: char| c.is_whitespace() || c == '+' || c == ',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let numeric_end = token
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(token.len());
        let quantity = Decimal::from_str(&token[..numeric_end]).map_err(|_| {
            ValidationError::MalformedSegment {
                token: token.to_string(),
                row,
            }
        })?;

        let rest = &token[numeric_end..];
        let (quantity, code) = if let Some(code) = rest.strip_prefix("min") {
            (SegmentQuantity::Minutes(quantity), code)
        } else if let Some(code) = rest.strip_prefix("mi") {
            (SegmentQuantity::Miles(quantity), code)
        } else {
            (SegmentQuantity::Miles(quantity), rest)
        };

        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::MalformedSegment {
                token: token.to_string(),
                row,
            });
        }

        segments.push(PlanSegment {
            quantity,
            code: code.to_uppercase(),
        });
    }

    Ok(segments)
}

fn segments_from_columns(
    record: &csv::StringRecord,
    code_cols: &[(String, usize, bool)],
) -> Vec<PlanSegment> {
    let mut segments = Vec::new();
    for (code, col, is_distance) in code_cols {
        let value = record
            .get(*col)
            .and_then(|v| Decimal::from_str(v.trim()).ok())
            .unwrap_or(Decimal::ZERO);
        if value <= Decimal::ZERO {
            continue;
        }
        let quantity = if *is_distance {
            SegmentQuantity::Miles(value)
        } else {
            SegmentQuantity::Minutes(value)
        };
        segments.push(PlanSegment {
            quantity,
            code: code.clone(),
        });
    }
    segments
}

fn segment_miles(segments: &[PlanSegment]) -> Decimal {
    segments
        .iter()
        .filter_map(|s| match s.quantity {
            SegmentQuantity::Miles(miles) => Some(miles),
            SegmentQuantity::Minutes(_) => None,
        })
        .sum()
}

fn summarize_segments(segments: &[PlanSegment]) -> String {
    segments
        .iter()
        .map(|s| match s.quantity {
            SegmentQuantity::Miles(miles) => format!("{}{}", miles, s.code),
            SegmentQuantity::Minutes(minutes) => format!("{}min{}", minutes, s.code),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace([' ', '-'], "_")
}

fn parse_plan_date(value: &str) -> std::result::Result<NaiveDate, chrono::ParseError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%y"))
}
