//! Binary fitness-file normalizer (FIT).
//!
//! The session message supplies start time, total distance and timer
//! duration; record messages supply the heart-rate samples whose arithmetic
//! mean becomes the record's average heart rate. Files with no session
//! message fall back to the span of record timestamps.

use crate::error::{Result, StrideError};
use crate::import::{NormalizedFile, Normalizer};
use crate::models::{SourceKind, WorkoutRecord};
use chrono::{DateTime, Local};
use fitparser::profile::MesgNum;
use fitparser::Value;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::fs::File;
use std::path::Path;
use uuid::Uuid;

pub struct FitNormalizer;

impl FitNormalizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FitNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer for FitNormalizer {
    fn can_import(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("fit"))
            .unwrap_or(false)
    }

    fn normalize(&self, path: &Path) -> Result<NormalizedFile> {
        let mut file = File::open(path).map_err(|e| StrideError::Parse {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let messages = fitparser::from_reader(&mut file).map_err(|e| StrideError::Parse {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut hr_samples: Vec<u32> = Vec::new();
        let mut record_timestamps: Vec<DateTime<Local>> = Vec::new();
        let mut session_start: Option<DateTime<Local>> = None;
        let mut session_distance: Option<f64> = None;
        let mut session_duration: Option<f64> = None;

        for message in &messages {
            match message.kind() {
                MesgNum::Record => {
                    for field in message.fields() {
                        match field.name() {
                            "heart_rate" => {
                                if let Some(hr) = value_to_f64(field.value()) {
                                    hr_samples.push(hr as u32);
                                }
                            }
                            "timestamp" => {
                                if let Value::Timestamp(ts) = field.value() {
                                    record_timestamps.push(*ts);
                                }
                            }
                            _ => {}
                        }
                    }
                }
                MesgNum::Session => {
                    for field in message.fields() {
                        match field.name() {
                            "start_time" => {
                                if let Value::Timestamp(ts) = field.value() {
                                    session_start = Some(*ts);
                                }
                            }
                            "total_distance" => {
                                session_distance = value_to_f64(field.value());
                            }
                            "total_timer_time" => {
                                session_duration = value_to_f64(field.value());
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        let start = session_start
            .or_else(|| record_timestamps.first().copied())
            .ok_or_else(|| StrideError::Parse {
                file: path.to_path_buf(),
                reason: "no session start time or record timestamps".to_string(),
            })?;

        let duration_seconds = match session_duration {
            Some(seconds) if seconds > 0.0 => seconds.round() as u32,
            _ => match (record_timestamps.first(), record_timestamps.last()) {
                (Some(first), Some(last)) => (*last - *first).num_seconds().max(0) as u32,
                _ => {
                    return Err(StrideError::Parse {
                        file: path.to_path_buf(),
                        reason: "no usable duration".to_string(),
                    })
                }
            },
        };

        let avg_heart_rate = if hr_samples.is_empty() {
            None
        } else {
            Some((hr_samples.iter().sum::<u32>() / hr_samples.len() as u32) as u16)
        };

        let record = WorkoutRecord {
            id: Uuid::new_v4().to_string(),
            date: start.date_naive(),
            distance_meters: session_distance
                .and_then(Decimal::from_f64)
                .unwrap_or(Decimal::ZERO),
            duration_seconds,
            avg_heart_rate,
            source_kind: SourceKind::FitnessFile,
            source: path.file_name().map(|n| n.to_string_lossy().to_string()),
        };

        Ok(NormalizedFile {
            records: vec![record],
            warnings: Vec::new(),
        })
    }

    fn format_name(&self) -> &'static str {
        "FIT"
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::SInt8(v) => Some(f64::from(*v)),
        Value::UInt8(v) | Value::UInt8z(v) | Value::Byte(v) => Some(f64::from(*v)),
        Value::SInt16(v) => Some(f64::from(*v)),
        Value::UInt16(v) | Value::UInt16z(v) => Some(f64::from(*v)),
        Value::SInt32(v) => Some(f64::from(*v)),
        Value::UInt32(v) | Value::UInt32z(v) => Some(f64::from(*v)),
        Value::SInt64(v) => Some(*v as f64),
        Value::UInt64(v) | Value::UInt64z(v) => Some(*v as f64),
        Value::Float32(v) => Some(f64::from(*v)),
        Value::Float64(v) => Some(*v),
        _ => None,
    }
}
