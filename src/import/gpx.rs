//! Geo-track normalizer.
//!
//! Distance is the cumulative point-to-point geodesic distance over the
//! track, duration is the last timestamp minus the first. GPS tracks carry
//! no heart-rate channel here, so `avg_heart_rate` is absent.

use crate::error::{Result, StrideError};
use crate::import::{NormalizedFile, Normalizer};
use crate::models::{SourceKind, WorkoutRecord};
use chrono::{DateTime, Utc};
use gpx::Gpx;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use uuid::Uuid;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

pub struct GpxNormalizer;

impl GpxNormalizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GpxNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer for GpxNormalizer {
    fn can_import(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("gpx"))
            .unwrap_or(false)
    }

    fn normalize(&self, path: &Path) -> Result<NormalizedFile> {
        let file = File::open(path).map_err(|e| StrideError::Parse {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let gpx: Gpx = gpx::read(BufReader::new(file)).map_err(|e| StrideError::Parse {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut distance_meters = 0.0f64;
        let mut first_time: Option<DateTime<Utc>> = None;
        let mut last_time: Option<DateTime<Utc>> = None;

        for track in &gpx.tracks {
            for segment in &track.segments {
                let mut previous: Option<(f64, f64)> = None;
                for waypoint in &segment.points {
                    let point = waypoint.point();
                    let position = (point.y(), point.x()); // (lat, lon)
                    if let Some(prev) = previous {
                        distance_meters += haversine_meters(prev, position);
                    }
                    previous = Some(position);

                    if let Some(time) = waypoint.time.clone() {
                        let odt: time::OffsetDateTime = time.into();
                        if let Some(dt) = DateTime::<Utc>::from_timestamp(odt.unix_timestamp(), 0)
                        {
                            if first_time.is_none() {
                                first_time = Some(dt);
                            }
                            last_time = Some(dt);
                        }
                    }
                }
            }
        }

        let (start, end) = match (first_time, last_time) {
            (Some(start), Some(end)) if end >= start => (start, end),
            _ => {
                return Err(StrideError::Parse {
                    file: path.to_path_buf(),
                    reason: "track has no usable timestamps".to_string(),
                })
            }
        };

        let record = WorkoutRecord {
            id: Uuid::new_v4().to_string(),
            date: start.date_naive(),
            distance_meters: Decimal::from_f64(distance_meters).unwrap_or(Decimal::ZERO),
            duration_seconds: (end - start).num_seconds().max(0) as u32,
            avg_heart_rate: None,
            source_kind: SourceKind::TrackFile,
            source: path.file_name().map(|n| n.to_string_lossy().to_string()),
        };

        Ok(NormalizedFile {
            records: vec![record],
            warnings: Vec::new(),
        })
    }

    fn format_name(&self) -> &'static str {
        "GPX"
    }
}

/// Great-circle distance between two (lat, lon) pairs in degrees
fn haversine_meters(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}
