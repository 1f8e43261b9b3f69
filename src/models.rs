use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source a workout record was normalized from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// GPS track file (GPX)
    TrackFile,
    /// Binary fitness-device export (FIT)
    FitnessFile,
    /// Tabular history row or manually entered activity
    ManualEntry,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::TrackFile => "track",
            SourceKind::FitnessFile => "fit",
            SourceKind::ManualEntry => "manual",
        }
    }
}

/// One completed activity, immutable once parsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Unique identifier for the record
    pub id: String,

    /// Calendar day of the activity (athlete-local)
    pub date: NaiveDate,

    /// Distance covered in meters, zero when unknown
    pub distance_meters: Decimal,

    /// Duration of the activity in seconds
    pub duration_seconds: u32,

    /// Average heart rate in bpm, absent when the source had no samples
    pub avg_heart_rate: Option<u16>,

    /// Which normalizer produced this record
    pub source_kind: SourceKind,

    /// Original file name, when imported from a file
    pub source: Option<String>,
}

impl WorkoutRecord {
    /// Natural key used to deduplicate re-imported activities
    pub fn natural_key(&self) -> String {
        format!(
            "{}-{}-{}",
            self.date, self.duration_seconds, self.distance_meters
        )
    }

    pub fn duration_hours(&self) -> Decimal {
        Decimal::from(self.duration_seconds) / dec!(3600)
    }
}

/// Quantity of a planned segment: either distance or time at an intensity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SegmentQuantity {
    Miles(Decimal),
    Minutes(Decimal),
}

/// One token of a structured workout description, e.g. `5E` or `30minT`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSegment {
    pub quantity: SegmentQuantity,

    /// Intensity code, resolved against the profile's factor mapping
    pub code: String,
}

/// One scheduled day from a training plan, immutable once parsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedWorkout {
    /// Scheduled calendar day
    pub date: NaiveDate,

    /// Original description text, kept for display and coach prompts
    pub description: String,

    /// Parsed structure the stress estimator consumes
    pub segments: Vec<PlanSegment>,

    /// Total planned distance in meters
    pub total_distance_meters: Decimal,

    /// One-based row in the source plan file, zero when not file-backed.
    /// Carried so scoring errors can name the offending row.
    #[serde(default)]
    pub source_row: usize,
}

/// One calendar date's aggregate training load.
///
/// The sequence of these is strictly increasing by date with no missing day,
/// and is always replaced wholesale by a full recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    /// Unique date key
    pub date: NaiveDate,

    /// Sum of same-day workout stress scores, zero on rest days
    pub actual_stress: Decimal,

    /// Plan-derived stress for the date, absent when the plan has no entry
    pub planned_stress: Option<Decimal>,

    /// Chronic training load over actual stress (fitness)
    pub ctl: Decimal,

    /// Acute training load over actual stress (fatigue)
    pub atl: Decimal,

    /// Training stress balance over actual stress (form)
    pub tsb: Decimal,

    /// CTL of the planned-only pass on the same date axis
    pub projected_ctl: Decimal,

    /// ATL of the planned-only pass
    pub projected_atl: Decimal,

    /// TSB of the planned-only pass
    pub projected_tsb: Decimal,
}

impl DailyLoad {
    /// Skeleton entry before the accumulator fills the derived metrics
    pub fn new(date: NaiveDate, actual_stress: Decimal, planned_stress: Option<Decimal>) -> Self {
        DailyLoad {
            date,
            actual_stress,
            planned_stress,
            ctl: Decimal::ZERO,
            atl: Decimal::ZERO,
            tsb: Decimal::ZERO,
            projected_ctl: Decimal::ZERO,
            projected_atl: Decimal::ZERO,
            projected_tsb: Decimal::ZERO,
        }
    }
}

/// Persistent athlete configuration, read by the estimator and pace adjuster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    /// Lactate threshold heart rate, the anchor for heart-rate stress scoring
    pub lthr: Option<u16>,

    /// VDOT score, the pace-predictor parameter
    pub vdot: Option<u8>,

    /// Intensity code -> intensity factor, user editable
    pub intensity_factors: BTreeMap<String, Decimal>,

    /// Creation timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Last update timestamp
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl AthleteProfile {
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        AthleteProfile {
            lthr: None,
            vdot: None,
            intensity_factors: default_intensity_factors(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Intensity factor for a code, when the mapping knows it
    pub fn intensity_factor(&self, code: &str) -> Option<Decimal> {
        self.intensity_factors.get(code).copied()
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }
}

impl Default for AthleteProfile {
    fn default() -> Self {
        Self::new()
    }
}

/// Default factor mapping for the five standard intensity codes:
/// easy, marathon, threshold, interval, repetition.
pub fn default_intensity_factors() -> BTreeMap<String, Decimal> {
    let mut factors = BTreeMap::new();
    factors.insert("E".to_string(), dec!(0.70));
    factors.insert("M".to_string(), dec!(0.85));
    factors.insert("T".to_string(), dec!(1.00));
    factors.insert("I".to_string(), dec!(1.10));
    factors.insert("R".to_string(), dec!(1.20));
    factors
}

/// Meters per statute mile
pub const METERS_PER_MILE: f64 = 1609.344;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_serialization() {
        let kind = SourceKind::TrackFile;
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, "\"TrackFile\"");

        let deserialized: SourceKind = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, SourceKind::TrackFile);
    }

    #[test]
    fn test_workout_record_natural_key() {
        let record = WorkoutRecord {
            id: "a".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            distance_meters: dec!(8046.72),
            duration_seconds: 1800,
            avg_heart_rate: Some(150),
            source_kind: SourceKind::ManualEntry,
            source: None,
        };

        assert_eq!(record.natural_key(), "2025-03-10-1800-8046.72");
    }

    #[test]
    fn test_duration_hours() {
        let record = WorkoutRecord {
            id: "b".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            distance_meters: Decimal::ZERO,
            duration_seconds: 5400,
            avg_heart_rate: None,
            source_kind: SourceKind::TrackFile,
            source: None,
        };

        assert_eq!(record.duration_hours(), dec!(1.5));
    }

    #[test]
    fn test_daily_load_skeleton() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let load = DailyLoad::new(date, dec!(65), Some(dec!(40)));

        assert_eq!(load.actual_stress, dec!(65));
        assert_eq!(load.planned_stress, Some(dec!(40)));
        assert_eq!(load.ctl, Decimal::ZERO);
        assert_eq!(load.projected_tsb, Decimal::ZERO);
    }

    #[test]
    fn test_default_factors_cover_standard_codes() {
        let profile = AthleteProfile::new();
        for code in ["E", "M", "T", "I", "R"] {
            assert!(profile.intensity_factor(code).is_some(), "missing {}", code);
        }
        assert_eq!(profile.intensity_factor("X"), None);
    }

    #[test]
    fn test_profile_serialization_round_trip() {
        let mut profile = AthleteProfile::new();
        profile.lthr = Some(172);
        profile.vdot = Some(48);

        let json = serde_json::to_string(&profile).unwrap();
        let deserialized: AthleteProfile = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.lthr, Some(172));
        assert_eq!(deserialized.vdot, Some(48));
        assert_eq!(deserialized.intensity_factors, profile.intensity_factors);
    }
}
