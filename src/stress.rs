//! Training-stress estimation.
//!
//! Both modes share the same convention: one hour exactly at threshold
//! intensity scores 100 points, so actual and planned stress are numerically
//! comparable on one daily axis.

use crate::error::{Result, StrideError, ValidationError};
use crate::models::{AthleteProfile, PlanSegment, PlannedWorkout, SegmentQuantity, WorkoutRecord};
use crate::pace;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Stress awarded per hour when no heart-rate data exists for a record
const FALLBACK_POINTS_PER_HOUR: Decimal = dec!(50);

/// Stress score for one completed workout.
///
/// Heart-rate based when samples exist: `hours × (avg_hr / lthr)² × 100`,
/// which is exactly 100 for one hour at threshold heart rate. Records
/// without heart rate fall back to a flat duration-based estimate. A missing
/// or non-positive LTHR is a configuration error when heart rate is the only
/// input channel.
pub fn workout_stress(record: &WorkoutRecord, profile: &AthleteProfile) -> Result<Decimal> {
    match record.avg_heart_rate {
        Some(avg_hr) => {
            let lthr = profile.lthr.unwrap_or(0);
            if lthr == 0 {
                return Err(StrideError::Configuration(
                    "LTHR must be set and positive for heart-rate stress scoring".to_string(),
                ));
            }
            let intensity = Decimal::from(avg_hr) / Decimal::from(lthr);
            Ok(record.duration_hours() * intensity * intensity * dec!(100))
        }
        None => Ok(record.duration_hours() * FALLBACK_POINTS_PER_HOUR),
    }
}

/// Stress score for one planned workout from its parsed segments.
///
/// Each segment contributes `hours × factor² × 100` where the duration of a
/// distance segment is miles × the VDOT pace implied by its code. Codes
/// missing from the profile's factor mapping are validation errors naming
/// the code and the workout's source row; distance segments with no VDOT
/// score are configuration errors.
pub fn planned_stress(workout: &PlannedWorkout, profile: &AthleteProfile) -> Result<Decimal> {
    let mut total = Decimal::ZERO;
    for segment in &workout.segments {
        total += segment_stress(segment, profile, workout.source_row)?;
    }
    Ok(total)
}

/// Stress contribution of a single plan segment. `row` feeds validation
/// error reporting when called during plan parsing.
pub fn segment_stress(
    segment: &PlanSegment,
    profile: &AthleteProfile,
    row: usize,
) -> Result<Decimal> {
    let factor = profile.intensity_factor(&segment.code).ok_or_else(|| {
        StrideError::Validation(ValidationError::UnknownIntensityCode {
            code: segment.code.clone(),
            row,
        })
    })?;

    let duration_hours = match &segment.quantity {
        SegmentQuantity::Minutes(minutes) => *minutes / dec!(60),
        SegmentQuantity::Miles(miles) => {
            let vdot = profile.vdot.ok_or_else(|| {
                StrideError::Configuration(
                    "VDOT score is required to derive duration from distance segments".to_string(),
                )
            })?;
            let pace_secs = pace::pace_seconds_per_mile(vdot, &segment.code);
            let pace_secs = Decimal::from_f64(pace_secs).unwrap_or(Decimal::ZERO);
            *miles * pace_secs / dec!(3600)
        }
    };

    Ok(duration_hours * factor * factor * dec!(100))
}

/// Estimate LTHR as the mean heart rate of the five hardest runs between
/// 20 and 75 minutes, the window where sustained efforts approximate
/// threshold intensity.
pub fn estimate_lthr(records: &[WorkoutRecord]) -> Result<u16> {
    let mut candidates: Vec<u16> = records
        .iter()
        .filter(|r| (1200..=4500).contains(&r.duration_seconds))
        .filter_map(|r| r.avg_heart_rate)
        .collect();

    if candidates.is_empty() {
        return Err(StrideError::DataGap(
            "no 20-75 minute runs with heart rate to estimate LTHR from".to_string(),
        ));
    }

    candidates.sort_unstable_by(|a, b| b.cmp(a));
    candidates.truncate(5);
    let sum: u32 = candidates.iter().map(|hr| u32::from(*hr)).sum();
    Ok((sum / candidates.len() as u32) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use chrono::NaiveDate;

    fn record(duration_seconds: u32, avg_heart_rate: Option<u16>) -> WorkoutRecord {
        WorkoutRecord {
            id: "r".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            distance_meters: dec!(10000),
            duration_seconds,
            avg_heart_rate,
            source_kind: SourceKind::ManualEntry,
            source: None,
        }
    }

    fn profile(lthr: Option<u16>, vdot: Option<u8>) -> AthleteProfile {
        let mut profile = AthleteProfile::new();
        profile.lthr = lthr;
        profile.vdot = vdot;
        profile
    }

    #[test]
    fn test_one_hour_at_threshold_scores_100() {
        let stress = workout_stress(&record(3600, Some(170)), &profile(Some(170), None)).unwrap();
        assert_eq!(stress, dec!(100));
    }

    #[test]
    fn test_stress_scales_with_intensity_squared() {
        let easy = workout_stress(&record(3600, Some(136)), &profile(Some(170), None)).unwrap();
        // IF = 0.8, so stress = 64.
        assert_eq!(easy, dec!(64));
    }

    #[test]
    fn test_zero_lthr_is_configuration_error() {
        let err = workout_stress(&record(3600, Some(150)), &profile(Some(0), None)).unwrap_err();
        assert!(matches!(err, StrideError::Configuration(_)));

        let err = workout_stress(&record(3600, Some(150)), &profile(None, None)).unwrap_err();
        assert!(matches!(err, StrideError::Configuration(_)));
    }

    #[test]
    fn test_missing_hr_uses_duration_fallback() {
        // No heart rate channel, so LTHR is not required.
        let stress = workout_stress(&record(5400, None), &profile(None, None)).unwrap();
        assert_eq!(stress, dec!(75));
    }

    #[test]
    fn test_time_segment_stress() {
        // 60 minutes easy at factor 0.70: 0.49 * 100.
        let segment = PlanSegment {
            quantity: SegmentQuantity::Minutes(dec!(60)),
            code: "E".to_string(),
        };
        let stress = segment_stress(&segment, &profile(None, None), 0).unwrap();
        assert_eq!(stress, dec!(49));
    }

    #[test]
    fn test_distance_segment_uses_vdot_pace() {
        let segment = PlanSegment {
            quantity: SegmentQuantity::Miles(dec!(5)),
            code: "T".to_string(),
        };
        // VDOT 50 threshold pace is 422 s/mi: 5 * 422 / 3600 hours at factor 1.0.
        let stress = segment_stress(&segment, &profile(None, Some(50)), 0).unwrap();
        let expected = dec!(5) * dec!(422) / dec!(3600) * dec!(100);
        assert!((stress - expected).abs() < dec!(0.0001));
    }

    #[test]
    fn test_distance_segment_without_vdot_fails() {
        let segment = PlanSegment {
            quantity: SegmentQuantity::Miles(dec!(3)),
            code: "E".to_string(),
        };
        let err = segment_stress(&segment, &profile(None, None), 0).unwrap_err();
        assert!(matches!(err, StrideError::Configuration(_)));
    }

    #[test]
    fn test_unknown_code_names_code_and_row() {
        let segment = PlanSegment {
            quantity: SegmentQuantity::Miles(dec!(3)),
            code: "Q".to_string(),
        };
        let err = segment_stress(&segment, &profile(None, Some(50)), 7).unwrap_err();
        match err {
            StrideError::Validation(ValidationError::UnknownIntensityCode { code, row }) => {
                assert_eq!(code, "Q");
                assert_eq!(row, 7);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_planned_stress_sums_segments() {
        let workout = PlannedWorkout {
            date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            description: "30minE 30minE".to_string(),
            segments: vec![
                PlanSegment {
                    quantity: SegmentQuantity::Minutes(dec!(30)),
                    code: "E".to_string(),
                },
                PlanSegment {
                    quantity: SegmentQuantity::Minutes(dec!(30)),
                    code: "E".to_string(),
                },
            ],
            total_distance_meters: Decimal::ZERO,
            source_row: 2,
        };
        let stress = planned_stress(&workout, &profile(None, None)).unwrap();
        assert_eq!(stress, dec!(49));
    }

    #[test]
    fn test_planned_stress_unknown_code_carries_source_row() {
        let workout = PlannedWorkout {
            date: NaiveDate::from_ymd_opt(2025, 4, 3).unwrap(),
            description: "3Q".to_string(),
            segments: vec![PlanSegment {
                quantity: SegmentQuantity::Minutes(dec!(30)),
                code: "Q".to_string(),
            }],
            total_distance_meters: Decimal::ZERO,
            source_row: 14,
        };
        let err = planned_stress(&workout, &profile(None, None)).unwrap_err();
        match err {
            StrideError::Validation(ValidationError::UnknownIntensityCode { code, row }) => {
                assert_eq!(code, "Q");
                assert_eq!(row, 14);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lthr_estimate_top_five_mean() {
        let mut records: Vec<WorkoutRecord> = [168, 172, 175, 160, 171, 169, 150]
            .iter()
            .map(|hr| record(2400, Some(*hr)))
            .collect();
        // Too short and too long efforts are ignored.
        records.push(record(600, Some(190)));
        records.push(record(7200, Some(188)));

        let lthr = estimate_lthr(&records).unwrap();
        assert_eq!(lthr, (168 + 172 + 175 + 171 + 169) / 5);
    }

    #[test]
    fn test_lthr_estimate_needs_candidates() {
        let err = estimate_lthr(&[record(600, Some(180))]).unwrap_err();
        assert!(matches!(err, StrideError::DataGap(_)));
    }
}
