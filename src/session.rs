//! Orchestrates one full recompute: score workouts and plan entries, fold
//! them onto the daily axis, run the accumulator, evaluate readiness.
//!
//! The session owns no storage and reads no globals; the profile, the
//! inputs and the clock all come from the caller, so every recompute is
//! reproducible.

use crate::daily::{self, DatedStress};
use crate::error::{ImportWarning, Result, StrideError};
use crate::models::{AthleteProfile, DailyLoad, PlannedWorkout, WorkoutRecord};
use crate::pmc::{PmcCalculator, PmcConfig};
use crate::readiness::{AdherenceReport, ReadinessBands, ReadinessEvaluator, ReadinessReport};
use crate::stress;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Result of a full recompute
#[derive(Debug)]
pub struct Recompute {
    /// The complete daily table, ordered and gap-free
    pub table: Vec<DailyLoad>,

    /// Plan entries skipped over row-level validation failures
    pub warnings: Vec<ImportWarning>,
}

pub struct TrainingSession {
    profile: AthleteProfile,
    calculator: PmcCalculator,
    evaluator: ReadinessEvaluator,
}

impl TrainingSession {
    pub fn new(
        profile: AthleteProfile,
        pmc: PmcConfig,
        bands: ReadinessBands,
        adherence_tolerance: Decimal,
    ) -> Self {
        TrainingSession {
            profile,
            calculator: PmcCalculator::with_config(pmc),
            evaluator: ReadinessEvaluator::new(bands, adherence_tolerance),
        }
    }

    pub fn profile(&self) -> &AthleteProfile {
        &self.profile
    }

    /// Score everything and rebuild the daily table from scratch.
    ///
    /// Unknown intensity codes in the plan reject only the offending
    /// workout and are reported as warnings; missing profile settings the
    /// scoring depends on abort the recompute.
    pub fn recompute(
        &self,
        workouts: &[WorkoutRecord],
        plan: &[PlannedWorkout],
        today: NaiveDate,
    ) -> Result<Recompute> {
        let mut warnings = Vec::new();

        // The table horizon is max(today, last plan date); anything dated
        // past it cannot appear on the axis and must not vanish silently.
        let horizon = plan
            .iter()
            .map(|w| w.date)
            .max()
            .map_or(today, |last| last.max(today));

        let mut actual = Vec::with_capacity(workouts.len());
        for record in workouts {
            if record.date > horizon {
                warn!(date = %record.date, %horizon, "workout dated past the table horizon");
                warnings.push(ImportWarning {
                    file: std::path::PathBuf::from(
                        record.source.as_deref().unwrap_or("workouts"),
                    ),
                    row: None,
                    reason: format!(
                        "workout dated {} is after {} and is excluded; check the record's date",
                        record.date, horizon
                    ),
                });
                continue;
            }
            actual.push(DatedStress {
                date: record.date,
                stress: stress::workout_stress(record, &self.profile)?,
            });
        }

        let mut planned = Vec::with_capacity(plan.len());
        for workout in plan {
            match stress::planned_stress(workout, &self.profile) {
                Ok(score) => planned.push(DatedStress {
                    date: workout.date,
                    stress: score,
                }),
                Err(StrideError::Validation(e)) => {
                    warn!(date = %workout.date, error = %e, "skipping plan entry");
                    warnings.push(ImportWarning {
                        file: std::path::PathBuf::from("plan"),
                        row: (workout.source_row > 0).then_some(workout.source_row),
                        reason: format!("{} ({})", e, workout.date),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let mut table = daily::build_daily_table(&actual, &planned, today)?;
        self.calculator.accumulate(&mut table);

        info!(
            days = table.len(),
            workouts = workouts.len(),
            plan_entries = plan.len(),
            skipped = warnings.len(),
            "recomputed daily table"
        );

        Ok(Recompute { table, warnings })
    }

    pub fn readiness(&self, table: &[DailyLoad], today: NaiveDate) -> Option<ReadinessReport> {
        self.evaluator.readiness(table, today)
    }

    pub fn adherence(&self, table: &[DailyLoad], date: NaiveDate) -> Option<AdherenceReport> {
        self.evaluator.adherence(table, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlanSegment, SegmentQuantity, SourceKind};
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn session(lthr: Option<u16>) -> TrainingSession {
        let mut profile = AthleteProfile::new();
        profile.lthr = lthr;
        TrainingSession::new(
            profile,
            PmcConfig::default(),
            ReadinessBands::default(),
            dec!(5),
        )
    }

    fn run(date: NaiveDate, duration_seconds: u32, hr: Option<u16>) -> WorkoutRecord {
        WorkoutRecord {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            distance_meters: dec!(10000),
            duration_seconds,
            avg_heart_rate: hr,
            source_kind: SourceKind::ManualEntry,
            source: None,
        }
    }

    fn timed_plan(date: NaiveDate, minutes: Decimal, code: &str, row: usize) -> PlannedWorkout {
        PlannedWorkout {
            date,
            description: format!("{minutes}min{code}"),
            segments: vec![PlanSegment {
                quantity: SegmentQuantity::Minutes(minutes),
                code: code.to_string(),
            }],
            total_distance_meters: Decimal::ZERO,
            source_row: row,
        }
    }

    #[test]
    fn test_recompute_scores_and_accumulates() {
        let session = session(Some(170));
        let workouts = vec![run(day(1), 3600, Some(170)), run(day(2), 3600, None)];
        let plan = vec![timed_plan(day(4), dec!(60), "T", 2)];

        let recompute = session.recompute(&workouts, &plan, day(2)).unwrap();
        assert!(recompute.warnings.is_empty());

        let table = &recompute.table;
        assert_eq!(table.first().unwrap().date, day(1));
        assert_eq!(table.last().unwrap().date, day(4));
        assert_eq!(table[0].actual_stress, dec!(100));
        assert_eq!(table[1].actual_stress, dec!(50));
        assert_eq!(table[3].planned_stress, Some(dec!(100)));

        // Seeding: first day's CTL equals its stress, TSB is zero.
        assert_eq!(table[0].ctl, dec!(100));
        assert_eq!(table[0].tsb, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_plan_code_is_warned_not_fatal() {
        let session = session(Some(170));
        let workouts = vec![run(day(1), 3600, Some(160))];
        let plan = vec![
            timed_plan(day(3), dec!(30), "E", 2),
            timed_plan(day(4), dec!(30), "Z", 3),
        ];

        let recompute = session.recompute(&workouts, &plan, day(2)).unwrap();
        assert_eq!(recompute.warnings.len(), 1);
        assert!(recompute.warnings[0].reason.contains("'Z'"));
        // The warning names the plan file row the bad code came from.
        assert_eq!(recompute.warnings[0].row, Some(3));
        assert!(recompute.warnings[0].reason.contains("row 3"));

        let table = &recompute.table;
        assert!(table.iter().any(|d| d.planned_stress.is_some()));
        assert!(table
            .iter()
            .all(|d| d.date != day(4) || d.planned_stress.is_none()));
    }

    #[test]
    fn test_missing_lthr_aborts_when_hr_present() {
        let session = session(None);
        let workouts = vec![run(day(1), 3600, Some(160))];
        let err = session.recompute(&workouts, &[], day(1)).unwrap_err();
        assert!(matches!(err, StrideError::Configuration(_)));
    }

    #[test]
    fn test_empty_inputs_are_a_data_gap() {
        let session = session(Some(170));
        let err = session.recompute(&[], &[], day(1)).unwrap_err();
        assert!(matches!(err, StrideError::DataGap(_)));
    }

    #[test]
    fn test_readiness_through_session() {
        let session = session(Some(170));
        let workouts = vec![run(day(1), 3600, Some(160)), run(day(2), 1800, Some(150))];
        let plan = vec![timed_plan(day(10), dec!(40), "E", 2)];

        let recompute = session.recompute(&workouts, &plan, day(3)).unwrap();
        let report = session.readiness(&recompute.table, day(3)).unwrap();
        assert_eq!(report.plan_start, day(10));
    }

    #[test]
    fn test_future_dated_workout_is_warned_and_excluded() {
        let session = session(Some(170));
        // Second record is dated past today with no plan extending the axis,
        // as from a device with a skewed clock.
        let workouts = vec![run(day(1), 3600, Some(160)), run(day(20), 3600, Some(160))];

        let recompute = session.recompute(&workouts, &[], day(2)).unwrap();
        assert_eq!(recompute.warnings.len(), 1);
        assert!(recompute.warnings[0].reason.contains("2025-06-20"));

        let table = &recompute.table;
        assert_eq!(table.last().unwrap().date, day(2));
        assert!(table.iter().all(|d| d.date != day(20)));
    }

    #[test]
    fn test_plan_horizon_admits_later_workouts() {
        let session = session(Some(170));
        // A workout after today but inside the plan window stays on the axis.
        let workouts = vec![run(day(1), 3600, Some(160)), run(day(8), 3600, Some(160))];
        let plan = vec![timed_plan(day(10), dec!(40), "E", 2)];

        let recompute = session.recompute(&workouts, &plan, day(2)).unwrap();
        assert!(recompute.warnings.is_empty());
        assert!(recompute
            .table
            .iter()
            .any(|d| d.date == day(8) && d.actual_stress > Decimal::ZERO));
    }
}
