//! Readiness and adherence evaluation.
//!
//! Compares the actual CTL/ATL/TSB trajectory against the planned-only
//! projection at defined checkpoints. Band cutoffs are named policy
//! parameters, configurable rather than buried in the logic.

use crate::models::DailyLoad;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// TSB cutoffs separating the readiness bands.
///
/// A value at or above `fresh_min` is fresh; at or above `neutral_min` is
/// neutral; at or above `fatigued_min` is fatigued; anything lower is
/// overreached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessBands {
    pub fresh_min: Decimal,
    pub neutral_min: Decimal,
    pub fatigued_min: Decimal,
}

impl Default for ReadinessBands {
    fn default() -> Self {
        ReadinessBands {
            fresh_min: dec!(5),
            neutral_min: dec!(-10),
            fatigued_min: dec!(-25),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadinessBand {
    Fresh,
    Neutral,
    Fatigued,
    Overreached,
}

impl ReadinessBand {
    pub fn classify(tsb: Decimal, bands: &ReadinessBands) -> Self {
        if tsb >= bands.fresh_min {
            ReadinessBand::Fresh
        } else if tsb >= bands.neutral_min {
            ReadinessBand::Neutral
        } else if tsb >= bands.fatigued_min {
            ReadinessBand::Fatigued
        } else {
            ReadinessBand::Overreached
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReadinessBand::Fresh => "Fresh and ready for the plan",
            ReadinessBand::Neutral => "Neutral, normal training zone",
            ReadinessBand::Fatigued => "Fatigued, monitor closely",
            ReadinessBand::Overreached => "High risk of overreaching, prioritize recovery",
        }
    }
}

/// Pre-plan readiness: current actual form against the projection at the
/// plan's first scheduled date.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessReport {
    /// Most recent actual date considered (<= today)
    pub as_of: NaiveDate,

    /// First date carrying planned stress
    pub plan_start: NaiveDate,

    pub current_tsb: Decimal,
    pub projected_tsb_at_start: Decimal,

    /// current_tsb - projected_tsb_at_start
    pub delta: Decimal,

    pub band: ReadinessBand,
}

/// Per-metric qualitative adherence status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricStatus {
    Ahead,
    OnTrack,
    Behind,
}

impl MetricStatus {
    fn from_delta(delta: Decimal, tolerance: Decimal) -> Self {
        if delta > tolerance {
            MetricStatus::Ahead
        } else if delta < -tolerance {
            MetricStatus::Behind
        } else {
            MetricStatus::OnTrack
        }
    }
}

/// Mid-plan adherence: actual vs projected at one shared date
#[derive(Debug, Clone, PartialEq)]
pub struct AdherenceReport {
    pub date: NaiveDate,

    /// Signed deltas, actual minus projected
    pub ctl_delta: Decimal,
    pub atl_delta: Decimal,
    pub tsb_delta: Decimal,

    pub ctl_status: MetricStatus,
    pub atl_status: MetricStatus,
    pub tsb_status: MetricStatus,
}

pub struct ReadinessEvaluator {
    bands: ReadinessBands,

    /// Absolute delta within which a metric counts as on track
    adherence_tolerance: Decimal,
}

impl ReadinessEvaluator {
    pub fn new(bands: ReadinessBands, adherence_tolerance: Decimal) -> Self {
        ReadinessEvaluator {
            bands,
            adherence_tolerance,
        }
    }

    /// Classify readiness ahead of the plan. Returns `None` when the table
    /// has no planned stress or no actual entry on or before `today`.
    pub fn readiness(&self, table: &[DailyLoad], today: NaiveDate) -> Option<ReadinessReport> {
        let plan_start = table
            .iter()
            .find(|d| d.planned_stress.unwrap_or(Decimal::ZERO) > Decimal::ZERO)?;
        let current = table.iter().rev().find(|d| d.date <= today)?;

        let delta = current.tsb - plan_start.projected_tsb;
        Some(ReadinessReport {
            as_of: current.date,
            plan_start: plan_start.date,
            current_tsb: current.tsb,
            projected_tsb_at_start: plan_start.projected_tsb,
            delta,
            band: ReadinessBand::classify(current.tsb, &self.bands),
        })
    }

    /// Exact differences of the two series at the shared date key.
    pub fn adherence(&self, table: &[DailyLoad], date: NaiveDate) -> Option<AdherenceReport> {
        let day = table.iter().find(|d| d.date == date)?;

        let ctl_delta = day.ctl - day.projected_ctl;
        let atl_delta = day.atl - day.projected_atl;
        let tsb_delta = day.tsb - day.projected_tsb;

        Some(AdherenceReport {
            date,
            ctl_delta,
            atl_delta,
            tsb_delta,
            ctl_status: MetricStatus::from_delta(ctl_delta, self.adherence_tolerance),
            // More fatigue than planned means behind on recovery, not ahead.
            atl_status: MetricStatus::from_delta(-atl_delta, self.adherence_tolerance),
            tsb_status: MetricStatus::from_delta(tsb_delta, self.adherence_tolerance),
        })
    }
}

impl Default for ReadinessEvaluator {
    fn default() -> Self {
        ReadinessEvaluator::new(ReadinessBands::default(), dec!(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap() + chrono::Days::new(offset)
    }

    fn load(offset: u64) -> DailyLoad {
        DailyLoad::new(day(offset), Decimal::ZERO, None)
    }

    #[test]
    fn test_band_classification_uses_configured_cutoffs() {
        let bands = ReadinessBands::default();
        assert_eq!(ReadinessBand::classify(dec!(10), &bands), ReadinessBand::Fresh);
        assert_eq!(ReadinessBand::classify(dec!(5), &bands), ReadinessBand::Fresh);
        assert_eq!(ReadinessBand::classify(dec!(0), &bands), ReadinessBand::Neutral);
        assert_eq!(
            ReadinessBand::classify(dec!(-15), &bands),
            ReadinessBand::Fatigued
        );
        assert_eq!(
            ReadinessBand::classify(dec!(-30), &bands),
            ReadinessBand::Overreached
        );

        let strict = ReadinessBands {
            fresh_min: dec!(15),
            neutral_min: dec!(0),
            fatigued_min: dec!(-10),
        };
        assert_eq!(
            ReadinessBand::classify(dec!(10), &strict),
            ReadinessBand::Neutral
        );
    }

    #[test]
    fn test_readiness_compares_checkpoints() {
        let mut table: Vec<DailyLoad> = (0..10).map(load).collect();
        // Actual form today.
        table[4].tsb = dec!(8);
        // Plan begins on day 6.
        table[6].planned_stress = Some(dec!(60));
        table[6].projected_tsb = dec!(-2);

        let evaluator = ReadinessEvaluator::default();
        let report = evaluator.readiness(&table, day(4)).unwrap();

        assert_eq!(report.as_of, day(4));
        assert_eq!(report.plan_start, day(6));
        assert_eq!(report.delta, dec!(10));
        assert_eq!(report.band, ReadinessBand::Fresh);
    }

    #[test]
    fn test_readiness_absent_without_plan() {
        let table: Vec<DailyLoad> = (0..5).map(load).collect();
        let evaluator = ReadinessEvaluator::default();
        assert!(evaluator.readiness(&table, day(4)).is_none());
    }

    #[test]
    fn test_adherence_deltas_and_status() {
        let mut table: Vec<DailyLoad> = (0..3).map(load).collect();
        table[1].ctl = dec!(50);
        table[1].projected_ctl = dec!(40);
        table[1].atl = dec!(62);
        table[1].projected_atl = dec!(50);
        table[1].tsb = dec!(-12);
        table[1].projected_tsb = dec!(-10);

        let evaluator = ReadinessEvaluator::default();
        let report = evaluator.adherence(&table, day(1)).unwrap();

        assert_eq!(report.ctl_delta, dec!(10));
        assert_eq!(report.ctl_status, MetricStatus::Ahead);
        // Carrying 12 more ATL than planned reads as behind.
        assert_eq!(report.atl_status, MetricStatus::Behind);
        assert_eq!(report.tsb_delta, dec!(-2));
        assert_eq!(report.tsb_status, MetricStatus::OnTrack);
    }

    #[test]
    fn test_adherence_requires_shared_date() {
        let table: Vec<DailyLoad> = (0..3).map(load).collect();
        let evaluator = ReadinessEvaluator::default();
        assert!(evaluator.adherence(&table, day(9)).is_none());
    }
}
