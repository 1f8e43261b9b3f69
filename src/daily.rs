//! Daily aggregator: folds scored workouts and plan entries into one ordered
//! daily table with no gaps.

use crate::error::{Result, StrideError};
use crate::models::DailyLoad;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

/// A workout's date paired with its estimated stress score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatedStress {
    pub date: NaiveDate,
    pub stress: Decimal,
}

/// Build the ordered `DailyLoad` skeleton for the accumulator.
///
/// Covers every date from the earliest observed activity or plan entry
/// through `max(today, last plan date)`, so the projected trajectory and
/// readiness checkpoints exist on the shared axis. Dates with no activity
/// appear with zero actual stress; dates with no plan entry carry `None`
/// planned stress. All-zero days are valid, not errors.
pub fn build_daily_table(
    actual: &[DatedStress],
    planned: &[DatedStress],
    today: NaiveDate,
) -> Result<Vec<DailyLoad>> {
    let mut actual_by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for entry in actual {
        *actual_by_date.entry(entry.date).or_insert(Decimal::ZERO) += entry.stress;
    }

    let mut planned_by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for entry in planned {
        *planned_by_date.entry(entry.date).or_insert(Decimal::ZERO) += entry.stress;
    }

    let start = actual_by_date
        .keys()
        .chain(planned_by_date.keys())
        .min()
        .copied()
        .ok_or_else(|| {
            StrideError::DataGap("no workouts and no plan entries to compute over".to_string())
        })?;
    let end = planned_by_date
        .keys()
        .max()
        .copied()
        .map_or(today, |last_plan| last_plan.max(today));
    let end = end.max(start);

    let excluded = actual_by_date.keys().filter(|date| **date > end).count();
    if excluded > 0 {
        warn!(count = excluded, %end, "actual entries dated past the table horizon were excluded");
    }

    let mut table = Vec::new();
    for date in start.iter_days() {
        if date > end {
            break;
        }
        table.push(DailyLoad::new(
            date,
            actual_by_date.get(&date).copied().unwrap_or(Decimal::ZERO),
            planned_by_date.get(&date).copied(),
        ));
    }

    Ok(table)
}
