//! Pace prediction and weather adjustment.
//!
//! Baseline paces come from a VDOT lookup table (seconds per mile for each
//! intensity code) with linear interpolation between table rows. Warm or
//! humid forecasts widen the per-mile allowance through a dew-point based
//! adjustment applied independently to the day's low and high temperature,
//! yielding a pace range instead of a point estimate.

use crate::error::{Result, StrideError};
use crate::services::weather::DailyForecast;

/// VDOT rows: (vdot, [E, M, T, I, R] seconds per mile)
const VDOT_TABLE: &[(u8, [f64; 5])] = &[
    (30, [798.0, 688.0, 641.0, 588.0, 540.0]),
    (35, [708.0, 610.0, 569.0, 522.0, 480.0]),
    (40, [636.0, 547.0, 510.0, 468.0, 430.0]),
    (42, [609.0, 523.0, 488.0, 448.0, 411.0]),
    (45, [576.0, 494.0, 461.0, 423.0, 388.0]),
    (50, [528.0, 453.0, 422.0, 388.0, 355.0]),
    (55, [486.0, 417.0, 389.0, 357.0, 327.0]),
    (60, [450.0, 386.0, 360.0, 330.0, 302.0]),
    (65, [414.0, 355.0, 331.0, 304.0, 278.0]),
    (70, [384.0, 329.0, 307.0, 282.0, 258.0]),
    (75, [354.0, 304.0, 283.0, 260.0, 238.0]),
    (80, [330.0, 283.0, 264.0, 242.0, 222.0]),
    (85, [306.0, 262.0, 245.0, 225.0, 206.0]),
];

/// Dew point above which pace is slowed
const DEW_POINT_FLOOR_F: f64 = 60.0;

/// Pace penalty per degree of dew point above the floor
const DEW_POINT_PENALTY_PER_DEGREE: f64 = 0.006;

fn code_column(code: &str) -> Option<usize> {
    match code {
        "E" => Some(0),
        "M" => Some(1),
        "T" => Some(2),
        "I" => Some(3),
        "R" => Some(4),
        _ => None,
    }
}

/// Baseline pace in seconds per mile for an intensity code.
///
/// Interpolates linearly between table rows and clamps at the table edges.
/// Codes outside the standard five fall back to the easy-pace column.
pub fn pace_seconds_per_mile(vdot: u8, code: &str) -> f64 {
    let column = code_column(code).unwrap_or(0);

    let (first_vdot, first_row) = VDOT_TABLE[0];
    if vdot <= first_vdot {
        return first_row[column];
    }
    let (last_vdot, last_row) = VDOT_TABLE[VDOT_TABLE.len() - 1];
    if vdot >= last_vdot {
        return last_row[column];
    }

    let mut low = VDOT_TABLE[0];
    let mut high = VDOT_TABLE[VDOT_TABLE.len() - 1];
    for entry in VDOT_TABLE {
        if entry.0 <= vdot {
            low = *entry;
        }
        if entry.0 >= vdot {
            high = *entry;
            break;
        }
    }

    if low.0 == high.0 {
        return low.1[column];
    }

    let pace_low = low.1[column];
    let pace_high = high.1[column];
    let fraction = f64::from(vdot - low.0) / f64::from(high.0 - low.0);
    pace_low - (pace_low - pace_high) * fraction
}

/// Dew point in Fahrenheit from temperature and relative humidity
/// (Magnus approximation).
pub fn dew_point_f(temp_f: f64, humidity_pct: f64) -> f64 {
    let temp_c = (temp_f - 32.0) * 5.0 / 9.0;
    let rh = (humidity_pct / 100.0).clamp(0.001, 1.0);
    let b = 17.625;
    let c = 243.04;
    let gamma = (b * temp_c) / (c + temp_c) + rh.ln();
    let dew_point_c = (c * gamma) / (b - gamma);
    dew_point_c * 9.0 / 5.0 + 32.0
}

/// Slow a pace for heat and humidity. Unchanged at or below the dew point
/// floor; monotonically slower above it.
pub fn adjust_pace_for_weather(base_pace_seconds: f64, dew_point: f64) -> f64 {
    if dew_point <= DEW_POINT_FLOOR_F {
        return base_pace_seconds;
    }
    base_pace_seconds * (1.0 + DEW_POINT_PENALTY_PER_DEGREE * (dew_point - DEW_POINT_FLOOR_F))
}

/// Pace window for one intensity code on one forecast day
#[derive(Debug, Clone, PartialEq)]
pub struct PaceRange {
    pub code: String,

    /// Unadjusted VDOT pace, seconds per mile
    pub base_seconds_per_mile: f64,

    /// Adjusted for the day's low temperature (the faster bound)
    pub low_seconds_per_mile: f64,

    /// Adjusted for the day's high temperature (the slower bound)
    pub high_seconds_per_mile: f64,
}

/// Target pace range for an intensity code under a forecast.
///
/// Fails with a configuration error when no VDOT score is set. When no
/// forecast is available the baseline pace is returned unchanged as a
/// degenerate range rather than failing the request.
pub fn adjusted_range(
    vdot: Option<u8>,
    code: &str,
    forecast: Option<&DailyForecast>,
) -> Result<PaceRange> {
    let vdot = vdot.ok_or_else(|| {
        StrideError::Configuration("VDOT score is required for pace targets".to_string())
    })?;

    let base = pace_seconds_per_mile(vdot, code);
    let (low, high) = match forecast {
        Some(day) => {
            let dew_low = dew_point_f(day.low_f, day.humidity_pct);
            let dew_high = dew_point_f(day.high_f, day.humidity_pct);
            (
                adjust_pace_for_weather(base, dew_low),
                adjust_pace_for_weather(base, dew_high),
            )
        }
        None => (base, base),
    };

    Ok(PaceRange {
        code: code.to_string(),
        base_seconds_per_mile: base,
        low_seconds_per_mile: low,
        high_seconds_per_mile: high,
    })
}

/// Format seconds per mile as m:ss
pub fn format_pace(seconds_per_mile: f64) -> String {
    let total = seconds_per_mile.round() as u32;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn forecast(high_f: f64, low_f: f64, humidity_pct: f64) -> DailyForecast {
        DailyForecast {
            date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            high_f,
            low_f,
            humidity_pct,
        }
    }

    #[test]
    fn test_table_rows_are_exact() {
        assert_eq!(pace_seconds_per_mile(50, "E"), 528.0);
        assert_eq!(pace_seconds_per_mile(50, "T"), 422.0);
        assert_eq!(pace_seconds_per_mile(85, "R"), 206.0);
    }

    #[test]
    fn test_interpolation_between_rows() {
        // VDOT 47.5 sits midway between 45 and 50.
        let pace = pace_seconds_per_mile(47, "E");
        assert!(pace < 576.0 && pace > 528.0);

        // Clamped at the edges.
        assert_eq!(pace_seconds_per_mile(20, "E"), 798.0);
        assert_eq!(pace_seconds_per_mile(99, "E"), 306.0);
    }

    #[test]
    fn test_unknown_code_uses_easy_column() {
        assert_eq!(pace_seconds_per_mile(50, "Z"), pace_seconds_per_mile(50, "E"));
    }

    #[test]
    fn test_dew_point_monotone_in_humidity() {
        let dry = dew_point_f(90.0, 30.0);
        let humid = dew_point_f(90.0, 80.0);
        assert!(humid > dry);
    }

    #[test]
    fn test_pace_unchanged_below_floor() {
        assert_eq!(adjust_pace_for_weather(500.0, 55.0), 500.0);
        assert_eq!(adjust_pace_for_weather(500.0, 60.0), 500.0);
        assert!(adjust_pace_for_weather(500.0, 70.0) > 500.0);
    }

    #[test]
    fn test_adjustment_monotone_in_dew_point() {
        let mild = adjust_pace_for_weather(500.0, 65.0);
        let oppressive = adjust_pace_for_weather(500.0, 78.0);
        assert!(oppressive > mild);
    }

    #[test]
    fn test_range_requires_vdot() {
        let err = adjusted_range(None, "E", None).unwrap_err();
        assert!(matches!(err, StrideError::Configuration(_)));
    }

    #[test]
    fn test_missing_forecast_degrades_to_base_pace() {
        let range = adjusted_range(Some(50), "T", None).unwrap();
        assert_eq!(range.low_seconds_per_mile, range.base_seconds_per_mile);
        assert_eq!(range.high_seconds_per_mile, range.base_seconds_per_mile);
    }

    #[test]
    fn test_hot_forecast_widens_range() {
        let range = adjusted_range(Some(50), "E", Some(&forecast(98.0, 76.0, 60.0))).unwrap();
        assert!(range.high_seconds_per_mile > range.low_seconds_per_mile);
        assert!(range.low_seconds_per_mile >= range.base_seconds_per_mile);
    }

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace(528.0), "8:48");
        assert_eq!(format_pace(359.6), "6:00");
    }
}
