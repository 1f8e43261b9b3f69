//! Load accumulator: the Performance Management Chart engine.
//!
//! Walks the gap-free daily table in date order and fills CTL, ATL and TSB
//! from exponentially weighted accumulation. The same recurrence runs twice
//! over the shared date axis: once on actual stress, once on planned-only
//! stress for the projected trajectory. State between the two passes is
//! fully independent.

use crate::models::DailyLoad;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Time constants for the exponentially weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PmcConfig {
    /// CTL time constant in days (default: 42)
    pub ctl_time_constant: u16,

    /// ATL time constant in days (default: 7)
    pub atl_time_constant: u16,
}

impl Default for PmcConfig {
    fn default() -> Self {
        PmcConfig {
            ctl_time_constant: 42,
            atl_time_constant: 7,
        }
    }
}

/// CTL/ATL/TSB triple for one date of one pass
#[derive(Debug, Clone, Copy, PartialEq)]
struct PmcPoint {
    ctl: Decimal,
    atl: Decimal,
    tsb: Decimal,
}

pub struct PmcCalculator {
    config: PmcConfig,
}

impl PmcCalculator {
    pub fn new() -> Self {
        PmcCalculator {
            config: PmcConfig::default(),
        }
    }

    pub fn with_config(config: PmcConfig) -> Self {
        PmcCalculator { config }
    }

    /// Fill both metric families of the table in place.
    ///
    /// A pure recompute over the whole sequence; callers replace any
    /// previously persisted table wholesale with the result.
    pub fn accumulate(&self, days: &mut [DailyLoad]) {
        let actual = self.run_pass(days, |d| d.actual_stress);
        let planned = self.run_pass(days, |d| d.planned_stress.unwrap_or(Decimal::ZERO));

        for (day, (a, p)) in days.iter_mut().zip(actual.into_iter().zip(planned)) {
            day.ctl = a.ctl;
            day.atl = a.atl;
            day.tsb = a.tsb;
            day.projected_ctl = p.ctl;
            day.projected_atl = p.atl;
            day.projected_tsb = p.tsb;
        }
    }

    /// One pass of the recurrence over an already ordered, gap-free table.
    ///
    /// Seeds CTL and ATL to the first date's stress (no history before day
    /// one), then for each later date:
    ///   CTL(d) = CTL(d-1) + (S(d) - CTL(d-1)) / ctl_tc
    ///   ATL(d) = ATL(d-1) + (S(d) - ATL(d-1)) / atl_tc
    ///   TSB(d) = CTL(d-1) - ATL(d-1)
    /// Form reflects accumulated state before today's stress registers.
    fn run_pass(&self, days: &[DailyLoad], stress: impl Fn(&DailyLoad) -> Decimal) -> Vec<PmcPoint> {
        let mut points = Vec::with_capacity(days.len());
        if days.is_empty() {
            return points;
        }

        let ctl_factor = Decimal::ONE / Decimal::from(self.config.ctl_time_constant);
        let atl_factor = Decimal::ONE / Decimal::from(self.config.atl_time_constant);

        let seed = stress(&days[0]);
        let mut prev_ctl = seed;
        let mut prev_atl = seed;
        points.push(PmcPoint {
            ctl: seed,
            atl: seed,
            tsb: Decimal::ZERO,
        });

        for day in &days[1..] {
            let s = stress(day);
            let ctl = prev_ctl + (s - prev_ctl) * ctl_factor;
            let atl = prev_atl + (s - prev_atl) * atl_factor;
            let tsb = prev_ctl - prev_atl;

            points.push(PmcPoint { ctl, atl, tsb });
            prev_ctl = ctl;
            prev_atl = atl;
        }

        points
    }
}

impl Default for PmcCalculator {
    fn default() -> Self {
        Self::new()
    }
}
