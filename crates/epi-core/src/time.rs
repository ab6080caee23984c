//! Simulation time model.
//!
//! # Design
//!
//! Time is represented as a monotonically increasing step index `ti`.  The
//! mapping to calendar years is held in `Timeline`:
//!
//!   year = start + ti * dt
//!
//! `dt` is a fraction of a year (1.0 = annual steps, 1/12 ≈ monthly).  Module
//! parameters expressed in years (durations, rates) are converted to step
//! units by dividing by `dt`; scheduled-event fields store the *step index*
//! at which a transition becomes due, with `f64::NAN` as the "unset"
//! sentinel (a NaN never compares `<=` any step, so unset events are never
//! due).

use crate::{EpiError, EpiResult};

/// Maps between step indices and calendar years for one simulation run.
///
/// `Timeline` is cheap to copy and intentionally holds no heap data.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timeline {
    /// Calendar year of step 0 (may be fractional).
    pub start: f64,
    /// Calendar year of the final step (inclusive).
    pub stop: f64,
    /// Step size in years.
    pub dt: f64,
}

impl Timeline {
    /// Create a timeline, validating that it spans at least one step.
    pub fn new(start: f64, stop: f64, dt: f64) -> EpiResult<Self> {
        if !(dt > 0.0) {
            return Err(EpiError::Config(format!("dt must be positive, got {dt}")));
        }
        if stop < start {
            return Err(EpiError::Config(format!(
                "stop year {stop} precedes start year {start}"
            )));
        }
        Ok(Self { start, stop, dt })
    }

    /// Number of timepoints, including both endpoints.
    #[inline]
    pub fn npts(&self) -> usize {
        ((self.stop - self.start) / self.dt).round() as usize + 1
    }

    /// Calendar year corresponding to step `ti`.
    #[inline]
    pub fn year(&self, ti: usize) -> f64 {
        self.start + ti as f64 * self.dt
    }

    /// Convert a duration in years into (fractional) steps.
    #[inline]
    pub fn to_steps(&self, years: f64) -> f64 {
        years / self.dt
    }

    /// The full vector of calendar years, one per step.
    pub fn yearvec(&self) -> Vec<f64> {
        (0..self.npts()).map(|ti| self.year(ti)).collect()
    }
}

/// Convert an ISO `YYYY-MM-DD` calendar date into a fractional year.
///
/// Observed epidemiological data is frequently indexed by date; the
/// calibration layer converts to fractional years so it can be compared
/// against the simulation's `yearvec`.  Month lengths ignore leap years
/// (the resulting error is below the resolution of annual surveillance
/// data).
pub fn date_to_year(date: &str) -> EpiResult<f64> {
    const CUM_DAYS: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
    let mut parts = date.split('-');
    let parse = |s: Option<&str>| -> EpiResult<u32> {
        s.and_then(|v| v.parse().ok())
            .ok_or_else(|| EpiError::Parse(format!("invalid date: {date:?}")))
    };
    let year = parse(parts.next())?;
    let month = parse(parts.next())?;
    let day = parse(parts.next())?;
    if parts.next().is_some() || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(EpiError::Parse(format!("invalid date: {date:?}")));
    }
    let day_of_year = CUM_DAYS[month as usize - 1] + day - 1;
    Ok(year as f64 + day_of_year as f64 / 365.0)
}
