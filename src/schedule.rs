//! Schedule estimates for live feedback before a batch is committed.
//!
//! These are pure functions of the panel inputs. The estimator models the
//! outer voltage-step loop (`start_voltage` to `stop_voltage` by
//! `step_voltage`, times `repetitions`), independently of any bias/size sweep,
//! and charges one trace plus one retrace pass per scan line.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::error::{AppResult, StmError};
use crate::plan::{SpectroscopyOptions, SweepSpecification};
use crate::quantity::ScaledDecimal;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Number of images the voltage loop will acquire.
///
/// `repetitions × trunc(|(start - stop) / step|)`: truncated, never rounded,
/// so `0.2 V → 1.0 V by 0.1 V` counts 8 images, not 9.
///
/// # Errors
///
/// [`StmError::InvalidSweep`] when `step` or `repetitions` is zero, and
/// [`StmError::InvalidValue`] when the quotient is not finite.
pub fn total_image_count(
    start: ScaledDecimal,
    stop: ScaledDecimal,
    step: ScaledDecimal,
    repetitions: u32,
) -> AppResult<u64> {
    if repetitions == 0 {
        return Err(StmError::InvalidSweep(
            "repetitions must be at least 1".to_string(),
        ));
    }

    let step = step.to_real();
    if step == 0.0 {
        return Err(StmError::InvalidSweep(
            "cannot count images with a zero voltage step".to_string(),
        ));
    }

    let per_repetition = ((start.to_real() - stop.to_real()) / step).abs().trunc();
    if !per_repetition.is_finite() {
        return Err(StmError::InvalidValue(format!(
            "voltage step {step} is too small for the range {start} to {stop}"
        )));
    }

    Ok((per_repetition as u64).saturating_mul(u64::from(repetitions)))
}

/// Estimated wall-clock time for `image_count` frames.
///
/// `2 × line_time × lines_per_frame × image_count`, truncated to whole
/// seconds. Negative inputs estimate zero.
pub fn estimated_duration(
    line_time: ScaledDecimal,
    lines_per_frame: u32,
    image_count: u64,
) -> EstimatedDuration {
    let total = 2.0 * line_time.to_real() * f64::from(lines_per_frame) * image_count as f64;
    EstimatedDuration::from_secs(total.max(0.0) as u64)
}

/// Time needed for one spectrum: voltage points × delay time.
pub fn spectroscopy_duration(options: &SpectroscopyOptions) -> AppResult<Duration> {
    let points = options.point_count()?;
    let seconds = points as f64 * options.delay_time.to_real();
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| StmError::InvalidValue(format!("spectroscopy duration {seconds}s: {e}")))
}

/// Whole-second duration split into display units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EstimatedDuration {
    /// Whole days.
    pub days: u64,
    /// Hours, 0 to 23.
    pub hours: u64,
    /// Minutes, 0 to 59.
    pub minutes: u64,
    /// Seconds, 0 to 59.
    pub seconds: u64,
}

impl EstimatedDuration {
    /// Decompose a whole number of seconds.
    pub fn from_secs(total: u64) -> Self {
        Self {
            days: total / SECONDS_PER_DAY,
            hours: total % SECONDS_PER_DAY / SECONDS_PER_HOUR,
            minutes: total % SECONDS_PER_HOUR / SECONDS_PER_MINUTE,
            seconds: total % SECONDS_PER_MINUTE,
        }
    }

    /// Recombined total in seconds.
    pub fn total_seconds(&self) -> u64 {
        self.days * SECONDS_PER_DAY
            + self.hours * SECONDS_PER_HOUR
            + self.minutes * SECONDS_PER_MINUTE
            + self.seconds
    }

    /// As a standard duration.
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.total_seconds())
    }
}

impl fmt::Display for EstimatedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days > 0 {
            write!(f, "{}d ", self.days)?;
        }
        write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
    }
}

/// Image count and duration for a specification's voltage loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleEstimate {
    /// Images across all repetitions.
    pub image_count: u64,
    /// Time to acquire them.
    pub duration: EstimatedDuration,
}

impl fmt::Display for ScheduleEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total images: {}, Time to finish: {}",
            self.image_count, self.duration
        )
    }
}

/// Estimate a specification from its voltage loop and frame timing.
///
/// A one-point loop (`start_voltage == stop_voltage`) estimates zero images,
/// even with a zero step, so every specification that passes
/// [`SweepSpecification::validate`] can be estimated.
pub fn estimate(spec: &SweepSpecification) -> AppResult<ScheduleEstimate> {
    let image_count = if spec.start_voltage == spec.stop_voltage && spec.repetitions > 0 {
        0
    } else {
        total_image_count(
            spec.start_voltage,
            spec.stop_voltage,
            spec.step_voltage,
            spec.repetitions,
        )?
    };
    Ok(ScheduleEstimate {
        image_count,
        duration: estimated_duration(spec.line_time, spec.lines_per_frame, image_count),
    })
}
