//! Sweep expansion: specification in, ordered work items out.
//!
//! Swept values are generated by index (`start + i * step`) over a count
//! computed up front, never by repeated addition, so long sweeps do not
//! drift past their stop value. A small relative tolerance absorbs quotients
//! such as `0.3 / 0.1 = 2.9999999999999996` so the stop value is included.

use tracing::debug;

use crate::error::{AppResult, StmError};
use crate::limits::MAX_SWEEP_POINTS;
use crate::plan::sweep::{SweepParameter, SweepSpecification};
use crate::plan::work_item::{ImageScan, PointSpectroscopy, WorkItem, WorkItemKind};
use crate::quantity::ScaledDecimal;

/// Slack, in steps, allowed when deciding whether the stop value is reached.
const RANGE_TOLERANCE: f64 = 1e-9;

/// Number of values in the inclusive range `[start, stop]` stepped by `step`.
///
/// Equals `floor((stop - start) / step) + 1`. A zero step is accepted only
/// when `start == stop` (one value).
pub fn sweep_point_count(start: f64, stop: f64, step: f64) -> AppResult<usize> {
    if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
        return Err(StmError::InvalidValue(format!(
            "sweep bounds must be finite (start {start}, stop {stop}, step {step})"
        )));
    }

    if step == 0.0 {
        if start == stop {
            return Ok(1);
        }
        return Err(StmError::InvalidSweep(format!(
            "step is zero but start {start} differs from stop {stop}"
        )));
    }

    let span = (stop - start) / step;
    if !span.is_finite() {
        return Err(StmError::InvalidSweep(format!(
            "step {step} is too small for the range {start} to {stop}"
        )));
    }
    if span < -RANGE_TOLERANCE {
        return Err(StmError::InvalidSweep(format!(
            "step {step} moves away from stop {stop} (start {start})"
        )));
    }

    let steps = (span + RANGE_TOLERANCE).floor().max(0.0);
    if steps >= MAX_SWEEP_POINTS as f64 {
        return Err(StmError::InvalidSweep(format!(
            "sweep from {start} to {stop} by {step} exceeds {MAX_SWEEP_POINTS} points"
        )));
    }

    Ok(steps as usize + 1)
}

/// Values of the inclusive range `[start, stop]` stepped by `step`, in order.
///
/// The i-th value is `start + i * step`; the last one is clamped so it never
/// overshoots `stop`.
pub fn sweep_values(start: f64, stop: f64, step: f64) -> AppResult<Vec<f64>> {
    let count = sweep_point_count(start, stop, step)?;

    Ok((0..count)
        .map(|i| {
            let value = start + i as f64 * step;
            if step > 0.0 {
                value.min(stop)
            } else if step < 0.0 {
                value.max(stop)
            } else {
                value
            }
        })
        .collect())
}

/// Expand a specification into its ordered work items.
///
/// Without a swept axis this yields exactly one image. With a bias or size
/// sweep it yields one image per swept value, each a copy of the base image
/// with that field replaced. Repetitions are not applied here; they only
/// scale the schedule estimate.
///
/// Nothing is returned on failure: invalid specifications report
/// [`StmError::InvalidValue`] or [`StmError::InvalidSweep`].
pub fn expand(spec: &SweepSpecification) -> AppResult<Vec<WorkItem>> {
    spec.validate()?;

    let base = ImageScan::from_specification(spec);
    let items = match spec.sweep_parameter {
        SweepParameter::None => vec![WorkItem::new(WorkItemKind::Image(base))],
        parameter @ (SweepParameter::Bias | SweepParameter::Size) => sweep_values(
            spec.sweep_start.to_real(),
            spec.sweep_stop.to_real(),
            spec.sweep_step.to_real(),
        )?
        .into_iter()
        .map(|value| {
            let value = ScaledDecimal::from_real(value)?;
            Ok(WorkItem::new(WorkItemKind::Image(
                base.with_swept(parameter, value),
            )))
        })
        .collect::<AppResult<Vec<_>>>()?,
    };

    debug!(
        task = %spec.name,
        sweep = ?spec.sweep_parameter,
        items = items.len(),
        "Expanded sweep specification"
    );

    Ok(items)
}

/// Point-spectroscopy item at the centre of `image`, when its mode asks for one.
pub fn derive_point_spectroscopy(image: &ImageScan) -> Option<WorkItem> {
    image
        .spectroscopy
        .mode
        .includes_point()
        .then(|| WorkItem::new(WorkItemKind::PointSpectroscopy(PointSpectroscopy::at_scan_centre(image))))
}
