//! Physical bounds for operator-entered parameters.
//!
//! These mirror the ranges the control panel widgets enforce. Values coming
//! from the panel are clamped into range with [`ParameterBounds::clamp`];
//! values coming from configuration files are checked with
//! [`ParameterBounds::check`] and rejected when outside.

use crate::error::{AppResult, StmError};
use crate::quantity::{ScaledDecimal, Unit};

/// Maximum number of values a single sweep may expand to.
pub const MAX_SWEEP_POINTS: usize = 100_000;

/// Relative slack applied when checking bounds, absorbing one-ulp rounding
/// from mantissa/exponent resolution.
const BOUNDS_TOLERANCE: f64 = 1e-12;

/// Smallest selectable lines-per-frame value (2^3).
pub const MIN_LINES_PER_FRAME: u32 = 8;
/// Largest selectable lines-per-frame value (2^12).
pub const MAX_LINES_PER_FRAME: u32 = 4096;

/// Inclusive range for one physical parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterBounds {
    /// Parameter name used in error messages.
    pub name: &'static str,
    /// Lower bound in base SI units.
    pub lower: f64,
    /// Upper bound in base SI units.
    pub upper: f64,
    /// Unit of the parameter.
    pub unit: Unit,
}

/// Scan size: 2.5 pm to 3 µm.
pub const SCAN_SIZE: ParameterBounds = ParameterBounds {
    name: "size",
    lower: 2.5e-12,
    upper: 3e-6,
    unit: Unit::Meter,
};

/// X offset: ±1.5 µm.
pub const X_OFFSET: ParameterBounds = ParameterBounds {
    name: "x_offset",
    lower: -1.5e-6,
    upper: 1.5e-6,
    unit: Unit::Meter,
};

/// Y offset: ±1.5 µm.
pub const Y_OFFSET: ParameterBounds = ParameterBounds {
    name: "y_offset",
    lower: -1.5e-6,
    upper: 1.5e-6,
    unit: Unit::Meter,
};

/// Scan speed: 2.5 pm/s to 1 µm/s.
pub const SCAN_SPEED: ParameterBounds = ParameterBounds {
    name: "scan_speed",
    lower: 2.5e-12,
    upper: 1e-6,
    unit: Unit::MeterPerSecond,
};

/// Line time: 2.5 ps to 1000 s.
pub const LINE_TIME: ParameterBounds = ParameterBounds {
    name: "line_time",
    lower: 2.5e-12,
    upper: 1000.0,
    unit: Unit::Second,
};

/// Tip bias and every voltage-axis field: ±5 V.
pub const VOLTAGE: ParameterBounds = ParameterBounds {
    name: "voltage",
    lower: -5.0,
    upper: 5.0,
    unit: Unit::Volt,
};

/// Tunnelling set point: ±5 nA.
pub const SET_POINT: ParameterBounds = ParameterBounds {
    name: "set_point",
    lower: -5e-9,
    upper: 5e-9,
    unit: Unit::Ampere,
};

/// Spectroscopy delay time: 5 ms to 1 s.
pub const SPECTROSCOPY_DELAY: ParameterBounds = ParameterBounds {
    name: "delay_time",
    lower: 5e-3,
    upper: 1.0,
    unit: Unit::Second,
};

impl ParameterBounds {
    /// Same bounds reported under another parameter name.
    pub const fn named(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    /// Whether `value` lies inside the bounds.
    pub fn contains(&self, value: ScaledDecimal) -> bool {
        let v = value.to_real();
        let slack = BOUNDS_TOLERANCE * self.lower.abs().max(self.upper.abs());
        v >= self.lower - slack && v <= self.upper + slack
    }

    /// Clamp `value` into the bounds, tagging it with this parameter's unit.
    pub fn clamp(&self, value: ScaledDecimal) -> ScaledDecimal {
        match (
            ScaledDecimal::from_real(self.lower),
            ScaledDecimal::from_real(self.upper),
        ) {
            (Ok(lower), Ok(upper)) => value.clamp_to(lower, upper).with_unit(self.unit),
            // bounds are finite constants
            _ => value.with_unit(self.unit),
        }
    }

    /// Reject `value` with [`StmError::InvalidValue`] when outside the bounds.
    pub fn check(&self, value: ScaledDecimal) -> AppResult<()> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(StmError::InvalidValue(format!(
                "{} = {} is outside [{}, {}] {}",
                self.name,
                value.to_real(),
                self.lower,
                self.upper,
                self.unit.symbol()
            )))
        }
    }
}

/// Validate a lines-per-frame value: a power of two from 8 to 4096.
pub fn check_lines_per_frame(lines: u32) -> AppResult<()> {
    if lines.is_power_of_two() && (MIN_LINES_PER_FRAME..=MAX_LINES_PER_FRAME).contains(&lines) {
        Ok(())
    } else {
        Err(StmError::InvalidValue(format!(
            "lines_per_frame = {lines} must be a power of two between {MIN_LINES_PER_FRAME} and {MAX_LINES_PER_FRAME}"
        )))
    }
}
