//! Sweep specifications: the declarative description of one batch.
//!
//! A [`SweepSpecification`] is created once per "add task" action and then
//! snapshotted by the task set that expands it. It carries the base imaging
//! parameters, the outer voltage-step loop used for schedule estimates, an
//! optional swept axis (bias or size), and spectroscopy sub-options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, StmError};
use crate::limits::{self, ParameterBounds};
use crate::plan::expander;
use crate::quantity::{ScaledDecimal, Unit};

/// Axis varied across the images of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    /// Single image with the base parameters.
    #[default]
    None,
    /// Tip bias voltage.
    Bias,
    /// Scan size.
    Size,
}

impl SweepParameter {
    /// Physical bounds of the swept field, if any.
    pub fn bounds(self) -> Option<ParameterBounds> {
        match self {
            SweepParameter::None => None,
            SweepParameter::Bias => Some(limits::VOLTAGE.named("bias")),
            SweepParameter::Size => Some(limits::SCAN_SIZE),
        }
    }

    /// Unit of the swept field.
    pub fn unit(self) -> Unit {
        match self {
            SweepParameter::None => Unit::None,
            SweepParameter::Bias => Unit::Volt,
            SweepParameter::Size => Unit::Meter,
        }
    }
}

/// Spectroscopy acquisition mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectroscopyMode {
    /// No spectroscopy.
    #[default]
    None,
    /// Single point at the scan centre.
    Point,
    /// Along a line.
    Line,
    /// Over a region.
    Region,
    /// Every mode.
    All,
}

impl SpectroscopyMode {
    /// Whether this mode acquires a point spectrum.
    pub fn includes_point(self) -> bool {
        matches!(self, SpectroscopyMode::Point | SpectroscopyMode::All)
    }
}

/// Spectroscopy sub-options of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectroscopyOptions {
    /// Acquisition mode.
    pub mode: SpectroscopyMode,
    /// First voltage of the spectrum.
    pub start: ScaledDecimal,
    /// Last voltage of the spectrum.
    pub stop: ScaledDecimal,
    /// Voltage increment.
    pub step: ScaledDecimal,
    /// Settling delay per voltage point.
    pub delay_time: ScaledDecimal,
}

impl Default for SpectroscopyOptions {
    fn default() -> Self {
        Self {
            mode: SpectroscopyMode::None,
            start: ScaledDecimal::literal(-1.0, 0, Unit::Volt),
            stop: ScaledDecimal::literal(1.0, 0, Unit::Volt),
            step: ScaledDecimal::literal(25.0, -3, Unit::Volt),
            delay_time: ScaledDecimal::literal(10.0, -3, Unit::Second),
        }
    }
}

impl SpectroscopyOptions {
    /// Options with the given mode and default voltages.
    pub fn with_mode(mode: SpectroscopyMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Number of voltage points in one spectrum.
    pub fn point_count(&self) -> AppResult<usize> {
        expander::sweep_point_count(
            self.start.to_real(),
            self.stop.to_real(),
            self.step.to_real(),
        )
    }

    fn with_field_units(self) -> Self {
        Self {
            start: self.start.with_unit(Unit::Volt),
            stop: self.stop.with_unit(Unit::Volt),
            step: self.step.with_unit(Unit::Volt),
            delay_time: self.delay_time.with_unit(Unit::Second),
            ..self
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.mode == SpectroscopyMode::None {
            return Ok(());
        }
        limits::VOLTAGE
            .named("spectroscopy.start")
            .check(self.start)?;
        limits::VOLTAGE.named("spectroscopy.stop").check(self.stop)?;
        limits::VOLTAGE.named("spectroscopy.step").check(self.step)?;
        limits::SPECTROSCOPY_DELAY.check(self.delay_time)?;
        self.point_count().map(|_| ())
    }
}

/// Declarative description of one acquisition batch.
///
/// Fields are public so the presentation layer can fill them from its
/// widgets; once handed to a task set the specification is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSpecification {
    /// Operator-given task name.
    pub name: String,
    /// When the batch was specified.
    pub created_at: DateTime<Utc>,
    /// Tip bias.
    pub bias: ScaledDecimal,
    /// Tunnelling current set point.
    pub set_point: ScaledDecimal,
    /// Scan size (square frame edge).
    pub size: ScaledDecimal,
    /// Frame centre, X.
    pub x_offset: ScaledDecimal,
    /// Frame centre, Y.
    pub y_offset: ScaledDecimal,
    /// Tip speed.
    pub scan_speed: ScaledDecimal,
    /// Time for one scan line.
    pub line_time: ScaledDecimal,
    /// Lines per frame (power of two, 8 to 4096).
    pub lines_per_frame: u32,
    /// Outer voltage loop start.
    pub start_voltage: ScaledDecimal,
    /// Outer voltage loop stop.
    pub stop_voltage: ScaledDecimal,
    /// Outer voltage loop step.
    pub step_voltage: ScaledDecimal,
    /// Repetitions of the outer loop (at least 1).
    pub repetitions: u32,
    /// Swept axis.
    pub sweep_parameter: SweepParameter,
    /// First swept value.
    pub sweep_start: ScaledDecimal,
    /// Last swept value (inclusive).
    pub sweep_stop: ScaledDecimal,
    /// Swept value increment.
    pub sweep_step: ScaledDecimal,
    /// Spectroscopy sub-options.
    pub spectroscopy: SpectroscopyOptions,
}

impl Default for SweepSpecification {
    fn default() -> Self {
        Self {
            name: "Untitled task".to_string(),
            created_at: Utc::now(),
            bias: ScaledDecimal::literal(1.0, 0, Unit::Volt),
            set_point: ScaledDecimal::literal(120.0, -12, Unit::Ampere),
            size: ScaledDecimal::literal(100.0, -9, Unit::Meter),
            x_offset: ScaledDecimal::literal(0.0, -9, Unit::Meter),
            y_offset: ScaledDecimal::literal(0.0, -9, Unit::Meter),
            scan_speed: ScaledDecimal::literal(100.0, -9, Unit::MeterPerSecond),
            line_time: ScaledDecimal::literal(1.0, 0, Unit::Second),
            lines_per_frame: 256,
            start_voltage: ScaledDecimal::literal(200.0, -3, Unit::Volt),
            stop_voltage: ScaledDecimal::literal(1.0, 0, Unit::Volt),
            step_voltage: ScaledDecimal::literal(100.0, -3, Unit::Volt),
            repetitions: 1,
            sweep_parameter: SweepParameter::None,
            sweep_start: ScaledDecimal::ZERO,
            sweep_stop: ScaledDecimal::ZERO,
            sweep_step: ScaledDecimal::ZERO,
            spectroscopy: SpectroscopyOptions::default(),
        }
    }
}

impl SweepSpecification {
    /// Panel defaults under the given name, stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sweep `parameter` from `start` to `stop` (inclusive) by `step`.
    pub fn with_sweep(
        mut self,
        parameter: SweepParameter,
        start: ScaledDecimal,
        stop: ScaledDecimal,
        step: ScaledDecimal,
    ) -> Self {
        let unit = parameter.unit();
        self.sweep_parameter = parameter;
        self.sweep_start = start.with_unit(unit);
        self.sweep_stop = stop.with_unit(unit);
        self.sweep_step = step.with_unit(unit);
        self
    }

    /// Set the outer voltage loop.
    pub fn with_voltage_range(
        mut self,
        start: ScaledDecimal,
        stop: ScaledDecimal,
        step: ScaledDecimal,
    ) -> Self {
        self.start_voltage = start.with_unit(Unit::Volt);
        self.stop_voltage = stop.with_unit(Unit::Volt);
        self.step_voltage = step.with_unit(Unit::Volt);
        self
    }

    /// Set the repetition count.
    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Set line time and lines per frame.
    pub fn with_frame(mut self, line_time: ScaledDecimal, lines_per_frame: u32) -> Self {
        self.line_time = line_time.with_unit(Unit::Second);
        self.lines_per_frame = lines_per_frame;
        self
    }

    /// Set the spectroscopy sub-options.
    pub fn with_spectroscopy(mut self, spectroscopy: SpectroscopyOptions) -> Self {
        self.spectroscopy = spectroscopy;
        self
    }

    /// Same specification with every quantity tagged with its field's unit.
    ///
    /// Values deserialized from plain numbers carry no unit, and explicit
    /// parts may carry the wrong one; the field decides.
    pub fn with_field_units(self) -> Self {
        let swept = self.sweep_parameter.unit();
        Self {
            bias: self.bias.with_unit(Unit::Volt),
            set_point: self.set_point.with_unit(Unit::Ampere),
            size: self.size.with_unit(Unit::Meter),
            x_offset: self.x_offset.with_unit(Unit::Meter),
            y_offset: self.y_offset.with_unit(Unit::Meter),
            scan_speed: self.scan_speed.with_unit(Unit::MeterPerSecond),
            line_time: self.line_time.with_unit(Unit::Second),
            start_voltage: self.start_voltage.with_unit(Unit::Volt),
            stop_voltage: self.stop_voltage.with_unit(Unit::Volt),
            step_voltage: self.step_voltage.with_unit(Unit::Volt),
            sweep_start: self.sweep_start.with_unit(swept),
            sweep_stop: self.sweep_stop.with_unit(swept),
            sweep_step: self.sweep_step.with_unit(swept),
            spectroscopy: self.spectroscopy.with_field_units(),
            ..self
        }
    }

    /// Check every invariant and physical bound.
    ///
    /// Range problems (repetitions, zero voltage step) report
    /// [`StmError::InvalidSweep`]; out-of-bounds parameters report
    /// [`StmError::InvalidValue`] naming the field.
    pub fn validate(&self) -> AppResult<()> {
        if self.repetitions < 1 {
            return Err(StmError::InvalidSweep(
                "repetitions must be at least 1".to_string(),
            ));
        }

        limits::VOLTAGE.named("bias").check(self.bias)?;
        limits::SET_POINT.check(self.set_point)?;
        limits::SCAN_SIZE.check(self.size)?;
        limits::X_OFFSET.check(self.x_offset)?;
        limits::Y_OFFSET.check(self.y_offset)?;
        limits::SCAN_SPEED.check(self.scan_speed)?;
        limits::LINE_TIME.check(self.line_time)?;
        limits::check_lines_per_frame(self.lines_per_frame)?;

        limits::VOLTAGE
            .named("start_voltage")
            .check(self.start_voltage)?;
        limits::VOLTAGE.named("stop_voltage").check(self.stop_voltage)?;
        limits::VOLTAGE.named("step_voltage").check(self.step_voltage)?;
        if self.step_voltage.to_real() == 0.0 && self.start_voltage != self.stop_voltage {
            return Err(StmError::InvalidSweep(format!(
                "step_voltage is zero but start_voltage {} differs from stop_voltage {}",
                self.start_voltage, self.stop_voltage
            )));
        }

        if let Some(bounds) = self.sweep_parameter.bounds() {
            bounds.named("sweep_start").check(self.sweep_start)?;
            bounds.named("sweep_stop").check(self.sweep_stop)?;
        }

        self.spectroscopy.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64) -> ScaledDecimal {
        ScaledDecimal::from_real(x).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let spec = SweepSpecification::new("defaults");
        assert_eq!(spec.name, "defaults");
        assert_eq!(spec.lines_per_frame, 256);
        assert_eq!(spec.size.to_string(), "100 nm");
        assert_eq!(spec.set_point.to_string(), "120 pA");
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_zero_repetitions_rejected() {
        let spec = SweepSpecification::new("r").with_repetitions(0);
        assert!(matches!(spec.validate(), Err(StmError::InvalidSweep(_))));
    }

    #[test]
    fn test_zero_voltage_step_rejected_only_for_distinct_endpoints() {
        let spec = SweepSpecification::new("s").with_voltage_range(v(0.2), v(1.0), v(0.0));
        assert!(matches!(spec.validate(), Err(StmError::InvalidSweep(_))));

        let spec = SweepSpecification::new("s").with_voltage_range(v(0.5), v(0.5), v(0.0));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_out_of_bounds_names_field() {
        let mut spec = SweepSpecification::new("b");
        spec.size = v(1e-3);
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, StmError::InvalidValue(_)));
        assert!(err.to_string().contains("size"));

        let spec = SweepSpecification::new("b").with_sweep(
            SweepParameter::Bias,
            v(-6.0),
            v(1.0),
            v(0.5),
        );
        assert!(spec.validate().unwrap_err().to_string().contains("sweep_start"));
    }

    #[test]
    fn test_spectroscopy_checked_only_when_enabled() {
        let mut options = SpectroscopyOptions::default();
        options.delay_time = v(5.0);
        let spec = SweepSpecification::new("sts").with_spectroscopy(options.clone());
        assert!(spec.validate().is_ok());

        options.mode = SpectroscopyMode::Point;
        let spec = SweepSpecification::new("sts").with_spectroscopy(options);
        assert!(spec.validate().unwrap_err().to_string().contains("delay_time"));
    }

    #[test]
    fn test_spectroscopy_point_count() {
        let options = SpectroscopyOptions::with_mode(SpectroscopyMode::Point);
        assert_eq!(options.point_count().unwrap(), 81);
        assert!(options.mode.includes_point());
        assert!(!SpectroscopyMode::Line.includes_point());
    }

    #[test]
    fn test_field_units_override_parsed_units() {
        let mut spec = SweepSpecification::new("parsed");
        spec.bias = v(0.5);
        spec.line_time = v(0.5);
        spec.size = v(2e-7).with_unit(Unit::Volt);
        spec.spectroscopy.delay_time = v(0.02);

        let spec = spec.with_field_units();
        assert_eq!(spec.bias.to_string(), "500 mV");
        assert_eq!(spec.line_time.to_string(), "500 ms");
        assert_eq!(spec.size.to_string(), "200 nm");
        assert_eq!(spec.spectroscopy.delay_time.to_string(), "20 ms");
        assert_eq!(spec.sweep_start.unit(), Unit::None);
    }

    #[test]
    fn test_with_sweep_tags_units() {
        let spec = SweepSpecification::new("u").with_sweep(
            SweepParameter::Size,
            v(50e-9),
            v(150e-9),
            v(50e-9),
        );
        assert_eq!(spec.sweep_start.unit(), Unit::Meter);
        assert_eq!(spec.sweep_stop.to_string(), "150 nm");
    }
}
