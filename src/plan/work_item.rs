//! Work items: the atomic units of acquisition.

use serde::Serialize;

use crate::plan::sweep::{SpectroscopyOptions, SweepParameter, SweepSpecification};
use crate::quantity::{ScaledDecimal, Unit};

/// One fully parameterized image scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageScan {
    /// Tip bias.
    pub bias: ScaledDecimal,
    /// Scan size.
    pub size: ScaledDecimal,
    /// Frame centre, X.
    pub x_offset: ScaledDecimal,
    /// Frame centre, Y.
    pub y_offset: ScaledDecimal,
    /// Tip speed.
    pub scan_speed: ScaledDecimal,
    /// Time for one scan line.
    pub line_time: ScaledDecimal,
    /// Lines per frame.
    pub lines_per_frame: u32,
    /// Tunnelling current set point.
    pub set_point: ScaledDecimal,
    /// Spectroscopy sub-options carried with the scan.
    pub spectroscopy: SpectroscopyOptions,
}

impl ImageScan {
    /// Base image of a specification, every field tagged with its unit.
    pub(crate) fn from_specification(spec: &SweepSpecification) -> Self {
        Self {
            bias: spec.bias.with_unit(Unit::Volt),
            size: spec.size.with_unit(Unit::Meter),
            x_offset: spec.x_offset.with_unit(Unit::Meter),
            y_offset: spec.y_offset.with_unit(Unit::Meter),
            scan_speed: spec.scan_speed.with_unit(Unit::MeterPerSecond),
            line_time: spec.line_time.with_unit(Unit::Second),
            lines_per_frame: spec.lines_per_frame,
            set_point: spec.set_point.with_unit(Unit::Ampere),
            spectroscopy: spec.spectroscopy.clone(),
        }
    }

    /// Copy with the swept field replaced by `value`.
    pub(crate) fn with_swept(&self, parameter: SweepParameter, value: ScaledDecimal) -> Self {
        let value = value.with_unit(parameter.unit());
        let mut image = self.clone();
        match parameter {
            SweepParameter::None => {}
            SweepParameter::Bias => image.bias = value,
            SweepParameter::Size => image.size = value,
        }
        image
    }

    /// Trace plus retrace time for one frame, in seconds.
    pub fn frame_seconds(&self) -> f64 {
        2.0 * self.line_time.to_real() * f64::from(self.lines_per_frame)
    }
}

/// Point spectrum acquired at a fixed tip position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSpectroscopy {
    /// Tip position, X.
    pub x_offset: ScaledDecimal,
    /// Tip position, Y.
    pub y_offset: ScaledDecimal,
    /// Tunnelling current set point held before the spectrum.
    pub set_point: ScaledDecimal,
    /// Voltage range and delay.
    pub spectroscopy: SpectroscopyOptions,
}

impl PointSpectroscopy {
    /// Spectrum at the centre of `image`.
    pub(crate) fn at_scan_centre(image: &ImageScan) -> Self {
        Self {
            x_offset: image.x_offset,
            y_offset: image.y_offset,
            set_point: image.set_point,
            spectroscopy: image.spectroscopy.clone(),
        }
    }
}

/// Kind of acquisition a work item performs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkItemKind {
    /// Topographic image.
    Image(ImageScan),
    /// Point spectrum.
    PointSpectroscopy(PointSpectroscopy),
}

/// Atomic unit of acquisition plus its completion flag.
///
/// Created only by the expander; completion is flipped only by the owning
/// [`TaskSet`](crate::task_set::TaskSet).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkItem {
    kind: WorkItemKind,
    completed: bool,
}

impl WorkItem {
    pub(crate) fn new(kind: WorkItemKind) -> Self {
        Self {
            kind,
            completed: false,
        }
    }

    /// What this item acquires.
    pub fn kind(&self) -> &WorkItemKind {
        &self.kind
    }

    /// The image parameters, if this is an image item.
    pub fn as_image(&self) -> Option<&ImageScan> {
        match &self.kind {
            WorkItemKind::Image(image) => Some(image),
            WorkItemKind::PointSpectroscopy(_) => None,
        }
    }

    /// Whether the executor reported this item done.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
    }

    /// Short label naming the swept value (e.g. `Bias: 200 mV`).
    pub fn label(&self, sweep_parameter: SweepParameter) -> String {
        match (&self.kind, sweep_parameter) {
            (WorkItemKind::Image(image), SweepParameter::Bias) => format!("Bias: {}", image.bias),
            (WorkItemKind::Image(image), SweepParameter::Size) => format!("Size: {}", image.size),
            (WorkItemKind::Image(image), SweepParameter::None) => {
                format!("Image: {} at ({}, {})", image.size, image.x_offset, image.y_offset)
            }
            (WorkItemKind::PointSpectroscopy(point), _) => {
                format!("Spectroscopy: ({}, {})", point.x_offset, point.y_offset)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_image_carries_units() {
        let mut spec = SweepSpecification::new("units");
        spec.bias = ScaledDecimal::from_real(0.5).unwrap();
        let image = ImageScan::from_specification(&spec);
        assert_eq!(image.bias.unit(), Unit::Volt);
        assert_eq!(image.bias.to_string(), "500 mV");
        assert_eq!(image.lines_per_frame, 256);
    }

    #[test]
    fn test_frame_seconds() {
        let spec = SweepSpecification::new("frame");
        let image = ImageScan::from_specification(&spec);
        assert_eq!(image.frame_seconds(), 512.0);
    }

    #[test]
    fn test_labels() {
        let spec = SweepSpecification::new("labels");
        let image = ImageScan::from_specification(&spec);
        let biased = image.with_swept(
            SweepParameter::Bias,
            ScaledDecimal::from_real(0.2).unwrap(),
        );
        let item = WorkItem::new(WorkItemKind::Image(biased));
        assert_eq!(item.label(SweepParameter::Bias), "Bias: 200 mV");
        assert_eq!(item.label(SweepParameter::Size), "Size: 100 nm");
        assert!(!item.is_completed());

        let point = WorkItem::new(WorkItemKind::PointSpectroscopy(
            PointSpectroscopy::at_scan_centre(&image),
        ));
        assert!(point.as_image().is_none());
        assert_eq!(point.label(SweepParameter::Bias), "Spectroscopy: (0 m, 0 m)");
    }
}
