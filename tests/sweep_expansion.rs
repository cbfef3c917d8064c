//! Expansion and estimation behavior seen from outside the crate.

use proptest::prelude::*;
use stm_automator::error::StmError;
use stm_automator::plan::{expand, SweepParameter, SweepSpecification, WorkItemKind};
use stm_automator::quantity::{ScaledDecimal, Unit};
use stm_automator::schedule::{estimate, estimated_duration, total_image_count};

fn v(x: f64) -> ScaledDecimal {
    ScaledDecimal::from_real(x).unwrap()
}

#[test]
fn bias_sweep_produces_five_ordered_images() {
    let spec = SweepSpecification::new("bias").with_sweep(
        SweepParameter::Bias,
        v(-1.0),
        v(1.0),
        v(0.5),
    );
    let items = expand(&spec).unwrap();

    let biases: Vec<f64> = items
        .iter()
        .map(|item| match item.kind() {
            WorkItemKind::Image(image) => image.bias.to_real(),
            other => panic!("unexpected work item {other:?}"),
        })
        .collect();
    assert_eq!(biases, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    assert!(items.iter().all(|item| !item.is_completed()));
    assert!(items
        .iter()
        .all(|item| item.as_image().unwrap().bias.unit() == Unit::Volt));
}

#[test]
fn zero_step_between_distinct_endpoints_fails() {
    let spec = SweepSpecification::new("zero").with_sweep(
        SweepParameter::Bias,
        v(-1.0),
        v(1.0),
        v(0.0),
    );
    assert!(matches!(expand(&spec), Err(StmError::InvalidSweep(_))));
}

#[test]
fn repetitions_scale_estimate_not_expansion() {
    let spec = SweepSpecification::new("reps")
        .with_sweep(SweepParameter::Bias, v(0.0), v(1.0), v(0.5))
        .with_repetitions(4);

    assert_eq!(expand(&spec).unwrap().len(), 3);
    assert_eq!(estimate(&spec).unwrap().image_count, 32);
}

#[test]
fn image_count_truncates() {
    assert_eq!(total_image_count(v(0.2), v(1.0), v(0.1), 1).unwrap(), 8);
}

#[test]
fn duration_decomposes_4096_seconds() {
    let duration = estimated_duration(v(1.0), 256, 8);
    assert_eq!(duration.total_seconds(), 4096);
    assert_eq!((duration.hours, duration.minutes, duration.seconds), (1, 8, 16));
    assert_eq!(duration.to_string(), "1h 8m 16s");
}

proptest! {
    #[test]
    fn round_trip_over_scan_range(x in 2.5e-12f64..=3e-6f64) {
        let back = ScaledDecimal::from_real(x).unwrap().to_real();
        prop_assert!((back - x).abs() <= 4.0 * f64::EPSILON * x);
    }

    #[test]
    fn clamp_is_idempotent(x in -1e-3f64..1e-3f64) {
        let lower = ScaledDecimal::new(2.5, -12).unwrap();
        let upper = ScaledDecimal::new(3.0, -6).unwrap();
        let once = v(x).clamp_to(lower, upper);
        let twice = once.clamp_to(lower, upper);
        prop_assert_eq!(once, twice);
        prop_assert!(once >= lower && once <= upper);
    }

    #[test]
    fn expansion_stays_within_sweep_bounds(
        start in -4.0f64..4.0,
        span in 0.0f64..1.0,
        step in 0.01f64..0.5,
    ) {
        let stop = (start + span).min(5.0);
        let spec = SweepSpecification::new("prop").with_sweep(
            SweepParameter::Bias,
            v(start),
            v(stop),
            v(step),
        );
        let items = expand(&spec).unwrap();
        prop_assert!(!items.is_empty());
        let biases: Vec<f64> = items.iter().map(|i| i.as_image().unwrap().bias.to_real()).collect();
        prop_assert!(biases.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(biases.iter().all(|b| *b <= stop + 1e-12));
    }
}
