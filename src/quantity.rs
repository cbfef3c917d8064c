//! Scaled decimal quantities for physical parameters.
//!
//! Every operator-facing parameter (bias in volts, scan size in meters, line
//! time in seconds, tunnelling set point in amperes) is carried as a
//! [`ScaledDecimal`]: a mantissa/exponent pair representing
//! `mantissa × 10^exponent`, tagged with a display-only [`Unit`].
//!
//! Values are immutable. Arithmetic resolves both operands to `f64`, computes,
//! and re-normalizes into engineering form (exponent a multiple of three,
//! `1 ≤ |mantissa| < 1000`), so the result renders with an SI prefix.
//!
//! Equality and ordering compare the resolved real value, so `(100, -9)` and
//! `(1, -7)` are equal while their pairs differ.
//!
//! # Example
//!
//! ```rust
//! use stm_automator::quantity::{ScaledDecimal, Unit};
//!
//! let size = ScaledDecimal::new(100.0, -9).unwrap().with_unit(Unit::Meter);
//! assert_eq!(size.to_string(), "100 nm");
//! assert_eq!(size, ScaledDecimal::new(1.0, -7).unwrap());
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{AppResult, StmError};

/// SI prefixes used when rendering normalized values.
const SI_PREFIXES: [(i32, &str); 9] = [
    (-15, "f"),
    (-12, "p"),
    (-9, "n"),
    (-6, "µ"),
    (-3, "m"),
    (0, ""),
    (3, "k"),
    (6, "M"),
    (9, "G"),
];

/// Largest power of ten applied in one multiplication step.
const MAX_SHIFT_STEP: i32 = 300;

/// Physical unit attached to a quantity. Display only; never affects comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Dimensionless.
    #[default]
    None,
    /// Volts (bias, spectroscopy voltages).
    Volt,
    /// Meters (scan size, offsets).
    Meter,
    /// Seconds (line time, delay time).
    Second,
    /// Amperes (tunnelling set point).
    Ampere,
    /// Meters per second (scan speed).
    MeterPerSecond,
}

impl Unit {
    /// Unit symbol as shown next to a value.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::Volt => "V",
            Unit::Meter => "m",
            Unit::Second => "s",
            Unit::Ampere => "A",
            Unit::MeterPerSecond => "m/s",
        }
    }
}

/// Immutable `mantissa × 10^exponent` value with a display unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "ScaledDecimalRepr")]
pub struct ScaledDecimal {
    mantissa: f64,
    exponent: i32,
    unit: Unit,
}

impl ScaledDecimal {
    /// Dimensionless zero.
    pub const ZERO: Self = Self {
        mantissa: 0.0,
        exponent: 0,
        unit: Unit::None,
    };

    /// Compile-time literal. The mantissa must be finite.
    pub(crate) const fn literal(mantissa: f64, exponent: i32, unit: Unit) -> Self {
        Self {
            mantissa,
            exponent,
            unit,
        }
    }

    /// Build from an explicit mantissa/exponent pair, keeping the pair as given.
    ///
    /// Fails with [`StmError::InvalidValue`] if the mantissa is not finite or
    /// the resolved value overflows `f64`.
    pub fn new(mantissa: f64, exponent: i32) -> AppResult<Self> {
        if !mantissa.is_finite() {
            return Err(StmError::InvalidValue(format!(
                "mantissa {mantissa} is not finite"
            )));
        }
        let value = Self {
            mantissa,
            exponent,
            unit: Unit::None,
        };
        if !value.to_real().is_finite() {
            return Err(StmError::InvalidValue(format!(
                "{mantissa}e{exponent} overflows a double"
            )));
        }
        Ok(value)
    }

    /// Normalize a real number into engineering form.
    ///
    /// Fails with [`StmError::InvalidValue`] if `value` is NaN or infinite.
    pub fn from_real(value: f64) -> AppResult<Self> {
        if !value.is_finite() {
            return Err(StmError::InvalidValue(format!("{value} is not finite")));
        }
        let (mantissa, exponent) = normalize(value);
        Ok(Self {
            mantissa,
            exponent,
            unit: Unit::None,
        })
    }

    /// Resolve to a plain real number.
    pub fn to_real(self) -> f64 {
        if self.mantissa == 0.0 {
            return 0.0;
        }
        shift(self.mantissa, self.exponent)
    }

    /// Mantissa as stored.
    pub fn mantissa(self) -> f64 {
        self.mantissa
    }

    /// Power-of-ten exponent as stored.
    pub fn exponent(self) -> i32 {
        self.exponent
    }

    /// Display unit.
    pub fn unit(self) -> Unit {
        self.unit
    }

    /// Same value tagged with another unit.
    pub fn with_unit(self, unit: Unit) -> Self {
        Self { unit, ..self }
    }

    /// Same value in engineering form.
    pub fn normalized(self) -> Self {
        let (mantissa, exponent) = normalize(self.to_real());
        Self {
            mantissa,
            exponent,
            unit: self.unit,
        }
    }

    /// Clamp into `[lower, upper]` by resolved value.
    ///
    /// Bound order does not matter. A value already inside the range is
    /// returned untouched, so clamping is idempotent. The result keeps this
    /// value's unit.
    pub fn clamp_to(self, lower: ScaledDecimal, upper: ScaledDecimal) -> Self {
        let (lo, hi) = if lower <= upper {
            (lower, upper)
        } else {
            (upper, lower)
        };

        if self < lo {
            lo.with_unit(self.unit)
        } else if self > hi {
            hi.with_unit(self.unit)
        } else {
            self
        }
    }

    /// Sum of two values, re-normalized.
    pub fn checked_add(self, other: ScaledDecimal) -> AppResult<Self> {
        Self::from_real(self.to_real() + other.to_real()).map(|v| v.with_unit(self.unit))
    }

    /// Difference of two values, re-normalized.
    pub fn checked_sub(self, other: ScaledDecimal) -> AppResult<Self> {
        Self::from_real(self.to_real() - other.to_real()).map(|v| v.with_unit(self.unit))
    }

    /// Value multiplied by a real factor, re-normalized.
    pub fn scale(self, factor: f64) -> AppResult<Self> {
        Self::from_real(self.to_real() * factor).map(|v| v.with_unit(self.unit))
    }
}

impl Default for ScaledDecimal {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for ScaledDecimal {
    fn eq(&self, other: &Self) -> bool {
        self.to_real() == other.to_real()
    }
}

impl PartialOrd for ScaledDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.to_real().partial_cmp(&other.to_real())
    }
}

impl fmt::Display for ScaledDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut value = self.normalized();
        // rounding to three decimals can carry into the next prefix
        if (value.mantissa * 1000.0).round().abs() >= 1_000_000.0 {
            value.mantissa /= 1000.0;
            value.exponent += 3;
        }
        let mantissa = format_mantissa(value.mantissa);
        let symbol = self.unit.symbol();

        match SI_PREFIXES.iter().find(|(e, _)| *e == value.exponent) {
            Some((_, prefix)) if prefix.is_empty() && symbol.is_empty() => {
                write!(f, "{mantissa}")
            }
            Some((_, prefix)) => write!(f, "{mantissa} {prefix}{symbol}"),
            None if symbol.is_empty() => write!(f, "{mantissa}e{}", value.exponent),
            None => write!(f, "{mantissa}e{} {symbol}", value.exponent),
        }
    }
}

/// Wire form accepted when deserializing: a plain number or explicit parts.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScaledDecimalRepr {
    Real(f64),
    Parts {
        mantissa: f64,
        exponent: i32,
        #[serde(default)]
        unit: Unit,
    },
}

impl TryFrom<ScaledDecimalRepr> for ScaledDecimal {
    type Error = StmError;

    fn try_from(repr: ScaledDecimalRepr) -> Result<Self, Self::Error> {
        match repr {
            ScaledDecimalRepr::Real(value) => Self::from_real(value),
            ScaledDecimalRepr::Parts {
                mantissa,
                exponent,
                unit,
            } => Self::new(mantissa, exponent).map(|v| v.with_unit(unit)),
        }
    }
}

/// Multiply `value` by `10^exponent`, one rounding per 10^300 step.
fn shift(value: f64, exponent: i32) -> f64 {
    let mut value = value;
    let mut remaining = exponent;
    while remaining != 0 {
        let step = remaining.clamp(-MAX_SHIFT_STEP, MAX_SHIFT_STEP);
        value = if step >= 0 {
            value * 10f64.powi(step)
        } else {
            value / 10f64.powi(-step)
        };
        remaining -= step;
    }
    value
}

/// Engineering-form mantissa and exponent for a finite value.
fn normalize(value: f64) -> (f64, i32) {
    if value == 0.0 {
        return (0.0, 0);
    }

    let decade = value.abs().log10().floor() as i32;
    let mut exponent = decade.div_euclid(3) * 3;
    let mut mantissa = shift(value, -exponent);

    // log10 can land one decade off near exact powers of ten
    if mantissa.abs() >= 1000.0 {
        exponent += 3;
        mantissa = shift(value, -exponent);
    } else if mantissa.abs() < 1.0 {
        exponent -= 3;
        mantissa = shift(value, -exponent);
    }

    (mantissa, exponent)
}

fn format_mantissa(mantissa: f64) -> String {
    let text = format!("{mantissa:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
