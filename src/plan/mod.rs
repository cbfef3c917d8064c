//! Acquisition planning.
//!
//! Turns a declarative [`SweepSpecification`] into the ordered [`WorkItem`]s
//! of one run.
//!
//! - **Sweep specifications**: base imaging parameters plus an optional swept axis
//! - **Work items**: one image scan or one point spectrum, fully parameterized
//! - **Expander**: pure function from specification to work items
//!
//! # Example
//!
//! ```rust
//! use stm_automator::plan::{expand, SweepParameter, SweepSpecification};
//! use stm_automator::quantity::ScaledDecimal;
//!
//! let spec = SweepSpecification::new("bias series").with_sweep(
//!     SweepParameter::Bias,
//!     ScaledDecimal::from_real(-1.0)?,
//!     ScaledDecimal::from_real(1.0)?,
//!     ScaledDecimal::from_real(0.5)?,
//! );
//! let items = expand(&spec)?;
//! assert_eq!(items.len(), 5);
//! # Ok::<(), stm_automator::error::StmError>(())
//! ```

pub mod expander;
pub mod sweep;
pub mod work_item;

pub use expander::{derive_point_spectroscopy, expand, sweep_point_count, sweep_values};
pub use sweep::{SpectroscopyMode, SpectroscopyOptions, SweepParameter, SweepSpecification};
pub use work_item::{ImageScan, PointSpectroscopy, WorkItem, WorkItemKind};
