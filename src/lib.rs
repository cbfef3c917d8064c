//! Core library for the STM automator.
//!
//! Turns declarative sweep specifications into ordered work items for a
//! scanning tunneling microscope, estimates how long they will take, and
//! tracks each batch's status and progress while an external executor runs
//! it. The library is synchronous and GUI-agnostic; only the mock executor
//! in [`simulator`] is async.
//!
//! - [`quantity`]: scaled decimal values with SI display
//! - [`plan`]: sweep specifications, work items and the expander
//! - [`schedule`]: image-count and duration estimates
//! - [`task_set`] / [`task_list`]: status lifecycle and progress
//! - [`config`]: layered Figment configuration

pub mod config;
pub mod error;
pub mod limits;
pub mod plan;
pub mod quantity;
pub mod schedule;
pub mod simulator;
pub mod task_list;
pub mod task_set;
