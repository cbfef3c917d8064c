//! Task sets: one expanded batch plus its status and progress.
//!
//! A [`TaskSet`] snapshots a [`SweepSpecification`], expands it once, and
//! then tracks execution. The external executor drives it through two calls:
//! [`TaskSet::set_status`] and [`TaskSet::mark_item_completed`]. Progress is
//! derived on demand from the items' completion flags.
//!
//! # Status lifecycle
//!
//! ```text
//! Ready ──► Working ──► Finished
//!   │          │
//!   └──────────┴──────► Error
//! ```
//!
//! `Finished` and `Error` are terminal. Any transition not drawn above is
//! rejected with [`StmError::InvalidTransition`] and leaves the status
//! unchanged. Completion never implies `Finished`; the executor must set it.
//!
//! Callers serialize access: a task set is plain owned data with no internal
//! locking.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppResult, StmError};
use crate::plan::{expand, SweepParameter, SweepSpecification, WorkItem};
use crate::schedule::{estimated_duration, EstimatedDuration};

/// Lifecycle state of a task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskSetStatus {
    /// Created, nothing started.
    #[default]
    Ready,
    /// Executor is consuming work items.
    Working,
    /// Executor reported every item done.
    Finished,
    /// Executor reported an unrecoverable failure.
    Error,
}

impl TaskSetStatus {
    /// Whether no further transition is allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskSetStatus::Finished | TaskSetStatus::Error)
    }

    /// Transition table.
    pub fn can_transition_to(self, next: TaskSetStatus) -> bool {
        use TaskSetStatus::*;
        matches!(
            (self, next),
            (Ready, Working) | (Ready, Error) | (Working, Finished) | (Working, Error)
        )
    }
}

impl fmt::Display for TaskSetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskSetStatus::Ready => "Ready",
            TaskSetStatus::Working => "Working",
            TaskSetStatus::Finished => "Finished",
            TaskSetStatus::Error => "Error",
        };
        f.write_str(name)
    }
}

/// One expanded batch with its status and per-item completion.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSet {
    id: Uuid,
    specification: SweepSpecification,
    items: Vec<WorkItem>,
    status: TaskSetStatus,
    index: usize,
}

impl TaskSet {
    /// Expand `specification` into a new task set in `Ready` status.
    ///
    /// The snapshot has every quantity tagged with its field's unit. Fails
    /// without creating anything if expansion fails.
    pub fn new(specification: SweepSpecification, index: usize) -> AppResult<Self> {
        let specification = specification.with_field_units();
        let items = expand(&specification)?;
        Ok(Self {
            id: Uuid::new_v4(),
            specification,
            items,
            status: TaskSetStatus::Ready,
            index,
        })
    }

    /// Unique identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Task name from the specification.
    pub fn name(&self) -> &str {
        &self.specification.name
    }

    /// The specification this set was expanded from.
    pub fn specification(&self) -> &SweepSpecification {
        &self.specification
    }

    /// Work items in expansion order.
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Current status.
    pub fn status(&self) -> TaskSetStatus {
        self.status
    }

    /// Position hint within the owning task list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Update the position hint after the owning list changes.
    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Number of work items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set holds no work items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items reported completed.
    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_completed()).count()
    }

    /// Fraction of items completed, in `[0, 1]`. An empty set is 0% complete.
    pub fn progress_fraction(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.items.len() as f64
    }

    /// Move to `next` if the transition table allows it.
    pub fn set_status(&mut self, next: TaskSetStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            warn!(
                id = %self.id,
                task = %self.specification.name,
                from = %self.status,
                to = %next,
                "Rejected task set status transition"
            );
            return Err(StmError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        info!(
            id = %self.id,
            task = %self.specification.name,
            from = %self.status,
            to = %next,
            "Task set status changed"
        );
        self.status = next;
        Ok(())
    }

    /// Record that the item at `index` finished. Only accepted while `Working`.
    ///
    /// Marking an already-completed item again is a no-op.
    pub fn mark_item_completed(&mut self, index: usize) -> AppResult<()> {
        let len = self.items.len();
        if self.status != TaskSetStatus::Working {
            return Err(StmError::InvalidState {
                status: self.status,
                operation: "complete work items",
            });
        }
        let item = self
            .items
            .get_mut(index)
            .ok_or(StmError::ItemOutOfRange { index, len })?;
        item.mark_completed();
        Ok(())
    }

    /// Estimated time for the items not yet completed.
    ///
    /// Charges one frame per incomplete work item. Repetitions are not
    /// applied, matching the expansion; the voltage-loop figure is
    /// [`estimate`](crate::schedule::estimate).
    pub fn remaining_duration(&self) -> EstimatedDuration {
        let remaining = (self.items.len() - self.completed_count()) as u64;
        estimated_duration(
            self.specification.line_time,
            self.specification.lines_per_frame,
            remaining,
        )
    }

    /// Display model of the set's parameters and progress.
    pub fn summary(&self) -> TaskSetSummary {
        let spec = &self.specification;
        let swept = |parameter: SweepParameter, text: String| {
            if spec.sweep_parameter == parameter {
                "-".to_string()
            } else {
                text
            }
        };

        TaskSetSummary {
            id: self.id,
            name: spec.name.clone(),
            status: self.status,
            bias: swept(SweepParameter::Bias, spec.bias.to_string()),
            set_point: spec.set_point.to_string(),
            size: swept(SweepParameter::Size, spec.size.to_string()),
            position: format!("({}, {})", spec.x_offset, spec.y_offset),
            line_time: spec.line_time.to_string(),
            lines_per_frame: spec.lines_per_frame,
            repetitions: spec.repetitions,
            total_tasks: self.items.len(),
            completed_tasks: self.completed_count(),
            time_remaining: self.remaining_duration(),
            item_labels: self
                .items
                .iter()
                .map(|item| item.label(spec.sweep_parameter))
                .collect(),
        }
    }
}

/// Text shown in a task set's expanded info panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSetSummary {
    /// Identifier of the summarized task set.
    pub id: Uuid,
    /// Task name.
    pub name: String,
    /// Current status.
    pub status: TaskSetStatus,
    /// Bias, or `-` when swept.
    pub bias: String,
    /// Set point.
    pub set_point: String,
    /// Size, or `-` when swept.
    pub size: String,
    /// Frame centre.
    pub position: String,
    /// Line time.
    pub line_time: String,
    /// Lines per frame.
    pub lines_per_frame: u32,
    /// Repetitions.
    pub repetitions: u32,
    /// Number of work items.
    pub total_tasks: usize,
    /// Number completed.
    pub completed_tasks: usize,
    /// Estimate for the remaining items.
    pub time_remaining: EstimatedDuration,
    /// One label per work item.
    pub item_labels: Vec<String>,
}

impl fmt::Display for TaskSetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}]", self.name, self.status)?;
        writeln!(f, "  Bias: {}    Set point: {}", self.bias, self.set_point)?;
        writeln!(f, "  Size: {}    Position: {}", self.size, self.position)?;
        writeln!(
            f,
            "  Line time: {}    Lines per frame: {}",
            self.line_time, self.lines_per_frame
        )?;
        writeln!(f, "  Repetitions: {}", self.repetitions)?;
        writeln!(
            f,
            "  Total Tasks: {} ({} done)",
            self.total_tasks, self.completed_tasks
        )?;
        write!(f, "  Time remaining: {}", self.time_remaining)?;
        for label in &self.item_labels {
            write!(f, "\n    - {label}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::ScaledDecimal;
    use tracing_test::traced_test;

    fn v(x: f64) -> ScaledDecimal {
        ScaledDecimal::from_real(x).unwrap()
    }

    fn bias_sweep() -> TaskSet {
        let spec = SweepSpecification::new("bias").with_sweep(
            SweepParameter::Bias,
            v(-1.0),
            v(1.0),
            v(0.5),
        );
        TaskSet::new(spec, 0).unwrap()
    }

    #[test]
    fn test_new_task_set_is_ready() {
        let set = bias_sweep();
        assert_eq!(set.status(), TaskSetStatus::Ready);
        assert_eq!(set.len(), 5);
        assert_eq!(set.progress_fraction(), 0.0);
        assert_eq!(set.name(), "bias");
    }

    #[test]
    fn test_empty_progress_is_zero() {
        let mut set = bias_sweep();
        set.items.clear();
        assert!(set.is_empty());
        assert_eq!(set.progress_fraction(), 0.0);
        assert_eq!(set.remaining_duration().total_seconds(), 0);
    }

    #[test]
    fn test_transition_table() {
        use TaskSetStatus::*;
        let all = [Ready, Working, Finished, Error];
        let allowed = [
            (Ready, Working),
            (Ready, Error),
            (Working, Finished),
            (Working, Error),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
        assert!(Finished.is_terminal());
        assert!(Error.is_terminal());
        assert!(!Working.is_terminal());
    }

    #[test]
    fn test_terminal_state_rejects_transitions() {
        let mut set = bias_sweep();
        set.set_status(TaskSetStatus::Working).unwrap();
        set.set_status(TaskSetStatus::Finished).unwrap();

        let err = set.set_status(TaskSetStatus::Working).unwrap_err();
        assert_eq!(
            err,
            StmError::InvalidTransition {
                from: TaskSetStatus::Finished,
                to: TaskSetStatus::Working,
            }
        );
        assert_eq!(set.status(), TaskSetStatus::Finished);
    }

    #[test]
    fn test_progress_follows_completion() {
        let mut set = bias_sweep();
        set.set_status(TaskSetStatus::Working).unwrap();
        set.mark_item_completed(0).unwrap();
        set.mark_item_completed(3).unwrap();
        set.mark_item_completed(3).unwrap();
        assert_eq!(set.completed_count(), 2);
        assert!((set.progress_fraction() - 0.4).abs() < 1e-12);

        for i in 0..set.len() {
            set.mark_item_completed(i).unwrap();
        }
        assert_eq!(set.progress_fraction(), 1.0);
        // completion alone does not finish the set
        assert_eq!(set.status(), TaskSetStatus::Working);
    }

    #[test]
    fn test_mark_item_errors() {
        let mut set = bias_sweep();
        assert!(matches!(
            set.mark_item_completed(0),
            Err(StmError::InvalidState { .. })
        ));

        set.set_status(TaskSetStatus::Working).unwrap();
        assert_eq!(
            set.mark_item_completed(5),
            Err(StmError::ItemOutOfRange { index: 5, len: 5 })
        );
        assert_eq!(set.completed_count(), 0);
    }

    #[test]
    fn test_remaining_duration_shrinks() {
        let mut set = bias_sweep();
        assert_eq!(set.remaining_duration().total_seconds(), 5 * 512);
        set.set_status(TaskSetStatus::Working).unwrap();
        set.mark_item_completed(0).unwrap();
        assert_eq!(set.remaining_duration().total_seconds(), 4 * 512);
    }

    #[test]
    fn test_summary_hides_swept_field() {
        let set = bias_sweep();
        let summary = set.summary();
        assert_eq!(summary.bias, "-");
        assert_eq!(summary.size, "100 nm");
        assert_eq!(summary.total_tasks, 5);
        assert_eq!(summary.item_labels[0], "Bias: -1 V");
        assert_eq!(summary.item_labels[2], "Bias: 0 V");

        let text = summary.to_string();
        assert!(text.starts_with("bias [Ready]"));
        assert!(text.contains("Total Tasks: 5 (0 done)"));
        assert!(text.contains("Time remaining: 0h 42m 40s"));
    }

    #[test]
    fn test_summary_uses_field_units() {
        let mut spec = SweepSpecification::new("plain numbers");
        spec.bias = v(0.5);
        spec.line_time = v(0.5);
        spec.set_point = v(1e-10);
        spec.size = v(2e-7).with_unit(crate::quantity::Unit::Volt);

        let set = TaskSet::new(spec, 0).unwrap();
        let summary = set.summary();
        assert_eq!(summary.id, set.id());
        assert_eq!(summary.bias, "500 mV");
        assert_eq!(summary.line_time, "500 ms");
        assert_eq!(summary.set_point, "100 pA");
        assert_eq!(summary.size, "200 nm");
    }

    #[test]
    fn test_remaining_duration_ignores_repetitions() {
        let spec = SweepSpecification::new("reps")
            .with_sweep(SweepParameter::Bias, v(-1.0), v(1.0), v(0.5))
            .with_repetitions(3);
        let set = TaskSet::new(spec, 0).unwrap();
        assert_eq!(set.remaining_duration().total_seconds(), 5 * 512);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(bias_sweep().id(), bias_sweep().id());
    }

    #[test]
    #[traced_test]
    fn test_transitions_are_logged() {
        let mut set = bias_sweep();
        set.set_status(TaskSetStatus::Working).unwrap();
        assert!(logs_contain("Task set status changed"));

        set.set_status(TaskSetStatus::Ready).unwrap_err();
        assert!(logs_contain("Rejected task set status transition"));
    }

    #[test]
    fn test_set_index() {
        let mut set = bias_sweep();
        set.set_index(4);
        assert_eq!(set.index(), 4);
    }

    #[test]
    fn test_failed_expansion_creates_nothing() {
        let spec = SweepSpecification::new("broken").with_sweep(
            SweepParameter::Bias,
            v(-1.0),
            v(1.0),
            ScaledDecimal::ZERO,
        );
        assert!(matches!(
            TaskSet::new(spec, 0),
            Err(StmError::InvalidSweep(_))
        ));
    }
}
