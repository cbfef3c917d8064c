//! Mock executor for running task sets without a microscope.
//!
//! Stands in for the external acquisition loop: it drives a task set through
//! the same two calls a real executor uses (`set_status` and
//! `mark_item_completed`) with simulated per-item timing.
//! Uses `tokio::time::sleep`, never `std::thread::sleep`.

use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::error::AppResult;
use crate::task_list::TaskList;
use crate::task_set::{TaskSet, TaskSetStatus};

/// Simulated executor with fixed per-item timing and optional failure injection.
///
/// # Example
///
/// ```rust,ignore
/// let executor = MockExecutor::new(Duration::from_millis(10));
/// let status = executor.run(&mut task_set).await?;
/// assert_eq!(status, TaskSetStatus::Finished);
/// ```
#[derive(Debug, Clone)]
pub struct MockExecutor {
    item_time: Duration,
    fail_at_item: Option<usize>,
}

impl MockExecutor {
    /// Executor that completes every item after `item_time`
    pub fn new(item_time: Duration) -> Self {
        Self {
            item_time,
            fail_at_item: None,
        }
    }

    /// Report an unrecoverable failure when reaching item `index`
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at_item = Some(index);
        self
    }

    /// Executor configured from the `[simulation]` section
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            item_time: config.item_time(),
            fail_at_item: config.fail_at_item,
        }
    }

    /// Run every item of `task_set` in order and return its final status.
    ///
    /// The set must be `Ready`. Items before the injected failure stay
    /// completed; the failing item and everything after it do not.
    pub async fn run(&self, task_set: &mut TaskSet) -> AppResult<TaskSetStatus> {
        task_set.set_status(TaskSetStatus::Working)?;

        for index in 0..task_set.len() {
            if self.fail_at_item == Some(index) {
                warn!(task = %task_set.name(), item = index, "Simulated acquisition failure");
                task_set.set_status(TaskSetStatus::Error)?;
                return Ok(task_set.status());
            }

            sleep(self.item_time).await;
            task_set.mark_item_completed(index)?;
            debug!(
                task = %task_set.name(),
                item = index,
                progress = task_set.progress_fraction(),
                "Work item completed"
            );
        }

        task_set.set_status(TaskSetStatus::Finished)?;
        Ok(task_set.status())
    }

    /// Run every `Ready` task set of `list` in queue order.
    ///
    /// Returns `(index, final status)` for each set that was run.
    pub async fn run_all(&self, list: &mut TaskList) -> AppResult<Vec<(usize, TaskSetStatus)>> {
        let mut outcomes = Vec::new();
        while let Some(index) = list.next_ready() {
            let status = self.run(list.get_mut(index)?).await?;
            info!(index, %status, "Task set run complete");
            outcomes.push((index, status));
        }
        Ok(outcomes)
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StmError;
    use crate::plan::{SweepParameter, SweepSpecification};
    use crate::quantity::ScaledDecimal;

    fn bias_set() -> TaskSet {
        let v = |x| ScaledDecimal::from_real(x).unwrap();
        let spec = SweepSpecification::new("bias").with_sweep(
            SweepParameter::Bias,
            v(-1.0),
            v(1.0),
            v(0.5),
        );
        TaskSet::new(spec, 0).unwrap()
    }

    #[tokio::test]
    async fn test_run_to_finished() {
        let mut set = bias_set();
        let status = MockExecutor::new(Duration::from_millis(1))
            .run(&mut set)
            .await
            .unwrap();
        assert_eq!(status, TaskSetStatus::Finished);
        assert_eq!(set.progress_fraction(), 1.0);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mut set = bias_set();
        let status = MockExecutor::new(Duration::ZERO)
            .failing_at(2)
            .run(&mut set)
            .await
            .unwrap();
        assert_eq!(status, TaskSetStatus::Error);
        assert_eq!(set.completed_count(), 2);
        assert!((set.progress_fraction() - 0.4).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_rerun_rejected() {
        let mut set = bias_set();
        let executor = MockExecutor::new(Duration::ZERO);
        executor.run(&mut set).await.unwrap();
        assert!(matches!(
            executor.run(&mut set).await,
            Err(StmError::InvalidTransition { .. })
        ));
        assert_eq!(set.status(), TaskSetStatus::Finished);
    }

    #[tokio::test]
    async fn test_run_all_skips_non_ready() {
        let mut list = TaskList::new();
        list.add(SweepSpecification::new("a")).unwrap();
        list.add(SweepSpecification::new("b")).unwrap();
        list.get_mut(0)
            .unwrap()
            .set_status(TaskSetStatus::Error)
            .unwrap();

        let outcomes = MockExecutor::new(Duration::ZERO)
            .run_all(&mut list)
            .await
            .unwrap();
        assert_eq!(outcomes, vec![(1, TaskSetStatus::Finished)]);
        assert_eq!(list.next_ready(), None);
    }

    #[test]
    fn test_from_config() {
        let config = SimulationConfig {
            item_time_ms: 7,
            fail_at_item: Some(1),
        };
        let executor = MockExecutor::from_config(&config);
        assert_eq!(executor.item_time, Duration::from_millis(7));
        assert_eq!(executor.fail_at_item, Some(1));
    }
}
