//! Ordered collection of task sets, as queued by the operator.

use tracing::info;

use crate::error::{AppResult, StmError};
use crate::plan::SweepSpecification;
use crate::task_set::{TaskSet, TaskSetStatus};

/// Task sets in queue order. Each set's index equals its position.
#[derive(Debug, Default)]
pub struct TaskList {
    sets: Vec<TaskSet>,
}

impl TaskList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand `specification` and append the resulting task set.
    ///
    /// Nothing is appended if expansion fails.
    pub fn add(&mut self, specification: SweepSpecification) -> AppResult<&TaskSet> {
        let index = self.sets.len();
        let set = TaskSet::new(specification, index)?;
        info!(task = %set.name(), index, items = set.len(), "Task set added");
        self.sets.push(set);
        Ok(&self.sets[index])
    }

    /// Remove the task set at `index` and renumber those after it.
    pub fn remove(&mut self, index: usize) -> AppResult<TaskSet> {
        if index >= self.sets.len() {
            return Err(StmError::TaskSetNotFound(index));
        }
        let removed = self.sets.remove(index);
        for (position, set) in self.sets.iter_mut().enumerate().skip(index) {
            set.set_index(position);
        }
        info!(task = %removed.name(), index, "Task set removed");
        Ok(removed)
    }

    /// Task set at `index`
    pub fn get(&self, index: usize) -> AppResult<&TaskSet> {
        self.sets.get(index).ok_or(StmError::TaskSetNotFound(index))
    }

    /// Mutable task set at `index`
    pub fn get_mut(&mut self, index: usize) -> AppResult<&mut TaskSet> {
        self.sets
            .get_mut(index)
            .ok_or(StmError::TaskSetNotFound(index))
    }

    /// Iterate in queue order
    pub fn iter(&self) -> impl Iterator<Item = &TaskSet> {
        self.sets.iter()
    }

    /// Number of task sets
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no task set is queued
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Index of the first set still `Ready`, if any.
    pub fn next_ready(&self) -> Option<usize> {
        self.sets
            .iter()
            .position(|set| set.status() == TaskSetStatus::Ready)
    }

    /// Total work items across all sets
    pub fn total_items(&self) -> usize {
        self.sets.iter().map(TaskSet::len).sum()
    }

    /// Completed work items across all sets
    pub fn completed_items(&self) -> usize {
        self.sets.iter().map(TaskSet::completed_count).sum()
    }

    /// Item-weighted progress across all sets, 0 when there are no items.
    pub fn overall_progress(&self) -> f64 {
        let total = self.total_items();
        if total == 0 {
            return 0.0;
        }
        self.completed_items() as f64 / total as f64
    }
}
