//! Shared task queue
//!
//! The task list is computed once and never changes; worker loops claim the
//! next index through an atomic cursor, so no task is handed out twice and
//! no lock is held while a task runs.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::app::models::DownloadTask;

#[derive(Debug)]
pub struct TaskQueue {
    tasks: Vec<DownloadTask>,
    cursor: AtomicUsize,
}

impl TaskQueue {
    pub fn new(tasks: Vec<DownloadTask>) -> Self {
        Self {
            tasks,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next unclaimed task
    pub fn claim(&self) -> Option<(usize, &DownloadTask)> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.tasks.get(index).map(|task| (index, task))
    }

    /// Number of tasks handed out so far
    pub fn claimed(&self) -> usize {
        self.cursor.load(Ordering::Relaxed).min(self.tasks.len())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[DownloadTask] {
        &self.tasks
    }
}
