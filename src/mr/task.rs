//! The task record and its state machine.
//!
//! ```text
//! IDLE ──GetTask──▶ IN_PROGRESS ──Report(success)──▶ COMPLETED  [terminal]
//!                     │
//!                     ├──Report(!success)──▶ IDLE
//!                     └──stall > threshold, next GetTask──▶ IDLE
//! ```

use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    InProgress,
    Completed,
}

/// What a task consumes as input. Map tasks read one file; reduce tasks read
/// the `M` intermediate files their bucket appears in across every map task.
#[derive(Debug, Clone)]
pub enum TaskInputs {
    Map(String),
    Reduce(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub state: TaskState,
    /// Meaningful only while `state == InProgress`; stamped on dispatch and
    /// consulted by the stall reaper.
    pub start_time: Option<Instant>,
    pub inputs: TaskInputs,
}

impl TaskRecord {
    pub fn new_map(file: String) -> Self {
        Self {
            state: TaskState::Idle,
            start_time: None,
            inputs: TaskInputs::Map(file),
        }
    }

    pub fn new_reduce() -> Self {
        Self {
            state: TaskState::Idle,
            start_time: None,
            inputs: TaskInputs::Reduce(Vec::new()),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == TaskState::Idle
    }

    pub fn is_completed(&self) -> bool {
        self.state == TaskState::Completed
    }

    /// Transitions `Idle -> InProgress`, stamping `start_time = now`.
    pub fn dispatch(&mut self, now: Instant) {
        self.state = TaskState::InProgress;
        self.start_time = Some(now);
    }

    /// Fault-recovery transition back to `Idle` — used by both the stall
    /// reaper and an explicit failure report. A no-op on a `Completed` task:
    /// completion is terminal.
    pub fn reset_to_idle(&mut self) {
        if self.state != TaskState::Completed {
            self.state = TaskState::Idle;
            self.start_time = None;
        }
    }

    /// `Report(success)`. Idempotent: completing an already-`Completed` task
    /// is a no-op.
    pub fn complete(&mut self) {
        self.state = TaskState::Completed;
        self.start_time = None;
    }

    /// True if this task is `InProgress` and has been so longer than
    /// `threshold`.
    pub fn is_stalled(&self, now: Instant, threshold: std::time::Duration) -> bool {
        self.state == TaskState::InProgress
            && self
                .start_time
                .map(|t| now.duration_since(t) > threshold)
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn dispatch_then_complete_is_terminal() {
        let mut t = TaskRecord::new_map("a.txt".into());
        assert!(t.is_idle());
        t.dispatch(Instant::now());
        assert_eq!(t.state, TaskState::InProgress);
        t.complete();
        assert!(t.is_completed());
        // Reporting failure (or a stall reap) after completion must not
        // un-complete the task — completion is terminal.
        t.reset_to_idle();
        assert!(t.is_completed());
    }

    #[test]
    fn failure_report_resets_in_progress_to_idle() {
        let mut t = TaskRecord::new_reduce();
        t.dispatch(Instant::now());
        t.reset_to_idle();
        assert!(t.is_idle());
    }

    #[test]
    fn stall_detection_respects_threshold() {
        let mut t = TaskRecord::new_map("a.txt".into());
        let start = Instant::now();
        t.dispatch(start);
        assert!(!t.is_stalled(start, Duration::from_secs(10)));
        let later = start + Duration::from_secs(11);
        assert!(t.is_stalled(later, Duration::from_secs(10)));
    }

    #[test]
    fn idle_task_is_never_stalled() {
        let t = TaskRecord::new_map("a.txt".into());
        assert!(!t.is_stalled(Instant::now(), Duration::from_secs(10)));
    }
}
