//! The coordinator's task table and dispatch algorithm.
//!
//! The coordinator is passive: workers drive every state transition by
//! calling `GetTask`/`ReportTask`. Both handlers run under one mutex — no
//! blocking I/O happens while it's held, only table lookups and
//! bookkeeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::{ready, Ready};
use tarpc::context;
use tracing::{debug, info};

use crate::mr::rpc::{self, TaskAssignment, TaskReport, TaskType};
use crate::mr::task::{TaskInputs, TaskRecord};

/// A stalled `IN_PROGRESS` task is reset to `IDLE` and re-dispatched. Must
/// exceed the expected runtime of any single task and RPC round-trip
/// latency; not a public tunable.
pub const STALL_THRESHOLD: Duration = Duration::from_secs(10);

pub fn intermediate_file(m: usize, r: usize) -> String {
    format!("mr-{m}-{r}")
}

pub fn final_file(r: usize) -> String {
    format!("mr-out-{r}")
}

struct State {
    map_tasks: Vec<TaskRecord>,
    reduce_tasks: Vec<TaskRecord>,
    map_phase_done: bool,
    all_done: bool,
}

impl State {
    fn reap_stalls(&mut self, now: Instant) {
        for (idx, task) in self.map_tasks.iter_mut().enumerate() {
            if task.is_stalled(now, STALL_THRESHOLD) {
                debug!(task = "map", id = idx, "reaping stalled task");
                task.reset_to_idle();
            }
        }
        for (idx, task) in self.reduce_tasks.iter_mut().enumerate() {
            if task.is_stalled(now, STALL_THRESHOLD) {
                debug!(task = "reduce", id = idx, "reaping stalled task");
                task.reset_to_idle();
            }
        }
    }

    fn dispatch_map(&mut self, now: Instant) -> Option<TaskAssignment> {
        let idx = self.map_tasks.iter().position(TaskRecord::is_idle)?;
        let task = &mut self.map_tasks[idx];
        task.dispatch(now);
        let file = match &task.inputs {
            TaskInputs::Map(f) => f.clone(),
            TaskInputs::Reduce(_) => unreachable!("map task table holds only map inputs"),
        };
        info!(task = "map", id = idx, %file, "dispatched");
        Some(TaskAssignment::Map {
            task_id: idx,
            file,
            n_reduce: self.reduce_tasks.len(),
        })
    }

    fn dispatch_reduce(&mut self, now: Instant, m: usize) -> Option<TaskAssignment> {
        let idx = self.reduce_tasks.iter().position(TaskRecord::is_idle)?;
        let files: Vec<String> = (0..m).map(|mi| intermediate_file(mi, idx)).collect();
        let task = &mut self.reduce_tasks[idx];
        task.dispatch(now);
        task.inputs = TaskInputs::Reduce(files.clone());
        info!(task = "reduce", id = idx, "dispatched");
        Some(TaskAssignment::Reduce {
            task_id: idx,
            files,
            n_reduce: self.reduce_tasks.len(),
        })
    }

    fn get_task(&mut self) -> TaskAssignment {
        let now = Instant::now();
        self.reap_stalls(now);

        if !self.map_phase_done {
            if let Some(assignment) = self.dispatch_map(now) {
                return assignment;
            }
            if self.map_tasks.iter().all(TaskRecord::is_completed) {
                info!("map phase complete, entering reduce phase");
                self.map_phase_done = true;
            } else {
                return TaskAssignment::Wait;
            }
        }

        let m = self.map_tasks.len();
        if let Some(assignment) = self.dispatch_reduce(now, m) {
            return assignment;
        }
        if self.reduce_tasks.iter().all(TaskRecord::is_completed) {
            info!("reduce phase complete, job done");
            self.all_done = true;
            TaskAssignment::Exit
        } else {
            TaskAssignment::Wait
        }
    }

    fn report_task(&mut self, report: TaskReport) {
        let table = match report.task_type {
            TaskType::Map => &mut self.map_tasks,
            TaskType::Reduce => &mut self.reduce_tasks,
        };
        let Some(task) = table.get_mut(report.task_id) else {
            debug!(
                task_id = report.task_id,
                "ignoring report for out-of-range task id"
            );
            return;
        };
        if report.success {
            task.complete();
        } else {
            task.reset_to_idle();
        }
    }
}

/// The scheduler. Cheap to clone — every clone shares the same task table
/// through the `Arc<Mutex<_>>`, which is exactly what the `tarpc` server
/// machinery needs (each RPC call gets a fresh clone of `Self`).
#[derive(Clone)]
pub struct Coordinator {
    state: Arc<Mutex<State>>,
}

impl Coordinator {
    /// `files` becomes the map task table (one task per input file, in
    /// order); `n_reduce` fixes the reduce task table's size. Rejects
    /// `n_reduce == 0`: every partitioning hash needs at least one bucket to
    /// land in, so a zero-reduce run can never produce output and is
    /// refused here instead of panicking partway through a worker's first
    /// map task.
    pub fn new(files: Vec<String>, n_reduce: usize) -> crate::mr::Result<Self> {
        if n_reduce == 0 {
            return Err(crate::mr::Error::Config(
                "n_reduce must be at least 1".to_string(),
            ));
        }
        let no_map_tasks = files.is_empty();
        let map_tasks = files.into_iter().map(TaskRecord::new_map).collect();
        let mut reduce_tasks: Vec<TaskRecord> =
            (0..n_reduce).map(|_| TaskRecord::new_reduce()).collect();
        // With zero input files, every reduce task has zero intermediate
        // files to consume — both phases are already done, and the
        // coordinator should serve `Exit` on the very first `GetTask`
        // without ever dispatching a reduce task that has nothing to do.
        if no_map_tasks {
            for task in &mut reduce_tasks {
                task.complete();
            }
        }
        Ok(Self {
            state: Arc::new(Mutex::new(State {
                map_tasks,
                reduce_tasks,
                map_phase_done: no_map_tasks,
                all_done: no_map_tasks,
            })),
        })
    }

    /// Polled by the launcher; true iff every reduce task is `Completed`
    /// (vacuously true when `n_reduce == 0`).
    pub fn is_done(&self) -> bool {
        self.state.lock().unwrap().all_done
    }
}

#[tarpc::server]
impl rpc::Coordinator for Coordinator {
    type GetTaskFut = Ready<TaskAssignment>;
    type ReportTaskFut = Ready<()>;

    fn get_task(self, _: context::Context) -> Self::GetTaskFut {
        let assignment = self.state.lock().unwrap().get_task();
        ready(assignment)
    }

    fn report_task(self, _: context::Context, report: TaskReport) -> Self::ReportTaskFut {
        self.state.lock().unwrap().report_task(report);
        ready(())
    }
}
