//! The RPC surface: two operations, request/reply shapes only — the actual
//! framing is whatever `tarpc`'s serde-json transport gives us.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    Map,
    Reduce,
}

/// Reply to `GetTask`. `Wait` and `Exit` carry no further fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskAssignment {
    Map {
        task_id: usize,
        file: String,
        n_reduce: usize,
    },
    Reduce {
        task_id: usize,
        files: Vec<String>,
        n_reduce: usize,
    },
    Wait,
    Exit,
}

/// Request body for `ReportTask`. An out-of-range `task_id`, or a
/// `task_type` the coordinator doesn't recognize, is ignored rather than
/// erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_type: TaskType,
    pub task_id: usize,
    pub success: bool,
}

#[tarpc::service]
pub trait Coordinator {
    /// Ask the coordinator for the next task to run.
    async fn get_task() -> TaskAssignment;
    /// Report that a previously assigned task finished, successfully or not.
    async fn report_task(report: TaskReport) -> ();
}
