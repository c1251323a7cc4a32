//! Sequential pipeline execution.
//!
//! Tasks run strictly in order; the first failure stops the pipeline and is
//! returned unchanged. Nothing is retried.

use super::metrics::{PipelineMetrics, TaskMetrics};
use super::task::BoxedTask;
use crate::errors::VboxResult;
use std::time::Instant;

pub struct ExecutionPlan<Ctx> {
    tasks: Vec<BoxedTask<Ctx>>,
}

impl<Ctx> ExecutionPlan<Ctx> {
    pub fn new(tasks: Vec<BoxedTask<Ctx>>) -> Self {
        Self { tasks }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }
}

/// Pipeline executor framework.
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Execute every task of the plan against `ctx`, in order.
    pub fn execute<Ctx>(plan: ExecutionPlan<Ctx>, ctx: &Ctx) -> VboxResult<PipelineMetrics> {
        let total_start = Instant::now();
        let mut task_metrics = Vec::with_capacity(plan.tasks.len());

        for task in plan.tasks {
            let name = task.name().to_string();
            let task_start = Instant::now();
            tracing::debug!(task = %name, "Running pipeline task");

            task.run(ctx).inspect_err(|e| {
                tracing::error!(task = %name, error = %e, "Pipeline task failed");
            })?;

            task_metrics.push(TaskMetrics {
                name,
                duration_ms: task_start.elapsed().as_millis(),
            });
        }

        Ok(PipelineMetrics {
            total_duration_ms: total_start.elapsed().as_millis(),
            tasks: task_metrics,
        })
    }
}
