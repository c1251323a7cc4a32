//! Per-step timing of an executed plan.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMetrics {
    pub name: String,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineMetrics {
    pub total_duration_ms: u128,
    pub tasks: Vec<TaskMetrics>,
}

impl PipelineMetrics {
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.name.as_str()).collect()
    }
}
