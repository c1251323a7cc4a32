//! Table-driven pipeline execution.
//!
//! ```text
//! ExecutionPlan → Tasks (sequential)
//!
//! - ExecutionPlan: ordered tasks chosen up front from observed state
//! - Task: one unit of hypervisor work
//! ```
//!
//! Plans are picked from a table keyed by state, so every path through
//! registration is visible in one place.

mod metrics;
#[allow(clippy::module_inception)]
mod pipeline;
mod task;

pub use metrics::{PipelineMetrics, TaskMetrics};
pub use pipeline::{ExecutionPlan, PipelineExecutor};
pub use task::{BoxedTask, PipelineTask};
