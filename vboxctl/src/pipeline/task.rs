//! Pipeline task trait.

use crate::errors::VboxResult;

/// One named step of an execution plan.
///
/// Steps share a borrowed context and run one management command (or a
/// short fixed sequence of them) each.
pub trait PipelineTask<Ctx> {
    fn run(&self, ctx: &Ctx) -> VboxResult<()>;

    /// Step name used in logs and metrics.
    fn name(&self) -> &str;
}

pub type BoxedTask<Ctx> = Box<dyn PipelineTask<Ctx>>;
