use crate::context::CoordinationContext;
use crate::plan::{ExecutionPlan, Step};

use super::parallel::ParallelExecutor;
use super::sequential::SequentialExecutor;
use super::types::PhaseOutcome;

/// Sequential phase over the steps, then a parallel phase over the parallel
/// tasks, both against the same context so phase two can read phase one's
/// shared data. The phases never overlap.
pub(crate) struct HybridExecutor<'a> {
    pub sequential: SequentialExecutor<'a>,
    pub parallel: ParallelExecutor<'a>,
}

impl HybridExecutor<'_> {
    pub async fn run(&self, plan: &ExecutionPlan, ordered: &[Step]) -> PhaseOutcome {
        let phase_one = self.sequential.run(plan, ordered).await;

        if skip_parallel_phase(self.sequential.ctx, &phase_one) {
            tracing::info!(
                run_id = self.sequential.ctx.run_id(),
                failed = phase_one.failed,
                "sequential phase did not finish cleanly; parallel phase skipped"
            );
            return phase_one;
        }

        let phase_two = self.parallel.run(&plan.parallel_tasks).await;
        phase_one.merge(phase_two)
    }
}

/// An abort always stops the run; plain failures only under fail_fast.
fn skip_parallel_phase(ctx: &CoordinationContext, phase_one: &PhaseOutcome) -> bool {
    !phase_one.is_clean() && (phase_one.aborted.is_some() || ctx.is_fail_fast())
}
