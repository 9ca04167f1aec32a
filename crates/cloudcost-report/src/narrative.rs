//! One-paragraph description of each job's estimate.

use rust_decimal::Decimal;

use crate::estimate::JobEstimate;
use crate::format::{ceil_dp, dollars, dollars_dp};

/// Presentation switches shared by every report output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub customer_facing: bool,
    pub include_any_nodes: bool,
}

/// Usage sentence, sizing notes, the best-fit price and, when enabled and
/// different, the cheaper any-nodes alternative.
pub fn job_line(estimate: &JobEstimate, options: ReportOptions) -> String {
    let job = &estimate.job;
    let mut out = format!(
        "Job {} used {} GPUs, {}CPUs & {}MB on {} node(s) for {}mins. ",
        job.job_id,
        job.gpus,
        job.cpus,
        ceil_dp(job.mem_mb, 2),
        job.nodes,
        job.billed_minutes,
    );

    if estimate.needs_extra_nodes() {
        out.push_str("To meet requirements with identical instance types, extra nodes required. ");
    }
    if estimate.is_over_resourced() {
        out.push_str(
            "To match number of nodes, larger instance(s) than job resources require must be used. ",
        );
    }
    out.push_str(&format!(
        "Instance config of {} would cost {}.",
        estimate.best_fit_description(options.customer_facing),
        dollars(estimate.best_fit_cost()),
    ));

    if options.include_any_nodes && estimate.any_nodes_is_different() {
        if let (Some(any), Some(cost), Some(delta)) = (
            estimate.any_nodes(),
            estimate.any_nodes_cost(),
            estimate.cost_delta(),
        ) {
            out.push_str(&format!(
                " Ignoring node counts, best fit would be {} at a cost of {}",
                any.description(options.customer_facing),
                dollars(cost),
            ));
            if delta == Decimal::ZERO {
                out.push_str(" (same cost)");
            } else {
                out.push_str(&format!(" (-{})", dollars_dp(delta, 3)));
            }
            out.push('.');
        }
    }

    out
}
