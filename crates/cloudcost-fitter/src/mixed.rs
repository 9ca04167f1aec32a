//! Mixed-family sizing.
//!
//! Alternate policy to uniform sizing. GPU demand goes onto GPU instances
//! first; whatever cpus and memory those do not already provide is split
//! between compute and memory-optimised base instances one at a time,
//! choosing `mem` while the outstanding memory per outstanding cpu is above
//! the threshold. Each family is then sized on its own within what is left
//! of the job's node budget, in the order gpu, mem, compute.

use std::collections::BTreeMap;

use cloudcost_catalog::{InstanceFamily, SizedInstance};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::demand::ResourceDemand;
use crate::error::{FitError, FitterResult};
use crate::fitter::Fitter;
use crate::result::Sizing;

/// Outcome of fitting one demand with mixed families.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixedFit {
    pub demand: ResourceDemand,
    /// Base instances per family before sizing.
    pub base: Vec<Sizing>,
    pub placements: Vec<Sizing>,
}

impl MixedFit {
    pub fn instance_count(&self) -> u32 {
        self.placements.iter().map(|s| s.count).sum()
    }

    pub fn base_cost_per_minute(&self) -> Decimal {
        self.base.iter().map(Sizing::cost_per_minute).sum()
    }

    pub fn base_cost(&self) -> Decimal {
        self.base_cost_per_minute() * self.demand.duration()
    }

    pub fn cost_per_minute(&self) -> Decimal {
        self.placements.iter().map(Sizing::cost_per_minute).sum()
    }

    pub fn total_cost(&self) -> Decimal {
        self.cost_per_minute() * self.demand.duration()
    }

    /// Placements joined with `+`, e.g. `1 p3.2xlarge + 2 r5.large`.
    pub fn description(&self, customer_facing: bool) -> String {
        if self.placements.is_empty() {
            return "0 instances".to_string();
        }
        self.placements
            .iter()
            .map(|s| s.description(customer_facing))
            .collect::<Vec<_>>()
            .join(" + ")
    }

    pub fn covers(&self, demand: &ResourceDemand) -> bool {
        let cpus: u64 = self.placements.iter().map(Sizing::total_cpus).sum();
        let gpus: u64 = self.placements.iter().map(Sizing::total_gpus).sum();
        let mem: f64 = self.placements.iter().map(Sizing::total_mem_mb).sum();
        cpus >= u64::from(demand.cpus()) && gpus >= u64::from(demand.gpus()) && mem >= demand.mem_mb()
    }

    pub fn needs_extra_nodes(&self) -> bool {
        self.instance_count() > self.demand.nodes()
    }

    pub fn is_over_resourced(&self) -> bool {
        self.cost_per_minute() > self.base_cost_per_minute()
    }
}

/// Cap on base instances counted one at a time for one demand.
const MAX_MIXED_BASE_INSTANCES: u64 = 10_000_000;

impl Fitter {
    /// Fit one demand with mixed families.
    pub fn fit_mixed(&self, demand: &ResourceDemand) -> FitterResult<MixedFit> {
        let mut fit = MixedFit {
            demand: *demand,
            base: Vec::new(),
            placements: Vec::new(),
        };
        if demand.is_zero() {
            return Ok(fit);
        }

        let provider = self.provider();
        let mut nodes_left = demand.nodes();
        let mut provided_cpus = 0u64;
        let mut provided_mem = 0.0f64;

        if demand.gpus() > 0 {
            let gpu = self.catalog().base_instance(provider, InstanceFamily::Gpu)?;
            let count = self.base_count(&gpu, 0, demand.gpus(), 0.0)?;
            let placed = self.fill_family(&gpu, count, nodes_left)?;
            for sizing in &placed {
                provided_cpus += sizing.total_cpus();
                provided_mem += sizing.total_mem_mb();
            }
            nodes_left = nodes_left.saturating_sub(placed.iter().map(|s| s.count).sum());
            fit.base.push(Sizing::new(gpu, count));
            fit.placements.extend(placed);
        }

        let cpus_left = u64::from(demand.cpus()).saturating_sub(provided_cpus);
        let mem_left = (demand.mem_mb() - provided_mem).max(0.0);
        let (mem_count, compute_count) = self.split_compute_mem(cpus_left, mem_left)?;

        let rest = [
            (InstanceFamily::Mem, mem_count),
            (InstanceFamily::Compute, compute_count),
        ];
        for (i, &(family, count)) in rest.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let later = rest[i + 1..].iter().filter(|(_, c)| *c > 0).count() as u32;
            let budget = nodes_left.saturating_sub(later).max(1);
            let base = self.catalog().base_instance(provider, family)?;
            let placed = self.fill_family(&base, count, budget)?;
            nodes_left = nodes_left.saturating_sub(placed.iter().map(|s| s.count).sum());
            fit.base.push(Sizing::new(base, count));
            fit.placements.extend(placed);
        }

        debug!(
            placements = %fit.description(false),
            nodes = demand.nodes(),
            "fitted demand with mixed families"
        );
        Ok(fit)
    }

    /// Base (mem, compute) instance counts covering leftover cpus and memory.
    fn split_compute_mem(&self, cpus: u64, mem_mb: f64) -> FitterResult<(u32, u32)> {
        let provider = self.provider();
        let compute = self.catalog().base_instance(provider, InstanceFamily::Compute)?;
        let mem = self.catalog().base_instance(provider, InstanceFamily::Mem)?;
        let threshold = self.config().mem_per_cpu_threshold_mb;

        let (mut mem_count, mut compute_count) = (0u64, 0u64);
        let (mut have_cpus, mut have_mem) = (0u64, 0.0f64);

        while have_cpus < cpus || have_mem < mem_mb {
            let pick_mem = if have_mem < mem_mb {
                let mem_short = mem_mb - have_mem;
                if have_cpus < cpus {
                    mem_short / (cpus - have_cpus) as f64 > threshold
                } else {
                    mem_short > threshold
                }
            } else {
                false
            };

            let added = if pick_mem {
                mem_count += 1;
                &mem
            } else {
                compute_count += 1;
                &compute
            };
            have_cpus += added.cpus();
            have_mem += added.mem_mb();

            if mem_count + compute_count > MAX_MIXED_BASE_INSTANCES {
                return Err(FitError::Unfittable {
                    family: InstanceFamily::Compute,
                    target: mem_count + compute_count,
                    max_nodes: self.max_nodes(),
                });
            }
        }

        Ok((mem_count as u32, compute_count as u32))
    }

    /// Size `target` base instances of one family over `budget` nodes, one
    /// instance per node, each taking the smallest size that covers its
    /// share of what is still outstanding. Instances keep being added past
    /// the budget until the target is covered.
    fn fill_family(&self, base: &SizedInstance, target: u32, budget: u32) -> FitterResult<Vec<Sizing>> {
        let spec = base.spec();
        let target = u64::from(target);
        let mut nodes = u64::from(budget.max(1));
        let mut covered = 0u64;
        let mut sizes: BTreeMap<u32, u32> = BTreeMap::new();
        let mut placed = 0u32;

        while covered < target {
            let outstanding = (target - covered) as f64;
            let share = if nodes > 0 { outstanding / nodes as f64 } else { outstanding };
            let multiplier = spec
                .multipliers()
                .iter()
                .copied()
                .find(|&m| f64::from(m) >= share)
                .unwrap_or_else(|| spec.largest_multiplier());

            *sizes.entry(multiplier).or_insert(0) += 1;
            covered += u64::from(multiplier);
            nodes = nodes.saturating_sub(1);
            placed += 1;

            if placed > self.max_nodes() {
                return Err(FitError::Unfittable {
                    family: spec.family,
                    target,
                    max_nodes: self.max_nodes(),
                });
            }
        }

        sizes
            .into_iter()
            .rev()
            .map(|(m, count)| {
                let instance = self.catalog().instance(self.provider(), spec.family, m)?;
                Ok(Sizing::new(instance, count))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitter::tests::fitter;
    use rust_decimal_macros::dec;

    fn demand(cpus: u32, gpus: u32, mem_mb: f64, nodes: u32) -> ResourceDemand {
        ResourceDemand::new(cpus, gpus, mem_mb, nodes, 10.0).unwrap()
    }

    #[test]
    fn gpu_then_memory_top_up() {
        let d = demand(8, 1, 100_000.0, 2);
        let fit = fitter().fit_mixed(&d).unwrap();
        assert_eq!(fit.description(false), "1 p3.2xlarge + 1 r5.2xlarge");
        assert!(fit.covers(&d));
        assert!(!fit.needs_extra_nodes());
    }

    #[test]
    fn splits_memory_heavy_and_cpu_heavy_parts() {
        let d = demand(8, 0, 20_000.0, 1);
        let fit = fitter().fit_mixed(&d).unwrap();
        assert_eq!(fit.description(false), "1 r5.large + 1 c5.2xlarge");
        assert_eq!(fit.instance_count(), 2);
        assert!(fit.needs_extra_nodes());
        assert!(fit.covers(&d));
        assert_eq!(
            fit.cost_per_minute(),
            dec!(0.00246) + dec!(0.00168) * dec!(4)
        );
    }

    #[test]
    fn compute_only_spreads_over_nodes() {
        let d = demand(16, 0, 1000.0, 2);
        let fit = fitter().fit_mixed(&d).unwrap();
        assert_eq!(fit.description(false), "2 c5.2xlarge");
        assert!(!fit.is_over_resourced());
    }

    #[test]
    fn keeps_adding_past_the_node_budget() {
        // 40 base compute instances on one node; largest size is 8.
        let d = demand(80, 0, 1000.0, 1);
        let fit = fitter().fit_mixed(&d).unwrap();
        assert_eq!(fit.description(false), "5 c5.4xlarge");
        assert!(fit.covers(&d));
    }

    #[test]
    fn zero_demand_places_nothing() {
        let fit = fitter().fit_mixed(&demand(0, 0, 0.0, 1)).unwrap();
        assert!(fit.placements.is_empty());
        assert_eq!(fit.total_cost(), dec!(0));
        assert_eq!(fit.description(false), "0 instances");
    }
}
