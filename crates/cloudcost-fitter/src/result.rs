//! Fit results and their prices.

use cloudcost_catalog::{InstanceFamily, SizedInstance};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::demand::ResourceDemand;

/// One instance size repeated `count` times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sizing {
    pub instance: SizedInstance,
    pub count: u32,
}

impl Sizing {
    pub fn new(instance: SizedInstance, count: u32) -> Self {
        Self { instance, count }
    }

    pub fn cost_per_minute(&self) -> Decimal {
        self.instance.cost_per_minute() * Decimal::from(self.count)
    }

    pub fn total_cost(&self, minutes: Decimal) -> Decimal {
        self.cost_per_minute() * minutes
    }

    pub fn total_cpus(&self) -> u64 {
        self.instance.cpus() * u64::from(self.count)
    }

    pub fn total_gpus(&self) -> u64 {
        self.instance.gpus() * u64::from(self.count)
    }

    pub fn total_mem_mb(&self) -> f64 {
        self.instance.mem_mb() * f64::from(self.count)
    }

    /// `"{count} {name}"`, e.g. `2 c5.xlarge`.
    pub fn description(&self, customer_facing: bool) -> String {
        format!("{} {}", self.count, self.instance.label(customer_facing))
    }

    /// Whether this sizing provides at least the demanded resources.
    pub fn covers(&self, demand: &ResourceDemand) -> bool {
        self.total_cpus() >= u64::from(demand.cpus())
            && self.total_gpus() >= u64::from(demand.gpus())
            && self.total_mem_mb() >= demand.mem_mb()
    }
}

/// Outcome of fitting one demand with uniform sizing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub demand: ResourceDemand,
    pub base_family: InstanceFamily,
    /// Base (multiplier 1) instances needed, ignoring node count.
    pub base: Sizing,
    /// Best fit honouring the job's node count.
    pub best_fit: Sizing,
    /// Best fit with the node count left free, when requested.
    pub any_nodes: Option<Sizing>,
}

impl FitResult {
    pub fn base_instance_count(&self) -> u32 {
        self.base.count
    }

    pub fn is_zero(&self) -> bool {
        self.base.count == 0
    }

    pub fn base_cost_per_minute(&self) -> Decimal {
        self.base.cost_per_minute()
    }

    pub fn base_cost(&self) -> Decimal {
        self.base.total_cost(self.demand.duration())
    }

    pub fn best_fit_cost_per_minute(&self) -> Decimal {
        self.best_fit.cost_per_minute()
    }

    pub fn best_fit_cost(&self) -> Decimal {
        self.best_fit.total_cost(self.demand.duration())
    }

    pub fn any_nodes_cost_per_minute(&self) -> Option<Decimal> {
        self.any_nodes.as_ref().map(Sizing::cost_per_minute)
    }

    pub fn any_nodes_cost(&self) -> Option<Decimal> {
        self.any_nodes
            .as_ref()
            .map(|s| s.total_cost(self.demand.duration()))
    }

    /// Best-fit cost minus any-nodes cost (the saving from ignoring node count).
    pub fn cost_delta(&self) -> Option<Decimal> {
        self.any_nodes_cost().map(|any| self.best_fit_cost() - any)
    }

    pub fn any_nodes_is_different(&self) -> Option<bool> {
        self.any_nodes.as_ref().map(|any| *any != self.best_fit)
    }

    /// More instances than the job had nodes.
    pub fn needs_extra_nodes(&self) -> bool {
        self.best_fit.count > self.demand.nodes()
    }

    /// Matching the node count forced larger instances than needed.
    pub fn is_over_resourced(&self) -> bool {
        self.best_fit_cost_per_minute() > self.base_cost_per_minute()
    }
}
