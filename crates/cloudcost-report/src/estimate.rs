//! One job paired with its fit.

use cloudcost_catalog::InstanceFamily;
use cloudcost_fitter::{Estimate, Sizing};
use cloudcost_sacct::JobRecord;
use rust_decimal::Decimal;
use serde::Serialize;

/// A parsed job and the estimate produced for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobEstimate {
    pub job: JobRecord,
    pub estimate: Estimate,
}

/// Ordering of a configuration in grouped summaries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigKey {
    pub family: InstanceFamily,
    pub multiplier: u32,
    pub name: String,
    pub count: u32,
}

impl ConfigKey {
    fn from_sizing(sizing: &Sizing, customer_facing: bool) -> Self {
        Self {
            family: sizing.instance.family(),
            multiplier: sizing.instance.multiplier(),
            name: sizing.instance.label(customer_facing),
            count: sizing.count,
        }
    }
}

impl JobEstimate {
    pub fn new(job: JobRecord, estimate: Estimate) -> Self {
        Self { job, estimate }
    }

    /// Instances in the node-constrained configuration.
    pub fn best_fit_count(&self) -> u32 {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.best_fit.count,
            Estimate::Mixed(fit) => fit.instance_count(),
        }
    }

    /// Instance name for uniform fits; the joined configuration for mixed.
    pub fn best_fit_name(&self, customer_facing: bool) -> String {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.best_fit.instance.label(customer_facing),
            Estimate::Mixed(fit) => fit.description(customer_facing),
        }
    }

    pub fn best_fit_description(&self, customer_facing: bool) -> String {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.best_fit.description(customer_facing),
            Estimate::Mixed(fit) => fit.description(customer_facing),
        }
    }

    pub fn best_fit_cost(&self) -> Decimal {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.best_fit_cost(),
            Estimate::Mixed(fit) => fit.total_cost(),
        }
    }

    pub fn base_cost(&self) -> Decimal {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.base_cost(),
            Estimate::Mixed(fit) => fit.base_cost(),
        }
    }

    pub fn needs_extra_nodes(&self) -> bool {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.needs_extra_nodes(),
            Estimate::Mixed(fit) => fit.needs_extra_nodes(),
        }
    }

    pub fn is_over_resourced(&self) -> bool {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.is_over_resourced(),
            Estimate::Mixed(fit) => fit.is_over_resourced(),
        }
    }

    /// Any-nodes configuration; only uniform fits compute one.
    pub fn any_nodes(&self) -> Option<&Sizing> {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.any_nodes.as_ref(),
            Estimate::Mixed(_) => None,
        }
    }

    pub fn any_nodes_cost(&self) -> Option<Decimal> {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.any_nodes_cost(),
            Estimate::Mixed(_) => None,
        }
    }

    /// Best-fit cost minus any-nodes cost.
    pub fn cost_delta(&self) -> Option<Decimal> {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.cost_delta(),
            Estimate::Mixed(_) => None,
        }
    }

    pub fn any_nodes_is_different(&self) -> bool {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.any_nodes_is_different().unwrap_or(false),
            Estimate::Mixed(_) => false,
        }
    }

    /// Billed minutes as a decimal.
    pub fn minutes(&self) -> Decimal {
        match &self.estimate {
            Estimate::Uniform(fit) => fit.demand.duration(),
            Estimate::Mixed(fit) => fit.demand.duration(),
        }
    }

    pub(crate) fn best_fit_key(&self, customer_facing: bool) -> ConfigKey {
        match &self.estimate {
            Estimate::Uniform(fit) => ConfigKey::from_sizing(&fit.best_fit, customer_facing),
            Estimate::Mixed(fit) => {
                let mut key = fit
                    .placements
                    .first()
                    .map(|s| ConfigKey::from_sizing(s, customer_facing))
                    .unwrap_or(ConfigKey {
                        family: InstanceFamily::Compute,
                        multiplier: 0,
                        name: String::new(),
                        count: 0,
                    });
                key.name = fit.description(customer_facing);
                key.count = fit.instance_count();
                key
            }
        }
    }

    pub(crate) fn any_nodes_key(&self, customer_facing: bool) -> Option<ConfigKey> {
        self.any_nodes()
            .map(|s| ConfigKey::from_sizing(s, customer_facing))
    }
}
