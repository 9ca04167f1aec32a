//! Fitting engine: maps one resource demand onto catalog instances.
//!
//! Three steps per demand:
//! 1. Pick a family and count the base (multiplier 1) instances needed.
//! 2. Re-express that count as one size repeated across the job's node
//!    count (node-constrained) or across any number of nodes (any-nodes).
//! 3. Price both with exact decimal arithmetic.

use std::str::FromStr;
use std::sync::Arc;

use cloudcost_catalog::{Catalog, CatalogError, InstanceFamily, InstanceSpec, Provider, SizedInstance};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::demand::ResourceDemand;
use crate::error::{FitError, FitterResult};
use crate::mixed::MixedFit;
use crate::result::{FitResult, Sizing};

/// Memory per cpu above which the memory-optimised family is chosen.
/// Matches the 2 GB/core ratio of a compute instance.
pub const DEFAULT_MEM_PER_CPU_THRESHOLD_MB: f64 = 2000.0;

/// Upper bound on the node count the best-fit search may escalate to.
pub const DEFAULT_MAX_NODES: u32 = 100_000;

/// How demand is spread over instance families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizingPolicy {
    /// One family, one size, repeated.
    #[default]
    Uniform,
    /// Families mixed per resource; see [`crate::mixed`].
    Mixed,
}

impl FromStr for SizingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(SizingPolicy::Uniform),
            "mixed" => Ok(SizingPolicy::Mixed),
            other => Err(format!("unknown sizing policy: {other} (expected uniform or mixed)")),
        }
    }
}

/// Fitter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    pub provider: Provider,
    /// Also compute the any-nodes fit.
    pub include_any_nodes: bool,
    pub mem_per_cpu_threshold_mb: f64,
    pub max_nodes: u32,
    pub sizing: SizingPolicy,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Aws,
            include_any_nodes: true,
            mem_per_cpu_threshold_mb: DEFAULT_MEM_PER_CPU_THRESHOLD_MB,
            max_nodes: DEFAULT_MAX_NODES,
            sizing: SizingPolicy::Uniform,
        }
    }
}

/// Outcome of [`Fitter::estimate`] under the configured policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum Estimate {
    Uniform(FitResult),
    Mixed(MixedFit),
}

/// Stateless fitter over a shared, read-only catalog.
///
/// Every call is independent; a `Fitter` can be shared across threads.
#[derive(Debug, Clone)]
pub struct Fitter {
    catalog: Arc<Catalog>,
    config: FitterConfig,
}

impl Fitter {
    pub fn new(catalog: Arc<Catalog>, config: FitterConfig) -> FitterResult<Self> {
        if !catalog.has_provider(config.provider) {
            return Err(CatalogError::UnknownProvider(config.provider.to_string()).into());
        }
        Ok(Self { catalog, config })
    }

    pub fn config(&self) -> &FitterConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub(crate) fn provider(&self) -> Provider {
        self.config.provider
    }

    pub(crate) fn max_nodes(&self) -> u32 {
        self.config.max_nodes.max(1)
    }

    /// Fit under the configured sizing policy.
    pub fn estimate(&self, demand: &ResourceDemand) -> FitterResult<Estimate> {
        match self.config.sizing {
            SizingPolicy::Uniform => self.fit(demand).map(Estimate::Uniform),
            SizingPolicy::Mixed => self.fit_mixed(demand).map(Estimate::Mixed),
        }
    }

    /// Fit one demand with uniform sizing.
    pub fn fit(&self, demand: &ResourceDemand) -> FitterResult<FitResult> {
        if demand.is_zero() {
            return self.zero_fit(demand);
        }

        let (base_instance, base_count) =
            self.base_instance_numbers(demand.cpus(), demand.gpus(), demand.mem_mb())?;
        let best_fit = self.best_fit_instances(&base_instance, base_count, demand.nodes(), true)?;
        let any_nodes = if self.config.include_any_nodes {
            Some(self.best_fit_instances(&base_instance, base_count, demand.nodes(), false)?)
        } else {
            None
        };

        debug!(
            family = %base_instance.family(),
            base_count,
            best_fit = %best_fit.description(false),
            nodes = demand.nodes(),
            "fitted demand"
        );

        Ok(FitResult {
            demand: *demand,
            base_family: base_instance.family(),
            base: Sizing::new(base_instance, base_count),
            best_fit,
            any_nodes,
        })
    }

    fn zero_fit(&self, demand: &ResourceDemand) -> FitterResult<FitResult> {
        let base = self.catalog.base_instance(self.provider(), InstanceFamily::Compute)?;
        let empty = Sizing::new(base, 0);
        Ok(FitResult {
            demand: *demand,
            base_family: InstanceFamily::Compute,
            base: empty.clone(),
            best_fit: empty.clone(),
            any_nodes: self.config.include_any_nodes.then_some(empty),
        })
    }

    /// Family for a demand: GPUs force `gpu`; otherwise `mem` when memory
    /// per cpu exceeds the threshold, else `compute`. With no cpus the ratio
    /// is undefined and `compute` is used.
    pub fn select_family(&self, cpus: u32, gpus: u32, mem_mb: f64) -> InstanceFamily {
        if gpus > 0 {
            return InstanceFamily::Gpu;
        }
        if cpus == 0 {
            return InstanceFamily::Compute;
        }
        let mem_per_cpu = mem_mb / f64::from(cpus);
        if mem_per_cpu > self.config.mem_per_cpu_threshold_mb {
            InstanceFamily::Mem
        } else {
            InstanceFamily::Compute
        }
    }

    /// Family and number of base instances that together cover the demand.
    ///
    /// The count equals adding base instances one at a time until cpus,
    /// gpus and memory are all met.
    pub fn base_instance_numbers(
        &self,
        cpus: u32,
        gpus: u32,
        mem_mb: f64,
    ) -> FitterResult<(SizedInstance, u32)> {
        let family = self.select_family(cpus, gpus, mem_mb);
        let instance = self.catalog.base_instance(self.provider(), family)?;
        let count = self.base_count(&instance, cpus, gpus, mem_mb)?;
        Ok((instance, count))
    }

    pub(crate) fn base_count(
        &self,
        base: &SizedInstance,
        cpus: u32,
        gpus: u32,
        mem_mb: f64,
    ) -> FitterResult<u32> {
        let needs = [
            instances_to_cover(f64::from(gpus), base.gpus() as f64),
            instances_to_cover(f64::from(cpus), base.cpus() as f64),
            instances_to_cover(mem_mb, base.mem_mb()),
        ];
        let mut count = 0u64;
        for need in needs {
            match need {
                Some(n) => count = count.max(n),
                None => {
                    return Err(FitError::Unfittable {
                        family: base.family(),
                        target: u64::MAX,
                        max_nodes: self.max_nodes(),
                    });
                }
            }
        }
        u32::try_from(count).map_err(|_| FitError::Unfittable {
            family: base.family(),
            target: count,
            max_nodes: self.max_nodes(),
        })
    }

    /// Re-express `target` base instances as one size repeated.
    ///
    /// With `consider_nodes`, the search starts at the job's node count and
    /// a single-node job is kept on one instance whenever a size can hold
    /// it. Without it, the cheapest uniform spread over any node count is
    /// returned.
    pub fn best_fit_instances(
        &self,
        base: &SizedInstance,
        target: u32,
        nodes: u32,
        consider_nodes: bool,
    ) -> FitterResult<Sizing> {
        let spec = base.spec();
        if target == 0 {
            return Ok(Sizing::new(base.clone(), 0));
        }

        let (multiplier, count) = if consider_nodes {
            if nodes <= 1 {
                match single_instance_multiplier(spec, target) {
                    Some(m) => (m, 1),
                    None => {
                        debug!(
                            family = %spec.family,
                            target,
                            "largest size cannot hold a single-node job, adding nodes"
                        );
                        self.spread(spec, target, 2)?
                    }
                }
            } else {
                self.spread(spec, target, nodes)?
            }
        } else {
            let single = single_instance_multiplier(spec, target).map(|m| (m, 1));
            match (single, self.spread(spec, target, 1)) {
                (Some(one), Ok(many)) => {
                    if aggregate(many) < aggregate(one) {
                        many
                    } else {
                        one
                    }
                }
                (Some(one), Err(_)) => one,
                (None, result) => result?,
            }
        };

        let instance = self.catalog.instance(self.provider(), spec.family, multiplier)?;
        Ok(Sizing::new(instance, count))
    }

    /// Smallest `n >= start` at which `target` splits evenly into a listed
    /// size, or at which the per-node share drops below the smallest size.
    ///
    /// Terminates by `n = target / smallest + 1` at the latest, since the
    /// per-node share is then below the smallest size; `max_nodes` bounds it
    /// further.
    fn spread(&self, spec: &InstanceSpec, target: u32, start: u32) -> FitterResult<(u32, u32)> {
        let target = u64::from(target);
        let smallest = u64::from(spec.smallest_multiplier());
        let max_nodes = u64::from(self.max_nodes());

        let mut nodes = u64::from(start.max(1));
        loop {
            if nodes > max_nodes {
                return Err(FitError::Unfittable {
                    family: spec.family,
                    target,
                    max_nodes: self.max_nodes(),
                });
            }
            if target % nodes == 0 {
                let per_node = target / nodes;
                if let Ok(m) = u32::try_from(per_node) {
                    if spec.allows(m) {
                        return Ok((m, nodes as u32));
                    }
                }
            }
            if target < smallest * nodes {
                return Ok((spec.smallest_multiplier(), nodes as u32));
            }
            nodes += 1;
        }
    }
}

/// Smallest size that holds `target` base instances on its own.
fn single_instance_multiplier(spec: &InstanceSpec, target: u32) -> Option<u32> {
    spec.multipliers().iter().copied().find(|&m| m >= target)
}

fn aggregate((multiplier, count): (u32, u32)) -> u64 {
    u64::from(multiplier) * u64::from(count)
}

/// Whole instances of `per_instance` capacity needed to reach `demand`.
pub(crate) fn instances_to_cover(demand: f64, per_instance: f64) -> Option<u64> {
    if demand <= 0.0 {
        return Some(0);
    }
    if per_instance <= 0.0 {
        return None;
    }
    let mut n = (demand / per_instance).ceil();
    while n * per_instance < demand {
        n += 1.0;
    }
    (n <= u32::MAX as f64).then_some(n as u64)
}
