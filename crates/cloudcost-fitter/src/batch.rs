//! Parallel fitting across many jobs.
//!
//! Each demand is fitted independently on the rayon pool (one task per
//! job, pool sized to the available cores). Results come back in input
//! order so callers can pair them with their job records.

use rayon::prelude::*;

use crate::demand::ResourceDemand;
use crate::error::FitterResult;
use crate::fitter::{Estimate, Fitter};
use crate::result::FitResult;

impl Fitter {
    /// Uniform fit for every demand.
    pub fn fit_batch(&self, demands: &[ResourceDemand]) -> Vec<FitterResult<FitResult>> {
        demands.par_iter().map(|d| self.fit(d)).collect()
    }

    /// [`Fitter::estimate`] for every demand.
    pub fn estimate_batch(&self, demands: &[ResourceDemand]) -> Vec<FitterResult<Estimate>> {
        demands.par_iter().map(|d| self.estimate(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::fitter::tests::{fitter, fitter_with};
    use crate::fitter::{Estimate, FitterConfig, SizingPolicy};
    use crate::{FitError, ResourceDemand};

    #[test]
    fn batch_matches_sequential_fits_in_order() {
        let f = fitter();
        let demands: Vec<ResourceDemand> = (1..=40)
            .map(|cpus| ResourceDemand::new(cpus, 0, 1500.0 * f64::from(cpus), 1 + cpus % 3, 5.0).unwrap())
            .collect();

        let batch = f.fit_batch(&demands);
        assert_eq!(batch.len(), demands.len());
        for (demand, result) in demands.iter().zip(batch) {
            assert_eq!(result.unwrap(), f.fit(demand).unwrap());
        }
    }

    #[test]
    fn one_failure_does_not_affect_the_rest() {
        let f = fitter_with(FitterConfig {
            max_nodes: 3,
            ..FitterConfig::default()
        });
        let demands = vec![
            ResourceDemand::new(4, 0, 100.0, 1, 1.0).unwrap(),
            ResourceDemand::new(20, 0, 100.0, 1, 1.0).unwrap(),
            ResourceDemand::new(2, 0, 100.0, 1, 1.0).unwrap(),
        ];
        let results = f.fit_batch(&demands);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(FitError::Unfittable { .. })));
        assert!(results[2].is_ok());
    }

    #[test]
    fn estimate_batch_follows_policy() {
        let f = fitter_with(FitterConfig {
            sizing: SizingPolicy::Mixed,
            ..FitterConfig::default()
        });
        let demands = vec![ResourceDemand::new(8, 0, 20_000.0, 1, 1.0).unwrap()];
        let results = f.estimate_batch(&demands);
        assert!(matches!(results[0], Ok(Estimate::Mixed(_))));
    }
}
