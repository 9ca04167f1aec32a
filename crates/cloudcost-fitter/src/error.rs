//! Fitter error types.

use cloudcost_catalog::{CatalogError, InstanceFamily};
use thiserror::Error;

/// Result type alias for fitting operations.
pub type FitterResult<T> = Result<T, FitError>;

/// Errors that can occur while fitting a demand onto instances.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("invalid resource demand: {0}")]
    InvalidDemand(String),

    #[error("cannot fit {target} base {family} instances within {max_nodes} nodes")]
    Unfittable {
        family: InstanceFamily,
        target: u64,
        max_nodes: u32,
    },

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}
