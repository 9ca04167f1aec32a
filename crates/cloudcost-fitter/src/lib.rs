//! cloudcost-fitter: the resource-to-instance fitting engine.
//!
//! Given one job's resource demand and a read-only [`Catalog`], the fitter
//! picks an instance family, counts the base instances needed, and
//! re-expresses that count as a best-fit configuration of equally sized
//! instances, then prices it.
//!
//! # Algorithm
//!
//! ```text
//! family = gpu                 if gpus > 0
//!        = mem                 if mem_mb / cpus > 2000
//!        = compute             otherwise (and when cpus == 0)
//!
//! target = base instances of `family` until cpus, gpus and memory are met
//!
//! node-constrained, nodes == 1:
//!     smallest size >= target, one instance
//!     none large enough -> continue below from nodes = 2
//! node-constrained, nodes > 1 (and any-nodes from nodes = 1):
//!     loop:
//!         target / nodes is a listed size  -> that size x nodes
//!         target / nodes < smallest size   -> smallest size x nodes
//!         else                              nodes += 1
//!
//! cost = size price x count x minutes      (exact decimal)
//! ```
//!
//! The loop stops by `nodes = target / smallest + 1` at the latest and is
//! additionally capped by [`FitterConfig::max_nodes`].
//!
//! [`Catalog`]: cloudcost_catalog::Catalog

pub mod batch;
pub mod demand;
pub mod error;
pub mod fitter;
pub mod mixed;
pub mod result;

pub use demand::ResourceDemand;
pub use error::{FitError, FitterResult};
pub use fitter::{
    DEFAULT_MAX_NODES, DEFAULT_MEM_PER_CPU_THRESHOLD_MB, Estimate, Fitter, FitterConfig, SizingPolicy,
};
pub use mixed::MixedFit;
pub use result::{FitResult, Sizing};
