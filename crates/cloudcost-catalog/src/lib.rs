//! cloudcost-catalog: the instance catalog.
//!
//! A provider-scoped table of instance families (`gpu`, `compute`, `mem`),
//! each with a base specification and an ascending list of size
//! multipliers. The catalog is validated eagerly when loaded and is
//! read-only afterwards; it exposes lookup and naming only.

pub mod catalog;
pub mod config;
pub mod error;
pub mod naming;
pub mod types;

pub use catalog::{Catalog, InstanceSpec, SizedInstance};
pub use error::{CatalogError, CatalogResult};
pub use naming::{NameTemplate, customer_facing_name, size_tier};
pub use types::{InstanceFamily, Provider};
