//! Provider and instance family tags shared across cloudcost crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Cloud provider a catalog table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azure,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Aws, Provider::Azure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(Provider::Aws),
            "azure" => Ok(Provider::Azure),
            other => Err(CatalogError::UnknownProvider(other.to_string())),
        }
    }
}

/// A class of instance distinguished by its resource profile.
///
/// Ordering follows sizing priority: GPU demand is always placed first,
/// then general compute, then memory-optimised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceFamily {
    Gpu,
    Compute,
    Mem,
}

impl InstanceFamily {
    pub const ALL: [InstanceFamily; 3] =
        [InstanceFamily::Gpu, InstanceFamily::Compute, InstanceFamily::Mem];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceFamily::Gpu => "gpu",
            InstanceFamily::Compute => "compute",
            InstanceFamily::Mem => "mem",
        }
    }
}

impl fmt::Display for InstanceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceFamily {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpu" => Ok(InstanceFamily::Gpu),
            "compute" => Ok(InstanceFamily::Compute),
            "mem" => Ok(InstanceFamily::Mem),
            other => Err(CatalogError::UnknownFamilyName(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parse_is_case_insensitive() {
        assert_eq!("AWS".parse::<Provider>().unwrap(), Provider::Aws);
        assert_eq!(" azure ".parse::<Provider>().unwrap(), Provider::Azure);
        assert!("gcp".parse::<Provider>().is_err());
    }

    #[test]
    fn family_round_trips_through_display() {
        for family in InstanceFamily::ALL {
            assert_eq!(family.to_string().parse::<InstanceFamily>().unwrap(), family);
        }
    }

    #[test]
    fn family_order_puts_gpu_first() {
        let mut families = vec![InstanceFamily::Mem, InstanceFamily::Gpu, InstanceFamily::Compute];
        families.sort();
        assert_eq!(families, InstanceFamily::ALL.to_vec());
    }
}
