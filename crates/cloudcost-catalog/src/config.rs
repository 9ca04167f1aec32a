//! Catalog file (TOML) format.
//!
//! ```toml
//! [aws.gpu]
//! name = "p3.{2}xlarge"
//! cpus = 8
//! gpus = 1
//! mem_gb = 61
//! price_per_min = "0.05982"
//! multipliers = [1, 4, 8]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogResult;
use crate::types::{InstanceFamily, Provider};

/// Raw catalog contents keyed by provider, then family.
pub type CatalogFile = BTreeMap<Provider, BTreeMap<InstanceFamily, FamilyConfig>>;

/// Base specification of one family as written in the catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    /// Name template with one `{..}` size placeholder.
    pub name: String,
    pub cpus: u32,
    #[serde(default)]
    pub gpus: u32,
    pub mem_gb: u32,
    pub price_per_min: PriceValue,
    pub multipliers: Vec<u32>,
}

/// Per-minute price, written either as a decimal string or a bare number.
///
/// Strings are preferred; bare numbers are read through their shortest
/// decimal representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceValue {
    Text(String),
    Number(f64),
}

impl PriceValue {
    pub fn as_text(&self) -> String {
        match self {
            PriceValue::Text(s) => s.trim().to_string(),
            PriceValue::Number(n) => n.to_string(),
        }
    }
}

pub fn parse_catalog_file(content: &str) -> CatalogResult<CatalogFile> {
    Ok(toml::from_str(content)?)
}

pub fn read_catalog_file(path: &Path) -> CatalogResult<CatalogFile> {
    let content = std::fs::read_to_string(path)?;
    parse_catalog_file(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_family() {
        let file = parse_catalog_file(
            r#"
[aws.compute]
name = "c5.{x}large"
cpus = 2
mem_gb = 4
price_per_min = "0.00168"
multipliers = [1, 2, 4]
"#,
        )
        .unwrap();
        let compute = &file[&Provider::Aws][&InstanceFamily::Compute];
        assert_eq!(compute.gpus, 0);
        assert_eq!(compute.price_per_min.as_text(), "0.00168");
        assert_eq!(compute.multipliers, vec![1, 2, 4]);
    }

    #[test]
    fn numeric_price_keeps_shortest_form() {
        let file = parse_catalog_file(
            r#"
[azure.mem]
name = "Standard_E{2}s_v3"
cpus = 2
mem_gb = 16
price_per_min = 0.00210
multipliers = [1]
"#,
        )
        .unwrap();
        assert_eq!(file[&Provider::Azure][&InstanceFamily::Mem].price_per_min.as_text(), "0.0021");
    }

    #[test]
    fn unknown_provider_is_a_parse_error() {
        let err = parse_catalog_file("[gcp.compute]\nname = \"n2-{2}\"\n").unwrap_err();
        assert!(err.to_string().contains("parse"));
    }
}
