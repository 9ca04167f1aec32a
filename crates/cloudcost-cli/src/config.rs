//! `cloudcost.toml`: estimator settings, overridable from the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use cloudcost_catalog::{Catalog, Provider};
use cloudcost_fitter::{DEFAULT_MAX_NODES, DEFAULT_MEM_PER_CPU_THRESHOLD_MB, FitterConfig, SizingPolicy};
use cloudcost_report::ReportOptions;
use cloudcost_sacct::{DEFAULT_MEMORY_HEADROOM, ParseOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    pub provider: Provider,
    pub include_failed: bool,
    pub include_any_nodes: bool,
    pub customer_facing: bool,
    /// Multiplier applied to peak RSS to get the memory demand.
    pub memory_headroom: f64,
    pub sizing: SizingPolicy,
    pub max_nodes: u32,
    pub mem_per_cpu_threshold_mb: f64,
    /// Catalog TOML; the built-in catalog when unset.
    pub catalog: Option<PathBuf>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Aws,
            include_failed: false,
            include_any_nodes: false,
            customer_facing: false,
            memory_headroom: DEFAULT_MEMORY_HEADROOM,
            sizing: SizingPolicy::Uniform,
            max_nodes: DEFAULT_MAX_NODES,
            mem_per_cpu_threshold_mb: DEFAULT_MEM_PER_CPU_THRESHOLD_MB,
            catalog: None,
        }
    }
}

/// Flag values from the command line. Switches can only turn settings on.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<Provider>,
    pub include_failed: bool,
    pub include_any_nodes: bool,
    pub customer_facing: bool,
    pub sizing: Option<SizingPolicy>,
    pub catalog: Option<PathBuf>,
}

impl EstimatorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("invalid estimator config")?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_toml_str(&content)
                    .with_context(|| format!("in config {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(provider) = overrides.provider {
            self.provider = provider;
        }
        if let Some(sizing) = overrides.sizing {
            self.sizing = sizing;
        }
        if overrides.catalog.is_some() {
            self.catalog = overrides.catalog;
        }
        self.include_failed |= overrides.include_failed;
        self.include_any_nodes |= overrides.include_any_nodes;
        self.customer_facing |= overrides.customer_facing;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.memory_headroom.is_finite() || self.memory_headroom <= 0.0 {
            bail!("memory_headroom must be a positive number, got {}", self.memory_headroom);
        }
        if !self.mem_per_cpu_threshold_mb.is_finite() || self.mem_per_cpu_threshold_mb < 0.0 {
            bail!(
                "mem_per_cpu_threshold_mb must be a non-negative number, got {}",
                self.mem_per_cpu_threshold_mb
            );
        }
        if self.max_nodes == 0 {
            bail!("max_nodes must be at least 1");
        }
        Ok(())
    }

    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog {
            Some(path) => Catalog::from_file(path)
                .with_context(|| format!("failed to load catalog {}", path.display())),
            None => Catalog::builtin().context("built-in catalog is invalid"),
        }
    }

    pub fn fitter_config(&self) -> FitterConfig {
        FitterConfig {
            provider: self.provider,
            include_any_nodes: self.include_any_nodes,
            mem_per_cpu_threshold_mb: self.mem_per_cpu_threshold_mb,
            max_nodes: self.max_nodes,
            sizing: self.sizing,
        }
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            include_failed: self.include_failed,
            memory_headroom: self.memory_headroom,
        }
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            customer_facing: self.customer_facing,
            include_any_nodes: self.include_any_nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(EstimatorConfig::from_toml_str("").unwrap(), EstimatorConfig::default());
    }

    #[test]
    fn parses_all_fields() {
        let config = EstimatorConfig::from_toml_str(
            r#"
provider = "azure"
include_failed = true
include_any_nodes = true
customer_facing = true
memory_headroom = 1.25
sizing = "mixed"
max_nodes = 64
mem_per_cpu_threshold_mb = 3000.0
catalog = "prices.toml"
"#,
        )
        .unwrap();
        assert_eq!(config.provider, Provider::Azure);
        assert_eq!(config.sizing, SizingPolicy::Mixed);
        assert_eq!(config.max_nodes, 64);
        assert_eq!(config.catalog.as_deref(), Some(Path::new("prices.toml")));
        assert_eq!(config.parse_options().memory_headroom, 1.25);
        assert!(config.report_options().include_any_nodes);
        assert!(config.fitter_config().include_any_nodes);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(EstimatorConfig::from_toml_str("memory_headroom = 0.0").is_err());
        assert!(EstimatorConfig::from_toml_str("max_nodes = 0").is_err());
        assert!(EstimatorConfig::from_toml_str("provider = \"gcp\"").is_err());
        assert!(EstimatorConfig::from_toml_str("colour = \"blue\"").is_err());
    }

    #[test]
    fn flags_override_file() {
        let config = EstimatorConfig {
            provider: Provider::Azure,
            include_failed: true,
            ..EstimatorConfig::default()
        }
        .apply(Overrides {
            provider: Some(Provider::Aws),
            sizing: Some(SizingPolicy::Mixed),
            customer_facing: true,
            ..Overrides::default()
        });
        assert_eq!(config.provider, Provider::Aws);
        assert_eq!(config.sizing, SizingPolicy::Mixed);
        assert!(config.include_failed);
        assert!(config.customer_facing);
        assert!(!config.include_any_nodes);
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloudcost.toml");
        std::fs::write(&path, "provider = \"azure\"\n").unwrap();
        let config = EstimatorConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.provider, Provider::Azure);
        assert!(EstimatorConfig::load(Some(dir.path().join("missing.toml").as_path())).is_err());
        assert_eq!(EstimatorConfig::load(None).unwrap(), EstimatorConfig::default());
    }

    #[test]
    fn builtin_catalog_by_default() {
        let catalog = EstimatorConfig::default().load_catalog().unwrap();
        assert!(catalog.has_provider(Provider::Azure));
    }
}
