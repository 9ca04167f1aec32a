//! Validated, read-only instance catalog.
//!
//! Built once from a [`CatalogFile`] and never mutated afterwards, so a
//! single `Catalog` can be shared across threads without locking. Every
//! malformed entry is rejected at load time; nothing is partially applied.

use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::debug;

use crate::config::{self, CatalogFile, FamilyConfig};
use crate::error::{CatalogError, CatalogResult};
use crate::naming::{NameTemplate, customer_facing_name};
use crate::types::{InstanceFamily, Provider};

const BUILTIN_CATALOG: &str = include_str!("../catalog.toml");

/// Base specification of one family for one provider.
#[derive(Debug, Clone)]
pub struct InstanceSpec {
    pub provider: Provider,
    pub family: InstanceFamily,
    pub base_cpus: u32,
    pub base_gpus: u32,
    pub base_mem_gb: u32,
    pub base_price_per_minute: Decimal,
    pub base_name: String,
    template: NameTemplate,
    /// Strictly ascending, always starts with 1.
    multipliers: Vec<u32>,
}

impl InstanceSpec {
    fn from_config(
        provider: Provider,
        family: InstanceFamily,
        raw: &FamilyConfig,
    ) -> CatalogResult<Self> {
        let invalid_spec = |reason: &str| CatalogError::InvalidSpec {
            provider,
            family,
            reason: reason.to_string(),
        };
        let invalid_multipliers = |reason: &str| CatalogError::InvalidMultipliers {
            provider,
            family,
            reason: reason.to_string(),
        };

        if raw.cpus == 0 {
            return Err(invalid_spec("cpus must be positive"));
        }
        if raw.mem_gb == 0 {
            return Err(invalid_spec("mem_gb must be positive"));
        }
        if family == InstanceFamily::Gpu && raw.gpus == 0 {
            return Err(invalid_spec("gpu family must carry at least one gpu"));
        }

        let price_text = raw.price_per_min.as_text();
        let price = Decimal::from_str(&price_text)
            .ok()
            .filter(|p| !p.is_sign_negative())
            .ok_or(CatalogError::InvalidPrice {
                provider,
                family,
                value: price_text,
            })?;

        let multipliers = raw.multipliers.clone();
        if multipliers.is_empty() {
            return Err(invalid_multipliers("list is empty"));
        }
        if multipliers.contains(&0) {
            return Err(invalid_multipliers("multipliers must be positive"));
        }
        if !multipliers.windows(2).all(|w| w[0] < w[1]) {
            return Err(invalid_multipliers("list must be strictly ascending"));
        }
        if multipliers[0] != 1 {
            return Err(invalid_multipliers("list must include the base size 1"));
        }

        let template = NameTemplate::parse(&raw.name)?;

        Ok(Self {
            provider,
            family,
            base_cpus: raw.cpus,
            base_gpus: raw.gpus,
            base_mem_gb: raw.mem_gb,
            base_price_per_minute: price,
            base_name: template.expand(1),
            template,
            multipliers,
        })
    }

    /// Valid size multipliers, ascending.
    pub fn multipliers(&self) -> &[u32] {
        &self.multipliers
    }

    pub fn smallest_multiplier(&self) -> u32 {
        self.multipliers[0]
    }

    pub fn largest_multiplier(&self) -> u32 {
        self.multipliers[self.multipliers.len() - 1]
    }

    pub fn allows(&self, multiplier: u32) -> bool {
        self.multipliers.binary_search(&multiplier).is_ok()
    }

    /// Position of `multiplier` within the sorted multiplier list.
    pub fn rank(&self, multiplier: u32) -> Option<usize> {
        self.multipliers.binary_search(&multiplier).ok()
    }

    /// Provider-specific display name for a size.
    pub fn name(&self, multiplier: u32) -> String {
        self.template.expand(multiplier)
    }

    pub fn template(&self) -> &NameTemplate {
        &self.template
    }
}

/// One concrete instance size: a family scaled by a multiplier.
///
/// Cloning is cheap; the base spec is shared.
#[derive(Debug, Clone)]
pub struct SizedInstance {
    spec: Arc<InstanceSpec>,
    multiplier: u32,
}

impl SizedInstance {
    pub fn provider(&self) -> Provider {
        self.spec.provider
    }

    pub fn family(&self) -> InstanceFamily {
        self.spec.family
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn spec(&self) -> &InstanceSpec {
        &self.spec
    }

    pub fn cpus(&self) -> u64 {
        u64::from(self.spec.base_cpus) * u64::from(self.multiplier)
    }

    pub fn gpus(&self) -> u64 {
        u64::from(self.spec.base_gpus) * u64::from(self.multiplier)
    }

    pub fn mem_gb(&self) -> u64 {
        u64::from(self.spec.base_mem_gb) * u64::from(self.multiplier)
    }

    /// Memory in MB, using decimal (1000) steps.
    pub fn mem_mb(&self) -> f64 {
        self.mem_gb() as f64 * 1000.0
    }

    pub fn cost_per_minute(&self) -> Decimal {
        self.spec.base_price_per_minute * Decimal::from(self.multiplier)
    }

    pub fn display_name(&self) -> String {
        self.spec.name(self.multiplier)
    }

    pub fn customer_facing_name(&self) -> String {
        let rank = self.spec.rank(self.multiplier).unwrap_or(0);
        customer_facing_name(self.spec.family, rank)
    }

    /// Display name or customer-facing name.
    pub fn label(&self, customer_facing: bool) -> String {
        if customer_facing {
            self.customer_facing_name()
        } else {
            self.display_name()
        }
    }
}

impl PartialEq for SizedInstance {
    fn eq(&self, other: &Self) -> bool {
        self.family() == other.family() && self.multiplier == other.multiplier
    }
}

impl Eq for SizedInstance {}

impl Hash for SizedInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.family().hash(state);
        self.multiplier.hash(state);
    }
}

impl Serialize for SizedInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SizedInstance", 8)?;
        s.serialize_field("provider", &self.provider())?;
        s.serialize_field("family", &self.family())?;
        s.serialize_field("multiplier", &self.multiplier)?;
        s.serialize_field("name", &self.display_name())?;
        s.serialize_field("cpus", &self.cpus())?;
        s.serialize_field("gpus", &self.gpus())?;
        s.serialize_field("mem_gb", &self.mem_gb())?;
        s.serialize_field("cost_per_minute", &self.cost_per_minute())?;
        s.end()
    }
}

/// The instance catalog: provider → family → spec.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: BTreeMap<Provider, BTreeMap<InstanceFamily, Arc<InstanceSpec>>>,
    /// provider → display or customer-facing name → (family, multiplier).
    names: HashMap<Provider, HashMap<String, (InstanceFamily, u32)>>,
}

impl Catalog {
    /// The catalog shipped with the crate (AWS and Azure).
    pub fn builtin() -> CatalogResult<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn from_toml_str(content: &str) -> CatalogResult<Self> {
        Self::from_file_contents(config::parse_catalog_file(content)?)
    }

    pub fn from_file(path: &Path) -> CatalogResult<Self> {
        let catalog = Self::from_file_contents(config::read_catalog_file(path)?)?;
        debug!(path = %path.display(), "loaded instance catalog from file");
        Ok(catalog)
    }

    /// Validate raw catalog contents.
    pub fn from_file_contents(file: CatalogFile) -> CatalogResult<Self> {
        let mut tables = BTreeMap::new();
        let mut names = HashMap::new();

        for (provider, families) in &file {
            let mut table = BTreeMap::new();
            let mut provider_names: HashMap<String, (InstanceFamily, u32)> = HashMap::new();

            for family in InstanceFamily::ALL {
                let raw = families.get(&family).ok_or(CatalogError::MissingFamily {
                    provider: *provider,
                    family,
                })?;
                let spec = InstanceSpec::from_config(*provider, family, raw)?;

                for (rank, &m) in spec.multipliers().iter().enumerate() {
                    for name in [spec.name(m), customer_facing_name(family, rank)] {
                        if provider_names.insert(name.clone(), (family, m)).is_some() {
                            return Err(CatalogError::DuplicateName {
                                provider: *provider,
                                name,
                            });
                        }
                    }
                }

                debug!(
                    provider = %provider,
                    family = %family,
                    base = %spec.base_name,
                    sizes = spec.multipliers().len(),
                    "validated instance family"
                );
                table.insert(family, Arc::new(spec));
            }

            tables.insert(*provider, table);
            names.insert(*provider, provider_names);
        }

        Ok(Self { tables, names })
    }

    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.tables.keys().copied()
    }

    pub fn has_provider(&self, provider: Provider) -> bool {
        self.tables.contains_key(&provider)
    }

    pub fn families(&self, provider: Provider) -> CatalogResult<Vec<&InstanceSpec>> {
        let table = self
            .tables
            .get(&provider)
            .ok_or_else(|| CatalogError::UnknownProvider(provider.to_string()))?;
        Ok(table.values().map(Arc::as_ref).collect())
    }

    fn spec_arc(&self, provider: Provider, family: InstanceFamily) -> CatalogResult<&Arc<InstanceSpec>> {
        self.tables
            .get(&provider)
            .and_then(|t| t.get(&family))
            .ok_or(CatalogError::UnknownFamily { provider, family })
    }

    pub fn spec(&self, provider: Provider, family: InstanceFamily) -> CatalogResult<&InstanceSpec> {
        self.spec_arc(provider, family).map(Arc::as_ref)
    }

    pub fn multipliers(&self, provider: Provider, family: InstanceFamily) -> CatalogResult<&[u32]> {
        Ok(self.spec(provider, family)?.multipliers())
    }

    pub fn name(
        &self,
        provider: Provider,
        family: InstanceFamily,
        multiplier: u32,
    ) -> CatalogResult<String> {
        Ok(self.instance(provider, family, multiplier)?.display_name())
    }

    /// Look up a size. Fails rather than clamping an unlisted multiplier.
    pub fn instance(
        &self,
        provider: Provider,
        family: InstanceFamily,
        multiplier: u32,
    ) -> CatalogResult<SizedInstance> {
        let spec = self.spec_arc(provider, family)?;
        if !spec.allows(multiplier) {
            return Err(CatalogError::InvalidInstanceConfiguration {
                provider,
                family,
                multiplier,
            });
        }
        Ok(SizedInstance {
            spec: Arc::clone(spec),
            multiplier,
        })
    }

    pub fn base_instance(&self, provider: Provider, family: InstanceFamily) -> CatalogResult<SizedInstance> {
        self.instance(provider, family, 1)
    }

    /// Inverse of [`Catalog::name`]; also accepts customer-facing names.
    pub fn parse_name(&self, provider: Provider, name: &str) -> Option<(InstanceFamily, u32)> {
        self.names.get(&provider)?.get(name.trim()).copied()
    }
}
