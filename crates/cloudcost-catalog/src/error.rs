//! Catalog error types.

use thiserror::Error;

use crate::types::{InstanceFamily, Provider};

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised while loading or querying the instance catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("unknown instance family: {0}")]
    UnknownFamilyName(String),

    #[error("instance family {family} is not configured for provider {provider}")]
    UnknownFamily {
        provider: Provider,
        family: InstanceFamily,
    },

    #[error("provider {provider} is missing the {family} family")]
    MissingFamily {
        provider: Provider,
        family: InstanceFamily,
    },

    #[error("invalid multipliers for {provider}.{family}: {reason}")]
    InvalidMultipliers {
        provider: Provider,
        family: InstanceFamily,
        reason: String,
    },

    #[error("multiplier {multiplier} is not valid for {provider}.{family}")]
    InvalidInstanceConfiguration {
        provider: Provider,
        family: InstanceFamily,
        multiplier: u32,
    },

    #[error("invalid price for {provider}.{family}: {value}")]
    InvalidPrice {
        provider: Provider,
        family: InstanceFamily,
        value: String,
    },

    #[error("invalid name template {template:?}: {reason}")]
    InvalidNameTemplate { template: String, reason: String },

    #[error("instance name {name} is produced by more than one size for provider {provider}")]
    DuplicateName { provider: Provider, name: String },

    #[error("invalid spec for {provider}.{family}: {reason}")]
    InvalidSpec {
        provider: Provider,
        family: InstanceFamily,
        reason: String,
    },

    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
}
