//! Instance name templates and customer-facing size tiers.
//!
//! A template is a provider's base instance name with exactly one
//! placeholder marking the part that changes with size:
//!
//! - `p3.{2}xlarge`, `Standard_F{2}s_v2`: the number is multiplied by the
//!   size multiplier (`p3.8xlarge` for multiplier 4).
//! - `c5.{x}large`: a size suffix; nothing for the base size, `x` for
//!   multiplier 2 and `{multiplier / 2}x` above that (`c5.4xlarge` for 8).

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::types::InstanceFamily;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameTemplate {
    /// Numeric token scaled by the multiplier.
    ScaledToken {
        prefix: String,
        base: u32,
        suffix: String,
    },
    /// `N x` size prefix inserted before a size suffix.
    SizeSuffix { prefix: String, suffix: String },
}

impl NameTemplate {
    pub fn parse(template: &str) -> Result<Self, CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidNameTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let (prefix, rest) = template
            .split_once('{')
            .ok_or_else(|| invalid("missing {..} placeholder"))?;
        let (token, suffix) = rest
            .split_once('}')
            .ok_or_else(|| invalid("unterminated placeholder"))?;
        if suffix.contains('{') || suffix.contains('}') || prefix.contains('}') {
            return Err(invalid("more than one placeholder"));
        }

        if token == "x" {
            Ok(NameTemplate::SizeSuffix {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            })
        } else if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            let base: u32 = token.parse().map_err(|_| invalid("token out of range"))?;
            if base == 0 {
                return Err(invalid("scaled token must be positive"));
            }
            Ok(NameTemplate::ScaledToken {
                prefix: prefix.to_string(),
                base,
                suffix: suffix.to_string(),
            })
        } else {
            Err(invalid("placeholder must be a number or `x`"))
        }
    }

    /// Expand the template for one size multiplier.
    pub fn expand(&self, multiplier: u32) -> String {
        match self {
            NameTemplate::ScaledToken { prefix, base, suffix } => {
                format!("{prefix}{}{suffix}", u64::from(*base) * u64::from(multiplier))
            }
            NameTemplate::SizeSuffix { prefix, suffix } => {
                let size = match multiplier {
                    0 | 1 => String::new(),
                    2 => "x".to_string(),
                    m => format!("{}x", m / 2),
                };
                format!("{prefix}{size}{suffix}")
            }
        }
    }
}

/// Size tier label for the `rank`-th smallest multiplier of a family.
pub fn size_tier(rank: usize) -> String {
    match rank {
        0 => "small".to_string(),
        1 => "medium".to_string(),
        2 => "large".to_string(),
        3 => "xlarge".to_string(),
        k => format!("{}xlarge", k - 2),
    }
}

/// Provider-neutral name shown to customers, e.g. `compute.large`.
pub fn customer_facing_name(family: InstanceFamily, rank: usize) -> String {
    format!("{family}.{}", size_tier(rank))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_token_multiplies_number() {
        let t = NameTemplate::parse("p3.{2}xlarge").unwrap();
        assert_eq!(t.expand(1), "p3.2xlarge");
        assert_eq!(t.expand(4), "p3.8xlarge");
        assert_eq!(t.expand(8), "p3.16xlarge");
    }

    #[test]
    fn scaled_token_leaves_other_digits_alone() {
        let t = NameTemplate::parse("Standard_F{2}s_v2").unwrap();
        assert_eq!(t.expand(1), "Standard_F2s_v2");
        assert_eq!(t.expand(16), "Standard_F32s_v2");
    }

    #[test]
    fn size_suffix_omits_count_of_one() {
        let t = NameTemplate::parse("c5.{x}large").unwrap();
        assert_eq!(t.expand(1), "c5.large");
        assert_eq!(t.expand(2), "c5.xlarge");
        assert_eq!(t.expand(4), "c5.2xlarge");
        assert_eq!(t.expand(48), "c5.24xlarge");
    }

    #[test]
    fn rejects_malformed_templates() {
        for bad in ["c5.large", "c5.{large", "c5.{y}large", "a{1}b{2}", "p3.{0}xlarge", "{}"] {
            assert!(NameTemplate::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn tiers_by_rank() {
        let tiers: Vec<String> = (0..6).map(size_tier).collect();
        assert_eq!(tiers, ["small", "medium", "large", "xlarge", "2xlarge", "3xlarge"]);
        assert_eq!(customer_facing_name(InstanceFamily::Mem, 2), "mem.large");
    }
}
