//! `cloudcost catalog`: list every instance size the estimator can pick.

use anyhow::Result;
use cloudcost_catalog::{Catalog, Provider};

pub fn list(catalog: &Catalog, provider: Option<Provider>) -> Result<()> {
    print!("{}", render(catalog, provider)?);
    Ok(())
}

pub fn render(catalog: &Catalog, provider: Option<Provider>) -> Result<String> {
    let providers: Vec<Provider> = match provider {
        Some(p) => vec![p],
        None => catalog.providers().collect(),
    };

    let mut out = String::new();
    for provider in providers {
        out.push_str(&format!("{provider}\n"));
        out.push_str(&format!(
            "  {:<24} {:<18} {:>5} {:>5} {:>8} {:>12}\n",
            "NAME", "CUSTOMER NAME", "CPUS", "GPUS", "MEM GB", "$/MIN"
        ));
        for spec in catalog.families(provider)? {
            for &multiplier in spec.multipliers() {
                let instance = catalog.instance(provider, spec.family, multiplier)?;
                out.push_str(&format!(
                    "  {:<24} {:<18} {:>5} {:>5} {:>8} {:>12}\n",
                    instance.display_name(),
                    instance.customer_facing_name(),
                    instance.cpus(),
                    instance.gpus(),
                    instance.mem_gb(),
                    instance.cost_per_minute().normalize(),
                ));
            }
        }
        out.push('\n');
    }
    Ok(out)
}
