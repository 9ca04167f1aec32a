use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cloudcost_catalog::Provider;
use cloudcost_fitter::SizingPolicy;

mod commands;
mod config;

use commands::estimate::{EstimateArgs, OutputFormat};
use config::{EstimatorConfig, Overrides};

#[derive(Parser)]
#[command(
    name = "cloudcost",
    about = "Estimate what historic cluster jobs would cost on cloud instances",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price every job in a sacct dump.
    ///
    /// Input is `sacct --parsable2` output with at least the JobID, State,
    /// Elapsed, AllocTRES, ReqGRES, MaxRSS and MaxVMSize columns.
    Estimate {
        /// sacct output to read
        #[arg(short, long)]
        input: PathBuf,
        /// Also write one CSV row per job here
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        provider: Option<Provider>,
        /// Include FAILED, CANCELLED, NODE_FAIL, OUT_OF_MEMORY and TIMEOUT jobs
        #[arg(long)]
        include_failed: bool,
        /// Also price each job ignoring its node count
        #[arg(long)]
        include_any_node_numbers: bool,
        /// Use tiered names such as compute.large
        #[arg(long)]
        customer_facing: bool,
        /// uniform or mixed
        #[arg(long)]
        sizing: Option<SizingPolicy>,
        /// Catalog TOML replacing the built-in prices
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Estimator config file (cloudcost.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Overwrite the output file without asking
        #[arg(short, long)]
        yes: bool,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List the instance sizes in the catalog
    Catalog {
        #[arg(short, long)]
        provider: Option<Provider>,
        /// Catalog TOML replacing the built-in prices
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("cloudcost={level}").parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Estimate {
            input,
            output,
            provider,
            include_failed,
            include_any_node_numbers,
            customer_facing,
            sizing,
            catalog,
            config,
            yes,
            format,
        } => {
            let config = EstimatorConfig::load(config.as_deref())?.apply(Overrides {
                provider,
                include_failed,
                include_any_nodes: include_any_node_numbers,
                customer_facing,
                sizing,
                catalog,
            });
            let args = EstimateArgs {
                input,
                output,
                format,
                assume_yes: yes,
            };
            commands::estimate::estimate(&config, &args)
        }
        Commands::Catalog { provider, catalog } => {
            let config = EstimatorConfig {
                catalog,
                ..EstimatorConfig::default()
            };
            let catalog = config.load_catalog()?;
            if let Some(p) = provider {
                anyhow::ensure!(catalog.has_provider(p), "provider {p} is not in the catalog");
            }
            commands::catalog::list(&catalog, provider).context("failed to list catalog")
        }
    }
}
