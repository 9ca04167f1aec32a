//! `cloudcost estimate`: price every job in a sacct dump.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cloudcost_fitter::{Fitter, ResourceDemand};
use cloudcost_report::{CsvExporter, JobEstimate, Report};
use cloudcost_sacct::{JobRecord, RecordOutcome, SacctReader};
use tracing::{debug, info, warn};

use crate::config::EstimatorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub struct EstimateArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub assume_yes: bool,
}

pub fn estimate(config: &EstimatorConfig, args: &EstimateArgs) -> Result<()> {
    if let Some(output) = &args.output {
        if output.exists() && !args.assume_yes {
            let stdin = std::io::stdin();
            let mut stderr = std::io::stderr();
            if !confirm_overwrite(output, &mut stdin.lock(), &mut stderr)? {
                info!(path = %output.display(), "not overwriting existing output");
                return Ok(());
            }
        }
    }

    let report = build_report(config, &args.input)?;

    if let Some(output) = &args.output {
        let mut exporter = CsvExporter::create(output, config.report_options())
            .with_context(|| format!("failed to create {}", output.display()))?;
        for estimate in report.estimates() {
            exporter.write(estimate)?;
        }
        let rows = exporter.rows();
        exporter
            .finish()
            .with_context(|| format!("failed to write {}", output.display()))?;
        info!(path = %output.display(), rows, "wrote CSV");
    }

    match args.format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => print!("{}", report.render_text()),
    }
    Ok(())
}

/// Parse `input`, fit every job and collect the results.
///
/// Lines that fail to parse and jobs that cannot be fitted are logged and
/// counted; they never abort the batch.
pub fn build_report(config: &EstimatorConfig, input: &Path) -> Result<Report> {
    let catalog = Arc::new(config.load_catalog()?);
    let fitter = Fitter::new(catalog, config.fitter_config())
        .context("provider is not in the catalog")?;
    let options = config.parse_options();
    let mut report = Report::new(options.permitted_states(), config.report_options());

    let reader = SacctReader::open(input, options)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let mut jobs: Vec<JobRecord> = Vec::new();
    let mut demands: Vec<ResourceDemand> = Vec::new();
    for (line, outcome) in reader {
        match outcome {
            Ok(RecordOutcome::Job(job)) => match job.to_demand() {
                Ok(demand) => {
                    demands.push(demand);
                    jobs.push(job);
                }
                Err(e) => {
                    warn!(line, job_id = %job.job_id, error = %e, "skipping job");
                    report.add_failed();
                }
            },
            Ok(RecordOutcome::Skipped(reason)) => {
                debug!(line, ?reason, "skipped record");
                report.add_skipped();
            }
            Err(e) => {
                warn!(line, error = %e, "skipping unparseable record");
                report.add_failed();
            }
        }
    }

    info!(
        jobs = jobs.len(),
        provider = %config.provider,
        sizing = ?config.sizing,
        "fitting jobs"
    );
    let results = fitter.estimate_batch(&demands);
    for (job, result) in jobs.into_iter().zip(results) {
        match result {
            Ok(estimate) => report.add(JobEstimate::new(job, estimate)),
            Err(e) => {
                warn!(job_id = %job.job_id, error = %e, "could not fit job");
                report.add_failed();
            }
        }
    }
    Ok(report)
}

/// Ask on `output` until `input` answers y or n. End of input counts as no.
pub fn confirm_overwrite(path: &Path, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    loop {
        write!(
            output,
            "File {} already exists. This file will be overwritten, do you wish to continue (y/n)? ",
            path.display()
        )?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => writeln!(output, "Invalid selection, please try again.")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const SACCT: &str = "\
JobID|State|Elapsed|AllocTRES|ReqGRES|MaxRSS|MaxVMSize
1|COMPLETED|10:00|cpu=2,node=1||100000K|200000K
2.0|COMPLETED|1:00:00|cpu=16,node=1|gpu:1|8G|9G
3.0|FAILED|5:00|cpu=2,node=2||100K|200K
4.0|COMPLETED|xx|cpu=2,node=1||100K|200K
";

    fn input() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.sacct");
        std::fs::write(&path, SACCT).unwrap();
        (dir, path)
    }

    #[test]
    fn builds_report_and_counts_failures() {
        let (_dir, path) = input();
        let report = build_report(&EstimatorConfig::default(), &path).unwrap();
        assert_eq!(report.estimates().len(), 2);
        assert_eq!(report.totals().skipped, 1);
        assert_eq!(report.totals().failed, 1);
        assert_eq!(report.estimates()[1].best_fit_description(false), "1 p3.8xlarge");
    }

    #[test]
    fn unfittable_jobs_do_not_abort_the_batch() {
        let (_dir, path) = input();
        let config = EstimatorConfig {
            max_nodes: 1,
            include_failed: true,
            ..EstimatorConfig::default()
        };
        let report = build_report(&config, &path).unwrap();
        let ids: Vec<&str> = report.estimates().iter().map(|e| e.job.job_id.as_str()).collect();
        assert_eq!(ids, ["1", "2.0"]);
        assert_eq!(report.totals().skipped, 0);
        assert_eq!(report.totals().failed, 2);
    }

    #[test]
    fn confirmed_overwrite_writes_csv() {
        let (dir, path) = input();
        let output = dir.path().join("out.csv");
        let args = EstimateArgs {
            input: path,
            output: Some(output.clone()),
            format: OutputFormat::Json,
            assume_yes: true,
        };
        estimate(&EstimatorConfig::default(), &args).unwrap();
        let csv = std::fs::read_to_string(&output).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("job_id,state,gpus,cpus,"));
    }

    #[test]
    fn overwrite_prompt() {
        let path = Path::new("out.csv");
        let mut shown = Vec::new();
        assert!(confirm_overwrite(path, &mut Cursor::new("maybe\nY\n"), &mut shown).unwrap());
        let shown = String::from_utf8(shown).unwrap();
        assert!(shown.contains("File out.csv already exists."));
        assert!(shown.contains("Invalid selection, please try again."));

        assert!(!confirm_overwrite(path, &mut Cursor::new("n\n"), &mut Vec::new()).unwrap());
        assert!(!confirm_overwrite(path, &mut Cursor::new(""), &mut Vec::new()).unwrap());
    }
}
