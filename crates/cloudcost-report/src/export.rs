//! CSV export of per-job estimates.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::Writer;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::ReportResult;
use crate::estimate::JobEstimate;
use crate::format::ceil_dp;
use crate::narrative::ReportOptions;

pub const BASE_HEADERS: [&str; 11] = [
    "job_id",
    "state",
    "gpus",
    "cpus",
    "base_max_rss_mb",
    "adjusted_max_rss_mb",
    "num_nodes",
    "elapsed_mins",
    "suggested_num",
    "suggested_type",
    "suggested_cost_usd",
];

pub const ANY_NODES_HEADERS: [&str; 4] = [
    "any_nodes_num",
    "any_nodes_type",
    "any_nodes_cost_usd",
    "cost_diff_usd",
];

/// Writes one row per job; the header goes out on construction.
pub struct CsvExporter<W: Write> {
    writer: Writer<W>,
    options: ReportOptions,
    rows: usize,
}

impl CsvExporter<File> {
    pub fn create(path: &Path, options: ReportOptions) -> ReportResult<Self> {
        let file = File::create(path)?;
        debug!(path = %path.display(), "writing CSV");
        Self::new(file, options)
    }
}

impl<W: Write> CsvExporter<W> {
    pub fn new(inner: W, options: ReportOptions) -> ReportResult<Self> {
        let mut writer = Writer::from_writer(inner);
        let mut headers: Vec<&str> = BASE_HEADERS.to_vec();
        if options.include_any_nodes {
            headers.extend(ANY_NODES_HEADERS);
        }
        writer.write_record(&headers)?;
        Ok(Self {
            writer,
            options,
            rows: 0,
        })
    }

    pub fn write(&mut self, estimate: &JobEstimate) -> ReportResult<()> {
        let job = &estimate.job;
        let cf = self.options.customer_facing;
        let mut row = vec![
            job.job_id.clone(),
            job.state.clone(),
            job.gpus.to_string(),
            job.cpus.to_string(),
            job.max_rss_mb.to_string(),
            ceil_dp(job.mem_mb, 2).to_string(),
            job.nodes.to_string(),
            job.billed_minutes.to_string(),
            estimate.best_fit_count().to_string(),
            estimate.best_fit_name(cf),
            money(estimate.best_fit_cost()),
        ];
        if self.options.include_any_nodes {
            match (estimate.any_nodes(), estimate.any_nodes_cost(), estimate.cost_delta()) {
                (Some(any), Some(cost), Some(delta)) => row.extend([
                    any.count.to_string(),
                    any.instance.label(cf),
                    money(cost),
                    money(delta),
                ]),
                _ => row.extend(std::iter::repeat_n(String::new(), ANY_NODES_HEADERS.len())),
            }
        }
        self.writer.write_record(&row)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(mut self) -> ReportResult<W> {
        self.writer.flush()?;
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }
}

/// Full precision, without trailing zeros.
fn money(amount: Decimal) -> String {
    amount.normalize().to_string()
}
