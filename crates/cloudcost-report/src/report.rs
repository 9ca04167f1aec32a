//! Full batch report: per-state job lines, totals and grouped summaries.

use serde::Serialize;

use crate::error::ReportResult;
use crate::estimate::JobEstimate;
use crate::narrative::{ReportOptions, job_line};
use crate::summary::{Aggregator, Group, Totals};

const RULE: &str = "--------------------------------------------------";

/// Collects estimates for one batch and renders them.
#[derive(Debug, Clone)]
pub struct Report {
    options: ReportOptions,
    estimates: Vec<JobEstimate>,
    best_fit: Aggregator,
    any_nodes: Aggregator,
    totals: Totals,
}

#[derive(Serialize)]
struct JsonJob<'a> {
    #[serde(flatten)]
    estimate: &'a JobEstimate,
    summary: String,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    jobs: Vec<JsonJob<'a>>,
    best_fit_groups: Vec<&'a Group>,
    #[serde(skip_serializing_if = "Option::is_none")]
    any_nodes_groups: Option<Vec<&'a Group>>,
    totals: &'a Totals,
}

impl Report {
    /// `states` fixes the order states are listed in.
    pub fn new(states: &[&str], options: ReportOptions) -> Self {
        Self {
            options,
            estimates: Vec::new(),
            best_fit: Aggregator::new(),
            any_nodes: Aggregator::new(),
            totals: Totals::new(states),
        }
    }

    pub fn add(&mut self, estimate: JobEstimate) {
        let cf = self.options.customer_facing;
        self.best_fit.add_best_fit(&estimate, cf);
        if self.options.include_any_nodes {
            self.any_nodes.add_any_nodes(&estimate, cf);
        }
        self.totals.add(&estimate);
        self.estimates.push(estimate);
    }

    pub fn add_skipped(&mut self) {
        self.totals.add_skipped();
    }

    pub fn add_failed(&mut self) {
        self.totals.add_failed();
    }

    pub fn estimates(&self) -> &[JobEstimate] {
        &self.estimates
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn best_fit_groups(&self) -> &Aggregator {
        &self.best_fit
    }

    pub fn any_nodes_groups(&self) -> &Aggregator {
        &self.any_nodes
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for (state, _) in &self.totals.states {
            let lines: Vec<String> = self
                .estimates
                .iter()
                .filter(|e| e.job.state == *state)
                .map(|e| job_line(e, self.options))
                .collect();
            if lines.is_empty() {
                continue;
            }
            out.push_str(&format!("{state}\n{RULE}\n"));
            for line in lines {
                out.push_str(&line);
                out.push('\n');
            }
            out.push('\n');
        }

        out.push_str(&format!("{RULE}\nTotals\n"));
        out.push_str(&self.totals.render(self.options));
        out.push('\n');

        out.push_str(&format!("{RULE}\nInstances Summary\n\n"));
        out.push_str("Best Fit\n");
        out.push_str(&self.best_fit.render());
        if self.options.include_any_nodes {
            out.push_str("\nIgnoring node counts\n");
            out.push_str(&self.any_nodes.render());
        }
        out
    }

    pub fn to_json(&self) -> ReportResult<String> {
        let report = JsonReport {
            jobs: self
                .estimates
                .iter()
                .map(|e| JsonJob {
                    estimate: e,
                    summary: job_line(e, self.options),
                })
                .collect(),
            best_fit_groups: self.best_fit.groups(),
            any_nodes_groups: self
                .options
                .include_any_nodes
                .then(|| self.any_nodes.groups()),
            totals: &self.totals,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }
}
