//! Grouped configuration summaries and batch totals.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::estimate::{ConfigKey, JobEstimate};
use crate::format::{ceil_dp, dollars};
use crate::narrative::ReportOptions;

/// Jobs, minutes and cost accumulated for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub description: String,
    pub jobs: u64,
    pub minutes: Decimal,
    pub cost: Decimal,
    #[serde(skip)]
    key: ConfigKey,
}

/// Groups jobs by the configuration they would run on.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    groups: HashMap<String, Group>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, key: ConfigKey, description: String, minutes: Decimal, cost: Decimal) {
        let group = self.groups.entry(description.clone()).or_insert_with(|| Group {
            description,
            jobs: 0,
            minutes: Decimal::ZERO,
            cost: Decimal::ZERO,
            key,
        });
        group.jobs += 1;
        group.minutes += minutes;
        group.cost += cost;
    }

    pub fn add_best_fit(&mut self, estimate: &JobEstimate, customer_facing: bool) {
        self.record(
            estimate.best_fit_key(customer_facing),
            estimate.best_fit_description(customer_facing),
            estimate.minutes(),
            estimate.best_fit_cost(),
        );
    }

    /// No-op for estimates without an any-nodes configuration.
    pub fn add_any_nodes(&mut self, estimate: &JobEstimate, customer_facing: bool) {
        if let (Some(any), Some(key), Some(cost)) = (
            estimate.any_nodes(),
            estimate.any_nodes_key(customer_facing),
            estimate.any_nodes_cost(),
        ) {
            self.record(key, any.description(customer_facing), estimate.minutes(), cost);
        }
    }

    pub fn merge(&mut self, other: Aggregator) {
        for (description, group) in other.groups {
            match self.groups.get_mut(&description) {
                Some(existing) => {
                    existing.jobs += group.jobs;
                    existing.minutes += group.minutes;
                    existing.cost += group.cost;
                }
                None => {
                    self.groups.insert(description, group);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups ordered by family, size, name and instance count.
    pub fn groups(&self) -> Vec<&Group> {
        let mut groups: Vec<&Group> = self.groups.values().collect();
        groups.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.description.cmp(&b.description)));
        groups
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for group in self.groups() {
            out.push_str(&format!(
                "{} job(s) can be run on {}. At a total time of {}mins this would cost {}.\n",
                group.jobs,
                group.description,
                group.minutes.normalize(),
                dollars(group.cost),
            ));
        }
        out
    }
}

/// Accumulated figures for one job state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateTotals {
    pub jobs: u64,
    pub minutes: Decimal,
    pub mem_mb: f64,
    pub best_fit_cost: Decimal,
    pub any_nodes_cost: Decimal,
}

impl StateTotals {
    fn average(&self, total: Decimal) -> Decimal {
        if self.jobs == 0 {
            Decimal::ZERO
        } else {
            total / Decimal::from(self.jobs)
        }
    }
}

/// Batch-wide totals, kept per permitted state in the order given.
#[derive(Debug, Clone, Serialize)]
pub struct Totals {
    pub states: Vec<(String, StateTotals)>,
    pub total_cpus: u64,
    pub max_mem_mb: f64,
    pub max_mem_per_cpu_mb: f64,
    pub over_resourced: u64,
    pub extra_nodes: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl Totals {
    pub fn new(states: &[&str]) -> Self {
        Self {
            states: states
                .iter()
                .map(|s| ((*s).to_string(), StateTotals::default()))
                .collect(),
            total_cpus: 0,
            max_mem_mb: 0.0,
            max_mem_per_cpu_mb: 0.0,
            over_resourced: 0,
            extra_nodes: 0,
            skipped: 0,
            failed: 0,
        }
    }

    pub fn add(&mut self, estimate: &JobEstimate) {
        let job = &estimate.job;
        let index = match self.states.iter().position(|(s, _)| *s == job.state) {
            Some(i) => i,
            None => {
                self.states.push((job.state.clone(), StateTotals::default()));
                self.states.len() - 1
            }
        };
        let state = &mut self.states[index].1;
        state.jobs += 1;
        state.minutes += estimate.minutes();
        state.mem_mb += job.mem_mb;
        state.best_fit_cost += estimate.best_fit_cost();
        state.any_nodes_cost += estimate.any_nodes_cost().unwrap_or_default();

        self.total_cpus += u64::from(job.cpus);
        self.max_mem_mb = self.max_mem_mb.max(job.mem_mb);
        if let Some(per_cpu) = job.mem_per_cpu_mb() {
            self.max_mem_per_cpu_mb = self.max_mem_per_cpu_mb.max(per_cpu);
        }
        if estimate.is_over_resourced() {
            self.over_resourced += 1;
        }
        if estimate.needs_extra_nodes() {
            self.extra_nodes += 1;
        }
    }

    /// A line that parsed but was filtered out.
    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }

    /// A line that could not be parsed or fitted.
    pub fn add_failed(&mut self) {
        self.failed += 1;
    }

    pub fn jobs(&self) -> u64 {
        self.states.iter().map(|(_, s)| s.jobs).sum()
    }

    pub fn minutes(&self) -> Decimal {
        self.states.iter().map(|(_, s)| s.minutes).sum()
    }

    pub fn mem_mb(&self) -> f64 {
        self.states.iter().map(|(_, s)| s.mem_mb).sum()
    }

    pub fn best_fit_cost(&self) -> Decimal {
        self.states.iter().map(|(_, s)| s.best_fit_cost).sum()
    }

    pub fn any_nodes_cost(&self) -> Decimal {
        self.states.iter().map(|(_, s)| s.any_nodes_cost).sum()
    }

    pub fn average_minutes(&self) -> Decimal {
        per_job(self.minutes(), self.jobs())
    }

    pub fn average_mem_mb(&self) -> f64 {
        match self.jobs() {
            0 => 0.0,
            n => self.mem_mb() / n as f64,
        }
    }

    pub fn average_mem_per_cpu_mb(&self) -> f64 {
        match self.total_cpus {
            0 => 0.0,
            n => self.mem_mb() / n as f64,
        }
    }

    pub fn render(&self, options: ReportOptions) -> String {
        let jobs = self.jobs();
        let by_state = self.states.len() > 1;
        let mut out = String::new();

        out.push_str(&format!("Total jobs processed: {jobs}"));
        if by_state {
            out.push_str(&self.breakdown(|s| (s.jobs > 0).then(|| s.jobs.to_string())));
        }
        out.push('\n');

        out.push_str(&format!(
            "Average time per job: {}mins",
            round_up(self.average_minutes())
        ));
        if by_state {
            out.push_str(&self.breakdown(|s| {
                (s.jobs > 0).then(|| format!("{}mins", round_up(s.average(s.minutes))))
            }));
        }
        out.push('\n');

        out.push_str(&format!("Average mem per job: {}MB", ceil_dp(self.average_mem_mb(), 2)));
        if by_state {
            out.push_str(&self.breakdown(|s| {
                (s.jobs > 0).then(|| format!("{}MB", ceil_dp(s.mem_mb / s.jobs as f64, 2)))
            }));
        }
        out.push('\n');

        out.push_str(&format!(
            "Average mem per cpu: {}MB\n",
            ceil_dp(self.average_mem_per_cpu_mb(), 2)
        ));
        out.push_str(&format!("Max mem for 1 job: {}MB\n", ceil_dp(self.max_mem_mb, 2)));
        out.push_str(&format!("Max mem per cpu: {}MB\n\n", ceil_dp(self.max_mem_per_cpu_mb, 2)));

        if options.include_any_nodes {
            out.push_str(&format!(
                "Overall cost ignoring node counts: {}",
                dollars(self.any_nodes_cost())
            ));
            if by_state {
                out.push_str(&self.cost_breakdown(|s| s.any_nodes_cost));
            }
            out.push('\n');
            out.push_str(&format!(
                "Average cost per job ignoring node counts: {}",
                dollars(per_job(self.any_nodes_cost(), jobs))
            ));
            if by_state {
                out.push_str(&self.average_cost_breakdown(|s| s.any_nodes_cost));
            }
            out.push('\n');
        }

        out.push_str(&format!("Overall best fit cost: {}", dollars(self.best_fit_cost())));
        if by_state {
            out.push_str(&self.cost_breakdown(|s| s.best_fit_cost));
        }
        out.push('\n');
        out.push_str(&format!(
            "Average best fit cost per job: {}",
            dollars(per_job(self.best_fit_cost(), jobs))
        ));
        if by_state {
            out.push_str(&self.average_cost_breakdown(|s| s.best_fit_cost));
        }
        out.push('\n');

        out.push_str(&format!(
            "{} jobs requiring larger instances than minimum necessary, to match number of nodes\n",
            self.over_resourced
        ));
        out.push_str(&format!(
            "{} jobs requiring more nodes than used on physical cluster\n",
            self.extra_nodes
        ));
        if self.skipped > 0 || self.failed > 0 {
            out.push_str(&format!(
                "{} records skipped, {} records could not be estimated\n",
                self.skipped, self.failed
            ));
        }
        out
    }

    /// ` (STATE: value, ...)` over states with a value.
    fn breakdown(&self, value: impl Fn(&StateTotals) -> Option<String>) -> String {
        let parts: Vec<String> = self
            .states
            .iter()
            .filter_map(|(name, s)| value(s).map(|v| format!("{name}: {v}")))
            .collect();
        format!(" ({})", parts.join(", "))
    }

    fn cost_breakdown(&self, cost: impl Fn(&StateTotals) -> Decimal) -> String {
        self.breakdown(|s| {
            let c = cost(s);
            (c > Decimal::ZERO).then(|| dollars(c))
        })
    }

    fn average_cost_breakdown(&self, cost: impl Fn(&StateTotals) -> Decimal) -> String {
        self.breakdown(|s| {
            let avg = s.average(cost(s));
            (avg > Decimal::ZERO).then(|| dollars(avg))
        })
    }
}

fn per_job(total: Decimal, jobs: u64) -> Decimal {
    if jobs == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(jobs)
    }
}

/// Round up to two places for display.
fn round_up(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::ToPositiveInfinity)
        .normalize()
}

#[cfg(test)]
mod tests {
    use cloudcost_fitter::SizingPolicy;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::estimate::tests::{estimate, job};

    fn estimates() -> Vec<JobEstimate> {
        vec![
            estimate(job("1", "COMPLETED", 2, 0, 100.0, 1, 10.0), SizingPolicy::Uniform),
            estimate(job("2", "COMPLETED", 2, 0, 300.0, 1, 20.0), SizingPolicy::Uniform),
            estimate(job("3", "FAILED", 16, 0, 1000.0, 1, 5.0), SizingPolicy::Uniform),
            estimate(job("4", "COMPLETED", 2, 1, 100.0, 1, 1.0), SizingPolicy::Uniform),
        ]
    }

    #[test]
    fn groups_accumulate_and_sort() {
        let mut agg = Aggregator::new();
        for e in estimates() {
            agg.add_best_fit(&e, false);
        }
        let groups = agg.groups();
        let names: Vec<&str> = groups.iter().map(|g| g.description.as_str()).collect();
        assert_eq!(names, ["1 p3.2xlarge", "1 c5.large", "1 c5.4xlarge"]);

        let small = groups[1];
        assert_eq!(small.jobs, 2);
        assert_eq!(small.minutes, dec!(30));
        assert_eq!(small.cost, dec!(0.00168) * dec!(30));

        assert_eq!(
            agg.render().lines().nth(1).unwrap(),
            "2 job(s) can be run on 1 c5.large. At a total time of 30mins this would cost $0.06."
        );
    }

    #[test]
    fn merge_combines_partial_aggregators() {
        let all = estimates();
        let (left, right) = all.split_at(2);
        let mut a = Aggregator::new();
        let mut b = Aggregator::new();
        let mut whole = Aggregator::new();
        for e in left {
            a.add_best_fit(e, false);
            whole.add_best_fit(e, false);
        }
        for e in right {
            b.add_best_fit(e, false);
            whole.add_best_fit(e, false);
        }
        a.merge(b);
        assert_eq!(a.groups(), whole.groups());
    }

    #[test]
    fn any_nodes_groups_skip_mixed_estimates() {
        let mut agg = Aggregator::new();
        let mixed = estimate(job("5", "COMPLETED", 8, 0, 20_000.0, 1, 5.0), SizingPolicy::Mixed);
        agg.add_any_nodes(&mixed, false);
        assert!(agg.is_empty());
    }

    #[test]
    fn totals_per_state() {
        let mut totals = Totals::new(&["FAILED", "COMPLETED"]);
        for e in estimates() {
            totals.add(&e);
        }
        totals.add_skipped();

        assert_eq!(totals.jobs(), 4);
        assert_eq!(totals.states[0].1.jobs, 1);
        assert_eq!(totals.states[1].1.jobs, 3);
        assert_eq!(totals.minutes(), dec!(36));
        assert_eq!(totals.average_minutes(), dec!(9));
        assert_eq!(totals.total_cpus, 22);
        assert_eq!(totals.max_mem_mb, 1000.0);
        assert_eq!(totals.max_mem_per_cpu_mb, 150.0);
        assert_eq!(totals.over_resourced, 0);
        assert_eq!(totals.extra_nodes, 0);
        assert_eq!(totals.skipped, 1);

        let expected = dec!(0.00168) * dec!(30)
            + dec!(0.00168) * dec!(8) * dec!(5)
            + dec!(0.05982);
        assert_eq!(totals.best_fit_cost(), expected);
        assert_eq!(totals.any_nodes_cost(), expected);
    }

    #[test]
    fn render_lists_states_when_more_than_one() {
        let mut totals = Totals::new(&["FAILED", "COMPLETED"]);
        for e in estimates() {
            totals.add(&e);
        }
        let text = totals.render(ReportOptions {
            customer_facing: false,
            include_any_nodes: true,
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Total jobs processed: 4 (FAILED: 1, COMPLETED: 3)");
        assert_eq!(lines[1], "Average time per job: 9mins (FAILED: 5mins, COMPLETED: 10.34mins)");
        assert!(text.contains("Overall cost ignoring node counts: $0.18 (FAILED: $0.07, COMPLETED: $0.12)"));
        assert!(text.contains("0 jobs requiring more nodes than used on physical cluster"));
        assert!(!text.contains("records skipped"));
    }

    #[test]
    fn single_state_has_no_breakdown() {
        let mut totals = Totals::new(&["COMPLETED"]);
        totals.add(&estimates()[0]);
        let text = totals.render(ReportOptions::default());
        assert!(text.starts_with("Total jobs processed: 1\n"));
        assert!(!text.contains("ignoring node counts"));
    }
}
