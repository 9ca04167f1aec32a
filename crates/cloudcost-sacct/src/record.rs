//! sacct records: header mapping and per-job field extraction.

use std::collections::HashMap;

use cloudcost_fitter::{FitterResult, ResourceDemand};
use serde::Serialize;

use crate::duration::parse_elapsed;
use crate::error::{ParseError, ParseResult};

/// States counted when only successful jobs are wanted.
pub const COMPLETED_STATES: &[&str] = &["COMPLETED"];

/// States counted when failed jobs are included.
pub const ALL_STATES: &[&str] = &[
    "FAILED",
    "CANCELLED",
    "NODE_FAIL",
    "OUT_OF_MEMORY",
    "TIMEOUT",
    "COMPLETED",
];

const REQUIRED_COLUMNS: &[&str] = &[
    "jobid",
    "state",
    "elapsed",
    "alloctres",
    "reqgres",
    "maxrss",
    "maxvmsize",
];

/// Headroom applied to peak RSS when estimating a job's memory need.
pub const DEFAULT_MEMORY_HEADROOM: f64 = 1.1;

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub include_failed: bool,
    pub memory_headroom: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            include_failed: false,
            memory_headroom: DEFAULT_MEMORY_HEADROOM,
        }
    }
}

impl ParseOptions {
    pub fn permitted_states(&self) -> &'static [&'static str] {
        if self.include_failed {
            ALL_STATES
        } else {
            COMPLETED_STATES
        }
    }
}

/// Column positions, keyed by lower-cased column name.
#[derive(Debug, Clone)]
pub struct Header {
    columns: HashMap<String, usize>,
    width: usize,
}

impl Header {
    pub fn parse(line: &str) -> ParseResult<Self> {
        let names: Vec<String> = line
            .trim_end()
            .split('|')
            .map(|c| c.trim().to_ascii_lowercase())
            .collect();
        let columns: HashMap<String, usize> =
            names.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect();

        for required in REQUIRED_COLUMNS {
            if !columns.contains_key(*required) {
                return Err(ParseError::MissingColumn((*required).to_string()));
            }
        }
        Ok(Self {
            columns,
            width: names.len(),
        })
    }

    fn field<'a>(&self, fields: &[&'a str], name: &str) -> &'a str {
        self.columns
            .get(name)
            .and_then(|&i| fields.get(i))
            .map(|f| f.trim())
            .unwrap_or("")
    }
}

/// Why a well-formed line produced no job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Job initiator line (no `MaxVMSize`), not a full job.
    Initiator,
    /// State not in the permitted set.
    State(String),
    /// Elapsed time of zero.
    ZeroDuration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Job(JobRecord),
    Skipped(SkipReason),
}

/// One job's usage, extracted from a sacct line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub job_id: String,
    pub state: String,
    pub gpus: u32,
    pub cpus: u32,
    pub nodes: u32,
    /// Peak resident memory in MB.
    pub max_rss_mb: f64,
    /// Peak memory with headroom; the memory demand.
    pub mem_mb: f64,
    pub elapsed_minutes: f64,
    /// Elapsed time rounded up to whole minutes; what is billed.
    pub billed_minutes: f64,
}

impl JobRecord {
    pub fn to_demand(&self) -> FitterResult<ResourceDemand> {
        ResourceDemand::new(self.cpus, self.gpus, self.mem_mb, self.nodes, self.billed_minutes)
    }

    pub fn mem_per_cpu_mb(&self) -> Option<f64> {
        (self.cpus > 0).then(|| self.mem_mb / f64::from(self.cpus))
    }
}

/// Parse one data line against `header`.
pub fn parse_record(header: &Header, line: &str, options: &ParseOptions) -> ParseResult<RecordOutcome> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('|').collect();
    if fields.len() < header.width {
        return Err(ParseError::ShortRecord {
            expected: header.width,
            found: fields.len(),
        });
    }

    if header.field(&fields, "maxvmsize").is_empty() {
        return Ok(RecordOutcome::Skipped(SkipReason::Initiator));
    }

    let state = normalize_state(header.field(&fields, "state"));
    if !options.permitted_states().contains(&state.as_str()) {
        return Ok(RecordOutcome::Skipped(SkipReason::State(state)));
    }

    let elapsed_minutes = parse_elapsed(header.field(&fields, "elapsed"))?;
    if elapsed_minutes == 0.0 {
        return Ok(RecordOutcome::Skipped(SkipReason::ZeroDuration));
    }

    let tres = parse_tres(header.field(&fields, "alloctres"));
    let cpus = tres_count(&tres, "cpu", "cpu")?.unwrap_or(0);
    let nodes = tres_count(&tres, "node", "node")?.unwrap_or(1).max(1);
    let gpus = parse_gres_gpus(header.field(&fields, "reqgres"))?
        .max(tres_count(&tres, "gres/gpu", "gres/gpu")?.unwrap_or(0));

    let max_rss_mb = parse_memory_mb(header.field(&fields, "maxrss"), "maxrss")?;

    Ok(RecordOutcome::Job(JobRecord {
        job_id: header.field(&fields, "jobid").to_string(),
        state,
        gpus,
        cpus,
        nodes,
        max_rss_mb,
        mem_mb: max_rss_mb * options.memory_headroom,
        elapsed_minutes,
        billed_minutes: elapsed_minutes.ceil(),
    }))
}

/// `CANCELLED by 1234` → `CANCELLED`.
fn normalize_state(state: &str) -> String {
    state.split_whitespace().next().unwrap_or("").to_string()
}

/// `billing=4,cpu=4,mem=16G,node=1` → key/value map.
fn parse_tres(value: &str) -> HashMap<&str, &str> {
    value
        .split(',')
        .filter_map(|part| {
            let (key, val) = part.split_once('=')?;
            Some((key.trim(), val.trim()))
        })
        .collect()
}

fn tres_count(tres: &HashMap<&str, &str>, key: &str, field: &'static str) -> ParseResult<Option<u32>> {
    tres.get(key)
        .map(|v| {
            v.parse::<u32>().map_err(|_| ParseError::InvalidNumber {
                field,
                value: (*v).to_string(),
            })
        })
        .transpose()
}

/// GPU count from a GRES request: `gpu:2`, `gpu:v100:2`, `gpu:2(IDX:0-1)`.
fn parse_gres_gpus(value: &str) -> ParseResult<u32> {
    let mut total = 0u32;
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let entry = entry.split('(').next().unwrap_or(entry);
        let entry = entry.strip_prefix("gres/").unwrap_or(entry);
        let mut parts = entry.split([':', '=']);
        if parts.next() != Some("gpu") {
            continue;
        }
        let count = parts.last().unwrap_or("1");
        total += count.parse::<u32>().map_err(|_| ParseError::InvalidNumber {
            field: "reqgres",
            value: entry.to_string(),
        })?;
    }
    Ok(total)
}

/// Memory with an optional unit suffix (`K`, `M`, `G`, `T`) in MB, using
/// decimal steps. A bare number is bytes.
fn parse_memory_mb(value: &str, field: &'static str) -> ParseResult<f64> {
    if value.is_empty() {
        return Ok(0.0);
    }
    let invalid = || ParseError::InvalidNumber {
        field,
        value: value.to_string(),
    };

    let (number, unit) = match value.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&value[..i], c.to_ascii_uppercase()),
        _ => (value, 'B'),
    };
    let number: f64 = number.trim().parse().map_err(|_| invalid())?;
    if !number.is_finite() || number < 0.0 {
        return Err(invalid());
    }
    match unit {
        'B' => Ok(number / 1e6),
        'K' => Ok(number / 1e3),
        'M' => Ok(number),
        'G' => Ok(number * 1e3),
        'T' => Ok(number * 1e6),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "JobID|State|Elapsed|AllocTRES|ReqGRES|MaxRSS|MaxVMSize";

    fn parse(line: &str, include_failed: bool) -> ParseResult<RecordOutcome> {
        let header = Header::parse(HEADER).unwrap();
        let options = ParseOptions {
            include_failed,
            ..ParseOptions::default()
        };
        parse_record(&header, line, &options)
    }

    fn job(line: &str) -> JobRecord {
        match parse(line, true).unwrap() {
            RecordOutcome::Job(job) => job,
            other => panic!("expected a job, got {other:?}"),
        }
    }

    #[test]
    fn parses_full_job() {
        let j = job("1234.0|COMPLETED|01:30:10|billing=8,cpu=8,mem=32G,node=2|gpu:2|2000000K|4000000K\n");
        assert_eq!(j.job_id, "1234.0");
        assert_eq!(j.cpus, 8);
        assert_eq!(j.nodes, 2);
        assert_eq!(j.gpus, 2);
        assert_eq!(j.max_rss_mb, 2000.0);
        assert!((j.mem_mb - 2200.0).abs() < 1e-9);
        assert_eq!(j.billed_minutes, 91.0);
    }

    #[test]
    fn initiator_lines_are_skipped() {
        let outcome = parse("1234|COMPLETED|01:00|cpu=8,node=1||||", false);
        assert_eq!(outcome.unwrap(), RecordOutcome::Skipped(SkipReason::Initiator));
    }

    #[test]
    fn failed_jobs_need_opt_in() {
        let line = "9|CANCELLED by 100|10:00|cpu=1,node=1||1000K|2000K";
        assert_eq!(
            parse(line, false).unwrap(),
            RecordOutcome::Skipped(SkipReason::State("CANCELLED".to_string()))
        );
        assert!(matches!(parse(line, true).unwrap(), RecordOutcome::Job(_)));
    }

    #[test]
    fn zero_duration_is_skipped() {
        let outcome = parse("9|COMPLETED|00:00:00|cpu=1,node=1||1000K|2000K", false);
        assert_eq!(outcome.unwrap(), RecordOutcome::Skipped(SkipReason::ZeroDuration));
    }

    #[test]
    fn gres_variants() {
        assert_eq!(parse_gres_gpus("").unwrap(), 0);
        assert_eq!(parse_gres_gpus("gpu:4").unwrap(), 4);
        assert_eq!(parse_gres_gpus("gpu:v100:2").unwrap(), 2);
        assert_eq!(parse_gres_gpus("gres/gpu:3(IDX:0-2)").unwrap(), 3);
        assert_eq!(parse_gres_gpus("mps:100").unwrap(), 0);
        assert!(parse_gres_gpus("gpu:many").is_err());
    }

    #[test]
    fn gpu_count_from_alloc_tres() {
        let j = job("5|COMPLETED|10|cpu=4,gres/gpu=1,node=1||1000K|2000K");
        assert_eq!(j.gpus, 1);
    }

    #[test]
    fn memory_suffixes() {
        assert_eq!(parse_memory_mb("1500K", "maxrss").unwrap(), 1.5);
        assert_eq!(parse_memory_mb("12M", "maxrss").unwrap(), 12.0);
        assert_eq!(parse_memory_mb("2G", "maxrss").unwrap(), 2000.0);
        assert_eq!(parse_memory_mb("3000000", "maxrss").unwrap(), 3.0);
        assert_eq!(parse_memory_mb("", "maxrss").unwrap(), 0.0);
        assert!(parse_memory_mb("12Q", "maxrss").is_err());
        assert!(parse_memory_mb("K", "maxrss").is_err());
    }

    #[test]
    fn missing_node_defaults_to_one() {
        let j = job("5|COMPLETED|10|cpu=4||1000K|2000K");
        assert_eq!(j.nodes, 1);
    }

    #[test]
    fn short_records_are_errors() {
        assert!(matches!(
            parse("5|COMPLETED|10", false),
            Err(ParseError::ShortRecord { expected: 7, found: 3 })
        ));
    }

    #[test]
    fn header_requires_columns() {
        assert!(matches!(
            Header::parse("JobID|State|Elapsed"),
            Err(ParseError::MissingColumn(_))
        ));
    }

    #[test]
    fn record_converts_to_demand() {
        let j = job("7|TIMEOUT|2-00:00:00|cpu=16,node=4||8G|9G");
        let d = j.to_demand().unwrap();
        assert_eq!(d.cpus(), 16);
        assert_eq!(d.nodes(), 4);
        assert_eq!(d.duration_minutes(), 2880.0);
        assert!((d.mem_mb() - 8800.0).abs() < 1e-6);
    }
}
