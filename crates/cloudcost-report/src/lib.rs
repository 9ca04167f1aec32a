//! cloudcost-report: turns fitted jobs into readable and exportable output.
//!
//! Per job: a narrative line and a CSV row. Per batch: totals by job state
//! and configuration summaries grouped by the instances jobs would run on.
//! Costs stay exact decimals throughout and are rounded up to the cent only
//! when displayed.

pub mod error;
pub mod estimate;
pub mod export;
pub mod format;
pub mod narrative;
pub mod report;
pub mod summary;

pub use error::{ReportError, ReportResult};
pub use estimate::{ConfigKey, JobEstimate};
pub use export::{ANY_NODES_HEADERS, BASE_HEADERS, CsvExporter};
pub use narrative::{ReportOptions, job_line};
pub use report::Report;
pub use summary::{Aggregator, Group, StateTotals, Totals};
