//! cloudcost-sacct: reads Slurm accounting output into job records.
//!
//! Input is `sacct --parsable2` style text: a header line of `|`-separated
//! column names followed by one line per job or job step. Each data line
//! becomes a [`JobRecord`], a skip (initiator line, filtered state, zero
//! duration), or a per-line [`ParseError`] the caller can log and move past.

pub mod duration;
pub mod error;
pub mod record;

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

pub use duration::{MAX_PLAUSIBLE_DAYS, parse_elapsed};
pub use error::{ParseError, ParseResult};
pub use record::{
    ALL_STATES, COMPLETED_STATES, DEFAULT_MEMORY_HEADROOM, Header, JobRecord, ParseOptions,
    RecordOutcome, SkipReason, parse_record,
};

/// Streaming reader over sacct output.
///
/// Yields `(line_number, outcome)` for every non-blank data line; line
/// numbers are 1-based and count the header.
pub struct SacctReader<R> {
    lines: Lines<R>,
    header: Header,
    options: ParseOptions,
    line_number: usize,
}

impl SacctReader<BufReader<File>> {
    pub fn open(path: &Path, options: ParseOptions) -> ParseResult<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file), options)
    }
}

impl<R: BufRead> SacctReader<R> {
    pub fn new(reader: R, options: ParseOptions) -> ParseResult<Self> {
        let mut lines = reader.lines();
        let header_line = lines.next().ok_or(ParseError::MissingHeader)??;
        let header = Header::parse(&header_line)?;
        tracing::debug!(header = %header_line.trim_end(), "read accounting header");
        Ok(Self {
            lines,
            header,
            options,
            line_number: 1,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }
}

impl<R: BufRead> Iterator for SacctReader<R> {
    type Item = (usize, ParseResult<RecordOutcome>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            match line {
                Err(e) => return Some((self.line_number, Err(e.into()))),
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    return Some((
                        self.line_number,
                        parse_record(&self.header, &line, &self.options),
                    ));
                }
            }
        }
    }
}
