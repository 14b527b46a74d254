//! Result sinks.
//!
//! A join streams its output into a [`ResultSink`]: one `begin` carrying the
//! output header, then one `emit` per result pair in production order, then
//! `finish`. Sinks never see hash tables or cursors.

use std::io::{self, Write};

use bandjoin_error::{BandJoinError, Result};
use csv::{Terminator, WriterBuilder};
use bandjoin_types::{Row, RowValues, Value};

/// Destination for join results.
pub trait ResultSink {
    /// Called once, before any row, with left-then-right column names.
    fn begin(&mut self, header: &[String]) -> Result<()>;

    /// One result: the left-side row followed by the right-side row.
    fn emit(&mut self, left: &Row, right: &Row) -> Result<()>;

    /// Called once after the last row of a successful join.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn begin(&mut self, header: &[String]) -> Result<()> {
        (**self).begin(header)
    }

    fn emit(&mut self, left: &Row, right: &Row) -> Result<()> {
        (**self).emit(left, right)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// One collected output row with the ordinals of the rows that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow {
    pub left_ordinal: u64,
    pub right_ordinal: u64,
    pub values: RowValues,
}

impl JoinedRow {
    fn concat(left: &Row, right: &Row) -> Self {
        Self {
            left_ordinal: left.ordinal(),
            right_ordinal: right.ordinal(),
            values: left.values().iter().chain(right.values()).cloned().collect(),
        }
    }

    /// The left part's column values, given the left relation's arity.
    #[must_use]
    pub fn left_values(&self, left_arity: usize) -> &[Value] {
        &self.values[..left_arity.min(self.values.len())]
    }

    #[must_use]
    pub fn right_values(&self, left_arity: usize) -> &[Value] {
        &self.values[left_arity.min(self.values.len())..]
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectSink {
    header: Vec<String>,
    rows: Vec<JoinedRow>,
    finished: bool,
}

impl CollectSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    #[must_use]
    pub fn rows(&self) -> &[JoinedRow] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<JoinedRow> {
        self.rows
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// `(left ordinal, right ordinal)` for every row, in emission order.
    #[must_use]
    pub fn ordinal_pairs(&self) -> Vec<(u64, u64)> {
        self.rows
            .iter()
            .map(|r| (r.left_ordinal, r.right_ordinal))
            .collect()
    }
}

impl ResultSink for CollectSink {
    fn begin(&mut self, header: &[String]) -> Result<()> {
        self.header = header.to_vec();
        self.rows.clear();
        self.finished = false;
        Ok(())
    }

    fn emit(&mut self, left: &Row, right: &Row) -> Result<()> {
        self.rows.push(JoinedRow::concat(left, right));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Counts rows and drops them.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingSink {
    rows: u64,
}

impl CountingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn rows(&self) -> u64 {
        self.rows
    }
}

impl ResultSink for CountingSink {
    fn begin(&mut self, _header: &[String]) -> Result<()> {
        self.rows = 0;
        Ok(())
    }

    fn emit(&mut self, _left: &Row, _right: &Row) -> Result<()> {
        self.rows += 1;
        Ok(())
    }
}

/// Forwards everything to two sinks, first `.0` then `.1`.
#[derive(Debug, Default)]
pub struct TeeSink<A, B>(pub A, pub B);

impl<A: ResultSink, B: ResultSink> ResultSink for TeeSink<A, B> {
    fn begin(&mut self, header: &[String]) -> Result<()> {
        self.0.begin(header)?;
        self.1.begin(header)
    }

    fn emit(&mut self, left: &Row, right: &Row) -> Result<()> {
        self.0.emit(left, right)?;
        self.1.emit(left, right)
    }

    fn finish(&mut self) -> Result<()> {
        self.0.finish()?;
        self.1.finish()
    }
}

/// Writes CSV (RFC 4180 quoting, `\n` line endings). `NULL` is an empty
/// field. Output is buffered; `finish` flushes it.
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    out: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: WriterBuilder::new()
                .terminator(Terminator::Any(b'\n'))
                .from_writer(out),
        }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.out.into_inner().map_err(|e| {
            let err = e.error();
            BandJoinError::Sink(io::Error::new(err.kind(), err.to_string()))
        })
    }

    fn end_record(&mut self) -> Result<()> {
        self.out.write_record(None::<&[u8]>).map_err(csv_error)
    }
}

fn csv_error(err: csv::Error) -> BandJoinError {
    BandJoinError::Sink(io::Error::from(err))
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn begin(&mut self, header: &[String]) -> Result<()> {
        self.out.write_record(header).map_err(csv_error)
    }

    fn emit(&mut self, left: &Row, right: &Row) -> Result<()> {
        for value in left.values().iter().chain(right.values()) {
            let written = match value {
                Value::Text(s) => self.out.write_field(s),
                Value::Null => self.out.write_field(""),
                other => self.out.write_field(other.to_string()),
            };
            written.map_err(csv_error)?;
        }
        self.end_record()
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
