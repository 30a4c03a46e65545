//! `col: value ` pairs, one line per row

use std::io::Write;

use super::{write_err, ResultRenderer, ResultSummary};
use crate::error::Result;
use crate::row::Row;

pub struct PlainRenderer<W: Write> {
    sink: W,
    wrote_rows: bool,
}

impl<W: Write> PlainRenderer<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            wrote_rows: false,
        }
    }
}

impl<W: Write> ResultRenderer for PlainRenderer<W> {
    fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            let mut line = String::new();
            for (column, value) in row.iter() {
                line.push_str(column);
                line.push_str(": ");
                line.push_str(&value.display());
                line.push(' ');
            }
            writeln!(self.sink, "{}", line).map_err(write_err)?;
            self.wrote_rows = true;
        }
        Ok(())
    }

    fn flush(&mut self, summary: &ResultSummary) -> Result<()> {
        if !self.wrote_rows {
            writeln!(self.sink, "{}", summary.status_line()).map_err(write_err)?;
        }
        self.sink.flush().map_err(write_err)
    }
}
