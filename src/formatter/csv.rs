//! Header line plus comma-joined rows

use std::io::Write;

use super::{write_err, ResultRenderer, ResultSummary};
use crate::error::Result;
use crate::row::{quote_csv, Row};

pub struct CsvRenderer<W: Write> {
    sink: W,
    header_written: bool,
}

impl<W: Write> CsvRenderer<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            header_written: false,
        }
    }

    fn header(columns: &[String]) -> String {
        columns
            .iter()
            .map(|name| {
                if name.contains([',', '"', '\n']) {
                    quote_csv(name)
                } else {
                    name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl<W: Write> ResultRenderer for CsvRenderer<W> {
    fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            if !self.header_written {
                writeln!(self.sink, "{}", Self::header(row.columns())).map_err(write_err)?;
                self.header_written = true;
            }
            let line = row
                .values()
                .iter()
                .map(|value| value.csv())
                .collect::<Vec<_>>()
                .join(",");
            writeln!(self.sink, "{}", line).map_err(write_err)?;
        }
        Ok(())
    }

    fn flush(&mut self, summary: &ResultSummary) -> Result<()> {
        if !self.header_written {
            if summary.has_rows {
                writeln!(self.sink, "{}", summary.status_line()).map_err(write_err)?;
            } else {
                writeln!(self.sink, "status,affected_rows\nOK,{}", summary.affected_rows)
                    .map_err(write_err)?;
            }
        }
        self.sink.flush().map_err(write_err)
    }
}
