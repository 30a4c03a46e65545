//! Result renderers
//!
//! A renderer receives rows as they are fetched and is always finalized with
//! [`ResultRenderer::flush`], even when nothing was written: JSON brackets,
//! CSV headers and the empty-result status lines are emitted lazily and only
//! flush knows which one applies.
//!
//! Execution details never go through a renderer; see
//! [`write_execution_details`].

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use colored::Colorize;

use crate::error::{CLIError, Result};
use crate::row::Row;

mod csv;
mod json;
mod plain;
mod table;

pub use self::csv::CsvRenderer;
pub use self::json::JsonRenderer;
pub use self::plain::PlainRenderer;
pub use self::table::TableRenderer;

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Plain,
    Csv,
}

impl OutputFormat {
    /// Every format, in the order `.output_format` lists them
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Json,
        OutputFormat::Table,
        OutputFormat::Plain,
        OutputFormat::Csv,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Table => "table",
            OutputFormat::Plain => "plain",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CLIError;

    fn from_str(s: &str) -> Result<Self> {
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| CLIError::CommandArgumentError(format!("invalid format: {}", s)))
    }
}

/// What the renderer needs to know about the statement once it finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultSummary {
    /// The statement ran on the row-fetch path
    pub has_rows: bool,
    /// Rows handed to the renderer
    pub row_count: u64,
    /// Rows reported as affected by the server
    pub affected_rows: u64,
    pub elapsed: Duration,
}

impl ResultSummary {
    /// Status line printed by the text formats when no row was written
    pub fn status_line(&self) -> String {
        if self.has_rows {
            "(empty result)".to_string()
        } else {
            format!("OK, affected_rows: {}", self.affected_rows)
        }
    }
}

/// Streaming sink for one statement's result
pub trait ResultRenderer {
    /// Write a batch of rows; may be called any number of times
    fn write_rows(&mut self, rows: &[Row]) -> Result<()>;

    /// Finalize the output. Mandatory, also for zero rows.
    fn flush(&mut self, summary: &ResultSummary) -> Result<()>;
}

/// Build the renderer for `format` on top of `sink`.
///
/// `table_width` bounds the table layout; pass `None` when the sink is not a
/// terminal so that nothing gets truncated.
pub fn renderer_for<'a, W: Write + 'a>(
    format: OutputFormat,
    sink: W,
    table_width: Option<usize>,
) -> Box<dyn ResultRenderer + 'a> {
    match format {
        OutputFormat::Plain => Box::new(PlainRenderer::new(sink)),
        OutputFormat::Table => Box::new(TableRenderer::new(sink, table_width)),
        OutputFormat::Json => Box::new(JsonRenderer::new(sink)),
        OutputFormat::Csv => Box::new(CsvRenderer::new(sink)),
    }
}

/// Terminal width when stdout is a terminal
pub fn terminal_width() -> Option<usize> {
    use std::io::IsTerminal;

    if !std::io::stdout().is_terminal() {
        return None;
    }
    crossterm::terminal::size().ok().map(|(w, _)| w as usize)
}

/// Write the execution footer (timing, row and affected counts)
pub fn write_execution_details(
    out: &mut impl Write,
    summary: &ResultSummary,
    color: bool,
) -> Result<()> {
    let mut lines = vec![format!("Execution time: {:?}", summary.elapsed)];
    if summary.has_rows {
        lines.push(format!("Rows in result: {}", summary.row_count));
    }
    if summary.affected_rows > 0 {
        lines.push(format!("Affected rows: {}", summary.affected_rows));
    }

    for line in lines {
        if color {
            writeln!(out, "{}", line.bright_black())?;
        } else {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

pub(crate) fn write_err(err: std::io::Error) -> CLIError {
    CLIError::RenderError(err.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::row::{CellValue, Row};

    pub fn rows(columns: &[&str], data: Vec<Vec<CellValue>>) -> Vec<Row> {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        data.into_iter()
            .map(|values| Row::new(columns.clone(), values))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        let err = "yaml".parse::<OutputFormat>().unwrap_err();
        assert_eq!(err.to_string(), "invalid format: yaml");
    }

    #[test]
    fn test_status_lines() {
        let query = ResultSummary {
            has_rows: true,
            ..Default::default()
        };
        assert_eq!(query.status_line(), "(empty result)");

        let update = ResultSummary {
            has_rows: false,
            affected_rows: 3,
            ..Default::default()
        };
        assert_eq!(update.status_line(), "OK, affected_rows: 3");
    }

    #[test]
    fn test_execution_details_omit_zero_counts() {
        let summary = ResultSummary {
            has_rows: false,
            row_count: 0,
            affected_rows: 0,
            elapsed: Duration::from_millis(5),
        };
        let mut out = Vec::new();
        write_execution_details(&mut out, &summary, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Execution time: 5ms\n");
    }
}
