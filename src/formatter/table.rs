//! Box-drawn, column-aligned table
//!
//! Column widths depend on every row, so rows are buffered until flush.

use std::io::Write;

use super::{write_err, ResultRenderer, ResultSummary};
use crate::error::Result;
use crate::row::Row;

/// Maximum column width before truncation
const MAX_COLUMN_WIDTH: usize = 32;

/// Minimum column width when resizing to fit the terminal
const MIN_COLUMN_WIDTH: usize = 6;

pub struct TableRenderer<W: Write> {
    sink: W,
    max_width: Option<usize>,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl<W: Write> TableRenderer<W> {
    pub fn new(sink: W, max_width: Option<usize>) -> Self {
        Self {
            sink,
            max_width,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Truncate a string to max width with ellipsis
    fn truncate_value(value: &str, max_width: usize) -> String {
        if value.chars().count() <= max_width {
            value.to_string()
        } else if max_width <= 3 {
            value.chars().take(max_width).collect()
        } else {
            let take = max_width - 3;
            format!("{}...", value.chars().take(take).collect::<String>())
        }
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (i, value) in row.iter().enumerate() {
                widths[i] = widths[i].max(value.chars().count());
            }
        }

        let Some(terminal_width) = self.max_width else {
            return widths;
        };
        if widths.is_empty() {
            return widths;
        }

        let border_padding = widths.len() * 3 + 1;
        let available = terminal_width
            .saturating_sub(border_padding)
            .max(widths.len());

        let mut total: usize = widths.iter().sum();
        if total <= available {
            return widths;
        }

        for width in widths.iter_mut() {
            *width = (*width).min(MAX_COLUMN_WIDTH);
        }
        total = widths.iter().sum();

        while total > available {
            let widest = |floor: usize| {
                widths
                    .iter()
                    .enumerate()
                    .filter(|(_, w)| **w > floor)
                    .max_by_key(|(_, w)| **w)
                    .map(|(i, _)| i)
            };
            match widest(MIN_COLUMN_WIDTH).or_else(|| widest(1)) {
                Some(idx) => widths[idx] -= 1,
                None => break,
            }
            total = widths.iter().sum();
        }

        widths
    }

    fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
        let mut line = String::new();
        line.push(left);
        for (idx, width) in widths.iter().enumerate() {
            line.push_str(&"─".repeat(width + 2));
            line.push(if idx == widths.len() - 1 { right } else { mid });
        }
        line
    }

    fn cells(values: &[String], widths: &[usize]) -> String {
        let mut line = String::from("│");
        for (value, width) in values.iter().zip(widths) {
            let truncated = Self::truncate_value(value, *width);
            line.push_str(&format!(" {:width$} │", truncated, width = *width));
        }
        line
    }

    fn render(&self) -> String {
        let widths = self.column_widths();
        let mut output = String::new();

        output.push_str(&Self::border(&widths, '┌', '┬', '┐'));
        output.push('\n');
        output.push_str(&Self::cells(&self.columns, &widths));
        output.push('\n');
        output.push_str(&Self::border(&widths, '├', '┼', '┤'));
        output.push('\n');
        for row in &self.rows {
            output.push_str(&Self::cells(row, &widths));
            output.push('\n');
        }
        output.push_str(&Self::border(&widths, '└', '┴', '┘'));
        output.push('\n');
        output
    }
}

impl<W: Write> ResultRenderer for TableRenderer<W> {
    fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            if self.columns.is_empty() {
                self.columns = row.columns().to_vec();
            }
            self.rows
                .push(row.values().iter().map(|value| value.display()).collect());
        }
        Ok(())
    }

    fn flush(&mut self, summary: &ResultSummary) -> Result<()> {
        if self.rows.is_empty() {
            writeln!(self.sink, "{}", summary.status_line()).map_err(write_err)?;
        } else {
            let table = self.render();
            self.sink.write_all(table.as_bytes()).map_err(write_err)?;
            self.rows.clear();
        }
        self.sink.flush().map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::test_support::rows;
    use crate::row::CellValue;

    fn render(width: Option<usize>, data: Vec<Row>) -> String {
        let mut out = Vec::new();
        {
            let mut renderer = TableRenderer::new(&mut out, width);
            renderer.write_rows(&data).unwrap();
            renderer
                .flush(&ResultSummary {
                    has_rows: true,
                    row_count: data.len() as u64,
                    ..Default::default()
                })
                .unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_table_layout() {
        let output = render(
            None,
            rows(
                &["id", "name"],
                vec![vec![CellValue::Int(1), CellValue::Text("alice".into())]],
            ),
        );
        let expected = "\
┌────┬───────┐
│ id │ name  │
├────┼───────┤
│ 1  │ alice │
└────┴───────┘
";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_zero_rows_fall_back_to_status_line() {
        let output = render(None, Vec::new());
        assert_eq!(output, "(empty result)\n");
    }

    #[test]
    fn test_truncate_value() {
        assert_eq!(TableRenderer::<Vec<u8>>::truncate_value("short", 10), "short");
        assert_eq!(
            TableRenderer::<Vec<u8>>::truncate_value(
                "this is a very long string that needs truncation",
                20
            ),
            "this is a very lo..."
        );
        assert_eq!(TableRenderer::<Vec<u8>>::truncate_value("test", 3), "tes");
        assert_eq!(TableRenderer::<Vec<u8>>::truncate_value("hello", 4), "h...");
    }

    #[test]
    fn test_narrow_terminal_shrinks_wide_columns() {
        let long = "x".repeat(60);
        let output = render(
            Some(40),
            rows(
                &["a", "b"],
                vec![vec![CellValue::Text(long.clone()), CellValue::Int(1)]],
            ),
        );
        for line in output.lines() {
            assert!(line.chars().count() <= 40, "line too wide: {}", line);
        }
        assert!(output.contains("..."));
    }
}
