//! One JSON array of row objects, keyed by column name in query order

use std::io::Write;

use serde_json::{json, Map, Value as JsonValue};

use super::{write_err, ResultRenderer, ResultSummary};
use crate::error::Result;
use crate::row::Row;

pub struct JsonRenderer<W: Write> {
    sink: W,
    opened: bool,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            opened: false,
        }
    }

    fn row_object(row: &Row) -> JsonValue {
        let object: Map<String, JsonValue> = row
            .iter()
            .map(|(column, value)| (column.to_string(), value.to_json()))
            .collect();
        JsonValue::Object(object)
    }
}

impl<W: Write> ResultRenderer for JsonRenderer<W> {
    fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            let encoded = serde_json::to_string(&Self::row_object(row))?;
            let separator = if self.opened { "," } else { "[" };
            write!(self.sink, "{}{}", separator, encoded).map_err(write_err)?;
            self.opened = true;
        }
        Ok(())
    }

    fn flush(&mut self, summary: &ResultSummary) -> Result<()> {
        if self.opened {
            writeln!(self.sink, "]").map_err(write_err)?;
        } else if summary.has_rows {
            writeln!(self.sink, "[]").map_err(write_err)?;
        } else {
            let status = json!({"status": "OK", "affected_rows": summary.affected_rows});
            writeln!(self.sink, "{}", serde_json::to_string(&status)?).map_err(write_err)?;
        }
        self.sink.flush().map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::test_support::rows;
    use crate::row::CellValue;

    fn render(data: Vec<Row>, summary: ResultSummary) -> String {
        let mut out = Vec::new();
        {
            let mut renderer = JsonRenderer::new(&mut out);
            renderer.write_rows(&data).unwrap();
            renderer.flush(&summary).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_single_row_single_column() {
        let data = rows(&["1"], vec![vec![CellValue::Int(1)]]);
        let summary = ResultSummary {
            has_rows: true,
            row_count: 1,
            ..Default::default()
        };
        assert_eq!(render(data, summary), "[{\"1\":1}]\n");
    }

    #[test]
    fn test_keys_follow_column_order() {
        let data = rows(
            &["z", "a"],
            vec![
                vec![CellValue::Text("x".into()), CellValue::Null],
                vec![CellValue::Bytes(b"y".to_vec()), CellValue::Bool(false)],
            ],
        );
        let output = render(
            data,
            ResultSummary {
                has_rows: true,
                row_count: 2,
                ..Default::default()
            },
        );
        assert_eq!(
            output,
            "[{\"z\":\"x\",\"a\":null},{\"z\":\"y\",\"a\":false}]\n"
        );
    }

    #[test]
    fn test_empty_results() {
        let query = ResultSummary {
            has_rows: true,
            ..Default::default()
        };
        assert_eq!(render(Vec::new(), query), "[]\n");

        let exec = ResultSummary {
            has_rows: false,
            affected_rows: 2,
            ..Default::default()
        };
        assert_eq!(
            render(Vec::new(), exec),
            "{\"status\":\"OK\",\"affected_rows\":2}\n"
        );
    }
}
