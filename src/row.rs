//! Result model: rows of heterogeneous column values
//!
//! Rows are built once per fetched record and handed to exactly one renderer.
//! The formatting helpers here are shared by every sink so that the same
//! value always prints the same way.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use mysql_async::consts::{ColumnFlags, ColumnType};
use mysql_async::{Column, Value};
use serde_json::Value as JsonValue;

/// Display format for timestamps in every sink
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A dynamically typed column value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl CellValue {
    /// Decode a driver value using the column metadata it was read with.
    ///
    /// The text protocol delivers everything as bytes, so numeric and
    /// date-time columns are parsed according to their declared type.
    pub fn from_mysql(value: Value, column: &Column) -> Self {
        match value {
            Value::NULL => CellValue::Null,
            Value::Int(v) => CellValue::Int(v),
            Value::UInt(v) => CellValue::UInt(v),
            Value::Float(v) => CellValue::Float(v as f64),
            Value::Double(v) => CellValue::Float(v),
            Value::Date(year, month, day, hour, minute, second, micros) => {
                NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                    .and_then(|date| {
                        date.and_hms_micro_opt(hour as u32, minute as u32, second as u32, micros)
                    })
                    .map(CellValue::Timestamp)
                    .unwrap_or_else(|| {
                        CellValue::Text(format!(
                            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                            year, month, day, hour, minute, second
                        ))
                    })
            }
            Value::Time(negative, days, hours, minutes, seconds, _micros) => {
                let total_hours = days * 24 + hours as u32;
                let sign = if negative { "-" } else { "" };
                CellValue::Text(format!("{}{:02}:{:02}:{:02}", sign, total_hours, minutes, seconds))
            }
            Value::Bytes(bytes) => Self::from_text_bytes(bytes, column),
        }
    }

    fn from_text_bytes(bytes: Vec<u8>, column: &Column) -> Self {
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => return CellValue::Bytes(err.into_bytes()),
        };

        let parsed = match column.column_type() {
            ColumnType::MYSQL_TYPE_TINY
            | ColumnType::MYSQL_TYPE_SHORT
            | ColumnType::MYSQL_TYPE_LONG
            | ColumnType::MYSQL_TYPE_INT24
            | ColumnType::MYSQL_TYPE_LONGLONG
            | ColumnType::MYSQL_TYPE_YEAR => {
                if column.flags().contains(ColumnFlags::UNSIGNED_FLAG) {
                    text.parse::<u64>().ok().map(CellValue::UInt)
                } else {
                    text.parse::<i64>().ok().map(CellValue::Int)
                }
            }
            ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => {
                text.parse::<f64>().ok().map(CellValue::Float)
            }
            ColumnType::MYSQL_TYPE_TIMESTAMP | ColumnType::MYSQL_TYPE_DATETIME => {
                NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f")
                    .ok()
                    .map(CellValue::Timestamp)
            }
            _ => None,
        };

        parsed.unwrap_or(CellValue::Text(text))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Human-readable rendering used by the plain and table sinks
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            other => other.text().unwrap_or_default(),
        }
    }

    /// CSV rendering: null is empty, textual values are always quoted
    pub fn csv(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(_) | CellValue::Int(_) | CellValue::UInt(_) | CellValue::Float(_) => {
                self.display()
            }
            CellValue::Text(_) | CellValue::Bytes(_) | CellValue::Timestamp(_) => {
                quote_csv(&self.display())
            }
        }
    }

    /// JSON rendering: byte sequences and timestamps become strings
    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::Null => JsonValue::Null,
            CellValue::Bool(v) => JsonValue::Bool(*v),
            CellValue::Int(v) => JsonValue::from(*v),
            CellValue::UInt(v) => JsonValue::from(*v),
            CellValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            other => JsonValue::String(other.display()),
        }
    }

    /// Textual form of a non-null value
    pub fn text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Bool(v) => Some(v.to_string()),
            CellValue::Int(v) => Some(v.to_string()),
            CellValue::UInt(v) => Some(v.to_string()),
            CellValue::Float(v) => Some(format!("{:.6}", v)),
            CellValue::Text(v) => Some(v.clone()),
            CellValue::Bytes(v) => Some(String::from_utf8_lossy(v).into_owned()),
            CellValue::Timestamp(v) => Some(v.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

/// Wrap a value in double quotes, doubling any embedded quote
pub fn quote_csv(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// One fetched record: column names paired 1:1 with values
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<CellValue>,
}

impl Row {
    /// Build a row; the caller guarantees one value per column
    pub fn new(columns: Arc<[String]>, values: Vec<CellValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<CellValue> {
        self.values
    }

    /// Iterate `(column, value)` pairs in query column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        let columns: Arc<[String]> = pairs.iter().map(|(c, _)| c.to_string()).collect();
        Row::new(columns, pairs.iter().map(|(_, v)| v.clone()).collect())
    }

    #[test]
    fn test_display_values() {
        assert_eq!(CellValue::Null.display(), "NULL");
        assert_eq!(CellValue::Bool(true).display(), "true");
        assert_eq!(CellValue::Int(-42).display(), "-42");
        assert_eq!(CellValue::Float(1.5).display(), "1.500000");
        assert_eq!(CellValue::Bytes(b"raw".to_vec()).display(), "raw");

        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(7, 5, 0))
            .unwrap();
        assert_eq!(CellValue::Timestamp(ts).display(), "2024-03-09 07:05:00");
    }

    #[test]
    fn test_csv_values() {
        assert_eq!(CellValue::Null.csv(), "");
        assert_eq!(CellValue::Int(7).csv(), "7");
        assert_eq!(CellValue::Text("say \"hi\", ok".into()).csv(), "\"say \"\"hi\"\", ok\"");
    }

    #[test]
    fn test_csv_quote_recovers_original_text() {
        let original = "a \"quoted\" value, with \"\" pairs";
        let quoted = CellValue::Text(original.to_string()).csv();
        let inner = &quoted[1..quoted.len() - 1];
        assert_eq!(inner.replace("\"\"", "\""), original);
    }

    #[test]
    fn test_json_values() {
        assert_eq!(CellValue::Int(1).to_json(), serde_json::json!(1));
        assert_eq!(CellValue::Bytes(b"x".to_vec()).to_json(), serde_json::json!("x"));
        assert_eq!(CellValue::Float(f64::NAN).to_json(), JsonValue::Null);
    }

    #[test]
    fn test_row_iterates_in_column_order() {
        let r = row(&[("b", CellValue::Int(2)), ("a", CellValue::Int(1))]);
        let names: Vec<&str> = r.iter().map(|(c, _)| c).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(r.values().len(), r.columns().len());
    }
}
