//! `sql` global: synchronous query and execute calls
//!
//! Failures never raise into the script. Every call returns a table whose
//! `ok` field tells whether it worked and whose `error` field says why not.

use std::sync::Arc;

use mlua::{Lua, Table, Value};
use tokio::runtime::Handle;

use super::block_on;
use crate::connection::ConnectionManager;
use crate::row::{CellValue, TIMESTAMP_FORMAT};

pub(crate) const NO_CONNECTION: &str =
    "database connection is not available, please connect first using .connect command";

fn status_table(lua: &Lua, error: Option<&str>) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.set("ok", error.is_none())?;
    table.set("error", error.unwrap_or(""))?;
    Ok(table)
}

/// Lua representation of a column value
pub(crate) fn cell_to_lua(lua: &Lua, value: &CellValue) -> mlua::Result<Value> {
    Ok(match value {
        CellValue::Null => Value::Nil,
        CellValue::Bool(v) => Value::Boolean(*v),
        CellValue::Int(v) => Value::Integer(*v),
        CellValue::UInt(v) => match i64::try_from(*v) {
            Ok(v) => Value::Integer(v),
            Err(_) => Value::Number(*v as f64),
        },
        CellValue::Float(v) => Value::Number(*v),
        CellValue::Text(v) => Value::String(lua.create_string(v)?),
        CellValue::Bytes(v) => Value::String(lua.create_string(v)?),
        CellValue::Timestamp(v) => {
            Value::String(lua.create_string(v.format(TIMESTAMP_FORMAT).to_string())?)
        }
    })
}

/// Install the `sql` global
pub(crate) fn register(lua: &Lua, manager: Arc<ConnectionManager>, handle: Handle) -> mlua::Result<()> {
    let sql = lua.create_table()?;

    let query_manager = Arc::clone(&manager);
    let query_handle = handle.clone();
    let query = lua.create_function(move |lua, statement: String| {
        let Some(database) = query_manager.current() else {
            return status_table(lua, Some(NO_CONNECTION));
        };

        let (columns, rows) = match block_on(&query_handle, database.fetch_all(&statement)) {
            Ok(result) => result,
            Err(e) => return status_table(lua, Some(&e.to_string())),
        };

        let result = status_table(lua, None)?;
        result.set("columns", lua.create_sequence_from(columns.iter().map(String::as_str))?)?;

        let data = lua.create_table()?;
        for (idx, row) in rows.iter().enumerate() {
            let values = lua.create_table()?;
            for (col, value) in row.values().iter().enumerate() {
                values.raw_set(col + 1, cell_to_lua(lua, value)?)?;
            }
            data.raw_set(idx + 1, values)?;
        }
        result.set("data", data)?;
        result.set("row_count", rows.len())?;
        Ok(result)
    })?;
    sql.set("query", query)?;

    let execute = lua.create_function(move |lua, statement: String| {
        let Some(database) = manager.current() else {
            return status_table(lua, Some(NO_CONNECTION));
        };

        match block_on(&handle, database.exec(&statement)) {
            Ok(outcome) => {
                let result = status_table(lua, None)?;
                result.set("rows_affected", outcome.affected_rows)?;
                result.set("last_insert_id", outcome.last_insert_id.unwrap_or(0))?;
                Ok(result)
            }
            Err(e) => status_table(lua, Some(&e.to_string())),
        }
    })?;
    sql.set("execute", execute)?;

    lua.globals().set("sql", sql)
}
