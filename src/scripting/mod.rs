//! Lua scripting bridge
//!
//! One interpreter per session, created on first use. Scripts see four
//! globals: `args`, `sql` (query/execute against the current connection),
//! `http` (fetch/poll/pending) and `sleep(ms)`.
//!
//! The interpreter only ever runs on the thread that called
//! [`ScriptBridge::run`]. Database calls and blocking requests are driven on
//! the tokio runtime from that thread; callback requests run as runtime
//! tasks and hand their results back through a queue that is drained inside
//! `sleep`, inside `http.poll` and once more after the chunk returns.

use std::future::Future;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;

use mlua::{Lua, MultiValue, Value};
use tokio::runtime::Handle;
use tracing::debug;

use crate::connection::ConnectionManager;
use crate::error::{CLIError, Result};

mod http_api;
pub mod source;
mod sql_api;

pub use http_api::{perform, HttpRequest, HttpResponse};

use http_api::CallbackQueue;

/// Run `future` to completion from synchronous interpreter code
pub(crate) fn block_on<F: Future>(handle: &Handle, future: F) -> F::Output {
    tokio::task::block_in_place(|| handle.block_on(future))
}

struct Interpreter {
    lua: Lua,
    queue: Rc<CallbackQueue>,
}

/// Lazily created, closable Lua interpreter wired to the session
pub struct ScriptBridge {
    manager: Arc<ConnectionManager>,
    http: reqwest::Client,
    interpreter: Option<Interpreter>,
}

impl ScriptBridge {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            interpreter: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.interpreter.is_some()
    }

    fn interpreter(&mut self) -> Result<&Interpreter> {
        if self.interpreter.is_none() {
            let handle = Handle::try_current()
                .map_err(|e| CLIError::ScriptError(format!("no async runtime available: {}", e)))?;

            let lua = Lua::new();
            let queue = Rc::new(CallbackQueue::new());
            sql_api::register(&lua, Arc::clone(&self.manager), handle.clone())?;
            http_api::register(&lua, self.http.clone(), handle, Rc::clone(&queue))?;
            debug!("Lua interpreter initialized");

            self.interpreter = Some(Interpreter { lua, queue });
        }

        self.interpreter
            .as_ref()
            .ok_or_else(|| CLIError::ScriptError("interpreter unavailable".into()))
    }

    /// Execute `source` with positional `args`, printing any non-nil
    /// return values to `out` as `=> v1, v2`.
    ///
    /// Must be called from within a multi-threaded tokio runtime.
    pub fn run(&mut self, name: &str, source: &str, args: &[String], out: &mut dyn Write) -> Result<()> {
        let interpreter = self.interpreter()?;
        let values = tokio::task::block_in_place(|| Self::eval(interpreter, name, source, args))?;

        let rendered: Vec<String> = values
            .into_iter()
            .filter(|value| !value.is_nil())
            .map(|value| display_value(&value))
            .collect();
        if !rendered.is_empty() {
            debug!("Lua chunk {} returned {:?}", name, rendered);
            writeln!(out, "=> {}", rendered.join(", "))?;
        }
        Ok(())
    }

    fn eval(interpreter: &Interpreter, name: &str, source: &str, args: &[String]) -> Result<MultiValue> {
        let lua = &interpreter.lua;
        lua.globals()
            .set("args", lua.create_sequence_from(args.iter().map(String::as_str))?)?;

        let values: MultiValue = lua.load(source).set_name(name).eval()?;
        interpreter.queue.drain(lua, None)?;
        Ok(values)
    }

    /// Drop the interpreter; the next run starts from a fresh one
    pub fn close(&mut self) {
        if let Some(interpreter) = self.interpreter.take() {
            interpreter.queue.clear(&interpreter.lua);
            debug!("Lua interpreter closed");
        }
    }
}

impl Drop for ScriptBridge {
    fn drop(&mut self) {
        self.close();
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(v) => v.to_string(),
        Value::Integer(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => v.to_string_lossy().to_string(),
        other => other.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    fn run(bridge: &mut ScriptBridge, source: &str, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        bridge.run("test", source, &args, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_return_values_are_printed() {
        let rt = runtime();
        let _guard = rt.enter();
        let mut bridge = ScriptBridge::new(Arc::new(ConnectionManager::new("test")));

        assert_eq!(run(&mut bridge, "return 1 + 1, 'x', nil", &[]).unwrap(), "=> 2, x\n");
        assert_eq!(run(&mut bridge, "local a = 1", &[]).unwrap(), "");
    }

    #[test]
    fn test_args_are_replaced_per_run() {
        let rt = runtime();
        let _guard = rt.enter();
        let mut bridge = ScriptBridge::new(Arc::new(ConnectionManager::new("test")));

        assert_eq!(
            run(&mut bridge, "return #args, args[1]", &["a", "b"]).unwrap(),
            "=> 2, a\n"
        );
        assert_eq!(run(&mut bridge, "return #args", &[]).unwrap(), "=> 0\n");
    }

    #[test]
    fn test_state_persists_until_closed() {
        let rt = runtime();
        let _guard = rt.enter();
        let mut bridge = ScriptBridge::new(Arc::new(ConnectionManager::new("test")));

        run(&mut bridge, "counter = 41", &[]).unwrap();
        assert_eq!(run(&mut bridge, "return counter + 1", &[]).unwrap(), "=> 42\n");

        bridge.close();
        assert!(!bridge.is_open());
        assert_eq!(run(&mut bridge, "return counter", &[]).unwrap(), "");
    }

    #[test]
    fn test_script_errors_become_script_errors() {
        let rt = runtime();
        let _guard = rt.enter();
        let mut bridge = ScriptBridge::new(Arc::new(ConnectionManager::new("test")));

        let err = run(&mut bridge, "error('bad things')", &[]).unwrap_err();
        assert!(matches!(err, CLIError::ScriptError(_)));
        assert!(err.to_string().contains("bad things"));

        let err = run(&mut bridge, "this is not lua", &[]).unwrap_err();
        assert!(matches!(err, CLIError::ScriptError(_)));
    }

    #[test]
    fn test_sql_query_without_connection() {
        let rt = runtime();
        let _guard = rt.enter();
        let mut bridge = ScriptBridge::new(Arc::new(ConnectionManager::new("test")));

        let out = run(
            &mut bridge,
            "local r = sql.query('SELECT 1') return r.ok, r.error ~= ''",
            &[],
        )
        .unwrap();
        assert_eq!(out, "=> false, true\n");
    }

    #[test]
    fn test_async_fetch_callback_runs_on_interpreter_thread() {
        let rt = runtime();
        let _guard = rt.enter();
        let mut bridge = ScriptBridge::new(Arc::new(ConnectionManager::new("test")));

        let script = r#"
            local done = false
            local result
            http.fetch("GET", "http://127.0.0.1:1/", nil, nil, function(ok, res)
                done = true
                result = ok
            end)
            local waited = 0
            while not done and waited < 5000 do
                sleep(20)
                waited = waited + 20
            end
            return done, result, http.pending()
        "#;
        assert_eq!(run(&mut bridge, script, &[]).unwrap(), "=> true, false, 0\n");
    }

    #[test]
    fn test_blocking_fetch_reports_failure() {
        let rt = runtime();
        let _guard = rt.enter();
        let mut bridge = ScriptBridge::new(Arc::new(ConnectionManager::new("test")));

        let out = run(
            &mut bridge,
            "local ok, err = http.fetch('GET', 'http://127.0.0.1:1/') return ok, type(err)",
            &[],
        )
        .unwrap();
        assert_eq!(out, "=> false, string\n");
    }
}
