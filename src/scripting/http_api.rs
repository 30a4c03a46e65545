//! `http` global: blocking and callback-based requests
//!
//! Callback requests run as tasks on the tokio runtime. A finished request
//! never touches the interpreter; it posts a [`Completion`] to the queue and
//! the interpreter thread invokes the callback when it drains the queue.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use mlua::{Function, Lua, RegistryKey, Table, Value};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use tokio::runtime::Handle;
use tracing::debug;

use super::block_on;

/// Response handed to scripts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    /// First value per header name
    pub headers: Vec<(String, String)>,
}

/// A request as described by the script
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Outcome posted by a background request
pub(crate) struct Completion {
    id: u64,
    outcome: std::result::Result<HttpResponse, String>,
}

/// Single-consumer queue of finished requests plus their pending callbacks
pub(crate) struct CallbackQueue {
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    pending: RefCell<HashMap<u64, RegistryKey>>,
    next_id: Cell<u64>,
}

impl CallbackQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            pending: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }

    fn register(&self, lua: &Lua, callback: Function) -> mlua::Result<u64> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let key = lua.create_registry_value(callback)?;
        self.pending.borrow_mut().insert(id, key);
        Ok(id)
    }

    /// Callbacks still waiting for their request
    pub(crate) fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Deliver completions on the calling (interpreter) thread.
    ///
    /// Without a deadline only already finished requests are delivered;
    /// with one, this waits for further completions until it passes.
    /// Returns the number of callbacks invoked.
    pub(crate) fn drain(&self, lua: &Lua, deadline: Option<Instant>) -> mlua::Result<usize> {
        let mut delivered = 0;
        loop {
            let next = match deadline {
                None => self.receiver.try_recv().ok(),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match self.receiver.recv_timeout(remaining) {
                        Ok(completion) => Some(completion),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => {
                            std::thread::sleep(remaining);
                            None
                        }
                    }
                }
            };
            let Some(completion) = next else {
                return Ok(delivered);
            };

            let key = self.pending.borrow_mut().remove(&completion.id);
            let Some(key) = key else {
                debug!("Dropping completion {} without a callback", completion.id);
                continue;
            };
            let callback: Function = lua.registry_value(&key)?;
            lua.remove_registry_value(key)?;

            match completion.outcome {
                Ok(response) => callback.call::<()>((true, response_table(lua, &response)?))?,
                Err(message) => callback.call::<()>((false, message))?,
            }
            delivered += 1;
        }
    }

    /// Drop callbacks whose requests will never be delivered
    pub(crate) fn clear(&self, lua: &Lua) {
        for (_, key) in self.pending.borrow_mut().drain() {
            let _ = lua.remove_registry_value(key);
        }
    }
}

/// Perform one request
pub async fn perform(
    client: &reqwest::Client,
    request: HttpRequest,
) -> std::result::Result<HttpResponse, String> {
    let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("invalid HTTP method: {}", request.method))?;

    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid header name {}: {}", name, e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| format!("invalid header value for {}: {}", name, e))?;
        headers.append(name, value);
    }

    let mut builder = client.request(method, &request.url).headers(headers);
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    let response = builder.send().await.map_err(|e| e.to_string())?;
    let status_code = response.status().as_u16();

    let mut first_values: Vec<(String, String)> = Vec::new();
    for (name, value) in response.headers() {
        if first_values.iter().any(|(n, _)| n == name.as_str()) {
            continue;
        }
        first_values.push((
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        ));
    }

    let body = response.text().await.map_err(|e| e.to_string())?;
    Ok(HttpResponse {
        status_code,
        body,
        headers: first_values,
    })
}

fn response_table(lua: &Lua, response: &HttpResponse) -> mlua::Result<Table> {
    let headers = lua.create_table()?;
    for (name, value) in &response.headers {
        headers.set(name.as_str(), value.as_str())?;
    }

    let table = lua.create_table()?;
    table.set("status_code", response.status_code)?;
    table.set("body", response.body.as_str())?;
    table.set("headers", headers)?;
    Ok(table)
}

fn header_pairs(headers: Option<Table>) -> mlua::Result<Vec<(String, String)>> {
    let Some(headers) = headers else {
        return Ok(Vec::new());
    };
    headers.pairs::<String, String>().collect()
}

/// Install the `http` global
pub(crate) fn register(
    lua: &Lua,
    client: reqwest::Client,
    handle: Handle,
    queue: Rc<CallbackQueue>,
) -> mlua::Result<()> {
    let http = lua.create_table()?;

    let fetch_queue = Rc::clone(&queue);
    let fetch = lua.create_function(
        move |lua,
              (method, url, headers, body, callback): (
            String,
            String,
            Option<Table>,
            Option<String>,
            Option<Function>,
        )| {
            let request = HttpRequest {
                method,
                url,
                headers: header_pairs(headers)?,
                body,
            };

            let Some(callback) = callback else {
                let outcome = block_on(&handle, perform(&client, request));
                return match outcome {
                    Ok(response) => Ok((true, Value::Table(response_table(lua, &response)?))),
                    Err(message) => Ok((false, Value::String(lua.create_string(&message)?))),
                };
            };

            let id = fetch_queue.register(lua, callback)?;
            let sender = fetch_queue.sender.clone();
            let client = client.clone();
            handle.spawn(async move {
                let outcome = perform(&client, request).await;
                // the receiver is gone once the interpreter has been closed
                let _ = sender.send(Completion { id, outcome });
            });
            Ok((true, Value::Nil))
        },
    )?;
    http.set("fetch", fetch)?;

    let poll_queue = Rc::clone(&queue);
    http.set(
        "poll",
        lua.create_function(move |lua, ()| poll_queue.drain(lua, None))?,
    )?;

    let pending_queue = Rc::clone(&queue);
    http.set(
        "pending",
        lua.create_function(move |_, ()| Ok(pending_queue.pending()))?,
    )?;

    lua.globals().set("http", http)?;

    let sleep_queue = queue;
    let sleep = lua.create_function(move |lua, millis: u64| {
        let deadline = Instant::now() + Duration::from_millis(millis);
        sleep_queue.drain(lua, Some(deadline)).map(|_| ())
    })?;
    lua.globals().set("sleep", sleep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_invokes_callbacks_once() {
        let lua = Lua::new();
        let queue = CallbackQueue::new();

        lua.load("calls = {}").exec().unwrap();
        let callback: Function = lua
            .load("return function(ok, res) table.insert(calls, {ok, res.status_code}) end")
            .eval()
            .unwrap();
        let id = queue.register(&lua, callback).unwrap();
        assert_eq!(queue.pending(), 1);

        queue
            .sender
            .send(Completion {
                id,
                outcome: Ok(HttpResponse {
                    status_code: 204,
                    body: String::new(),
                    headers: vec![("x-test".into(), "1".into())],
                }),
            })
            .unwrap();

        assert_eq!(queue.drain(&lua, None).unwrap(), 1);
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.drain(&lua, None).unwrap(), 0);

        let status: i64 = lua.load("return calls[1][2]").eval().unwrap();
        assert_eq!(status, 204);
    }

    #[test]
    fn test_failed_request_passes_error_text() {
        let lua = Lua::new();
        let queue = CallbackQueue::new();

        let callback: Function = lua
            .load("return function(ok, err) last_ok, last_err = ok, err end")
            .eval()
            .unwrap();
        let id = queue.register(&lua, callback).unwrap();
        queue
            .sender
            .send(Completion {
                id,
                outcome: Err("connection refused".into()),
            })
            .unwrap();

        queue.drain(&lua, Some(Instant::now())).unwrap();
        let (ok, err): (bool, String) = lua.load("return last_ok, last_err").eval().unwrap();
        assert!(!ok);
        assert_eq!(err, "connection refused");
    }

    #[test]
    fn test_callback_error_propagates() {
        let lua = Lua::new();
        let queue = CallbackQueue::new();

        let callback: Function = lua.load("return function() error('boom') end").eval().unwrap();
        let id = queue.register(&lua, callback).unwrap();
        queue
            .sender
            .send(Completion {
                id,
                outcome: Err("x".into()),
            })
            .unwrap();

        let err = queue.drain(&lua, None).unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_response_table_shape() {
        let lua = Lua::new();
        let table = response_table(
            &lua,
            &HttpResponse {
                status_code: 200,
                body: "hello".into(),
                headers: vec![("content-type".into(), "text/plain".into())],
            },
        )
        .unwrap();

        assert_eq!(table.get::<u16>("status_code").unwrap(), 200);
        assert_eq!(table.get::<String>("body").unwrap(), "hello");
        let headers: Table = table.get("headers").unwrap();
        assert_eq!(headers.get::<String>("content-type").unwrap(), "text/plain");
    }
}
