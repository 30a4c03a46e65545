//! Natural-language questions against a remote chat endpoint
//!
//! The question is enriched with the DDL of any known table it mentions,
//! sent to the endpoint, and fenced SQL blocks are pulled out of the answer.

use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::Database;
use crate::error::{CLIError, Result};

/// Default chat endpoint
pub const DEFAULT_ASK_ENDPOINT: &str = "https://tidb.ai/api/v1/chats";

const SPINNER_FRAMES: [&str; 4] = ["-", "\\", "|", "/"];
const SPINNER_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    chat_engine: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    content: String,
}

/// HTTP client for the chat endpoint
#[derive(Debug, Clone)]
pub struct AskClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AskClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one question and return the answer text
    pub async fn ask(&self, question: &str) -> Result<String> {
        let body = ChatRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: question,
            }],
            chat_engine: "default",
            stream: false,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| CLIError::HttpError(format!("unexpected answer format: {}", e)))?;
        Ok(parsed.content)
    }
}

/// Wrap `question` with the schema context
pub fn refine_question(question: &str, context: &str) -> String {
    format!(
        "Based on the context, answer the question in user's language\nContext:\n{}\nQuestion:\n{}",
        context, question
    )
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-zA-Z_]\w*\b").expect("valid regex literal"))
}

fn sql_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```sql\s*(.+?)\s*```").expect("valid regex literal"))
}

/// Known tables mentioned in `question`, in order of first mention
pub fn mentioned_tables(question: &str, tables: &[String]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for token in identifier_regex().find_iter(question).map(|m| m.as_str()) {
        if tables.iter().any(|t| t == token) && !found.iter().any(|f| f == token) {
            found.push(token.to_string());
        }
    }
    found
}

/// Schema context block for each `(table, ddl)` pair
pub fn build_context(schemas: &[(String, String)]) -> String {
    schemas
        .iter()
        .map(|(table, ddl)| format!("`{}` schema: {}\n---\n", table, ddl))
        .collect()
}

/// Collect `SHOW CREATE TABLE` output for every mentioned table.
///
/// Tables whose DDL cannot be read are skipped.
pub async fn schema_context(database: &Database, question: &str, tables: &[String]) -> String {
    let mut schemas = Vec::new();
    for table in mentioned_tables(question, tables) {
        let sql = format!("SHOW CREATE TABLE `{}`", table.replace('`', "``"));
        match database.fetch_all(&sql).await {
            Ok((_, rows)) => {
                let ddl = rows
                    .into_iter()
                    .next()
                    .and_then(|row| row.into_values().into_iter().nth(1))
                    .and_then(|value| value.text());
                if let Some(ddl) = ddl {
                    schemas.push((table, ddl));
                }
            }
            Err(e) => debug!("Skipping schema of {}: {}", table, e),
        }
    }
    build_context(&schemas)
}

/// Fenced SQL blocks in `answer`, each flattened to one line
pub fn extract_sql_blocks(answer: &str) -> Vec<String> {
    sql_block_regex()
        .captures_iter(answer)
        .filter_map(|caps| caps.get(1))
        .map(|body| {
            body.as_str()
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Spinner redrawn by a background thread until stopped.
///
/// Stopping joins the thread, so the line is guaranteed to be cleared
/// before the caller writes anything else.
pub struct BusyIndicator {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl BusyIndicator {
    pub fn start<W: Write + Send + 'static>(mut out: W, label: &str) -> Self {
        let (stop, signal) = mpsc::channel::<()>();
        let label = label.to_string();

        let worker = thread::spawn(move || {
            for frame in SPINNER_FRAMES.iter().cycle() {
                let _ = write!(out, "\r{} {}", label, frame);
                let _ = out.flush();
                match signal.recv_timeout(SPINNER_INTERVAL) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    _ => break,
                }
            }
            let _ = write!(out, "\r\x1b[K");
            let _ = out.flush();
        });

        Self {
            stop: Some(stop),
            worker: Some(worker),
        }
    }

    pub fn stop(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for BusyIndicator {
    fn drop(&mut self) {
        self.finish();
    }
}
