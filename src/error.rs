//! Error types for tip
//!
//! Every failure surfaced to the user goes through [`CLIError`]. Statement and
//! command errors are reported and the session continues; only startup
//! failures propagate out of `main`.

use std::fmt;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CLIError>;

/// Errors that can occur in the CLI
#[derive(Debug)]
pub enum CLIError {
    /// Opening a connection or its liveness check failed
    ConnectError(String),

    /// The statement classifier rejected the input
    ParseError(String),

    /// The database reported a failure for a statement
    ExecutionError(String),

    /// A renderer could not serialize or write its output
    RenderError(String),

    /// Compile or runtime failure inside the script interpreter
    ScriptError(String),

    /// Malformed dot-command invocation
    CommandArgumentError(String),

    /// Configuration file error
    ConfigurationError(String),

    /// File I/O error
    FileError(String),

    /// Outbound HTTP request failed
    HttpError(String),

    /// Readline error
    ReadlineError(String),

    /// History file error
    HistoryError(String),

    /// User cancelled operation
    Cancelled,
}

impl CLIError {
    /// Shorthand for a usage error carrying the command's usage text
    pub fn usage(usage: &str) -> Self {
        CLIError::CommandArgumentError(format!("usage: {}", usage))
    }
}

impl fmt::Display for CLIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CLIError::ConnectError(msg) => write!(f, "Connection error: {}", msg),
            CLIError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            CLIError::ExecutionError(msg) => write!(f, "Execution error: {}", msg),
            CLIError::RenderError(msg) => write!(f, "Render error: {}", msg),
            CLIError::ScriptError(msg) => write!(f, "Lua execution error: {}", msg),
            CLIError::CommandArgumentError(msg) => write!(f, "{}", msg),
            CLIError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            CLIError::FileError(msg) => write!(f, "File error: {}", msg),
            CLIError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            CLIError::ReadlineError(msg) => write!(f, "Input error: {}", msg),
            CLIError::HistoryError(msg) => write!(f, "History error: {}", msg),
            CLIError::Cancelled => write!(f, "Operation cancelled"),
        }
    }
}

impl std::error::Error for CLIError {}

impl From<rustyline::error::ReadlineError> for CLIError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        match err {
            rustyline::error::ReadlineError::Interrupted => CLIError::Cancelled,
            rustyline::error::ReadlineError::Eof => CLIError::Cancelled,
            e => CLIError::ReadlineError(e.to_string()),
        }
    }
}

impl From<std::io::Error> for CLIError {
    fn from(err: std::io::Error) -> Self {
        CLIError::FileError(err.to_string())
    }
}

impl From<toml::de::Error> for CLIError {
    fn from(err: toml::de::Error) -> Self {
        CLIError::ConfigurationError(format!("TOML parse error: {}", err))
    }
}

impl From<mysql_async::Error> for CLIError {
    fn from(err: mysql_async::Error) -> Self {
        CLIError::ExecutionError(err.to_string())
    }
}

impl From<mlua::Error> for CLIError {
    fn from(err: mlua::Error) -> Self {
        CLIError::ScriptError(err.to_string())
    }
}

impl From<reqwest::Error> for CLIError {
    fn from(err: reqwest::Error) -> Self {
        CLIError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for CLIError {
    fn from(err: serde_json::Error) -> Self {
        CLIError::RenderError(err.to_string())
    }
}
