//! Library entry point for tip components.
//!
//! Exposes the session, renderers, connection management and scripting
//! bridge so integration tests can drive them without going through the
//! binary entry point.

pub mod ask;
pub mod classifier;
pub mod commands;
pub mod completer;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod highlighter;
pub mod history;
pub mod lexer;
pub mod logging;
pub mod row;
pub mod scripting;
pub mod select_menu;
pub mod session;

pub use config::CLIConfiguration;
pub use connection::{ConnectionInfo, ConnectionManager};
pub use error::{CLIError, Result};
pub use formatter::OutputFormat;
pub use session::{CLISession, SessionContext, SessionOptions};

/// Client version reported by `.ver` and the greeting
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
