//! Interactive and piped sessions
//!
//! [`SessionContext`] is the state every dot-command and statement sees: the
//! shared connection manager, the selected output format, the one-shot
//! prompt suggestion, the completion metadata and the scripting bridge.
//! [`CLISession`] drives the read loop on top of it.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, EditMode, Editor};
use tracing::{debug, warn};

use crate::ask::AskClient;
use crate::classifier::classify;
use crate::commands;
use crate::completer::{prefetch_metadata, AutoCompleter, MetadataCache, SharedMetadata};
use crate::connection::ConnectionManager;
use crate::error::{CLIError, Result};
use crate::executor;
use crate::formatter::{renderer_for, terminal_width, write_execution_details, OutputFormat, ResultSummary};
use crate::history::HistoryLog;
use crate::scripting::ScriptBridge;

mod buffer;
mod helper;

pub use buffer::{AssemblerState, InputMode, LineAction, StatementAssembler, TERMINATOR};
pub use helper::CLIHelper;

/// Reported when a statement arrives without a connection
pub const NOT_CONNECTED: &str =
    "Not connected to any database. Use .connect to establish a connection.";

/// Reported for piped lines that do not end with the terminator
pub const PIPE_FRAMING: &str = "Input from pipe must end with a semicolon.";

/// Prompt shown while disconnected
const DISCONNECTED_PROMPT: &str = "tip> ";

/// Startup options for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub format: OutputFormat,
    pub ask_endpoint: String,
    /// Input comes from a terminal
    pub interactive: bool,
    pub color: bool,
    pub verbose: bool,
}

/// State shared by statements and dot-commands
pub struct SessionContext {
    pub manager: Arc<ConnectionManager>,
    pub format: OutputFormat,
    /// Statement that pre-fills the next prompt, consumed once
    pub suggestion: Option<String>,
    pub metadata: SharedMetadata,
    pub scripts: ScriptBridge,
    pub ask: AskClient,
    pub http: reqwest::Client,
    pub interactive: bool,
    pub color: bool,
    pub verbose: bool,
}

impl SessionContext {
    pub fn new(manager: Arc<ConnectionManager>, options: SessionOptions) -> Self {
        Self {
            scripts: ScriptBridge::new(Arc::clone(&manager)),
            manager,
            format: options.format,
            suggestion: None,
            metadata: MetadataCache::shared(),
            ask: AskClient::new(options.ask_endpoint),
            http: reqwest::Client::new(),
            interactive: options.interactive,
            color: options.color,
            verbose: options.verbose,
        }
    }

    /// Whether the execution footer goes to stderr
    pub fn show_details(&self) -> bool {
        self.verbose || self.interactive
    }

    /// Take the pending suggestion, leaving the slot empty
    pub fn take_suggestion(&mut self) -> Option<String> {
        self.suggestion.take()
    }

    /// Print an error on stderr
    pub fn report_error(&self, err: &CLIError) {
        if self.color {
            eprintln!("{}", format!("✗ {}", err).red());
        } else {
            eprintln!("Error: {}", err);
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(
            Arc::new(ConnectionManager::new("test")),
            SessionOptions {
                format: OutputFormat::Table,
                ask_endpoint: "http://127.0.0.1:1/api/v1/chats".into(),
                interactive: false,
                color: false,
                verbose: false,
            },
        )
    }
}

/// Classify `sql`, run it on the current connection and render the result
/// into `sink` with the session's output format.
pub async fn execute_sql<W: Write>(
    ctx: &SessionContext,
    sql: &str,
    sink: W,
    table_width: Option<usize>,
) -> Result<ResultSummary> {
    let database = ctx
        .manager
        .current()
        .ok_or_else(|| CLIError::ConnectError(NOT_CONNECTED.into()))?;
    let category = classify(sql)?;
    debug!("Executing {:?} statement", category);

    let mut renderer = renderer_for(ctx.format, sink, table_width);
    executor::execute(&database, sql, category, renderer.as_mut(), ctx.interactive).await
}

/// Read loop over a [`SessionContext`]
pub struct CLISession {
    ctx: SessionContext,
    history: HistoryLog,
}

impl CLISession {
    pub fn new(ctx: SessionContext, history: HistoryLog) -> Self {
        Self { ctx, history }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Print the client version and the server version block on stderr
    pub async fn greeting(&self) {
        eprintln!("tip version: {}", crate::VERSION);

        let Some(database) = self.ctx.manager.current() else {
            return;
        };
        match database.fetch_scalar("SELECT tidb_version()").await {
            Ok(Some(info)) => {
                eprintln!("------ server info ------");
                for line in info.lines() {
                    eprintln!("{}", line);
                }
                eprintln!("-------------------------");
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to get server info: {}", e),
        }
    }

    /// Run until end of input, loading and saving history around the loop
    pub async fn run(&mut self) -> Result<()> {
        if let Err(e) = self.history.load() {
            warn!("Failed to load history from {}: {}", self.history.path().display(), e);
        }

        let result = if self.ctx.interactive {
            self.run_interactive().await
        } else {
            self.run_piped(io::stdin().lock()).await
        };

        if let Err(e) = self.history.save() {
            warn!("Failed to save history to {}: {}", self.history.path().display(), e);
        }
        self.ctx.scripts.close();
        result
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let completer = AutoCompleter::new(
            commands::command_names(),
            Arc::clone(&self.ctx.metadata),
            self.ctx.color,
        );
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .completion_prompt_limit(100)
            .edit_mode(EditMode::Emacs)
            .auto_add_history(false)
            .build();

        let mut rl = Editor::<CLIHelper, DefaultHistory>::with_config(config)?;
        rl.set_helper(Some(CLIHelper::new(completer, self.ctx.color)));
        for entry in self.history.entries() {
            let _ = rl.add_history_entry(entry.as_str());
        }

        let mut assembler = StatementAssembler::new(InputMode::Interactive);
        loop {
            let prompt = self.prompt(&assembler).await;
            let input = match self.ctx.take_suggestion() {
                Some(suggestion) => rl.readline_with_initial(&prompt, (&suggestion, "")),
                None => rl.readline(&prompt),
            };

            match input {
                Ok(line) => {
                    if let Some(entry) = self.handle_line(&mut assembler, &line).await {
                        let _ = rl.add_history_entry(entry.as_str());
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    if !assembler.is_empty() {
                        assembler.clear();
                        eprintln!("{}", "Statement cancelled".yellow());
                    }
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Read newline-separated input until it runs out
    pub async fn run_piped<R: BufRead>(&mut self, input: R) -> Result<()> {
        let mut assembler = StatementAssembler::new(InputMode::Piped);
        for line in input.lines() {
            let line = line?;
            self.handle_line(&mut assembler, &line).await;
        }
        Ok(())
    }

    /// Process one input line. Returns the history entry it produced, if any.
    async fn handle_line(&mut self, assembler: &mut StatementAssembler, line: &str) -> Option<String> {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !commands::is_command(trimmed) && !self.ctx.manager.is_connected() {
            assembler.clear();
            self.ctx.report_error(&CLIError::ConnectError(NOT_CONNECTED.into()));
            return None;
        }

        match assembler.push_line(line) {
            LineAction::Ignore | LineAction::Continue => None,
            LineAction::Command(command) => {
                let mut out = io::stdout();
                if let Err(e) = commands::dispatch(&mut self.ctx, &command, &mut out).await {
                    debug!("Command {} failed: {}", command, e);
                    self.ctx.report_error(&e);
                }
                let _ = out.flush();
                self.history.push(&command);
                Some(command)
            }
            LineAction::Execute(statement) => {
                let recorded = self.run_statement(&statement).await;
                recorded.then_some(statement)
            }
            LineAction::Rejected => {
                self.ctx
                    .report_error(&CLIError::ExecutionError(PIPE_FRAMING.into()));
                None
            }
        }
    }

    /// Execute one complete statement and report the outcome.
    /// Returns whether it was recorded in history.
    async fn run_statement(&mut self, statement: &str) -> bool {
        let started = Instant::now();
        let width = if self.ctx.interactive { terminal_width() } else { None };
        let result = execute_sql(&self.ctx, statement, io::stdout(), width).await;

        let recorded = !matches!(
            result,
            Err(CLIError::ParseError(_)) | Err(CLIError::ConnectError(_))
        );
        if recorded {
            self.history.push(statement);
        }

        match result {
            Ok(summary) => {
                debug!("Statement finished in {:?}", started.elapsed());
                if self.ctx.show_details() {
                    let mut err = io::stderr();
                    if let Err(e) = write_execution_details(&mut err, &summary, self.ctx.color) {
                        debug!("Failed to write execution details: {}", e);
                    }
                }
            }
            Err(e) => self.ctx.report_error(&e),
        }
        recorded
    }

    /// `<db>> `, `<db>>>> ` while accumulating, `tip> ` when disconnected
    async fn prompt(&self, assembler: &StatementAssembler) -> String {
        let Some(database) = self.ctx.manager.current() else {
            return DISCONNECTED_PROMPT.to_string();
        };

        let current = self.ctx.manager.refresh_current_database().await;
        prefetch_metadata(&database, &self.ctx.metadata, current.as_deref()).await;

        let name = current.as_deref().unwrap_or("(none)");
        match assembler.state() {
            AssemblerState::AwaitingStatement => format!("{}> ", name),
            AssemblerState::AccumulatingStatement => format!("{}>>> ", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (tempfile::TempDir, CLISession) {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryLog::with_path(dir.path().join("history"));
        (dir, CLISession::new(SessionContext::for_tests(), history))
    }

    #[tokio::test]
    async fn test_piped_commands_run_without_connection() {
        let (_dir, mut session) = session();
        let input = ".output_format json\nSELECT 1;\n\n.output_format\n";

        session.run_piped(input.as_bytes()).await.unwrap();

        assert_eq!(session.context().format, OutputFormat::Json);
        assert_eq!(
            session.history().entries(),
            &[".output_format json".to_string(), ".output_format".to_string()]
        );
    }

    #[tokio::test]
    async fn test_statement_without_connection_is_not_recorded() {
        let (_dir, mut session) = session();
        let mut assembler = StatementAssembler::new(InputMode::Interactive);

        assert_eq!(session.handle_line(&mut assembler, "SELECT").await, None);
        assert_eq!(assembler.state(), AssemblerState::AwaitingStatement);
        assert!(session.history().entries().is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_prompt() {
        let (_dir, session) = session();
        let assembler = StatementAssembler::new(InputMode::Interactive);
        assert_eq!(session.prompt(&assembler).await, "tip> ");
    }

    #[test]
    fn test_suggestion_is_consumed_once() {
        let mut ctx = SessionContext::for_tests();
        ctx.suggestion = Some("SELECT 1;".into());
        assert_eq!(ctx.take_suggestion().as_deref(), Some("SELECT 1;"));
        assert_eq!(ctx.take_suggestion(), None);
    }

    #[test]
    fn test_details_follow_verbosity() {
        let mut ctx = SessionContext::for_tests();
        assert!(!ctx.show_details());
        ctx.verbose = true;
        assert!(ctx.show_details());
    }
}
