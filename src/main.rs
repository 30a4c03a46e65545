//! tip - Terminal client for TiDB
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode
//! tip --host 127.0.0.1 -P 4000 -u root -d test
//!
//! # Execute one statement and exit
//! tip -o json -e "SELECT * FROM users;"
//!
//! # Piped statements, one per line
//! echo "SELECT 1;" | tip -o csv
//! ```

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;

use tip::config::{EnvSettings, DEFAULT_DATABASE};
use tip::formatter::{terminal_width, write_execution_details};
use tip::history::HistoryLog;
use tip::logging::init_logging;
use tip::session::execute_sql;
use tip::{
    CLIConfiguration, CLIError, CLISession, ConnectionManager, OutputFormat, Result, SessionContext,
    SessionOptions,
};

mod args;

use args::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = CLIConfiguration::load(cli.config.as_deref())?;

    let color = !cli.no_color && config.color() && io::stdout().is_terminal();
    colored::control::set_override(color);
    init_logging(cli.verbose, !cli.no_color && io::stderr().is_terminal())?;

    let env = EnvSettings::from_env();
    let info = config.resolve_connection(&cli.overrides(), &env)?;

    let manager = Arc::new(ConnectionManager::new(DEFAULT_DATABASE));
    if let Err(e) = manager.connect(info).await {
        warn!("Failed to connect to TiDB: {}", e);
    }

    let interactive = io::stdin().is_terminal();
    let format = match cli.output_format {
        Some(format) => format,
        None => config.format()?.unwrap_or(OutputFormat::Table),
    };
    let ctx = SessionContext::new(
        Arc::clone(&manager),
        SessionOptions {
            format,
            ask_endpoint: config.ask_endpoint(),
            interactive,
            color,
            verbose: cli.verbose,
        },
    );

    let result = match cli.execute {
        Some(sql) => execute_once(&ctx, &sql, cli.output_file.as_deref()).await,
        None => {
            let mut session = CLISession::new(ctx, HistoryLog::new());
            if interactive && manager.is_connected() {
                session.greeting().await;
            }
            session.run().await
        }
    };

    manager.shutdown().await;
    result
}

/// Run the `-e` statement, writing to `output` or stdout
async fn execute_once(ctx: &SessionContext, sql: &str, output: Option<&Path>) -> Result<()> {
    let summary = match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                CLIError::FileError(format!("Failed to create output file {}: {}", path.display(), e))
            })?;
            let mut writer = BufWriter::new(file);
            let summary = execute_sql(ctx, sql, &mut writer, None).await?;
            writer.flush()?;
            summary
        }
        None => {
            let mut writer = BufWriter::new(io::stdout());
            let summary = execute_sql(ctx, sql, &mut writer, terminal_width()).await?;
            writer.flush()?;
            summary
        }
    };

    if ctx.verbose {
        write_execution_details(&mut io::stderr(), &summary, ctx.color)?;
    }
    Ok(())
}
