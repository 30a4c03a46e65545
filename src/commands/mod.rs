//! Dot-command registry
//!
//! Commands are a fixed, ordered list of `{name, description, usage}`
//! records; the first record whose name matches the first token of the line
//! handles it. An unknown name is reported on the output sink and is not an
//! error.

use std::io::Write;

use crate::error::Result;
use crate::lexer;
use crate::session::SessionContext;

mod ask;
mod connect;
mod lua;
mod output_format;

/// Which handler a registered command dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Help,
    Version,
    RefreshCompletion,
    Connect,
    OutputFormat,
    Ask,
    LuaEval,
    LuaEvalFile,
}

/// A registered dot-command
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    kind: CommandKind,
}

/// Registered commands, in `.help` order
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: ".help",
        description: "Display help information for all available commands",
        usage: ".help",
        kind: CommandKind::Help,
    },
    CommandSpec {
        name: ".ver",
        description: "Display the current version of tip",
        usage: ".ver",
        kind: CommandKind::Version,
    },
    CommandSpec {
        name: ".refresh_completion",
        description: "Refresh completion (not implemented yet)",
        usage: ".refresh_completion",
        kind: CommandKind::RefreshCompletion,
    },
    CommandSpec {
        name: ".connect",
        description: "Connect to a TiDB database",
        usage: ".connect <host> <port> <user> <password> [database]",
        kind: CommandKind::Connect,
    },
    CommandSpec {
        name: ".output_format",
        description: "Set or display the current output format",
        usage: ".output_format [format]",
        kind: CommandKind::OutputFormat,
    },
    CommandSpec {
        name: ".ask",
        description: "Ask a question to the database",
        usage: ".ask <question>",
        kind: CommandKind::Ask,
    },
    CommandSpec {
        name: ".lua-eval",
        description: "Execute a Lua script",
        usage: ".lua-eval \"<script>\" [args...]",
        kind: CommandKind::LuaEval,
    },
    CommandSpec {
        name: ".lua-eval-file",
        description: "Execute a Lua file",
        usage: ".lua-eval-file <path-or-url> [args...]",
        kind: CommandKind::LuaEvalFile,
    },
];

/// Prefix that marks a line as a dot-command
pub const COMMAND_PREFIX: char = '.';

/// Whether `line` should be dispatched as a dot-command
pub fn is_command(line: &str) -> bool {
    line.trim_start().starts_with(COMMAND_PREFIX)
}

/// Names of all registered commands
pub fn command_names() -> Vec<String> {
    COMMANDS.iter().map(|c| c.name.to_string()).collect()
}

/// Look up a command by exact name
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// Split a raw line into the command token and the remaining text
fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim_start()),
        None => (line, ""),
    }
}

/// Dispatch one dot-command line
pub async fn dispatch(ctx: &mut SessionContext, line: &str, out: &mut dyn Write) -> Result<()> {
    let (name, rest) = split_command(line);
    let Some(spec) = find(name) else {
        writeln!(out, "Unknown command: {}, use .help for help", name)?;
        return Ok(());
    };

    match spec.kind {
        CommandKind::Help => write_help(out),
        CommandKind::Version => {
            writeln!(out, "tip version: {}", crate::VERSION)?;
            Ok(())
        }
        CommandKind::RefreshCompletion => {
            writeln!(out, "not impl yet")?;
            Ok(())
        }
        CommandKind::Connect => connect::run(ctx, spec, &lexer::split_args(rest)?, out).await,
        CommandKind::OutputFormat => {
            output_format::run(ctx, spec, &lexer::split_args(rest)?, out)
        }
        CommandKind::Ask => ask::run(ctx, spec, rest, out).await,
        CommandKind::LuaEval => lua::eval(ctx, spec, rest, out),
        CommandKind::LuaEvalFile => lua::eval_file(ctx, spec, rest, out).await,
    }
}

fn write_help(out: &mut dyn Write) -> Result<()> {
    for spec in COMMANDS {
        writeln!(out, "{} - {} - Usage: {}", spec.name, spec.description, spec.usage)?;
    }
    Ok(())
}
