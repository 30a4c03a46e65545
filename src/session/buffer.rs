//! Statement assembly
//!
//! Lines are accumulated until one ends with `;`. Dot-commands pass through
//! without touching the buffer. Piped input must deliver every statement on
//! lines that each end with the terminator; anything else is rejected and
//! the buffer discarded.

use crate::commands;

/// Statement terminator
pub const TERMINATOR: char = ';';

/// Where the lines come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Interactive,
    Piped,
}

/// Observable state of the assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    AwaitingStatement,
    AccumulatingStatement,
}

/// What the caller should do with the line just pushed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    /// Blank line with nothing buffered
    Ignore,
    /// Dispatch this trimmed dot-command line
    Command(String),
    /// More input is needed
    Continue,
    /// Classify and run this complete statement text
    Execute(String),
    /// Piped line without a terminator; the buffer was discarded
    Rejected,
}

#[derive(Debug)]
pub struct StatementAssembler {
    buffer: String,
    mode: InputMode,
}

impl StatementAssembler {
    pub fn new(mode: InputMode) -> Self {
        Self {
            buffer: String::new(),
            mode,
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn state(&self) -> AssemblerState {
        if self.buffer.is_empty() {
            AssemblerState::AwaitingStatement
        } else {
            AssemblerState::AccumulatingStatement
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard anything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Feed one raw input line (without its newline)
    pub fn push_line(&mut self, line: &str) -> LineAction {
        let trimmed = line.trim();

        if commands::is_command(trimmed) {
            return LineAction::Command(trimmed.to_string());
        }
        if trimmed.is_empty() && self.buffer.is_empty() {
            return LineAction::Ignore;
        }

        self.buffer.push_str(line);
        self.buffer.push('\n');

        if trimmed.ends_with(TERMINATOR) {
            let statement = self.buffer.trim().to_string();
            self.buffer.clear();
            return LineAction::Execute(statement);
        }

        if self.mode == InputMode::Piped {
            self.buffer.clear();
            return LineAction::Rejected;
        }
        LineAction::Continue
    }
}
