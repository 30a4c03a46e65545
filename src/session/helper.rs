//! Line-editor helper: completion, inline hints and highlighting

use std::borrow::Cow;

use colored::Colorize;
use rustyline::completion::Completer;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::Helper;

use crate::completer::AutoCompleter;
use crate::highlighter::SqlHighlighter;

pub struct CLIHelper {
    completer: AutoCompleter,
    highlighter: SqlHighlighter,
}

impl CLIHelper {
    pub fn new(completer: AutoCompleter, color_enabled: bool) -> Self {
        Self {
            highlighter: SqlHighlighter::new(color_enabled),
            completer,
        }
    }
}

impl Completer for CLIHelper {
    type Candidate = <AutoCompleter as Completer>::Candidate;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        self.completer.complete(line, pos, ctx)
    }
}

impl Hinter for CLIHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        self.completer.completion_hint(line, pos)
    }
}

impl Highlighter for CLIHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match self.highlighter.highlight(line) {
            Some(highlighted) => Cow::Owned(highlighted),
            None => Cow::Borrowed(line),
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        if self.highlighter.color_enabled() && !hint.is_empty() {
            Cow::Owned(hint.dimmed().to_string())
        } else {
            Cow::Borrowed(hint)
        }
    }

    fn highlight_char(&self, line: &str, _pos: usize, _forced: bool) -> bool {
        self.highlighter.color_enabled() && !line.is_empty()
    }
}

impl Validator for CLIHelper {}

impl Helper for CLIHelper {}
