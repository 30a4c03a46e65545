//! Shell-like argument splitting for dot-commands
//!
//! A backslash escapes the next character, double quotes toggle quoting and
//! unquoted whitespace separates arguments.

use crate::error::{CLIError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Normal,
    InQuote,
}

/// Split `input` into arguments, dropping quotes and escape backslashes.
///
/// An unterminated quote or a trailing lone backslash is an error.
pub fn split_args(input: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut state = LexState::Normal;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match (state, ch) {
            (_, '\\') => match chars.next() {
                Some(escaped) => {
                    current.push(escaped);
                    has_token = true;
                }
                None => {
                    return Err(CLIError::CommandArgumentError(
                        "dangling escape at end of input".into(),
                    ))
                }
            },
            (LexState::Normal, '"') => {
                state = LexState::InQuote;
                has_token = true;
            }
            (LexState::InQuote, '"') => state = LexState::Normal,
            (LexState::Normal, c) if c.is_whitespace() => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            (_, c) => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if state == LexState::InQuote {
        return Err(CLIError::CommandArgumentError("unterminated quote".into()));
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}

/// Take a leading double-quoted string off `input`.
///
/// Returns the quoted body and the remainder after the closing quote. Only
/// `\"` is unescaped inside the body so that script text keeps its own
/// escape sequences. `None` when `input` does not start with a complete
/// quoted string.
pub fn take_quoted(input: &str) -> Option<(String, &str)> {
    let rest = input.trim_start().strip_prefix('"')?;
    let mut body = String::new();
    let mut chars = rest.char_indices();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, '"')) => body.push('"'),
                Some((_, other)) => {
                    body.push('\\');
                    body.push(other);
                }
                None => return None,
            },
            '"' => return Some((body, &rest[idx + 1..])),
            c => body.push(c),
        }
    }
    None
}
