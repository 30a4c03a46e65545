//! Syntax highlighting for the input line

use std::collections::HashSet;

use colored::*;

use crate::completer::SQL_KEYWORDS;

/// Keywords highlighted in addition to the completion list
const EXTRA_KEYWORDS: &[&str] = &[
    "INTO", "VALUES", "TABLE", "DATABASE", "INDEX", "VIEW", "DISTINCT", "HAVING", "UNION", "ALL",
    "CASE", "WHEN", "THEN", "ELSE", "END", "ASC", "DESC", "DESCRIBE", "EXPLAIN", "BEGIN", "COMMIT",
    "ROLLBACK", "TRUE", "FALSE",
];

type CharIter<'a> = std::iter::Peekable<std::str::Chars<'a>>;

pub struct SqlHighlighter {
    keywords: HashSet<String>,
    color_enabled: bool,
}

impl SqlHighlighter {
    pub fn new(color_enabled: bool) -> Self {
        let keywords = SQL_KEYWORDS
            .iter()
            .flat_map(|kw| kw.split_whitespace())
            .chain(EXTRA_KEYWORDS.iter().copied())
            .map(str::to_ascii_uppercase)
            .collect();

        Self {
            keywords,
            color_enabled,
        }
    }

    pub fn color_enabled(&self) -> bool {
        self.color_enabled
    }

    /// Highlighted copy of `line`, `None` when nothing would change
    pub fn highlight(&self, line: &str) -> Option<String> {
        if !self.color_enabled || line.trim().is_empty() || line.trim_start().starts_with('.') {
            return None;
        }

        Some(self.highlight_line(line))
    }

    fn highlight_line(&self, line: &str) -> String {
        let mut result = String::with_capacity(line.len() * 2);
        let mut iter = line.chars().peekable();

        while let Some(ch) = iter.next() {
            if ch.is_whitespace() {
                result.push(ch);
                continue;
            }

            if ch == '#' || (ch == '-' && iter.peek() == Some(&'-')) {
                let comment: String = std::iter::once(ch).chain(iter.by_ref()).collect();
                result.push_str(&comment.dimmed().to_string());
                return result;
            }

            if ch == '\'' || ch == '"' || ch == '`' {
                result.push_str(&self.collect_quoted(ch, &mut iter));
                continue;
            }

            if ch.is_ascii_digit() {
                result.push_str(&Self::collect_number(ch, &mut iter));
                continue;
            }

            if ch.is_alphabetic() || ch == '_' {
                result.push_str(&self.collect_identifier(ch, &mut iter));
                continue;
            }

            result.push(ch);
        }

        result
    }

    fn collect_quoted(&self, quote: char, iter: &mut CharIter<'_>) -> String {
        let mut literal = String::from(quote);
        let mut escaped = false;

        while let Some(next) = iter.next() {
            literal.push(next);
            if escaped {
                escaped = false;
            } else if next == '\\' && quote != '`' {
                escaped = true;
            } else if next == quote {
                if iter.peek() == Some(&quote) {
                    literal.push(quote);
                    iter.next();
                    continue;
                }
                break;
            }
        }

        if quote == '`' {
            literal
        } else {
            literal.green().to_string()
        }
    }

    fn collect_number(first: char, iter: &mut CharIter<'_>) -> String {
        let mut number = String::from(first);

        while let Some(&next) = iter.peek() {
            if next.is_ascii_alphanumeric() || next == '.' {
                number.push(next);
                iter.next();
            } else {
                break;
            }
        }

        number.yellow().to_string()
    }

    fn collect_identifier(&self, first: char, iter: &mut CharIter<'_>) -> String {
        let mut ident = String::from(first);

        while let Some(&next) = iter.peek() {
            if next.is_alphanumeric() || next == '_' || next == '$' {
                ident.push(next);
                iter.next();
            } else {
                break;
            }
        }

        if self.keywords.contains(&ident.to_ascii_uppercase()) {
            ident.blue().bold().to_string()
        } else {
            ident
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_highlighter_leaves_line_alone() {
        let highlighter = SqlHighlighter::new(false);
        assert!(highlighter.highlight("SELECT 1;").is_none());
    }

    #[test]
    fn test_dot_commands_are_not_highlighted() {
        let highlighter = SqlHighlighter::new(true);
        assert!(highlighter.highlight(".output_format csv").is_none());
    }

    #[test]
    fn test_highlight_keeps_text() {
        colored::control::set_override(false);
        let highlighter = SqlHighlighter::new(true);
        let line = "select 'it''s', 42 from t -- note";
        assert_eq!(highlighter.highlight(line).unwrap(), line);
        colored::control::unset_override();
    }
}
