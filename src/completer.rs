//! TAB completion for SQL keywords, schema names and dot-commands
//!
//! Candidates are prefix-matched case-insensitively against the last
//! whitespace-delimited token before the cursor. Schema names come from a
//! [`MetadataCache`] that the REPL fills before showing the prompt, so
//! completion itself never touches the network.

use std::collections::HashMap;
use std::sync::Arc;

use colored::*;
use parking_lot::RwLock;
use rustyline::completion::{Completer, Pair};
use tracing::debug;

use crate::connection::Database;
use crate::error::Result;

pub(crate) const SQL_KEYWORDS: &[&str] = &[
    "USE",
    "SELECT",
    "FROM",
    "WHERE",
    "JOIN",
    "ON",
    "GROUP BY",
    "ORDER BY",
    "LIMIT",
    "OFFSET",
    "AS",
    "IS",
    "NULL",
    "NOT",
    "IN",
    "BETWEEN",
    "LIKE",
    "SHOW",
    "DATABASES",
    "TABLES",
    "COLUMNS",
    "INDEXES",
    "STATISTICS",
    "INSERT",
    "UPDATE",
    "DELETE",
    "DROP",
    "ALTER",
    "CREATE",
    "GRANT",
    "REVOKE",
    "SET",
    "AND",
    "OR",
    "XOR",
    "EXISTS",
];

/// Schema names fetched from the server, cached per process
#[derive(Debug, Default)]
pub struct MetadataCache {
    databases: Option<Vec<String>>,
    tables: HashMap<String, Vec<String>>,
    columns: HashMap<String, Vec<String>>,
    current: Option<String>,
}

/// Cache shared between the REPL, the completer and `.ask`
pub type SharedMetadata = Arc<RwLock<MetadataCache>>;

impl MetadataCache {
    pub fn shared() -> SharedMetadata {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn set_databases(&mut self, databases: Vec<String>) {
        self.databases = Some(databases);
    }

    /// Record tables and columns of `database`
    pub fn set_schema(&mut self, database: &str, tables: Vec<String>, columns: Vec<String>) {
        self.tables.insert(database.to_string(), tables);
        self.columns.insert(database.to_string(), columns);
    }

    pub fn has_schema(&self, database: &str) -> bool {
        self.tables.contains_key(database)
    }

    pub fn set_current(&mut self, database: Option<String>) {
        self.current = database;
    }

    pub fn databases(&self) -> &[String] {
        self.databases.as_deref().unwrap_or_default()
    }

    /// Tables of the current database
    pub fn tables(&self) -> &[String] {
        self.current_entry(&self.tables)
    }

    /// Columns of the current database
    pub fn columns(&self) -> &[String] {
        self.current_entry(&self.columns)
    }

    fn current_entry<'a>(&self, map: &'a HashMap<String, Vec<String>>) -> &'a [String] {
        self.current
            .as_ref()
            .and_then(|db| map.get(db))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Fill the cache for `current` unless it is already known.
///
/// Fetch failures are logged and leave the cache as it was.
pub async fn prefetch_metadata(database: &Database, cache: &SharedMetadata, current: Option<&str>) {
    cache.write().set_current(current.map(str::to_string));

    if cache.read().databases.is_none() {
        match database.fetch_column("SHOW DATABASES").await {
            Ok(databases) => cache.write().set_databases(databases),
            Err(e) => debug!("Failed to fetch databases for completion: {}", e),
        }
    }

    let Some(current) = current else {
        return;
    };
    if cache.read().has_schema(current) {
        return;
    }

    match fetch_schema(database, current).await {
        Ok((tables, columns)) => cache.write().set_schema(current, tables, columns),
        Err(e) => debug!("Failed to fetch schema of {} for completion: {}", current, e),
    }
}

async fn fetch_schema(database: &Database, name: &str) -> Result<(Vec<String>, Vec<String>)> {
    let tables = database.fetch_column("SHOW TABLES").await?;
    let mut columns = database
        .fetch_column(&format!(
            "SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_SCHEMA = {}",
            quote_literal(name)
        ))
        .await?;
    columns.sort();
    columns.dedup();
    Ok((tables, columns))
}

/// Single-quoted SQL string literal
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// Category of completion for styling
#[derive(Debug, Clone, Copy)]
enum CompletionCategory {
    Keyword,
    Database,
    Table,
    Column,
    Command,
}

/// Styled completion candidate
#[derive(Debug, Clone)]
struct StyledPair {
    display: String,
    replacement: String,
}

impl StyledPair {
    fn new(text: &str, category: CompletionCategory, color: bool) -> Self {
        let label = match category {
            CompletionCategory::Keyword => "keyword",
            CompletionCategory::Database => "database",
            CompletionCategory::Table => "table",
            CompletionCategory::Column => "column",
            CompletionCategory::Command => "command",
        };
        let display = if color {
            let name = match category {
                CompletionCategory::Keyword => text.blue().bold(),
                CompletionCategory::Database => text.cyan(),
                CompletionCategory::Table => text.green(),
                CompletionCategory::Column => text.yellow(),
                CompletionCategory::Command => text.cyan().bold(),
            };
            format!("{}  {}", name, label.dimmed())
        } else {
            text.to_string()
        };

        Self {
            display,
            replacement: text.to_string(),
        }
    }
}

/// Auto-completer for SQL and dot-commands
pub struct AutoCompleter {
    commands: Vec<String>,
    metadata: SharedMetadata,
    color: bool,
}

impl AutoCompleter {
    pub fn new(commands: Vec<String>, metadata: SharedMetadata, color: bool) -> Self {
        Self {
            commands,
            metadata,
            color,
        }
    }

    /// Start of the token being completed and the token itself
    fn current_token(line: &str, pos: usize) -> (usize, &str) {
        let before = &line[..pos];
        let start = before
            .rfind(char::is_whitespace)
            .map(|i| i + before[i..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(0);
        (start, &before[start..])
    }

    fn candidates(&self, token: &str) -> Vec<StyledPair> {
        if token.is_empty() {
            return Vec::new();
        }

        let needle = token.to_lowercase();
        let metadata = self.metadata.read();
        let mut results = Vec::new();

        let sources: [(Vec<&str>, CompletionCategory); 5] = [
            (SQL_KEYWORDS.to_vec(), CompletionCategory::Keyword),
            (
                metadata.databases().iter().map(String::as_str).collect(),
                CompletionCategory::Database,
            ),
            (
                metadata.tables().iter().map(String::as_str).collect(),
                CompletionCategory::Table,
            ),
            (
                metadata.columns().iter().map(String::as_str).collect(),
                CompletionCategory::Column,
            ),
            (
                self.commands.iter().map(String::as_str).collect(),
                CompletionCategory::Command,
            ),
        ];
        for (names, category) in sources {
            for name in names {
                if name.to_lowercase().starts_with(&needle) {
                    results.push(StyledPair::new(name, category, self.color));
                }
            }
        }

        results.dedup_by(|a, b| a.replacement == b.replacement);
        results
    }

    /// Remainder of the first candidate, shown as an inline hint
    pub fn completion_hint(&self, line: &str, pos: usize) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let (_, token) = Self::current_token(line, pos);
        self.candidates(token)
            .into_iter()
            .find(|c| c.replacement.len() > token.len() && c.replacement.is_char_boundary(token.len()))
            .map(|c| {
                let suffix = &c.replacement[token.len()..];
                if token.chars().all(|ch| !ch.is_ascii_uppercase()) {
                    suffix.to_lowercase()
                } else {
                    suffix.to_string()
                }
            })
    }
}

impl Completer for AutoCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, token) = Self::current_token(line, pos);
        let pairs = self
            .candidates(token)
            .into_iter()
            .map(|s| Pair {
                display: s.display,
                replacement: s.replacement,
            })
            .collect();
        Ok((start, pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completer() -> AutoCompleter {
        let metadata = MetadataCache::shared();
        {
            let mut cache = metadata.write();
            cache.set_databases(vec!["test".into(), "shop".into()]);
            cache.set_schema(
                "shop",
                vec!["users".into(), "user_sessions".into()],
                vec!["id".into(), "username".into()],
            );
            cache.set_current(Some("shop".into()));
        }
        AutoCompleter::new(vec![".help".into(), ".ver".into()], metadata, false)
    }

    fn replacements(completer: &AutoCompleter, line: &str) -> Vec<String> {
        let (_, token) = AutoCompleter::current_token(line, line.len());
        completer
            .candidates(token)
            .into_iter()
            .map(|c| c.replacement)
            .collect()
    }

    #[test]
    fn test_keyword_completion_is_case_insensitive() {
        let completer = completer();
        assert!(replacements(&completer, "sel").contains(&"SELECT".to_string()));
        assert!(replacements(&completer, "SeL").contains(&"SELECT".to_string()));
    }

    #[test]
    fn test_schema_names_are_completed() {
        let completer = completer();
        let found = replacements(&completer, "SELECT * FROM us");
        assert!(found.contains(&"USE".to_string()));
        assert!(found.contains(&"users".to_string()));
        assert!(found.contains(&"user_sessions".to_string()));
        assert!(found.contains(&"username".to_string()));

        let found = replacements(&completer, "USE sh");
        assert!(found.contains(&"shop".to_string()));
        assert!(!found.contains(&"test".to_string()));
    }

    #[test]
    fn test_command_completion() {
        let completer = completer();
        assert_eq!(replacements(&completer, ".h"), vec![".help".to_string()]);
    }

    #[test]
    fn test_trailing_space_yields_nothing() {
        let completer = completer();
        assert!(replacements(&completer, "SELECT ").is_empty());
    }

    #[test]
    fn test_tables_follow_current_database() {
        let completer = completer();
        completer.metadata.write().set_current(Some("test".into()));
        assert!(!replacements(&completer, "us").contains(&"users".to_string()));
    }

    #[test]
    fn test_completion_hint() {
        let completer = completer();
        assert_eq!(completer.completion_hint("sele", 4), Some("ct".to_string()));
        assert_eq!(completer.completion_hint("SELE", 4), Some("CT".to_string()));
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
