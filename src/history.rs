//! Statement history persistence
//!
//! Entries are kept in order, never deduplicated and never truncated. The
//! file is loaded once at session start and overwritten at session end.

use std::path::{Path, PathBuf};

use crate::error::{CLIError, Result};

/// Written at the end of a stored line that continues on the next one.
/// Trailing backslashes that belong to the entry are stored doubled, so an
/// odd count always marks a continuation.
const LINE_CONTINUATION: char = '\\';

/// Persisted history log
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
    entries: Vec<String>,
}

impl HistoryLog {
    /// History at the per-user default location (`~/.tip/history`)
    pub fn new() -> Self {
        Self::with_path(default_history_path())
    }

    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: Vec::new(),
        }
    }

    /// Load entries from disk. A missing file is an empty history.
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| CLIError::HistoryError(format!("Failed to read history file: {}", e)))?;

        self.entries = decode_entries(&contents);
        Ok(())
    }

    /// Overwrite the file with every in-memory entry
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut contents = self
            .entries
            .iter()
            .map(|entry| encode_entry(entry))
            .collect::<Vec<_>>()
            .join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }

        std::fs::write(&self.path, contents)
            .map_err(|e| CLIError::HistoryError(format!("Failed to write history file: {}", e)))
    }

    /// Append one entry verbatim
    pub fn push(&mut self, entry: &str) {
        self.entries.push(entry.to_string());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

/// `~/.tip/history`, or `./.tip/history` when no home directory is known
pub fn default_history_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tip")
        .join("history")
}

fn encode_entry(entry: &str) -> String {
    let lines: Vec<&str> = entry.split('\n').collect();
    let mut encoded = String::with_capacity(entry.len() + lines.len());
    for (i, line) in lines.iter().enumerate() {
        let body = line.trim_end_matches(LINE_CONTINUATION);
        encoded.push_str(body);
        for _ in 0..(line.len() - body.len()) * 2 {
            encoded.push(LINE_CONTINUATION);
        }
        if i + 1 < lines.len() {
            encoded.push(LINE_CONTINUATION);
            encoded.push('\n');
        }
    }
    encoded
}

/// Split a stored line into its text and whether the entry continues
fn decode_line(line: &str) -> (String, bool) {
    let body = line.trim_end_matches(LINE_CONTINUATION);
    let trailing = line.len() - body.len();
    let mut text = body.to_string();
    for _ in 0..trailing / 2 {
        text.push(LINE_CONTINUATION);
    }
    (text, trailing % 2 == 1)
}

fn decode_entries(contents: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut pending: Option<String> = None;

    for line in contents.lines() {
        let (text, continues) = decode_line(line);

        let entry = match pending.take() {
            Some(mut entry) => {
                entry.push('\n');
                entry.push_str(&text);
                entry
            }
            None => text,
        };

        if continues {
            pending = Some(entry);
        } else {
            entries.push(entry);
        }
    }

    entries.extend(pending);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = tempdir().unwrap();
        let mut history = HistoryLog::with_path(dir.path().join("history"));
        history.load().unwrap();
        assert!(history.entries().is_empty());
    }

    #[test]
    fn test_entries_survive_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history");

        let mut history = HistoryLog::with_path(&path);
        history.push("SELECT 1;");
        history.push("SELECT 1;");
        history.push("SELECT *\nFROM t;");
        history.push(".output_format csv");
        history.save().unwrap();

        let mut reloaded = HistoryLog::with_path(&path);
        reloaded.load().unwrap();
        assert_eq!(
            reloaded.entries(),
            &["SELECT 1;", "SELECT 1;", "SELECT *\nFROM t;", ".output_format csv"]
        );
    }

    #[test]
    fn test_trailing_backslash_is_not_a_continuation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history");

        let mut history = HistoryLog::with_path(&path);
        history.push(".lua-eval \"x\" a\\");
        history.push("SELECT 1;");
        history.push("SELECT '\\\\'\nFROM t\\");
        history.save().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with(".lua-eval \"x\" a\\\\\n"));

        let mut reloaded = HistoryLog::with_path(&path);
        reloaded.load().unwrap();
        assert_eq!(
            reloaded.entries(),
            &[".lua-eval \"x\" a\\", "SELECT 1;", "SELECT '\\\\'\nFROM t\\"]
        );
    }

    #[test]
    fn test_save_overwrites_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history");
        std::fs::write(&path, "old entry\n").unwrap();

        let mut history = HistoryLog::with_path(&path);
        history.load().unwrap();
        history.push("new entry");
        history.save().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "old entry\nnew entry\n");
    }
}
