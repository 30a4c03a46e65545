//! Keyboard-driven selection menu
//!
//! Used by `.ask` to pick one of the SQL statements found in an answer.
//! Up/Down move, Enter selects, Esc or Ctrl-C cancels, typing filters.

use std::io::{self, Write};

use colored::Colorize;
use crossterm::{
    cursor::{MoveDown, MoveToColumn, MoveUp},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{self, ClearType},
    ExecutableCommand,
};

/// Number of items shown at once
const VISIBLE_ITEMS: usize = 8;

/// Outcome of a menu interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    Selected(String),
    Cancelled,
}

pub struct SelectMenu {
    title: String,
    items: Vec<String>,
    filtered: Vec<usize>,
    selected: usize,
    scroll_offset: usize,
    query: String,
    color_enabled: bool,
}

impl SelectMenu {
    pub fn new(title: impl Into<String>, items: Vec<String>, color_enabled: bool) -> Self {
        let filtered = (0..items.len()).collect();
        Self {
            title: title.into(),
            items,
            filtered,
            selected: 0,
            scroll_offset: 0,
            query: String::new(),
            color_enabled,
        }
    }

    /// Show the menu until the user picks an item or cancels
    pub fn run(&mut self) -> io::Result<MenuChoice> {
        if self.items.is_empty() {
            return Ok(MenuChoice::Cancelled);
        }

        terminal::enable_raw_mode()?;
        let result = self.run_loop();
        terminal::disable_raw_mode()?;
        self.clear_display()?;

        result
    }

    fn run_loop(&mut self) -> io::Result<MenuChoice> {
        self.render()?;

        loop {
            if !event::poll(std::time::Duration::from_millis(100))? {
                continue;
            }
            let Event::Key(key_event) = event::read()? else {
                continue;
            };
            if key_event.kind != KeyEventKind::Press {
                continue;
            }

            match key_event.code {
                KeyCode::Esc => return Ok(MenuChoice::Cancelled),
                KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(MenuChoice::Cancelled)
                }
                KeyCode::Enter => {
                    return Ok(self
                        .current()
                        .map(|item| MenuChoice::Selected(item.to_string()))
                        .unwrap_or(MenuChoice::Cancelled))
                }
                KeyCode::Up => self.move_up(),
                KeyCode::Down => self.move_down(),
                KeyCode::Char(c) => {
                    self.query.push(c);
                    self.update_filter();
                }
                KeyCode::Backspace => {
                    self.query.pop();
                    self.update_filter();
                }
                _ => continue,
            }
            self.render()?;
        }
    }

    fn current(&self) -> Option<&str> {
        self.filtered
            .get(self.selected)
            .and_then(|&idx| self.items.get(idx))
            .map(String::as_str)
    }

    fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.adjust_scroll();
        }
    }

    fn move_down(&mut self) {
        if self.selected + 1 < self.filtered.len() {
            self.selected += 1;
            self.adjust_scroll();
        }
    }

    fn adjust_scroll(&mut self) {
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + VISIBLE_ITEMS {
            self.scroll_offset = self.selected + 1 - VISIBLE_ITEMS;
        }
    }

    fn update_filter(&mut self) {
        let query = self.query.to_lowercase();
        self.filtered = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| query.is_empty() || item.to_lowercase().contains(&query))
            .map(|(i, _)| i)
            .collect();

        self.selected = self.selected.min(self.filtered.len().saturating_sub(1));
        self.scroll_offset = self.scroll_offset.min(self.selected);
        self.adjust_scroll();
    }

    fn truncate(item: &str, max_width: usize) -> String {
        if item.chars().count() <= max_width {
            item.to_string()
        } else {
            let kept: String = item.chars().take(max_width.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }

    /// Lines drawn by one render pass
    fn line_count(&self) -> usize {
        1 + VISIBLE_ITEMS.min(self.filtered.len()).max(1)
    }

    fn render(&self) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.execute(MoveToColumn(0))?;

        stdout.execute(terminal::Clear(ClearType::CurrentLine))?;
        let hint = if self.query.is_empty() {
            "↑↓ navigate, Enter select, Esc cancel".to_string()
        } else {
            format!("filter: {}", self.query)
        };
        if self.color_enabled {
            writeln!(stdout, "\r{} {}", self.title.bold(), hint.dimmed())?;
        } else {
            writeln!(stdout, "\r{} {}", self.title, hint)?;
        }

        if self.filtered.is_empty() {
            stdout.execute(terminal::Clear(ClearType::CurrentLine))?;
            writeln!(stdout, "\r  (no matching entries)")?;
        }

        let max_width = terminal::size()
            .map(|(w, _)| w as usize)
            .unwrap_or(80)
            .saturating_sub(6);
        let visible = self
            .filtered
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(VISIBLE_ITEMS);
        for (position, &idx) in visible {
            stdout.execute(terminal::Clear(ClearType::CurrentLine))?;
            let text = Self::truncate(&self.items[idx], max_width);
            let line = match (position == self.selected, self.color_enabled) {
                (true, true) => format!("\r  {} {}", "▸".bright_cyan().bold(), text.white().bold()),
                (true, false) => format!("\r  > {}", text),
                (false, true) => format!("\r    {}", text.dimmed()),
                (false, false) => format!("\r    {}", text),
            };
            writeln!(stdout, "{}", line)?;
        }

        stdout.flush()?;
        stdout.execute(MoveUp(self.line_count() as u16))?;
        Ok(())
    }

    fn clear_display(&self) -> io::Result<()> {
        let mut stdout = io::stdout();
        let lines = self.line_count();

        for _ in 0..lines {
            stdout.execute(terminal::Clear(ClearType::CurrentLine))?;
            stdout.execute(MoveDown(1))?;
        }
        stdout.execute(MoveUp(lines as u16))?;
        stdout.execute(MoveToColumn(0))?;
        stdout.flush()
    }
}
