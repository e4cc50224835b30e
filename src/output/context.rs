use crossterm::style::Stylize;
use serde::Serialize;
use std::io::IsTerminal;

use crate::error::Result;

/// Central output coordinator that respects json/quiet modes.
#[derive(Debug, Clone)]
pub struct OutputContext {
    mode: OutputMode,
    /// Terminal width (cached)
    width: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Colors and symbols
    Rich,
    /// Plain text, no ANSI codes (for piping)
    Plain,
    /// JSON output only
    Json,
    /// Minimal output (quiet mode)
    Quiet,
}

impl OutputContext {
    /// Create from CLI-style flags.
    #[must_use]
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else if std::env::var("NO_COLOR").is_ok() || !std::io::stdout().is_terminal() {
            OutputMode::Plain
        } else {
            OutputMode::Rich
        };

        Self {
            mode,
            width: detect_width(),
        }
    }

    /// Fixed mode and width, for tests.
    #[must_use]
    pub const fn with_mode(mode: OutputMode, width: usize) -> Self {
        Self { mode, width }
    }

    #[must_use]
    pub const fn mode(&self) -> OutputMode {
        self.mode
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.mode == OutputMode::Quiet
    }

    #[must_use]
    pub fn use_color(&self) -> bool {
        self.mode == OutputMode::Rich
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Print a line of human output. Suppressed in JSON and quiet modes.
    pub fn print(&self, content: &str) {
        match self.mode {
            OutputMode::Rich | OutputMode::Plain => println!("{content}"),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    /// Print a value as pretty JSON to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Rich => println!("{} {message}", "✓".green().bold()),
            OutputMode::Plain => println!("✓ {message}"),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Rich => eprintln!("{} {}", "⚠".yellow().bold(), message.yellow()),
            OutputMode::Plain => eprintln!("Warning: {message}"),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn section(&self, title: &str) {
        match self.mode {
            OutputMode::Rich => println!("\n{}", title.bold()),
            OutputMode::Plain => println!("\n─── {title} ───"),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }
}

fn detect_width() -> usize {
    if let Ok((columns, _)) = crossterm::terminal::size() {
        if columns > 0 {
            return usize::from(columns);
        }
    }
    crate::format::terminal_width()
}
