//! Translation results

use rppkit_core::{DeviceCommand, Error, LogLevel, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Line counts gathered during a translation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationStats {
    /// Input lines seen
    pub lines_read: usize,
    /// Blank or comment-only lines
    pub comments: usize,
    /// Thermal/extrusion lines dropped on purpose
    pub filtered: usize,
    /// Commands the device has no equivalent for
    pub unsupported: usize,
    /// Moves without any X/Y/Z
    pub no_motion: usize,
    /// Lines with an unparseable number
    pub malformed: usize,
    /// Moves outside the travel limits
    pub out_of_bounds: usize,
    /// Commands emitted, including the fixed prologue and epilogue
    pub emitted: usize,
}

impl TranslationStats {
    /// Input lines that produced no output
    pub fn discarded(&self) -> usize {
        self.comments
            + self.filtered
            + self.unsupported
            + self.no_motion
            + self.malformed
            + self.out_of_bounds
    }
}

/// Note about a single input line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based input line number
    pub line_number: u32,
    /// Input line as read
    pub text: String,
    pub level: LogLevel,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {} ({})", self.line_number, self.message, self.text)
    }
}

/// Output of [`crate::DialectTranslator::translate`]
#[derive(Debug, Clone, Default)]
pub struct TranslationReport {
    pub commands: Vec<DeviceCommand>,
    pub stats: TranslationStats,
    pub diagnostics: Vec<Diagnostic>,
}

impl TranslationReport {
    /// Device-dialect text, one command per line
    pub fn to_device_text(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            out.push_str(&command.to_string());
            out.push('\n');
        }
        out
    }

    /// Write the device-dialect text to a file
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_device_text()).map_err(|e| Error::file_access(path, e))?;
        tracing::info!(
            "Wrote {} commands to {}",
            self.commands.len(),
            path.display()
        );
        Ok(())
    }

    /// Diagnostics at warning level or above
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d.level, LogLevel::Warn | LogLevel::Error))
    }
}

impl std::fmt::Display for TranslationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = &self.stats;
        writeln!(f, "Lines read: {}", s.lines_read)?;
        writeln!(f, "Commands emitted: {}", s.emitted)?;
        writeln!(f, "Lines discarded: {}", s.discarded())?;
        writeln!(f, "  comments/blank: {}", s.comments)?;
        writeln!(f, "  filtered: {}", s.filtered)?;
        writeln!(f, "  unsupported: {}", s.unsupported)?;
        writeln!(f, "  no motion: {}", s.no_motion)?;
        writeln!(f, "  malformed: {}", s.malformed)?;
        write!(f, "  out of bounds: {}", s.out_of_bounds)
    }
}
