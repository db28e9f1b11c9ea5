//! Slicer G-Code translation
//!
//! Accepted input, per line, first match wins:
//! - blank and `;` comment lines are dropped
//! - thermal and extrusion tokens ([`FILTERED_TOKENS`]) are dropped
//! - `G0`/`G1` become `G00`/`G01` when at least one of X/Y/Z is present
//! - `G28` homes and resets the position tracker, `G90` passes through
//! - anything else is unsupported and dropped
//!
//! Every output starts with `G28`, `G90` and ends with `M114`.

use crate::report::{Diagnostic, TranslationReport, TranslationStats};
use rppkit_core::{
    strip_comment, CartesianPosition, DeviceCommand, Error, GcodeError, LogLevel,
    MachineGeometry, Result,
};
use rppkit_kinematics::{offset_and_clamp, WorkOffset};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Slicer tokens that are dropped without a diagnostic
pub const FILTERED_TOKENS: &[&str] = &["M104", "M105", "M109", "M82", "M107", "G92"];

/// Translator settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Upper bound and initial value of the sticky feedrate
    pub max_feedrate: f64,
    /// Slicer to device offset
    pub offset: WorkOffset,
    pub geometry: MachineGeometry,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            max_feedrate: 1000.0,
            offset: WorkOffset::default(),
            geometry: MachineGeometry::default(),
        }
    }
}

/// Slicer G-Code to device dialect translator
#[derive(Debug, Clone, Default)]
pub struct DialectTranslator {
    config: TranslatorConfig,
}

/// Per-run state
struct Pass {
    feedrate: f64,
    tracker: CartesianPosition,
    report: TranslationReport,
}

impl Pass {
    fn emit(&mut self, command: DeviceCommand) {
        self.report.commands.push(command);
        self.report.stats.emitted += 1;
    }

    fn diagnose(&mut self, line_number: u32, text: &str, level: LogLevel, message: String) {
        match level {
            LogLevel::Warn | LogLevel::Error => {
                tracing::warn!("Line {}: {} ({})", line_number, message, text)
            }
            _ => tracing::debug!("Line {}: {} ({})", line_number, message, text),
        }
        self.report.diagnostics.push(Diagnostic {
            line_number,
            text: text.to_string(),
            level,
            message,
        });
    }
}

/// Fields of a slicer move
#[derive(Default)]
struct MoveWords {
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    f: Option<f64>,
}

impl DialectTranslator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate slicer text
    pub fn translate(&self, input: &str) -> TranslationReport {
        let mut pass = Pass {
            feedrate: self.config.max_feedrate,
            tracker: CartesianPosition::default(),
            report: TranslationReport::default(),
        };

        pass.emit(DeviceCommand::Home);
        pass.emit(DeviceCommand::absolute_mode());

        for (index, raw) in input.lines().enumerate() {
            pass.report.stats.lines_read += 1;
            self.translate_line(&mut pass, index as u32 + 1, raw);
        }

        pass.emit(DeviceCommand::ReportPosition);

        let stats = pass.report.stats;
        tracing::info!(
            "Translated {} lines into {} commands ({} discarded)",
            stats.lines_read,
            stats.emitted,
            stats.discarded()
        );
        pass.report
    }

    /// Translate a slicer file
    pub fn translate_file(&self, path: impl AsRef<Path>) -> Result<TranslationReport> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::file_access(path, e))?;
        tracing::info!("Translating {}", path.display());
        Ok(self.translate(&text))
    }

    fn translate_line(&self, pass: &mut Pass, line_number: u32, raw: &str) {
        let line = strip_comment(raw);
        let mut words = line.split_whitespace();
        let code = match words.next() {
            Some(code) => code.to_ascii_uppercase(),
            None => {
                pass.report.stats.comments += 1;
                return;
            }
        };

        if FILTERED_TOKENS.contains(&code.as_str()) {
            pass.report.stats.filtered += 1;
            return;
        }

        match code.as_str() {
            "G0" | "G00" | "G1" | "G01" => {
                let rapid = matches!(code.as_str(), "G0" | "G00");
                match parse_move_words(words, line, line_number) {
                    Ok(fields) => self.translate_move(pass, line_number, line, rapid, fields),
                    Err(e) => {
                        pass.report.stats.malformed += 1;
                        pass.diagnose(line_number, line, LogLevel::Warn, e.to_string());
                    }
                }
            }
            "G28" => {
                pass.tracker = CartesianPosition::default();
                pass.emit(DeviceCommand::Home);
            }
            "G90" => pass.emit(DeviceCommand::absolute_mode()),
            _ => {
                pass.report.stats.unsupported += 1;
                pass.diagnose(
                    line_number,
                    line,
                    LogLevel::Debug,
                    format!("Unsupported command {}", code),
                );
            }
        }
    }

    fn translate_move(
        &self,
        pass: &mut Pass,
        line_number: u32,
        line: &str,
        rapid: bool,
        fields: MoveWords,
    ) {
        if let Some(f) = fields.f {
            pass.feedrate = f.min(self.config.max_feedrate);
        }

        if fields.x.is_none() && fields.y.is_none() && fields.z.is_none() {
            pass.report.stats.no_motion += 1;
            return;
        }

        let target = CartesianPosition::new(
            fields.x.unwrap_or(pass.tracker.x),
            fields.y.unwrap_or(pass.tracker.y),
            fields.z.unwrap_or(pass.tracker.z),
        );
        let (device, in_bounds) =
            offset_and_clamp(target, &self.config.offset, &self.config.geometry);
        if !in_bounds {
            pass.report.stats.out_of_bounds += 1;
            pass.diagnose(
                line_number,
                line,
                LogLevel::Warn,
                format!("Target out of range: {}", device),
            );
            return;
        }

        pass.tracker = target;
        pass.emit(DeviceCommand::LinearMove {
            rapid,
            x: fields.x.map(|_| round3(device.x)),
            y: fields.y.map(|_| round3(device.y)),
            z: fields.z.map(|_| round3(device.z)),
            feedrate: Some(pass.feedrate),
        });
    }
}

fn parse_move_words<'a>(
    words: impl Iterator<Item = &'a str>,
    line: &str,
    line_number: u32,
) -> std::result::Result<MoveWords, GcodeError> {
    let mut fields = MoveWords::default();
    for word in words {
        let mut chars = word.chars();
        let letter = match chars.next() {
            Some(c) => c.to_ascii_uppercase(),
            None => continue,
        };
        let slot = match letter {
            'X' => &mut fields.x,
            'Y' => &mut fields.y,
            'Z' => &mut fields.z,
            'F' => &mut fields.f,
            _ => continue,
        };
        let value = chars
            .as_str()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| GcodeError::InvalidNumber {
                line_number,
                field: letter,
                text: line.to_string(),
            })?;
        *slot = Some(value);
    }
    Ok(fields)
}

fn round3(value: f64) -> f64 {
    let rounded = (value * 1000.0).round() / 1000.0;
    // avoid emitting "-0.000"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(report: &TranslationReport) -> Vec<String> {
        report.commands.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_prologue_and_epilogue_on_empty_input() {
        let report = DialectTranslator::default().translate("");
        assert_eq!(lines(&report), vec!["G28", "G90", "M114"]);
        assert_eq!(report.stats.emitted, 3);
    }

    #[test]
    fn test_extrusion_is_ignored() {
        let report = DialectTranslator::default().translate("G1 X1 E0.5 F200\nG1 E2.0\n");
        assert_eq!(report.commands[2].to_string(), "G01 X1.000 F200.000");
        assert_eq!(report.stats.no_motion, 1);
    }

    #[test]
    fn test_feedrate_is_capped() {
        let report = DialectTranslator::default().translate("G0 X5 F6000\n");
        assert_eq!(report.commands[2].to_string(), "G00 X5.000 F1000.000");
    }

    #[test]
    fn test_unsupported_and_inline_comment() {
        let report = DialectTranslator::default().translate("M106 S255\nG1 Y2 ; travel\n");
        assert_eq!(report.stats.unsupported, 1);
        assert_eq!(report.commands[2].to_string(), "G01 Y2.000 F1000.000");
        assert_eq!(report.diagnostics[0].line_number, 1);
        assert_eq!(report.warnings().count(), 0);
    }

    #[test]
    fn test_round_to_three_decimals() {
        assert_eq!(round3(1.23456), 1.235);
        assert!(round3(-0.0004).is_sign_positive());
    }
}
