//! # RPPKit Translator
//!
//! Rewrites slicer G-Code into the subset the RPP device accepts.

pub mod report;
pub mod translator;

pub use report::{Diagnostic, TranslationReport, TranslationStats};
pub use translator::{DialectTranslator, TranslatorConfig, FILTERED_TOKENS};
