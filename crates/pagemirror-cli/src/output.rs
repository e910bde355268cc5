//! Human and JSON renderings of command results
//!
//! Human output goes to stdout with status glyphs; warnings and errors go
//! to stderr. JSON mode prints exactly one document per command on stdout,
//! so progress lines are suppressed and diagnostics become JSON lines on
//! stderr.

use std::fmt::Display;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Human
        }
    }

    pub fn is_json(self) -> bool {
        self == Self::Json
    }
}

/// Sink for everything a command reports
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    /// An aligned `label: value` row
    fn field(&self, label: &str, value: &dyn Display);
    /// The single structured result of a command
    fn print_json(&self, value: &serde_json::Value);
}

#[derive(Debug, Clone, Copy)]
enum Glyph {
    Success,
    Error,
    Warning,
}

fn human_line(glyph: Glyph, message: &str) -> String {
    match glyph {
        Glyph::Success => format!("\u{2713} {message}"),
        Glyph::Error => format!("\u{2717} Error: {message}"),
        Glyph::Warning => format!("\u{26a0} Warning: {message}"),
    }
}

fn human_field(label: &str, value: &dyn Display) -> String {
    format!("  {:<14}{value}", format!("{label}:"))
}

fn json_diagnostic(level: &str, message: &str) -> serde_json::Value {
    serde_json::json!({ "level": level, "message": message })
}

pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("{}", human_line(Glyph::Success, message));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", human_line(Glyph::Error, message));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", human_line(Glyph::Warning, message));
    }
    fn info(&self, message: &str) {
        println!("  {message}");
    }
    fn field(&self, label: &str, value: &dyn Display) {
        println!("{}", human_field(label, value));
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, _message: &str) {}
    fn error(&self, message: &str) {
        eprintln!("{}", json_diagnostic("error", message));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", json_diagnostic("warning", message));
    }
    fn info(&self, _message: &str) {}
    fn field(&self, _label: &str, _value: &dyn Display) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Human => Box::new(HumanFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// `"1 document"` / `"3 documents"`
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
