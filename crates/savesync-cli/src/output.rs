//! Output formatting for CLI commands
//!
//! Human output goes to stdout with a status glyph per line; errors and
//! warnings go to stderr. JSON output prints one document per command on
//! stdout and a single `{"success": false, "error": ...}` object on stderr
//! when a command fails.

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with glyphs and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("{}", human_line('\u{2713}', message));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", human_line('\u{2717}', message));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", human_line('!', message));
    }
    fn info(&self, message: &str) {
        println!("  {message}");
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

fn human_line(glyph: char, message: &str) -> String {
    format!("{glyph} {message}")
}

/// JSON output formatter
///
/// Informational lines are dropped so stdout stays a single document.
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", status_json(true, message));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", status_json(false, message));
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({ "level": "warning", "message": message })
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

fn status_json(success: bool, message: &str) -> serde_json::Value {
    if success {
        serde_json::json!({ "success": true, "message": message })
    } else {
        serde_json::json!({ "success": false, "error": message })
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}
