//! Command handlers, one module per resource.
//!
//! Handlers fetch through the services on [`App`], render tables or JSON to
//! stdout and report outcomes as alerts on stderr.

pub mod auth;
pub mod credentials;
pub mod items;
pub mod outcomes;
pub mod templates;

use serde::Serialize;

use crate::config::OutputFormat;
use crate::error::{Result, TallyError};
use crate::output::{alert, print_json, AlertLevel};

/// How command results are written.
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl OutputOptions {
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints `value` as JSON, or the rendered text in table mode.
    pub fn emit<T, F>(&self, value: &T, render: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce() -> String,
    {
        if self.is_json() {
            print_json(value, self.pretty)
        } else {
            println!("{}", render());
            Ok(())
        }
    }

    /// Success alert, suppressed in JSON mode to keep output machine-readable.
    pub fn success(&self, message: &str) {
        if !self.is_json() {
            alert(AlertLevel::Success, message);
        }
    }
}

/// Parses repeated `field=value` arguments.
pub fn parse_assignments(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(field, value)| (field.trim().to_string(), value.to_string()))
                .filter(|(field, _)| !field.is_empty())
                .ok_or_else(|| TallyError::Input(format!("Expected field=value, got \"{pair}\"")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignments() {
        let parsed = parse_assignments(&[
            "taskDescription=Set up CI".to_string(),
            "scopingNotes=a=b".to_string(),
            "phase=".to_string(),
        ])
        .unwrap();

        assert_eq!(parsed[0], ("taskDescription".into(), "Set up CI".into()));
        assert_eq!(parsed[1], ("scopingNotes".into(), "a=b".into()));
        assert_eq!(parsed[2], ("phase".into(), String::new()));

        assert!(parse_assignments(&["novalue".to_string()]).is_err());
        assert!(parse_assignments(&["=x".to_string()]).is_err());
    }
}
