//! Structured output writer supporting JSON Lines and human-readable modes.

use console::style;
use serde::Serialize;
use serde_json::Value;

use crate::check::ConnectionReport;
use crate::upload::UploadSummary;

const SUCCESS: &str = "✓";
const ERROR: &str = "✗";
const WARNING: &str = "⚠";

/// Output mode for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Structured upload result for JSON output
#[derive(Debug, Serialize)]
pub struct UploadResult<'a> {
    pub operation: &'static str,
    pub success: bool,
    pub package: &'a str,
    pub file: &'a str,
    pub source: String,
    pub bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    pub response: &'a Value,
    pub uploaded_at: String,
}

#[derive(Debug, Serialize)]
struct ErrorResult<'a> {
    operation: &'static str,
    success: bool,
    category: String,
    error: &'a str,
}

/// Writes results to stdout and errors to stderr in the selected mode
#[derive(Debug, Clone)]
pub struct OutputWriter {
    pub mode: OutputMode,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            mode: if json { OutputMode::Json } else { OutputMode::Human },
        }
    }

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    pub fn upload(&self, operation: &'static str, summary: &UploadSummary) {
        match self.mode {
            OutputMode::Json => {
                let result = UploadResult {
                    operation,
                    success: true,
                    package: &summary.package_name,
                    file: &summary.file_name,
                    source: summary.source.display().to_string(),
                    bytes: summary.bytes,
                    message: summary.message.as_deref(),
                    response: &summary.response,
                    uploaded_at: chrono::Utc::now().to_rfc3339(),
                };
                print_json(&result);
            }
            OutputMode::Human => {
                println!(
                    "  {} {} ({} bytes) {} Odoo [{}]",
                    style(SUCCESS).green(),
                    summary.file_name,
                    summary.bytes,
                    "\u{2192}",
                    summary.package_name
                );
                if let Some(message) = &summary.message {
                    println!("    {}", style(message).dim());
                }
            }
        }
    }

    pub fn connection_report(&self, report: &ConnectionReport) {
        match self.mode {
            OutputMode::Json => print_json(report),
            OutputMode::Human => {
                let icon = if report.succeeded() {
                    style(SUCCESS).green()
                } else {
                    style(ERROR).red()
                };
                if report.url.is_empty() {
                    println!("  {} {}", icon, report.server);
                } else {
                    println!(
                        "  {} {} ({}, db {}, user {})",
                        icon, report.server, report.url, report.database, report.username
                    );
                }
                if let Some(version) = &report.server_version {
                    println!("    server version: {}", version);
                }
                if let Some(uid) = report.uid {
                    println!("    uid: {}", uid);
                }
                if report.can_read_partners == Some(false) {
                    println!(
                        "    {} user cannot read res.partner (not necessarily an error)",
                        style(WARNING).yellow()
                    );
                }
                if let Some(error) = &report.error {
                    println!("    {}", style(error).red());
                }
            }
        }
    }

    /// Print an error message
    pub fn error(&self, operation: &'static str, err: &crate::error::GatewayError) {
        let msg = err.to_string();
        match self.mode {
            OutputMode::Json => {
                let result = ErrorResult {
                    operation,
                    success: false,
                    category: err.category().to_string(),
                    error: &msg,
                };
                if let Ok(json) = serde_json::to_string(&result) {
                    eprintln!("{}", json);
                }
            }
            OutputMode::Human => {
                eprintln!("{} {}", style("Error:").red().bold(), msg);
            }
        }
    }

    /// Print an info message (suppressed in JSON mode)
    pub fn info(&self, msg: &str) {
        if !self.is_json() {
            println!("{}", style(msg).cyan());
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        println!("{}", json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_selection() {
        assert!(OutputWriter::new(true).is_json());
        assert_eq!(OutputWriter::new(false).mode, OutputMode::Human);
    }

    #[test]
    fn test_upload_result_serialization() {
        let response = serde_json::json!({"status": "success"});
        let result = UploadResult {
            operation: "upload",
            success: true,
            package: "OrderFlow",
            file: "order_flow.xlsx",
            source: "/tmp/order_flow.xlsx".to_string(),
            bytes: 42,
            message: None,
            response: &response,
            uploaded_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["package"], "OrderFlow");
        assert_eq!(value["response"]["status"], "success");
        assert!(value.get("message").is_none());
    }
}
