//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::error::RefactorError;
use crate::pipeline::Extraction;
use crate::range::SourceRange;
use crate::scope::CapturedVariable;
use serde::{Deserialize, Serialize};

/// Outcome of one extraction, in report form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExtractionReport {
    pub file: String,
    pub range: SourceRange,
    pub statement: SourceRange,
    pub unit: String,
    pub target: String,
    pub interface: String,
    pub captured: Vec<CapturedVariable>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ambiguous: Vec<String>,
    pub written: bool,
    /// Generated source, included for dry runs
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<String>,
}

impl ExtractionReport {
    pub fn new(extraction: &Extraction, written: bool) -> Self {
        ExtractionReport {
            file: extraction.path.display().to_string(),
            range: extraction.range,
            statement: extraction.statement_range,
            unit: extraction.unit.name.clone(),
            target: extraction.target.display().to_string(),
            interface: extraction.unit.interface.to_string(),
            captured: extraction.captured.clone(),
            ambiguous: extraction.ambiguous.clone(),
            written,
            source: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }
}

/// A failed request, in report form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FailureReport {
    pub file: String,
    pub range: SourceRange,
    pub stage: String,
    pub kind: String,
    pub message: String,
    pub exit_code: i32,
}

impl FailureReport {
    pub fn new(error: &RefactorError) -> Self {
        FailureReport {
            file: error.path.display().to_string(),
            range: error.range,
            stage: error.stage.to_string(),
            kind: error.kind().to_string(),
            message: error.cause.to_string(),
            exit_code: error.exit_code(),
        }
    }
}

/// Either outcome of a request, as listed in batch output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeReport {
    Done(ExtractionReport),
    Failed(FailureReport),
}

/// Render one extraction as text
pub fn render_text(report: &ExtractionReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{} {} -> {}\n",
        report.file, report.statement, report.unit
    ));
    output.push_str(&format!("  implements {}\n", report.interface));
    if report.captured.is_empty() {
        output.push_str("  captures   (none)\n");
    } else {
        let captured = report
            .captured
            .iter()
            .map(|variable| variable.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        output.push_str(&format!("  captures   {}\n", captured));
    }
    if !report.ambiguous.is_empty() {
        output.push_str(&format!(
            "  ambiguous  {} (declared more than once, last declaration used)\n",
            report.ambiguous.join(", ")
        ));
    }
    let verb = if report.written { "wrote" } else { "target" };
    output.push_str(&format!("  {:<10} {}\n", verb, report.target));
    output
}

/// Render a batch of outcomes as a text table
pub fn render_outcomes_text(outcomes: &[OutcomeReport]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<8} {:<30} {:<14} {}\n",
        "STATUS", "FILE", "RANGE", "RESULT"
    ));
    for outcome in outcomes {
        match outcome {
            OutcomeReport::Done(report) => output.push_str(&format!(
                "{:<8} {:<30} {:<14} {}\n",
                "done",
                truncate_or_pad(&report.file, 30),
                report.range.to_string(),
                report.target
            )),
            OutcomeReport::Failed(failure) => output.push_str(&format!(
                "{:<8} {:<30} {:<14} {} error: {}\n",
                "failed",
                truncate_or_pad(&failure.file, 30),
                failure.range.to_string(),
                failure.kind,
                failure.message
            )),
        }
    }
    output
}

/// Render a single report as JSON output
pub fn render_json(report: &ExtractionReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

/// Render batch outcomes as JSON output
pub fn render_outcomes_json(outcomes: &[OutcomeReport]) -> String {
    serde_json::to_string_pretty(outcomes).unwrap_or_else(|_| "[]".to_string())
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}
