use text_size::TextRange;

use super::{Diagnostic, Diagnostics, DiagnosticsPrinter, Severity};

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}

#[test]
fn sorted_by_start_then_severity() {
    let mut diags = Diagnostics::new();
    diags.push(Diagnostic::warning(range(4, 5), "late warning"));
    diags.push(Diagnostic::error(range(0, 1), "early error"));
    diags.push(Diagnostic::warning(range(0, 1), "early warning"));
    diags.sort();

    let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, ["early error", "early warning", "late warning"]);
}

#[test]
fn has_errors_distinguishes_severities() {
    let mut diags = Diagnostics::new();
    diags.push(Diagnostic::warning(range(0, 1), "just a warning"));
    assert!(!diags.has_errors());
    diags.push(Diagnostic::error(range(0, 1), "an error"));
    assert!(diags.has_errors());
}

#[test]
fn renders_with_caret_at_range() {
    let source = "let u = 1";
    let mut diags = Diagnostics::new();
    diags.push(Diagnostic::error(range(8, 9), "a message about 1"));

    let rendered = DiagnosticsPrinter::new(&diags, source).render();
    assert!(rendered.contains("error"));
    assert!(rendered.contains("a message about 1"));
    assert!(rendered.contains("let u = 1"));
}

#[test]
fn severity_display() {
    assert_eq!(Severity::Error.to_string(), "error");
    assert_eq!(Severity::Warning.to_string(), "warning");
}
