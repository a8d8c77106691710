//! The errors query: every diagnostic currently attached to the buffer.

use crate::Buffer;
use crate::diagnostics::{Diagnostic, Diagnostics};

/// Collects syntax errors, type errors and warnings from all typer states,
/// in source order.
pub fn diagnostics(buffer: &Buffer) -> Diagnostics {
    let mut out = Diagnostics::new();
    for state in buffer.states() {
        for error in &state.errors {
            out.push(Diagnostic::error(error.range, error.message.clone()));
        }
        for warning in &state.warnings {
            out.push(Diagnostic::warning(warning.range, warning.message.clone()));
        }
    }
    out.sort();
    out
}
