use indoc::indoc;
use text_size::TextSize;

use crate::Buffer;

use super::refactor_open::{OpenAction, RefactorEdit, refactor_open};

fn buffer(source: &str) -> Buffer {
    Buffer::new(source).unwrap()
}

fn at(buffer: &Buffer, line: u32, col: u32) -> TextSize {
    buffer.line_index().offset_at(line, col).unwrap()
}

/// (start line, start col, end line, end col, content) for assertions
/// against 1-indexed lines and 0-indexed columns.
fn describe(buffer: &Buffer, edits: &[RefactorEdit]) -> Vec<(u32, u32, u32, u32, String)> {
    edits
        .iter()
        .map(|e| {
            let (start, end) = buffer.line_index().range_bounds(e.range);
            (start.line, start.col, end.line, end.col, e.content.clone())
        })
        .collect()
}

#[test]
fn unqualify_after_open() {
    let source = "module M = struct\n  let u = ()\nend\nopen M\nlet u = M.u";
    let b = buffer(source);
    let edits = refactor_open(&b, at(&b, 5, 6), OpenAction::Unqualify);
    assert_eq!(describe(&b, &edits), [(5, 8, 5, 11, "u".to_string())]);
}

#[test]
fn unqualify_nested_module_path() {
    let source = indoc! {"
        module M = struct
          module N = struct
            let u = ()
          end
        end
        open M.N
        let u = M.N.u"};
    let b = buffer(source);
    let edits = refactor_open(&b, at(&b, 6, 6), OpenAction::Unqualify);
    assert_eq!(describe(&b, &edits), [(7, 8, 7, 13, "u".to_string())]);
}

#[test]
fn unqualify_multiline_identifier_keeps_tail() {
    let source = indoc! {"
        module M = struct
          module N = struct
            let u = ()
          end
        end
        open M.N
        let u = M.N.
        u"};
    let b = buffer(source);
    let edits = refactor_open(&b, at(&b, 6, 6), OpenAction::Unqualify);
    // Observed behavior for identifiers split across lines: one edit
    // spanning both lines, dropping only the head segment.
    assert_eq!(describe(&b, &edits), [(7, 8, 8, 1, "N.u".to_string())]);
}

#[test]
fn unqualify_skips_shadowed_references() {
    // After the open, a closer `u` shadows `M.u`: removing the prefix
    // would change what the name resolves to, so no edit is offered.
    let source = indoc! {"
        module M = struct
          let u = 1
        end
        open M
        let u = 2
        let w = M.u"};
    let b = buffer(source);
    let edits = refactor_open(&b, at(&b, 4, 5), OpenAction::Unqualify);
    assert!(edits.is_empty(), "unexpected edits: {edits:?}");
}

#[test]
fn unqualify_without_any_open() {
    let b = buffer("let u = 1\nlet v = u");
    let edits = refactor_open(&b, at(&b, 2, 0), OpenAction::Unqualify);
    assert!(edits.is_empty());
}

#[test]
fn qualify_references_reaching_through_the_open() {
    let source = indoc! {"
        module M = struct
          let u = ()
        end
        open M
        let v = u"};
    let b = buffer(source);
    let edits = refactor_open(&b, at(&b, 4, 5), OpenAction::Qualify);
    assert_eq!(describe(&b, &edits), [(5, 8, 5, 9, "M.u".to_string())]);
}

#[test]
fn qualify_leaves_local_bindings_alone() {
    let source = indoc! {"
        module M = struct
          let u = ()
        end
        open M
        let w = 1
        let v = w"};
    let b = buffer(source);
    let edits = refactor_open(&b, at(&b, 4, 5), OpenAction::Qualify);
    assert!(edits.is_empty(), "unexpected edits: {edits:?}");
}
