use text_size::{TextRange, TextSize};

use crate::{LineIndex, Pos};

#[test]
fn pos_orders_by_offset() {
    let a = Pos::new(1, 5, TextSize::from(5));
    let b = Pos::new(2, 0, TextSize::from(6));
    assert!(a < b);
}

#[test]
fn empty_buffer() {
    let idx = LineIndex::new("");
    assert!(idx.is_empty());
    let p = idx.pos_at(TextSize::from(0));
    assert_eq!((p.line, p.col), (1, 0));
}

#[test]
fn pos_at_line_boundaries() {
    let idx = LineIndex::new("ab\ncd\n");

    let p = idx.pos_at(TextSize::from(0));
    assert_eq!((p.line, p.col), (1, 0));

    let p = idx.pos_at(TextSize::from(2));
    assert_eq!((p.line, p.col), (1, 2));

    let p = idx.pos_at(TextSize::from(3));
    assert_eq!((p.line, p.col), (2, 0));

    // Past the trailing newline: a final empty line.
    let p = idx.pos_at(TextSize::from(6));
    assert_eq!((p.line, p.col), (3, 0));
}

#[test]
fn pos_at_clamps_past_end() {
    let idx = LineIndex::new("ab");
    let p = idx.pos_at(TextSize::from(99));
    assert_eq!((p.line, p.col), (1, 2));
}

#[test]
fn offset_at_roundtrip() {
    let text = "module M = struct\n  let u = ()\nend\n";
    let idx = LineIndex::new(text);
    for (i, _) in text.char_indices() {
        let p = idx.pos_at(TextSize::from(i as u32));
        assert_eq!(idx.offset_at(p.line, p.col), Some(p.offset));
    }
}

#[test]
fn offset_at_missing_line() {
    let idx = LineIndex::new("one\n");
    assert_eq!(idx.offset_at(0, 0), None);
    assert_eq!(idx.offset_at(7, 0), None);
}

#[test]
fn offset_at_clamps_column_to_line_end() {
    let idx = LineIndex::new("ab\ncd");
    assert_eq!(idx.offset_at(1, 99), Some(TextSize::from(3)));
    assert_eq!(idx.offset_at(2, 99), Some(TextSize::from(5)));
}

#[test]
fn multiline_detection() {
    let idx = LineIndex::new("ab\ncd");
    assert!(!idx.is_multiline(TextRange::new(0.into(), 2.into())));
    assert!(idx.is_multiline(TextRange::new(1.into(), 4.into())));
}
