use std::cmp::Ordering;

use crate::{History, Mark, rewind};

fn history_of(values: impl IntoIterator<Item = i32>) -> History<i32> {
    let mut h = History::new();
    for v in values {
        h.insert(v);
    }
    h
}

#[test]
fn insert_backward_forward_roundtrip() {
    let mut h = history_of([1, 2]);
    h.insert(3);

    assert_eq!(h.backward(), Some(&3));
    assert_eq!(h.offset(), 2);
    assert_eq!(h.forward(), Some(&3));
    assert_eq!(h.offset(), 3);
    assert_eq!(h.prev(), Some(&3));
}

#[test]
fn insert_leaves_future_untouched() {
    let mut h = history_of([1, 2, 3]);
    h.seek_offset(1);
    h.insert(9);

    assert_eq!(h.offset(), 2);
    assert_eq!(h.next(), Some(&2));
    assert_eq!(h.len(), 4);
}

#[test]
fn remove_pops_past_only() {
    let mut h = history_of([1, 2]);
    h.seek_offset(0);
    assert_eq!(h.remove(), None);

    h.seek_offset(2);
    assert_eq!(h.remove(), Some(2));
    assert_eq!(h.len(), 1);
}

#[test]
fn cutoff_discards_future() {
    let mut h = history_of([1, 2, 3, 4]);
    h.seek_offset(2);
    h.cutoff();

    assert_eq!(h.len(), 2);
    assert_eq!(h.offset(), 2);
    assert_eq!(h.next(), None);
}

#[test]
fn seek_offset_clamps() {
    let mut h = history_of([1, 2, 3]);
    h.seek_offset(100);
    assert_eq!(h.offset(), 3);
    h.seek_offset(0);
    assert_eq!(h.offset(), 0);
}

#[test]
fn seek_monotone_lands_between() {
    // Elements 0, 10, 20, 30; target: just after the last element < 15.
    let mut h = history_of([0, 10, 20, 30]);
    for start in 0..=4 {
        h.seek_offset(start);
        h.seek(|&v| if v < 15 { Ordering::Less } else { Ordering::Greater });
        assert_eq!(h.offset(), 2, "from start {start}");
        assert!(h.prev().is_none_or(|&v| v < 15));
        assert!(h.next().is_none_or(|&v| v >= 15));
    }
}

#[test]
fn seek_saturates_at_ends() {
    let mut h = history_of([1, 2, 3]);
    h.seek(|_| Ordering::Less);
    assert_eq!(h.offset(), 3);
    h.seek(|_| Ordering::Greater);
    assert_eq!(h.offset(), 0);
}

#[test]
fn get_is_cursor_independent() {
    let mut h = history_of([10, 20, 30]);
    for at in 0..=3 {
        h.seek_offset(at);
        assert_eq!(h.get(0), Some(&10));
        assert_eq!(h.get(2), Some(&30));
        assert_eq!(h.get(3), None);
    }
}

#[test]
fn mark_survives_unrelated_edits() {
    let mut h = history_of([1, 2, 3]);
    h.seek_offset(2);
    let mark = Mark::at(&h);

    h.seek_offset(3);
    h.insert(4);
    assert!(h.contains(mark));
    assert_eq!(mark.offset(), 2);
}

#[test]
fn mark_detects_cutoff_of_target() {
    let mut h = history_of([1, 2, 3]);
    h.seek_offset(3);
    let mark = Mark::at(&h);

    h.seek_offset(2);
    h.cutoff();
    assert!(!h.contains(mark));

    // Re-inserting at the same offset is a different element.
    h.insert(3);
    assert!(!h.contains(mark));
}

#[test]
fn origin_mark_is_always_valid() {
    let mut h = history_of([1]);
    let origin = Mark::<i32>::origin();
    assert!(h.contains(origin));
    h.seek_offset(0);
    h.cutoff();
    assert!(h.contains(origin));
}

/// Downstream history whose elements mark positions in an upstream history.
fn linked_histories(n: usize) -> (History<i32>, History<Mark<i32>>) {
    let mut up = History::new();
    let mut down = History::new();
    for i in 0..n {
        up.insert(i as i32);
        down.insert(Mark::at(&up));
    }
    (up, down)
}

#[test]
fn rewind_agrees_on_clean_prefix() {
    let (mut up, mut down) = linked_histories(5);
    up.seek_offset(3);

    rewind(|m| *m, &mut up, &mut down);
    assert_eq!(down.offset(), 3);
    assert_eq!(up.offset(), 3);
    assert_eq!(Mark::at(&up), *down.prev().unwrap());
}

#[test]
fn rewind_skips_rewritten_suffix() {
    let (mut up, mut down) = linked_histories(5);

    // Rewrite upstream elements 2.. — same offsets, new identities.
    up.seek_offset(2);
    up.cutoff();
    up.insert(20);
    up.insert(30);
    up.insert(40);

    rewind(|m| *m, &mut up, &mut down);
    assert_eq!(down.offset(), 2);
    assert_eq!(up.offset(), 2);
}

#[test]
fn rewind_lands_at_origin_when_nothing_agrees() {
    let (mut up, mut down) = linked_histories(3);
    up.seek_offset(0);
    up.cutoff();
    up.insert(7);

    rewind(|m| *m, &mut up, &mut down);
    assert_eq!(down.offset(), 0);
    assert_eq!(up.offset(), 0);
}
