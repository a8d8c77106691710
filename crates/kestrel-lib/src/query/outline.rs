//! Document outline: the tree an editor builds its navigation menu from.

use text_size::{TextRange, TextSize};

use crate::Buffer;
use crate::chunk::ChunkKind;
use crate::typer::printer::scheme_to_string;
use crate::typer::typed::{ItemKind, TypedItem};

#[derive(Debug, Clone)]
pub struct OutlineItem {
    pub name: String,
    pub kind: ItemKind,
    /// Printed type, for kinds that have one.
    pub ty: Option<String>,
    pub range: TextRange,
    pub children: Vec<OutlineItem>,
}

/// Builds the outline from the typer history.
///
/// Closed modules arrive pre-folded in their closing state; modules still
/// open at the end of the buffer are reconstructed from the per-state
/// nesting depth so their items stay reachable while the user types.
pub fn outline(buffer: &Buffer) -> Vec<OutlineItem> {
    struct Frame {
        name: String,
        start: TextSize,
        items: Vec<OutlineItem>,
    }

    let mut top: Vec<OutlineItem> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut prev_depth = 0u32;

    for (idx, state) in buffer.typer().iter_past().enumerate() {
        if state.depth > prev_depth {
            let (name, start) = match buffer.chunks().get(idx) {
                Some(chunk) => match &chunk.kind {
                    ChunkKind::EnterModule { name, .. } => {
                        (name.clone(), chunk.range.start())
                    }
                    _ => (String::new(), chunk.range.start()),
                },
                None => (String::new(), TextSize::from(0)),
            };
            stack.push(Frame {
                name,
                start,
                items: Vec::new(),
            });
        } else if state.depth < prev_depth {
            // The closing state carries the folded module; the frame's
            // provisional items are superseded by it.
            stack.pop();
        }
        let target = match stack.last_mut() {
            Some(frame) => &mut frame.items,
            None => &mut top,
        };
        for item in &state.items {
            if let Some(entry) = item_to_outline(item) {
                target.push(entry);
            }
        }
        prev_depth = state.depth;
    }

    // Modules the buffer never closed.
    let end = TextSize::of(buffer.text());
    while let Some(frame) = stack.pop() {
        let module = OutlineItem {
            name: frame.name,
            kind: ItemKind::Module,
            ty: None,
            range: TextRange::new(frame.start, end),
            children: frame.items,
        };
        match stack.last_mut() {
            Some(parent) => parent.items.push(module),
            None => top.push(module),
        }
    }
    top
}

fn item_to_outline(item: &TypedItem) -> Option<OutlineItem> {
    match item {
        TypedItem::Value {
            name,
            range,
            scheme,
            ..
        } => {
            if name == "_" {
                return None;
            }
            Some(OutlineItem {
                name: name.clone(),
                kind: ItemKind::Value,
                ty: Some(scheme_to_string(scheme)),
                range: *range,
                children: Vec::new(),
            })
        }
        TypedItem::TypeDef {
            name,
            range,
            labels,
            ..
        } => Some(OutlineItem {
            name: name.clone(),
            kind: ItemKind::Type,
            ty: None,
            range: *range,
            children: labels
                .iter()
                .map(|label| OutlineItem {
                    name: label.name.clone(),
                    kind: ItemKind::Label,
                    ty: None,
                    range: label.range,
                    children: Vec::new(),
                })
                .collect(),
        }),
        TypedItem::Exception { name, range, .. } => Some(OutlineItem {
            name: name.clone(),
            kind: ItemKind::Exception,
            ty: None,
            range: *range,
            children: Vec::new(),
        }),
        TypedItem::Class { name, range, .. } => Some(OutlineItem {
            name: name.clone(),
            kind: ItemKind::Class,
            ty: None,
            range: *range,
            children: Vec::new(),
        }),
        TypedItem::Open { .. } => None,
        TypedItem::Module {
            name, range, items, ..
        } => Some(OutlineItem {
            name: name.clone(),
            kind: ItemKind::Module,
            ty: None,
            range: *range,
            children: items.iter().filter_map(item_to_outline).collect(),
        }),
    }
}
