//! Source positions: 1-indexed lines, 0-indexed columns, absolute byte offsets.

use std::cmp::Ordering;

use text_size::{TextRange, TextSize};

/// A point in a buffer. Totally ordered by byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    /// 1-indexed line.
    pub line: u32,
    /// 0-indexed column, in bytes.
    pub col: u32,
    /// Absolute byte offset.
    pub offset: TextSize,
}

impl Pos {
    pub fn new(line: u32, col: u32, offset: TextSize) -> Self {
        Self { line, col, offset }
    }
}

impl PartialOrd for Pos {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pos {
    fn cmp(&self, other: &Self) -> Ordering {
        self.offset.cmp(&other.offset)
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Offset↔position conversion table for one buffer revision.
///
/// Rebuilt on every edit; lookups are binary searches over line starts.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the first character of each line. Always starts with 0.
    line_starts: Vec<TextSize>,
    len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(TextSize::from(i as u32 + 1));
            }
        }
        Self {
            line_starts,
            len: TextSize::of(text),
        }
    }

    pub fn len(&self) -> TextSize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == TextSize::from(0)
    }

    /// Position of an offset. Offsets past the end clamp to the end.
    pub fn pos_at(&self, offset: TextSize) -> Pos {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let col = u32::from(offset) - u32::from(self.line_starts[line]);
        Pos::new(line as u32 + 1, col, offset)
    }

    /// Offset of a (1-indexed line, 0-indexed column) pair.
    ///
    /// `None` when the line does not exist; columns past the end of the line
    /// clamp to the end of the line.
    pub fn offset_at(&self, line: u32, col: u32) -> Option<TextSize> {
        if line == 0 {
            return None;
        }
        let start = *self.line_starts.get(line as usize - 1)?;
        let end = self
            .line_starts
            .get(line as usize)
            .map_or(self.len, |&next| next);
        Some((start + TextSize::from(col)).min(end))
    }

    /// Both endpoints of a range as positions.
    pub fn range_bounds(&self, range: TextRange) -> (Pos, Pos) {
        (self.pos_at(range.start()), self.pos_at(range.end()))
    }

    /// True when the range spans more than one line.
    pub fn is_multiline(&self, range: TextRange) -> bool {
        self.pos_at(range.start()).line != self.pos_at(range.end()).line
    }
}
