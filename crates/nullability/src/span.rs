use serde::Serialize;

/// Byte range into a host source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct LineInfo<'s> {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in bytes.
    pub column: usize,
    pub line_text: &'s [u8],
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`, used for insertions.
    pub fn point(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn line_info<'s>(&self, source: &'s [u8]) -> Option<LineInfo<'s>> {
        offset_line_info(source, self.start)
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

pub fn offset_line_info(source: &[u8], offset: usize) -> Option<LineInfo<'_>> {
    if offset > source.len() {
        return None;
    }
    let line_start = source[..offset]
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let line_end = source[offset..]
        .iter()
        .position(|b| *b == b'\n')
        .map(|idx| offset + idx)
        .unwrap_or(source.len());
    let line = source[..line_start].iter().filter(|b| **b == b'\n').count() + 1;
    Some(LineInfo {
        line,
        column: offset - line_start + 1,
        line_text: &source[line_start..line_end],
    })
}
