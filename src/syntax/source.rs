//! Source text with a line table for LSP position conversion.
//!
//! LSP positions count columns in UTF-16 code units; everything inside
//! the crate works in byte offsets. `SourceText` converts between them.

use std::ops::Range;

use lsp_types::Position;

#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    line_starts: Vec<usize>,
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Text of line `n` without its line terminator.
    pub fn line(&self, n: usize) -> Option<&str> {
        let start = *self.line_starts.get(n)?;
        let end = self
            .line_starts
            .get(n + 1)
            .copied()
            .unwrap_or(self.text.len());
        let line = &self.text[start..end];
        let line = line.strip_suffix('\n').unwrap_or(line);
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    /// Byte offset → LSP position.
    pub fn position_at(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self.line_starts.partition_point(|&s| s <= offset) - 1;
        let start = self.line_starts[line];
        let character = self.text[start..offset].encode_utf16().count();
        Position::new(line as u32, character as u32)
    }

    /// LSP position → byte offset, clamped to the line (or the text).
    pub fn offset_at(&self, pos: Position) -> usize {
        let line_idx = pos.line as usize;
        let Some(line) = self.line(line_idx) else {
            return self.text.len();
        };
        let start = self.line_starts[line_idx];
        let target = pos.character as usize;
        let mut units = 0;
        for (i, c) in line.char_indices() {
            if units >= target {
                return start + i;
            }
            units += c.len_utf16();
        }
        start + line.len()
    }

    pub fn range(&self, span: Range<usize>) -> lsp_types::Range {
        lsp_types::Range::new(self.position_at(span.start), self.position_at(span.end))
    }

    /// Text of the cursor's line up to the cursor.
    pub fn line_prefix(&self, pos: Position) -> &str {
        let offset = self.offset_at(pos);
        let start = self
            .line_starts
            .get(pos.line as usize)
            .copied()
            .unwrap_or(self.text.len())
            .min(offset);
        &self.text[start..offset]
    }

    /// Identifier touching the cursor, with its byte span.
    pub fn word_at(&self, pos: Position) -> Option<(&str, Range<usize>)> {
        let offset = self.offset_at(pos);
        let bytes = self.text.as_bytes();

        let mut start = offset;
        while start > 0 && is_ident_byte(bytes[start - 1]) {
            start -= 1;
        }
        let mut end = offset;
        while end < bytes.len() && is_ident_byte(bytes[end]) {
            end += 1;
        }

        if start == end {
            return None;
        }
        Some((&self.text[start..end], start..end))
    }
}
