//! Span-based source editing with source map output.
//!
//! Edits are byte ranges of the original source replaced by new text. Every
//! untouched chunk of the original keeps a mapping back to its original
//! position, line by line, so stack traces through a rewritten module still
//! land on the right lines.

use oxc_sourcemap::{SourceMap, SourceMapBuilder};

#[derive(Debug)]
struct Edit {
    start: u32,
    end: u32,
    text: String,
}

/// Accumulates edits against one source text
pub(crate) struct SourceEditor<'s> {
    source: &'s str,
    edits: Vec<Edit>,
    appended: String,
}

impl<'s> SourceEditor<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            edits: Vec::new(),
            appended: String::new(),
        }
    }

    /// Replace `start..end` of the original source
    pub fn overwrite(&mut self, start: u32, end: u32, text: impl Into<String>) {
        debug_assert!(start <= end && end as usize <= self.source.len());
        self.edits.push(Edit {
            start,
            end,
            text: text.into(),
        });
    }

    pub fn remove(&mut self, start: u32, end: u32) {
        self.overwrite(start, end, String::new());
    }

    pub fn insert(&mut self, at: u32, text: impl Into<String>) {
        self.overwrite(at, at, text);
    }

    /// Text added after the last byte of the source
    pub fn append(&mut self, text: &str) {
        self.appended.push_str(text);
    }

    #[cfg(test)]
    pub fn has_changes(&self) -> bool {
        !self.edits.is_empty() || !self.appended.is_empty()
    }

    /// Apply all edits and build the source map for `source_name`.
    ///
    /// Edits must not overlap; inserts at the same offset keep their order.
    pub fn finish(mut self, source_name: &str) -> (String, SourceMap) {
        self.edits.sort_by_key(|edit| (edit.start, edit.end));

        let mut builder = SourceMapBuilder::default();
        let source_id = builder.set_source_and_content(source_name, self.source);

        let mut out = Generated::default();
        let mut original = Cursor::new(self.source);

        for edit in &self.edits {
            debug_assert!(edit.start as usize >= original.offset, "overlapping edits: {:?}", edit);
            let chunk_end = (edit.start as usize).max(original.offset);
            original.copy_to(chunk_end, &mut out, &mut builder, source_id);
            out.push(&edit.text);
            original.skip_to((edit.end as usize).max(original.offset));
        }
        original.copy_to(self.source.len(), &mut out, &mut builder, source_id);
        out.push(&self.appended);

        (out.code, builder.into_sourcemap())
    }
}

/// Generated text with its current line/column (UTF-16 columns)
#[derive(Default)]
struct Generated {
    code: String,
    line: u32,
    col: u32,
}

impl Generated {
    fn push(&mut self, text: &str) {
        for ch in text.chars() {
            self.advance(ch);
        }
        self.code.push_str(text);
    }

    fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += ch.len_utf16() as u32;
        }
    }
}

/// Position in the original source
struct Cursor<'s> {
    source: &'s str,
    offset: usize,
    line: u32,
    col: u32,
}

impl<'s> Cursor<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            offset: 0,
            line: 0,
            col: 0,
        }
    }

    /// Copy original text up to `end`, mapping the chunk start and every line start
    fn copy_to(
        &mut self,
        end: usize,
        out: &mut Generated,
        builder: &mut SourceMapBuilder,
        source_id: u32,
    ) {
        if end <= self.offset {
            return;
        }
        let chunk = &self.source[self.offset..end];
        builder.add_token(out.line, out.col, self.line, self.col, Some(source_id), None);

        let mut at_line_start = false;
        for ch in chunk.chars() {
            if at_line_start {
                builder.add_token(out.line, out.col, self.line, self.col, Some(source_id), None);
                at_line_start = false;
            }
            out.advance(ch);
            self.advance(ch);
            if ch == '\n' {
                at_line_start = true;
            }
        }
        out.code.push_str(chunk);
        self.offset = end;
    }

    /// Move past removed text without emitting it
    fn skip_to(&mut self, end: usize) {
        if end <= self.offset {
            return;
        }
        let skipped = &self.source[self.offset..end];
        for ch in skipped.chars() {
            self.advance(ch);
        }
        self.offset = end;
    }

    fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += ch.len_utf16() as u32;
        }
    }
}
