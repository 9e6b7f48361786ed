//! Source map: file contents plus offset-to-line/column conversion.
//!
//! Fatal diagnostics are rendered through [`SourceMap::format_span`], which
//! prints the `file:line:column` header, the offending source line, and a
//! caret column pointing at the span start.

use std::sync::Arc;

use super::{FileId, Span};

/// A source file with its content and a precomputed line-start table.
#[derive(Clone)]
pub struct SourceFile {
    id: FileId,
    name: String,
    content: Arc<str>,
    line_starts: Arc<[usize]>,
}

impl SourceFile {
    pub fn new(id: usize, name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        let content = content.into();
        let line_starts = Self::compute_line_starts(&content);
        Self {
            id: FileId(id),
            name: name.into(),
            content,
            line_starts,
        }
    }

    fn compute_line_starts(content: &str) -> Arc<[usize]> {
        let mut line_starts = vec![0];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        line_starts.into()
    }

    #[inline]
    pub fn id(&self) -> FileId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset where a 0-indexed line starts.
    #[inline]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Convert a byte offset to 1-indexed (line, column).
    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => (line + 1, 1),
            Err(insert_point) => {
                let line = insert_point - 1;
                let line_start = self.line_starts.get(line).copied().unwrap_or(0);
                (line + 1, offset - line_start + 1)
            }
        }
    }

    /// A specific source line (1-indexed), without its trailing newline.
    pub fn line_at(&self, line: usize) -> Option<&str> {
        let start = self.line_start(line.checked_sub(1)?)?;
        let end = self.line_start(line).unwrap_or(self.content.len());
        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("line_count", &self.line_count())
            .finish()
    }
}

/// A source map managing the files of one compilation.
///
/// # Examples
///
/// ```
/// use rcc_util::span::SourceMap;
///
/// let mut map = SourceMap::new();
/// let file_id = map.add_file("main.c", "int main() { return 0; }");
/// assert_eq!(map.get(file_id).unwrap().name(), "main.c");
/// ```
#[derive(Default)]
pub struct SourceMap {
    files: Vec<Arc<SourceFile>>,
}

impl SourceMap {
    #[inline]
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Add a source file, returning its [`FileId`].
    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<Arc<str>>) -> FileId {
        let id = self.files.len();
        let file = SourceFile::new(id, name, content);
        let file_id = file.id();
        self.files.push(Arc::new(file));
        file_id
    }

    #[inline]
    pub fn get(&self, id: FileId) -> Option<Arc<SourceFile>> {
        self.files.get(id.0).cloned()
    }

    #[inline]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Render a span as `file:line:column`, the source line, and a caret.
    ///
    /// Returns `None` when the span's file or line is unknown (dummy spans).
    pub fn format_span(&self, span: Span) -> Option<String> {
        let file = self.get(span.file_id)?;
        let line = file.line_at(span.line as usize)?;

        let mut result = String::new();
        result.push_str(&format!(
            "{}:{}:{}\n{}\n",
            file.name(),
            span.line,
            span.column,
            line
        ));
        for _ in 0..(span.column as usize).saturating_sub(1) {
            result.push(' ');
        }
        result.push('^');
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_starts() {
        let file = SourceFile::new(0, "t.c", "line1\nline2\nline3");
        assert_eq!(file.line_count(), 3);
        assert_eq!(file.line_start(0), Some(0));
        assert_eq!(file.line_start(1), Some(6));
        assert_eq!(file.line_start(3), None);
    }

    #[test]
    fn test_offset_to_line_col() {
        let file = SourceFile::new(0, "t.c", "int main() {}");
        assert_eq!(file.offset_to_line_col(0), (1, 1));
        assert_eq!(file.offset_to_line_col(4), (1, 5));
    }

    #[test]
    fn test_line_at() {
        let file = SourceFile::new(0, "t.c", "line1\nline2\nline3");
        assert_eq!(file.line_at(1), Some("line1"));
        assert_eq!(file.line_at(3), Some("line3"));
        assert_eq!(file.line_at(4), None);
    }

    #[test]
    fn test_empty_file() {
        let file = SourceFile::new(0, "empty.c", "");
        assert_eq!(file.line_count(), 1);
        assert_eq!(file.offset_to_line_col(0), (1, 1));
    }

    #[test]
    fn test_format_span_caret() {
        let mut map = SourceMap::new();
        let file_id = map.add_file("t.c", "int x = @;");
        let span = Span::with_file(8, 9, file_id, 1, 9);
        let rendered = map.format_span(span).unwrap();
        assert!(rendered.starts_with("t.c:1:9\n"));
        assert!(rendered.contains("int x = @;"));
        assert!(rendered.ends_with("        ^"));
    }

    #[test]
    fn test_format_span_dummy() {
        let map = SourceMap::new();
        assert!(map.format_span(Span::DUMMY).is_none());
    }
}
