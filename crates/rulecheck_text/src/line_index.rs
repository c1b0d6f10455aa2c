use memchr::memchr_iter;

/// Precomputed line-start table for offset <-> line/column conversion
///
/// Lines and columns are 1-indexed. Columns are byte columns, matching the
/// offsets produced by the markup pass.
pub struct LineIndex {
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = Vec::with_capacity(source.len() / 40 + 1);
        line_starts.push(0);
        for pos in memchr_iter(b'\n', source.as_bytes()) {
            line_starts.push((pos + 1) as u32);
        }
        Self {
            line_starts,
            len: source.len() as u32,
        }
    }

    /// Convert a byte offset to (line, column), both 1-indexed
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let column = offset - self.line_starts[line] + 1;
        ((line + 1) as u32, column)
    }

    /// Convert a 1-indexed (line, column) pair back to a byte offset
    ///
    /// Returns `None` when the line does not exist or the column runs past
    /// the end of the source.
    pub fn offset(&self, line: u32, column: u32) -> Option<u32> {
        if line == 0 || column == 0 {
            return None;
        }
        let line_start = *self.line_starts.get(line as usize - 1)?;
        let offset = line_start + column - 1;
        if offset > self.len {
            return None;
        }
        Some(offset)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
