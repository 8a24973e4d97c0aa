//! Newline index with LF/CRLF-robust line/byte mapping.
//!
//! Goals
//! - Single pass over bytes to record '\n' positions.
//! - 1-based external line numbers (matches Tree-sitter row + 1).
//! - O(1) line→byte start/end via the index.
//! - Content end excludes the line terminator ('\n' or "\r\n").
//!
//! Notes
//! - An empty buffer has 0 lines.
//! - A buffer ending in '\n' has a final, empty line.
//! - Byte ranges are half-open (Rust slicing convention).

use std::cmp;

#[derive(Debug, Clone)]
pub struct NewlineIndex
{
    /// Byte positions of every '\n' in the buffer.
    nl_positions: Vec<usize>,
    /// Total byte length of the buffer.
    len: usize,
}

impl NewlineIndex
{
    /// Build an index recording positions of '\n'.
    pub fn build(bytes: &[u8]) -> Self
    {
        let mut nl_positions = Vec::with_capacity(bytes.len() / 48);
        nl_positions.extend(memchr::memchr_iter(b'\n', bytes));

        Self { nl_positions, len: bytes.len() }
    }

    /// Total number of logical lines.
    /// Empty buffer => 0 lines; else (#'\n' + 1).
    pub fn line_count(&self) -> usize
    {
        if self.len == 0 { 0 } else { self.nl_positions.len() + 1 }
    }

    /// Start byte (inclusive) of a 1-based line.
    pub fn start_byte_of_line(
        &self,
        line1: usize,
    ) -> Option<usize>
    {
        if line1 == 0 || line1 > self.line_count()
        {
            return None;
        }
        if line1 == 1
        {
            return Some(0);
        }
        self.nl_positions
            .get(line1 - 2)
            .map(|&prev_nl| prev_nl + 1)
    }

    /// End byte (exclusive) of a line's content, before its
    /// terminator. A trailing '\r' before '\n' is excluded.
    pub fn end_byte_of_line(
        &self,
        line1: usize,
        bytes: &[u8],
    ) -> Option<usize>
    {
        if line1 == 0 || line1 > self.line_count()
        {
            return None;
        }

        match self
            .nl_positions
            .get(line1 - 1)
        {
            Some(&nl) if nl > 0 && bytes.get(nl - 1) == Some(&b'\r') => Some(nl - 1),
            Some(&nl) => Some(nl),
            // Last line without trailing '\n' ends at EOF.
            None => Some(self.len),
        }
    }

    /// First byte after the line's terminator, i.e. the start of
    /// the following line, or EOF for the last line.
    pub fn after_line(
        &self,
        line1: usize,
    ) -> Option<usize>
    {
        if line1 == 0 || line1 > self.line_count()
        {
            return None;
        }
        Some(
            self.nl_positions
                .get(line1 - 1)
                .map_or(self.len, |&nl| nl + 1),
        )
    }

    /// Content byte range for an inclusive 1-based line span.
    /// The end of the span is clamped to the last line.
    pub fn byte_range_for_lines(
        &self,
        start_line1: usize,
        end_line1: usize,
        bytes: &[u8],
    ) -> Option<(usize, usize)>
    {
        if start_line1 == 0 || start_line1 > end_line1
        {
            return None;
        }

        let s = self.start_byte_of_line(start_line1)?;
        let e = self.end_byte_of_line(cmp::min(end_line1, self.line_count()), bytes)?;

        (s <= e).then_some((s, e))
    }
}
