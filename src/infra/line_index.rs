//! Newline index with Go-style line accounting.
//!
//! Goals
//! - Single pass over bytes to record line starts.
//! - 1-based external line numbers (matches editor positions).
//! - O(1) line→byte start via the index.
//!
//! Notes
//! - A line exists only if at least one byte starts it, so a trailing
//!   '\n' does not open an extra empty line.
//! - An empty buffer still has one (empty) line.

#[derive(Debug, Clone)]
pub struct NewlineIndex {
    /// Byte offsets of every line start; always begins with 0.
    starts: Vec<usize>,
}

impl NewlineIndex {
    /// Build an index recording the start of every line.
    pub fn build(bytes: &[u8]) -> Self {
        let mut starts = Vec::with_capacity(bytes.len() / 48 + 1);
        starts.push(0);
        let mut i = 0usize;

        // A '\n' at the very end does not start a new line.
        while let Some(pos) = memchr::memchr(b'\n', &bytes[i..]) {
            let next = i + pos + 1;
            if next < bytes.len() {
                starts.push(next);
            }
            i = next;
            if i >= bytes.len() {
                break;
            }
        }

        Self { starts }
    }

    /// Total number of lines (never zero).
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Start byte (inclusive) of a 1-based line.
    /// Returns None if line is out of range.
    pub fn start_byte_of_line(&self, line1: usize) -> Option<usize> {
        if line1 == 0 {
            return None;
        }
        self.starts.get(line1 - 1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines_like_go() {
        assert_eq!(NewlineIndex::build(b"").line_count(), 1);
        assert_eq!(NewlineIndex::build(b"package p").line_count(), 1);
        assert_eq!(NewlineIndex::build(b"package p\n").line_count(), 1);
        assert_eq!(NewlineIndex::build(b"package p\n\n").line_count(), 2);
        assert_eq!(NewlineIndex::build(b"a\nb\nc").line_count(), 3);
    }

    #[test]
    fn maps_lines_to_start_bytes() {
        let text = b"package p\nfunc A() {\n}\n";
        let idx = NewlineIndex::build(text);

        assert_eq!(idx.start_byte_of_line(1), Some(0));
        assert_eq!(idx.start_byte_of_line(2), Some(10));
        assert_eq!(idx.start_byte_of_line(3), Some(21));
        assert_eq!(idx.start_byte_of_line(4), None);
        assert_eq!(idx.start_byte_of_line(0), None);
    }
}
