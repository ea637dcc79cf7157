//! Overlapping word-window chunker.

use crate::{Error, Result};

/// Text chunk produced by the chunker. Chunks only live for the duration of
/// one ingestion run; they are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text
    pub content: String,
    /// Position in the chunk sequence (0-based)
    pub index: usize,
    /// Word index of the first token
    pub start_pos: usize,
    /// Word index after the last token
    pub end_pos: usize,
}

/// Splits normalized text into overlapping fixed-size word windows.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a new chunker.
    ///
    /// `size` and the step `size - overlap` must both be positive, otherwise
    /// the window loop would never terminate.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidArgument(
                "chunk_size must be positive".to_string(),
            ));
        }
        if overlap >= size {
            return Err(Error::InvalidArgument(format!(
                "overlap_size ({}) must be smaller than chunk_size ({})",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.size
    }

    pub fn overlap_size(&self) -> usize {
        self.overlap
    }

    /// Split text into overlapping chunks covering every word.
    ///
    /// Texts of up to `chunk_size` words produce exactly one chunk.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let step = self.size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + self.size).min(words.len());
            chunks.push(Chunk {
                content: words[start..end].join(" "),
                index: chunks.len(),
                start_pos: start,
                end_pos: end,
            });

            if end == words.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Collapse whitespace runs into single spaces and trim the ends.
///
/// Raw extractor output tends to carry page breaks and layout newlines that
/// would otherwise distort word windows.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunker_respects_overlap() {
        let chunker = Chunker::new(4, 1).unwrap();
        let chunks = chunker.chunk("one two three four five six seven");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "one two three four");
        assert_eq!(chunks[1].content, "four five six seven");
        assert_eq!(chunks[0].end_pos - chunks[0].start_pos, 4);
    }

    #[test]
    fn chunker_rejects_zero_size() {
        assert!(Chunker::new(0, 0).is_err());
    }

    #[test]
    fn chunker_rejects_overlap_not_smaller_than_size() {
        assert!(Chunker::new(4, 4).is_err());
        assert!(Chunker::new(4, 10).is_err());
    }

    #[test]
    fn chunker_empty_text_returns_empty() {
        let chunker = Chunker::new(4, 1).unwrap();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \t\n  ").is_empty());
    }

    #[test]
    fn chunker_short_text_single_chunk() {
        let chunker = Chunker::new(250, 50).unwrap();
        let chunks = chunker.chunk("just a few words");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "just a few words");
        assert_eq!(chunks[0].start_pos, 0);
        assert_eq!(chunks[0].end_pos, 4);
    }

    #[test]
    fn chunker_exact_size_text() {
        let chunker = Chunker::new(3, 1).unwrap();
        let chunks = chunker.chunk("one two three");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn chunk_count_matches_formula() {
        // N words, size=250, overlap=50 (step=200):
        // count = 1 if N <= 250, else ceil((N - 250) / 200) + 1
        let chunker = Chunker::new(250, 50).unwrap();
        for n in [1usize, 250, 251, 450, 451, 1000, 1234] {
            let text = vec!["w"; n].join(" ");
            let chunks = chunker.chunk(&text);
            let expected = if n <= 250 { 1 } else { (n - 250).div_ceil(200) + 1 };
            assert_eq!(chunks.len(), expected, "word count {}", n);
        }
    }

    #[test]
    fn chunks_cover_all_words_without_gaps() {
        let chunker = Chunker::new(250, 50).unwrap();
        let n = 1000;
        let text = (0..n).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks[0].start_pos, 0);
        assert_eq!(chunks.last().unwrap().end_pos, n);
        for pair in chunks.windows(2) {
            // Adjacent windows overlap; no word index is skipped.
            assert!(pair[1].start_pos <= pair[0].end_pos);
            assert_eq!(pair[1].start_pos, pair[0].end_pos - 50);
        }
    }

    #[test]
    fn chunk_indices_are_sequential() {
        let chunker = Chunker::new(2, 1).unwrap();
        let chunks = chunker.chunk("a b c d e");
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let chunker = Chunker::new(5, 2).unwrap();
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        assert_eq!(chunker.chunk(text), chunker.chunk(text));
    }

    #[test]
    fn chunker_no_overlap() {
        let chunker = Chunker::new(2, 0).unwrap();
        let chunks = chunker.chunk("a b c d e f");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "a b");
        assert_eq!(chunks[1].content, "c d");
        assert_eq!(chunks[2].content, "e f");
    }

    #[test]
    fn chunker_unicode_text() {
        let chunker = Chunker::new(3, 1).unwrap();
        let text = "Привет мир тест";
        let chunks = chunker.chunk(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
    }

    #[test]
    fn normalize_text_collapses_whitespace() {
        assert_eq!(
            normalize_text("  one\n\ntwo\t three  \r\n"),
            "one two three"
        );
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   "), "");
    }
}
