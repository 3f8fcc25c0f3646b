//! Text chunking with overlap for optimal embedding.

use crate::models::{Chunk, ChunkingConfig, SourceDocument};

/// Text chunker that splits documents into overlapping chunks.
///
/// Sizes and offsets are counted in characters, not bytes or tokens.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters shared by consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new text chunker with the given configuration.
    ///
    /// An overlap that is not smaller than the chunk size is clamped so the
    /// chunker always makes progress; [`ChunkingConfig::validate`] rejects it earlier.
    pub fn new(config: &ChunkingConfig) -> Self {
        let chunk_size = (config.chunk_size as usize).max(1);
        let overlap = (config.chunk_overlap as usize).min(chunk_size - 1);
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Create a chunker with default settings.
    pub fn with_defaults() -> Self {
        Self::new(&ChunkingConfig::default())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk every document, keeping document order and left-to-right order within each.
    pub fn chunk_all(&self, documents: &[SourceDocument]) -> Vec<Chunk> {
        documents.iter().flat_map(|doc| self.chunk(doc)).collect()
    }

    /// Chunk a document into overlapping segments.
    pub fn chunk(&self, document: &SourceDocument) -> Vec<Chunk> {
        let content = &document.content;

        if content.trim().is_empty() {
            return Vec::new();
        }

        // Blank windows inside longer content are kept so neighbours still overlap
        self.split_with_overlap(content)
            .into_iter()
            .enumerate()
            .map(|(idx, (text, position))| {
                Chunk::from_document(document, text, position as u64, idx as u32)
            })
            .collect()
    }

    /// Split content into overlapping chunks with their character offsets.
    fn split_with_overlap(&self, content: &str) -> Vec<(String, usize)> {
        let chars: Vec<char> = content.chars().collect();
        let total_chars = chars.len();

        // Short content is returned whole, no overlap applied
        if total_chars <= self.chunk_size {
            return vec![(content.to_string(), 0)];
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let target_end = start + self.chunk_size;

            if target_end >= total_chars {
                chunks.push((chars[start..].iter().collect(), start));
                break;
            }

            let end = self.find_break_point(&chars, start, target_end);
            chunks.push((chars[start..end].iter().collect(), start));

            // end > start + overlap, so this always advances
            start = end - self.overlap;
        }

        chunks
    }

    /// Find a natural break point near the target end position.
    ///
    /// Returns an exclusive end offset in `(start + overlap, target_end]`.
    fn find_break_point(&self, chars: &[char], start: usize, target_end: usize) -> usize {
        // Look in the last 20% of the window, but never so early that the
        // next chunk would not move forward.
        let lowest_end = target_end
            .saturating_sub(self.chunk_size / 5)
            .max(start + self.overlap + 1);

        // Priority: paragraph > line > sentence > word > hard cut
        let mut last_paragraph = None;
        let mut last_newline = None;
        let mut last_sentence = None;
        let mut last_space = None;

        for i in (lowest_end - 1)..target_end {
            let end = i + 1;
            match chars[i] {
                '\n' => {
                    if i > start && chars[i - 1] == '\n' {
                        last_paragraph = Some(end);
                    }
                    last_newline = Some(end);
                }
                '.' | '!' | '?' => {
                    if chars.get(i + 1).is_some_and(|c| c.is_whitespace()) {
                        last_sentence = Some(end);
                    }
                }
                c if c.is_whitespace() => {
                    last_space = Some(end);
                }
                _ => {}
            }
        }

        last_paragraph
            .or(last_newline)
            .or(last_sentence)
            .or(last_space)
            .unwrap_or(target_end)
    }
}
