use crate::document::{Document, Metadata};
use log::warn;
use serde_json::Value;
use std::collections::VecDeque;

/// Maximum chunk length, in characters
pub const CHUNK_SIZE: usize = 1000;
/// Characters shared between consecutive chunks of the same page
pub const CHUNK_OVERLAP: usize = 150;

/// Split points tried in order: paragraph, line, word, then single characters.
const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Represents a text chunk with the metadata of the page it came from
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: String,
    pub metadata: Metadata,
}

/// Recursive character splitter.
///
/// Text is cut at the first separator that occurs in it. Pieces that are
/// still too long are split again with the next separator, and short pieces
/// are merged back into chunks of at most `chunk_size` characters, each one
/// starting with the tail (at most `chunk_overlap` characters) of the last.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &'static [&'static str],
}

impl Default for TextSplitter {
    fn default() -> Self {
        TextSplitter::new(CHUNK_SIZE, CHUNK_OVERLAP)
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        TextSplitter {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size),
            separators: DEFAULT_SEPARATORS,
        }
    }

    /// Split every page, keeping page order. Chunks never span two pages.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<TextChunk> {
        documents
            .iter()
            .flat_map(|document| {
                let metadata = non_empty_metadata(&document.metadata);
                self.split_text(&document.content)
                    .into_iter()
                    .map(move |text| TextChunk {
                        text,
                        metadata: metadata.clone(),
                    })
            })
            .collect()
    }

    /// Split raw text into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, remaining) = match separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
        {
            Some(idx) => (separators[idx], &separators[idx + 1..]),
            None => ("", &separators[..0]),
        };

        let mut chunks = Vec::new();
        let mut short_pieces = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }

            if !short_pieces.is_empty() {
                chunks.extend(self.merge_pieces(&short_pieces));
                short_pieces.clear();
            }

            if remaining.is_empty() {
                chunks.extend(join_trimmed(&[piece]));
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !short_pieces.is_empty() {
            chunks.extend(self.merge_pieces(&short_pieces));
        }

        chunks
    }

    /// Greedily pack pieces into chunks, carrying a tail of the previous chunk
    /// forward as overlap.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, self.chunk_size
                    );
                }

                if !current.is_empty() {
                    chunks.extend(join_trimmed(current.make_contiguous()));

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some(front) => total -= char_len(front),
                            None => break,
                        }
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        chunks.extend(join_trimmed(current.make_contiguous()));
        chunks
    }
}

/// Drop metadata entries whose value is null or an empty string.
pub fn non_empty_metadata(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(_, value)| match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Split at every occurrence of `separator`, attaching the separator to the
/// start of the piece that follows it. An empty separator yields characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(idx, c)| &text[idx..idx + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;

    for (idx, _) in text.match_indices(separator) {
        pieces.push(&text[start..idx]);
        start = idx;
    }
    pieces.push(&text[start..]);

    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn join_trimmed(pieces: &[&str]) -> Option<String> {
    let joined = pieces.concat();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
