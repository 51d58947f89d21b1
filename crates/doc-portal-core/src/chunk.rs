//! Paragraph-boundary text splitter.
//!
//! Turns extracted document text into [`Chunk`]s no larger than a
//! `max_tokens` budget (4 characters per token). Paragraphs (`\n\n`) are
//! packed together while they fit; a paragraph that alone exceeds the
//! budget is hard-split at the last newline or space before the limit.
//!
//! Every chunk gets a `row_id` equal to its position, so chunks from the
//! same source get stable `source::row_id` fingerprints across re-ingestion.
//!
//! ```rust
//! use doc_portal_core::chunk::split_text;
//!
//! let pieces = split_text("Hello world.\n\nSecond paragraph.", 700);
//! assert_eq!(pieces, vec!["Hello world.\n\nSecond paragraph."]);
//! ```

use crate::models::{Chunk, Metadata};

/// Rough characters-per-token ratio used to size chunks.
const CHARS_PER_TOKEN: usize = 4;

/// Split `text` into pieces of at most `max_tokens × 4` bytes.
///
/// Blank input yields no pieces.
pub fn split_text(text: &str, max_tokens: usize) -> Vec<String> {
    let max_chars = (max_tokens * CHARS_PER_TOKEN).max(1);
    let mut pieces = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if para.len() > max_chars {
            flush(&mut buf, &mut pieces);
            hard_split(para, max_chars, &mut pieces);
            continue;
        }

        let joined_len = if buf.is_empty() {
            para.len()
        } else {
            buf.len() + 2 + para.len()
        };
        if joined_len > max_chars {
            flush(&mut buf, &mut pieces);
        }
        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
    }
    flush(&mut buf, &mut pieces);
    pieces
}

/// Split `text` and wrap each piece in a [`Chunk`].
///
/// Each chunk carries a copy of `base` plus `row_id = <position>`.
pub fn chunk_document(text: &str, base: &Metadata, max_tokens: usize) -> Vec<Chunk> {
    split_text(text, max_tokens)
        .into_iter()
        .enumerate()
        .map(|(row, piece)| {
            let mut metadata = base.clone();
            metadata.insert("row_id".to_string(), row.into());
            Chunk {
                text: piece,
                metadata,
            }
        })
        .collect()
}

fn flush(buf: &mut String, pieces: &mut Vec<String>) {
    if !buf.is_empty() {
        pieces.push(std::mem::take(buf));
    }
}

fn hard_split(para: &str, max_chars: usize, pieces: &mut Vec<String>) {
    let mut rest = para;
    while !rest.is_empty() {
        let cut = if rest.len() <= max_chars {
            rest.len()
        } else {
            let limit = floor_char_boundary(rest, max_chars);
            let at_break = rest[..limit]
                .rfind(['\n', ' '])
                .map(|pos| pos + 1)
                .unwrap_or(limit);
            if at_break == 0 {
                first_char_len(rest)
            } else {
                at_break
            }
        };
        let piece = rest[..cut].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        rest = &rest[cut..];
    }
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn first_char_len(s: &str) -> usize {
    s.chars().next().map(char::len_utf8).unwrap_or(s.len())
}
