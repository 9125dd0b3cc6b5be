//! Line-aware chunker (C3).
//!
//! Splits a file's text into overlapping chunks bounded by character count,
//! never by AST structure -- a file here is an arbitrary text blob from a
//! remote repository, not a parsed syntax tree. Line-aware boundaries keep
//! citations meaningful; overlap hedges against semantically important
//! regions split by a chunk boundary.
//!
//! ## Growth rule
//!
//! Starting at a 1-based `start` line, extend `end` while the accumulated
//! byte count is below `MAX_CHARS`, stopping early once `MIN_CHARS` is
//! reached. This early-stop reading is the chosen resolution of the
//! chunker's open question: `original_source`'s inner-loop check after
//! crossing `MIN_CHARS` is a dead branch that visibly intended early
//! termination but didn't implement it. Stopping early keeps chunk size
//! meaningfully below `MAX_CHARS` instead of always hugging it.

use crate::config::ChunkingConfig;

/// One emitted chunk: raw text plus its 1-based inclusive line range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Chunk text, lines joined by `\n`.
    pub text: String,
    /// Start line, 1-based inclusive.
    pub start_line: u32,
    /// End line, 1-based inclusive.
    pub end_line: u32,
}

/// Split `lines` (already split on `\n`, no terminators) into overlapping
/// chunks per the configured size and overlap bounds.
///
/// Every line appears in at least one chunk (chunk-coverage property,
/// spec §8); each chunk's bounds satisfy `1 <= start <= end <= lines.len()`.
pub fn chunk_lines(lines: &[&str], config: &ChunkingConfig) -> Vec<ChunkSpan> {
    let n = lines.len();
    if n == 0 {
        return Vec::new();
    }

    let mut spans = Vec::new();
    // 0-based cursor; converted to 1-based line numbers on emission.
    let mut start = 0usize;

    while start < n {
        let mut end = start; // inclusive, 0-based
        let mut size = lines[end].len() + 1; // +1 for the newline terminator

        while end + 1 < n && size < config.max_chars {
            end += 1;
            size += lines[end].len() + 1;
            if size >= config.min_chars {
                break;
            }
        }

        let text = lines[start..=end].join("\n");
        spans.push(ChunkSpan {
            text,
            start_line: (start + 1) as u32,
            end_line: (end + 1) as u32,
        });

        if end + 1 >= n {
            break;
        }

        // Next chunk starts `overlap` lines back from this chunk's end,
        // clamped to make forward progress and to stay >= 0.
        let next_start = (end + 1).saturating_sub(config.overlap);
        start = if next_start > start { next_start } else { end + 1 };
    }

    spans
}

/// Convenience wrapper splitting a file body into lines before chunking.
///
/// Uses `str::lines()` (the `splitlines()`-equivalent `original_source` uses),
/// not `split('\n')` -- a trailing `\n` at EOF would otherwise yield a
/// phantom empty final line, folding into the last chunk and pushing its
/// `end_line` one past the true end of file.
pub fn chunk_text(body: &str, config: &ChunkingConfig) -> Vec<ChunkSpan> {
    let lines: Vec<&str> = body.lines().collect();
    chunk_lines(&lines, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> ChunkingConfig {
        ChunkingConfig {
            min_chars: 900,
            max_chars: 1800,
            overlap: 15,
            file_embed_prefix_chars: 10_000,
            preview_chars: 1_000,
        }
    }

    #[test]
    fn empty_input_produces_no_chunks() {
        let spans = chunk_lines(&[], &default_config());
        assert!(spans.is_empty());
    }

    #[test]
    fn single_short_line_is_one_chunk() {
        let lines = vec!["hello world"];
        let spans = chunk_lines(&lines, &default_config());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start_line, 1);
        assert_eq!(spans[0].end_line, 1);
        assert_eq!(spans[0].text, "hello world");
    }

    #[test]
    fn chunk_coverage_every_line_is_covered() {
        let owned: Vec<String> = (0..100).map(|i| format!("line {i} of 80 characters padding padding padding pad")).collect();
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let spans = chunk_lines(&lines, &default_config());

        let mut covered = vec![false; lines.len()];
        for span in &spans {
            assert!(span.start_line >= 1);
            assert!(span.end_line >= span.start_line);
            assert!(span.end_line as usize <= lines.len());
            for l in span.start_line..=span.end_line {
                covered[(l - 1) as usize] = true;
            }
        }
        assert!(covered.iter().all(|&c| c), "every line must be covered by at least one chunk");
    }

    #[test]
    fn chunk_sizes_respect_bounds_except_possibly_last() {
        let owned: Vec<String> = (0..200).map(|i| format!("{i:06}_{}", "x".repeat(74))).collect();
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let config = default_config();
        let spans = chunk_lines(&lines, &config);

        for (i, span) in spans.iter().enumerate() {
            let is_last = i == spans.len() - 1;
            if !is_last {
                assert!(span.text.len() + 1 >= config.min_chars || span.end_line as usize == lines.len());
                assert!(span.text.len() <= config.max_chars + lines[span.end_line as usize - 1].len());
            }
        }
    }

    #[test]
    fn overlap_between_consecutive_chunks() {
        let owned: Vec<String> = (0..100).map(|i| format!("line {i} padding padding padding padding pad")).collect();
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let spans = chunk_lines(&lines, &default_config());

        for pair in spans.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert!(next.start_line <= prev.end_line, "next chunk should start at or before previous chunk's end");
        }
    }

    #[test]
    fn reconstructs_original_text() {
        let lines = vec!["a", "b", "c"];
        let spans = chunk_lines(&lines, &default_config());
        assert_eq!(spans[0].text, "a\nb\nc");
    }

    #[test]
    fn chunk_text_ignores_trailing_newline_at_eof() {
        // spec §8 scenario 2: README.md's sole content is "hello world\n";
        // build_embeddings must see this as a single-line file (1-1), not
        // a phantom two-line file ending in an empty line.
        let spans = chunk_text("hello world\n", &default_config());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start_line, 1);
        assert_eq!(spans[0].end_line, 1);
        assert_eq!(spans[0].text, "hello world");
    }

    #[test]
    fn chunk_text_without_trailing_newline_matches_with_trailing_newline() {
        let with_newline = chunk_text("a\nb\nc\n", &default_config());
        let without_newline = chunk_text("a\nb\nc", &default_config());
        assert_eq!(with_newline, without_newline);
    }
}
