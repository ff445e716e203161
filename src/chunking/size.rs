//! Stage two of the splitter: size-bounded segmentation with overlap.
//!
//! A recursive boundary search tries separators in priority order (paragraph
//! break, line break, sentence boundary, space, character), so a chunk never
//! cuts through a boundary when a higher-priority one fits inside the window.
//! Lengths are counted in characters, not bytes.

/// Maximum chunk length in characters.
pub const CHUNK_SIZE: usize = 300;
/// Characters shared between consecutive chunks of the same segment.
pub const CHUNK_OVERLAP: usize = 20;

/// One boundary level of the recursive search.
///
/// `keep_with_previous` splits *after* the separator so it stays attached to
/// the preceding piece (the sentence boundary behaves like a lookbehind).
#[derive(Clone, Copy)]
struct Boundary {
    separator: &'static str,
    keep_with_previous: bool,
}

const BOUNDARIES: [Boundary; 5] = [
    Boundary {
        separator: "\n\n",
        keep_with_previous: false,
    },
    Boundary {
        separator: "\n",
        keep_with_previous: false,
    },
    Boundary {
        separator: ". ",
        keep_with_previous: true,
    },
    Boundary {
        separator: " ",
        keep_with_previous: false,
    },
    Boundary {
        separator: "",
        keep_with_previous: false,
    },
];

/// Splits one segment into chunks of at most `chunk_size` characters with
/// `overlap` characters carried between consecutive chunks.
pub fn split_segment(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    split_with(text, &BOUNDARIES, chunk_size, overlap)
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

fn split_with(
    text: &str,
    boundaries: &[Boundary],
    chunk_size: usize,
    overlap: usize,
) -> Vec<String> {
    // Pick the highest-priority boundary present in this text; the char-level
    // boundary always applies.
    let (position, boundary) = boundaries
        .iter()
        .enumerate()
        .find(|(_, b)| b.separator.is_empty() || text.contains(b.separator))
        .map(|(i, b)| (i, *b))
        .expect("char-level boundary always matches");
    let deeper = &boundaries[position + 1..];

    let join_separator = if boundary.keep_with_previous {
        ""
    } else {
        boundary.separator
    };

    let mut chunks = Vec::new();
    let mut fitting: Vec<String> = Vec::new();
    for piece in split_pieces(text, boundary) {
        if char_len(&piece) < chunk_size {
            fitting.push(piece);
            continue;
        }
        if !fitting.is_empty() {
            chunks.extend(merge_pieces(
                std::mem::take(&mut fitting),
                join_separator,
                chunk_size,
                overlap,
            ));
        }
        if deeper.is_empty() {
            chunks.push(piece);
        } else {
            chunks.extend(split_with(&piece, deeper, chunk_size, overlap));
        }
    }
    if !fitting.is_empty() {
        chunks.extend(merge_pieces(fitting, join_separator, chunk_size, overlap));
    }
    chunks
}

fn split_pieces(text: &str, boundary: Boundary) -> Vec<String> {
    if boundary.separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    if boundary.keep_with_previous {
        return split_after(text, boundary.separator);
    }
    text.split(boundary.separator)
        .map(str::to_string)
        .collect()
}

fn split_after(text: &str, separator: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while let Some(found) = text[start..].find(separator) {
        let end = start + found + separator.len();
        pieces.push(text[start..end].to_string());
        start = end;
    }
    if start < text.len() {
        pieces.push(text[start..].to_string());
    }
    pieces
}

/// Greedily packs pieces into windows of `chunk_size`, carrying an `overlap`
/// tail of whole pieces into the next window.
fn merge_pieces(
    pieces: Vec<String>,
    separator: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: std::collections::VecDeque<String> = std::collections::VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let piece_len = char_len(&piece);
        let joined_extra = if window.is_empty() { 0 } else { separator_len };

        if total + piece_len + joined_extra > chunk_size && !window.is_empty() {
            chunks.push(join_window(&window, separator));
            // Shrink the window to the overlap budget before starting the
            // next chunk, keeping whole pieces only.
            while total > overlap
                || (total + piece_len + separator_len > chunk_size && total > 0)
            {
                let Some(front) = window.pop_front() else {
                    break;
                };
                total -= char_len(&front);
                if !window.is_empty() {
                    total -= separator_len;
                }
            }
        }

        if !window.is_empty() {
            total += separator_len;
        }
        total += piece_len;
        window.push_back(piece);
    }

    if !window.is_empty() {
        chunks.push(join_window(&window, separator));
    }
    chunks
}

fn join_window(window: &std::collections::VecDeque<String>, separator: &str) -> String {
    window
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(separator)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_segment("hello world", CHUNK_SIZE, CHUNK_OVERLAP);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn whitespace_only_produces_nothing() {
        assert!(split_segment("   \n\n  ", CHUNK_SIZE, CHUNK_OVERLAP).is_empty());
    }

    #[test]
    fn every_chunk_respects_the_size_bound() {
        let paragraph = "The ingestion pipeline fetches pages and splits them. \
            Each sentence here adds material so that the segment comfortably \
            exceeds a single window. "
            .repeat(12);
        let chunks = split_segment(&paragraph, CHUNK_SIZE, CHUNK_OVERLAP);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= CHUNK_SIZE,
                "chunk exceeded bound: {} chars",
                chunk.chars().count()
            );
        }
    }

    #[test]
    fn paragraph_breaks_win_over_smaller_boundaries() {
        let first = "a".repeat(120);
        let second = "b".repeat(120);
        let text = format!("{first}\n\n{second}");
        let chunks = split_segment(&text, 150, 20);
        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn sentence_boundary_keeps_the_period() {
        let text = "First sentence ends here. Second sentence follows along. \
            Third sentence closes it out.";
        let chunks = split_segment(text, 60, 10);
        assert!(chunks.len() > 1);
        assert!(chunks[0].ends_with('.'), "got: {:?}", chunks[0]);
    }

    #[test]
    fn long_unbroken_text_falls_back_to_characters() {
        let text = "x".repeat(750);
        let chunks = split_segment(&text, CHUNK_SIZE, CHUNK_OVERLAP);
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= CHUNK_SIZE);
        }
    }

    #[test]
    fn consecutive_chunks_share_an_overlap() {
        let words: Vec<String> = (0..120).map(|i| format!("word{i}")).collect();
        let text = words.join(" ");
        let chunks = split_segment(&text, 100, 20);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail: String = pair[0]
                .chars()
                .skip(pair[0].chars().count().saturating_sub(8))
                .collect();
            assert!(
                pair[1].contains(tail.split_whitespace().last().unwrap_or("")),
                "no shared material between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn splitting_loses_no_content_outside_overlaps() {
        let words: Vec<String> = (0..80).map(|i| format!("tok{i}")).collect();
        let text = words.join(" ");
        let chunks = split_segment(&text, 100, 20);

        // Every original word must survive in at least one chunk, and chunk
        // start positions must be monotonically non-decreasing in the source.
        for word in &words {
            assert!(
                chunks.iter().any(|c| c.contains(word.as_str())),
                "lost {word}"
            );
        }
        let mut last_start = 0;
        for chunk in &chunks {
            let start = text.find(chunk.as_str()).expect("chunk is a substring");
            assert!(start >= last_start);
            last_start = start;
        }
    }
}
