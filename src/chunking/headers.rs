//! Stage one of the splitter: markdown-header-aware segmentation.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

/// A run of content bounded by header lines, with the header path above it.
#[derive(Clone, Debug)]
pub struct HeaderSegment {
    pub content: String,
    pub header_path: Map<String, Value>,
}

const HEADER_KEYS: [&str; 3] = ["heading_1", "heading_2", "heading_3"];

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,3})\s+(.*\S)\s*$").expect("static regex"))
}

/// Splits content into segments at `#`/`##`/`###` header boundaries.
///
/// Header lines move into the segment's metadata path rather than its
/// content. A shallower header resets all deeper levels. Lines inside fenced
/// code blocks are never treated as headers. Whitespace-only segments are
/// dropped entirely.
pub fn split_by_headers(content: &str) -> Vec<HeaderSegment> {
    let mut segments = Vec::new();
    let mut headers: [Option<String>; 3] = [None, None, None];
    let mut lines: Vec<&str> = Vec::new();
    let mut in_code_fence = false;

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_code_fence = !in_code_fence;
            lines.push(line);
            continue;
        }

        let header = if in_code_fence {
            None
        } else {
            header_regex().captures(line)
        };

        match header {
            Some(captures) => {
                flush(&mut segments, &headers, &mut lines);
                let level = captures[1].len();
                headers[level - 1] = Some(captures[2].to_string());
                for deeper in headers.iter_mut().skip(level) {
                    *deeper = None;
                }
            }
            None => lines.push(line),
        }
    }
    flush(&mut segments, &headers, &mut lines);

    segments
}

fn flush(segments: &mut Vec<HeaderSegment>, headers: &[Option<String>; 3], lines: &mut Vec<&str>) {
    let content = lines.join("\n").trim().to_string();
    lines.clear();
    if content.is_empty() {
        return;
    }

    let mut header_path = Map::new();
    for (key, title) in HEADER_KEYS.iter().zip(headers.iter()) {
        if let Some(title) = title {
            header_path.insert((*key).to_string(), Value::String(title.clone()));
        }
    }
    segments.push(HeaderSegment {
        content,
        header_path,
    });
}
