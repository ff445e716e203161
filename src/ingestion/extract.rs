//! HTML-to-text extraction shared by the page and wiki loaders.
//!
//! Headings are rendered as markdown `#` lines so the header-aware splitter
//! can see the document structure; everything else becomes whitespace-normal
//! paragraphs separated by blank lines.

use scraper::{ElementRef, Html, Selector};

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "head", "nav", "footer"];
const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "main",
    "li",
    "ul",
    "ol",
    "table",
    "tr",
    "pre",
    "blockquote",
    "br",
    "hr",
];

/// Extracts readable text from an HTML document.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").expect("static selector");

    let mut builder = TextBuilder::default();
    let scope = document
        .select(&body_selector)
        .next()
        .unwrap_or_else(|| document.root_element());
    walk(scope, &mut builder);
    builder.finish()
}

fn walk(element: ElementRef<'_>, builder: &mut TextBuilder) {
    let tag = element.value().name();

    if SKIPPED_TAGS.contains(&tag) {
        return;
    }

    if let Some(level) = heading_level(tag) {
        builder.heading(level, &inline_text(element));
        return;
    }

    let is_block = BLOCK_TAGS.contains(&tag);
    if is_block {
        builder.flush();
    }

    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            walk(child_element, builder);
        } else if let Some(text) = child.value().as_text() {
            builder.inline(&text.text);
        }
    }

    if is_block {
        builder.flush();
    }
}

fn heading_level(tag: &str) -> Option<usize> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        _ => None,
    }
}

fn inline_text(element: ElementRef<'_>) -> String {
    let joined: String = element.text().collect();
    normalize(&joined)
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Default)]
struct TextBuilder {
    blocks: Vec<String>,
    current: String,
}

impl TextBuilder {
    fn inline(&mut self, text: &str) {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return;
        }
        if !self.current.is_empty() {
            self.current.push(' ');
        }
        self.current.push_str(&normalized);
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.blocks.push(std::mem::take(&mut self.current));
        }
    }

    fn heading(&mut self, level: usize, text: &str) {
        self.flush();
        if text.is_empty() {
            return;
        }
        self.blocks.push(format!("{} {}", "#".repeat(level), text));
    }

    fn finish(mut self) -> String {
        self.flush();
        self.blocks.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_become_markdown_lines() {
        let html = "<html><body>\
            <h1>Guide</h1>\
            <p>Intro paragraph.</p>\
            <h2>Install</h2>\
            <p>Run the installer.</p>\
            </body></html>";
        let text = html_to_text(html);
        assert_eq!(
            text,
            "# Guide\n\nIntro paragraph.\n\n## Install\n\nRun the installer."
        );
    }

    #[test]
    fn scripts_and_nav_are_dropped() {
        let html = "<body><nav>menu</nav><p>Content.</p><script>var x;</script></body>";
        assert_eq!(html_to_text(html), "Content.");
    }

    #[test]
    fn whitespace_is_normalized_inside_blocks() {
        let html = "<body><p>  spaced\n   out\ttext </p></body>";
        assert_eq!(html_to_text(html), "spaced out text");
    }
}
