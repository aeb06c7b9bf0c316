//! Article HTML to Markdown and plain text.

use crate::error::{Result, WikipyError};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

/// Elements whose text never reaches the reader.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "sup", "link", "meta"];

const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, dd, blockquote";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// 0 for the lead section, otherwise the heading level.
    pub level: u8,
    pub heading: String,
    pub text: String,
}

pub fn html_to_markdown(html: &str) -> Result<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(HIDDEN_TAGS.to_vec())
        .build();
    let markdown = converter
        .convert(html)
        .map_err(|e| WikipyError::Conversion(format!("htmd conversion failed: {e}")))?;
    Ok(collapse_blank_lines(&markdown))
}

pub fn html_to_text(html: &str) -> Result<String> {
    let paragraphs: Vec<String> = blocks(html)?
        .into_iter()
        .map(|(_, text)| text)
        .collect();
    Ok(paragraphs.join("\n"))
}

pub fn extract_sections(html: &str) -> Result<Vec<Section>> {
    let mut sections = Vec::new();
    let mut current = Section {
        level: 0,
        heading: "Introduction".to_string(),
        text: String::new(),
    };

    for (level, text) in blocks(html)? {
        match level {
            Some(level) => {
                if current.level > 0 || !current.text.is_empty() {
                    sections.push(current);
                }
                current = Section {
                    level,
                    heading: text,
                    text: String::new(),
                };
            }
            None => {
                if !current.text.is_empty() {
                    current.text.push('\n');
                }
                current.text.push_str(&text);
            }
        }
    }
    if current.level > 0 || !current.text.is_empty() {
        sections.push(current);
    }
    Ok(sections)
}

/// Text of an inline fragment such as a search excerpt, tags removed.
pub fn strip_tags(fragment: &str) -> String {
    let fragment = Html::parse_fragment(fragment);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Non-empty block elements in document order, paired with the heading level
/// for `h1`..`h6`.
fn blocks(html: &str) -> Result<Vec<(Option<u8>, String)>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(BLOCK_SELECTOR)
        .map_err(|e| WikipyError::Conversion(format!("invalid selector: {e}")))?;

    let mut out = Vec::new();
    for element in document.select(&selector) {
        if has_block_ancestor(element) || is_hidden(element) {
            continue;
        }
        let text = visible_text(element);
        if text.is_empty() {
            continue;
        }
        out.push((heading_level(element.value().name()), text));
    }
    Ok(out)
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn has_block_ancestor(element: ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| matches!(e.name(), "p" | "li" | "dd" | "blockquote"))
    })
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| HIDDEN_TAGS.contains(&e.name()))
    })
}

/// Text of `element` minus anything under a hidden tag, whitespace collapsed.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_TAGS.contains(&e.name()))
        });
        if !hidden {
            raw.push_str(text);
        }
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collapse_blank_lines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut blank_run = 0;
    for line in s.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}
