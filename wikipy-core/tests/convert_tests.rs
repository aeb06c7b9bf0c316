// Tests for HTML conversion

use wikipy_core::convert::{extract_sections, html_to_markdown, html_to_text};

const ARTICLE: &str = r#"<!DOCTYPE html>
<html><head><title>Dog</title><style>p { color: red; }</style></head>
<body>
<section>
<p>The <b>dog</b> is a domesticated descendant of the wolf.<sup class="reference">[1]</sup></p>
<script>console.log("tracking");</script>
</section>
<section>
<h2>Etymology</h2>
<p>The word dog comes from Old English.</p>
<ul><li>Hound</li><li>Pooch</li></ul>
</section>
<section>
<h2>Taxonomy</h2>
<h3>Classification</h3>
<p>Dogs belong to the genus Canis.</p>
</section>
</body></html>"#;

#[test]
fn test_markdown_strips_noise() {
    let markdown = html_to_markdown(ARTICLE).unwrap();

    assert!(markdown.contains("**dog**"));
    assert!(markdown.contains("## Etymology"));
    assert!(!markdown.contains("[1]"));
    assert!(!markdown.contains("tracking"));
    assert!(!markdown.contains("color: red"));
    assert!(!markdown.contains("\n\n\n"));
}

#[test]
fn test_text_one_paragraph_per_line() {
    let text = html_to_text(ARTICLE).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "The dog is a domesticated descendant of the wolf.");
    assert_eq!(lines[1], "Etymology");
    assert_eq!(lines[2], "The word dog comes from Old English.");
    assert_eq!(lines[3], "Hound");
    assert_eq!(lines[4], "Pooch");
    assert!(!text.contains("tracking"));
}

#[test]
fn test_sections() {
    let sections = extract_sections(ARTICLE).unwrap();

    let headings: Vec<(u8, &str)> = sections
        .iter()
        .map(|s| (s.level, s.heading.as_str()))
        .collect();
    assert_eq!(
        headings,
        vec![
            (0, "Introduction"),
            (2, "Etymology"),
            (2, "Taxonomy"),
            (3, "Classification")
        ]
    );
    assert_eq!(
        sections[0].text,
        "The dog is a domesticated descendant of the wolf."
    );
    assert_eq!(
        sections[1].text,
        "The word dog comes from Old English.\nHound\nPooch"
    );
    assert!(sections[2].text.is_empty());
}

#[test]
fn test_sections_without_lead() {
    let sections = extract_sections("<h2>Only</h2><p>Body</p>").unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].heading, "Only");
    assert_eq!(sections[0].text, "Body");
}

#[test]
fn test_empty_html() {
    assert!(extract_sections("").unwrap().is_empty());
    assert_eq!(html_to_text("").unwrap(), "");
}
