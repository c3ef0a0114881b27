//! Changelog segmentation.
//!
//! A changelog is split into [`ChangelogBlock`]s: one heading (which usually
//! carries a version and maybe a date) plus the nodes that follow it up to the
//! next heading. HTML changelogs are segmented with `scraper`, plain-text ones
//! line by line.

use quick_xml::escape::{escape, partial_escape};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

const UNSAFE_ELEMENTS: &[&str] = &["script", "style", "iframe", "object", "embed", "frame"];

const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "poster", "xlink:href"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

static TEXT_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:=+\s*(.+?)\s*=+|#+\s*(.+?)|([vV]?\d+(?:\.\d+)+.*?))\s*$").unwrap()
});

static TEXT_BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[*-]\s+(.+?)\s*$").unwrap());

/// One element of a block body: its tag name and inner HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyNode {
    pub tag: String,
    pub html: String,
}

impl BodyNode {
    pub fn new(tag: &str, html: impl Into<String>) -> Self {
        Self {
            tag: tag.to_string(),
            html: html.into(),
        }
    }

    /// The node wrapped in its original tag, attributes dropped
    pub fn to_html(&self) -> String {
        format!("<{0}>{1}</{0}>", self.tag, self.html)
    }
}

/// A heading and everything up to the next heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogBlock {
    pub heading: String,
    pub body: Vec<BodyNode>,
}

impl ChangelogBlock {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body: Vec::new(),
        }
    }

    /// Concatenated body, or `None` when nothing followed the heading
    pub fn content(&self) -> Option<String> {
        if self.body.is_empty() {
            return None;
        }
        Some(self.body.iter().map(BodyNode::to_html).collect())
    }
}

/// Segment an HTML changelog into blocks.
///
/// `container` narrows the search to a part of the page; when it matches nothing
/// the whole document is used. Within the scope the first element that has a
/// heading among its direct children is segmented.
pub fn parse_html_blocks(html: &str, container: &str) -> Vec<ChangelogBlock> {
    let document = Html::parse_document(html);

    let scope = match Selector::parse(container) {
        Ok(selector) => document.select(&selector).next(),
        Err(err) => {
            tracing::warn!("Invalid changelog selector {:?}: {}", container, err);
            None
        }
    }
    .unwrap_or_else(|| document.root_element());

    match heading_parent(scope) {
        Some(parent) => segment(parent),
        None => Vec::new(),
    }
}

fn heading_parent(scope: ElementRef<'_>) -> Option<ElementRef<'_>> {
    scope
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| {
            el.children()
                .filter_map(ElementRef::wrap)
                .any(|child| is_heading(child.value().name()))
        })
}

fn segment(parent: ElementRef<'_>) -> Vec<ChangelogBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<ChangelogBlock> = None;

    for child in parent.children().filter_map(ElementRef::wrap) {
        let name = child.value().name();
        if is_heading(name) {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            current = Some(ChangelogBlock::new(element_text(child)));
        } else if let Some(block) = current.as_mut() {
            block.body.push(BodyNode::new(name, child.inner_html().trim()));
        }
    }

    blocks.extend(current);
    blocks
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Text content of an element with whitespace collapsed
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Segment a plain-text changelog.
///
/// Headings look like `= 1.2 =`, `## 1.2` or a line starting with a version.
/// Bullet lines (`*` / `-`) following a heading become one `<ul>`, other lines
/// become paragraphs. Text before the first heading is ignored.
pub fn parse_text_blocks(text: &str) -> Vec<ChangelogBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<ChangelogBlock> = None;
    let mut items: Vec<String> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = TEXT_BULLET_RE.captures(line) {
            if current.is_some() {
                items.push(format!("<li>{}</li>", escape(&caps[1])));
            }
            continue;
        }

        if let Some(caps) = TEXT_HEADING_RE.captures(line) {
            if let Some(mut block) = current.take() {
                flush_items(&mut block, &mut items);
                blocks.push(block);
            }
            let heading = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            current = Some(ChangelogBlock::new(heading));
            continue;
        }

        if let Some(block) = current.as_mut() {
            flush_items(block, &mut items);
            block.body.push(BodyNode::new("p", escape(line.trim())));
        }
    }

    if let Some(mut block) = current {
        flush_items(&mut block, &mut items);
        blocks.push(block);
    }
    blocks
}

fn flush_items(block: &mut ChangelogBlock, items: &mut Vec<String>) {
    if !items.is_empty() {
        block.body.push(BodyNode::new("ul", items.concat()));
        items.clear();
    }
}

/// Re-serialize an HTML fragment without script-bearing elements, inline event
/// handlers or `javascript:` URLs. Comments are dropped.
pub fn sanitize(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    write_children(fragment.root_element(), &mut out);
    out
}

fn write_children(parent: ElementRef<'_>, out: &mut String) {
    for child in parent.children() {
        if let Some(element) = ElementRef::wrap(child) {
            write_element(element, out);
        } else if let Node::Text(text) = child.value() {
            out.push_str(&partial_escape(&**text));
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if UNSAFE_ELEMENTS.contains(&name) {
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        if is_unsafe_attribute(attr, value) {
            continue;
        }
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }
    write_children(element, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn is_unsafe_attribute(name: &str, value: &str) -> bool {
    let name = name.to_ascii_lowercase();
    if name.starts_with("on") {
        return true;
    }
    if !URL_ATTRIBUTES.contains(&name.as_str()) {
        return false;
    }

    // browsers ignore whitespace and control characters inside the scheme
    let scheme: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(11)
        .collect::<String>()
        .to_ascii_lowercase();
    scheme.starts_with("javascript:") || scheme.starts_with("vbscript:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_html_blocks_segments_by_heading() {
        let html = r#"
            <div id="tab-changelog">
                <h4>1.2</h4>
                <ul class="fixes"><li>Fixed bug</li></ul>
                <p>Thanks to everyone.</p>
                <h4>1.1</h4>
                <p>Initial public release</p>
            </div>
        "#;

        let blocks = parse_html_blocks(html, "#tab-changelog");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].heading, "1.2");
        assert_eq!(
            blocks[0].content().unwrap(),
            "<ul><li>Fixed bug</li></ul><p>Thanks to everyone.</p>"
        );
        assert_eq!(blocks[1].content().unwrap(), "<p>Initial public release</p>");
    }

    #[test]
    fn test_parse_html_blocks_finds_nested_headings() {
        let html = r#"
            <html><body><main><section class="notes">
                <h3>Version <strong>2.0</strong> beta 1</h3>
                <p>Rewrite</p>
            </section></main></body></html>
        "#;

        let blocks = parse_html_blocks(html, "#missing");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].heading, "Version 2.0 beta 1");
    }

    #[test]
    fn test_parse_html_blocks_heading_without_body() {
        let blocks = parse_html_blocks("<div><h2>1.0</h2><h2>0.9</h2><p>Old</p></div>", "div");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].content(), None);
        assert_eq!(blocks[1].content().as_deref(), Some("<p>Old</p>"));
    }

    #[test]
    fn test_parse_html_blocks_without_headings() {
        assert!(parse_html_blocks("<p>No changelog yet</p>", "body").is_empty());
        assert!(parse_html_blocks("", "body").is_empty());
    }

    #[test]
    fn test_parse_text_blocks() {
        let text = "\
Changelog for the plugin

= 1.2 (2024-03-01) =
* Fixed <b> tags
* Faster loading
Note: requires PHP 8

1.1 - 2024-02-01
- First release
";
        let blocks = parse_text_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].heading, "1.2 (2024-03-01)");
        assert_eq!(
            blocks[0].content().unwrap(),
            "<ul><li>Fixed &lt;b&gt; tags</li><li>Faster loading</li></ul><p>Note: requires PHP 8</p>"
        );
        assert_eq!(blocks[1].heading, "1.1 - 2024-02-01");
        assert_eq!(blocks[1].content().unwrap(), "<ul><li>First release</li></ul>");
    }

    #[test]
    fn test_sanitize() {
        let html = r#"<p onclick="steal()">Hi</p><SCRIPT type="x">bad()</SCRIPT><style>p{}</style>"#;
        assert_eq!(sanitize(html), "<p>Hi</p>");
        assert_eq!(sanitize("<ul><li>ok</li></ul>"), "<ul><li>ok</li></ul>");
    }

    #[test]
    fn test_sanitize_handler_after_slash() {
        assert_eq!(sanitize("<svg/onload=alert(1)>"), "<svg></svg>");
        assert_eq!(
            sanitize(r#"<img src="a.png"/onerror="x()">"#),
            r#"<img src="a.png">"#
        );
    }

    #[test]
    fn test_sanitize_unclosed_script() {
        assert_eq!(sanitize("<p>Notes</p><script>x()"), "<p>Notes</p>");
        assert_eq!(sanitize("<iframe src=//evil>"), "");
    }

    #[test]
    fn test_sanitize_script_urls() {
        assert_eq!(sanitize(r#"<a href="javascript:alert(1)">x</a>"#), "<a>x</a>");
        assert_eq!(sanitize("<a href=' JaVa\tScript:alert(1)'>x</a>"), "<a>x</a>");
        assert_eq!(
            sanitize(r#"<a href="https://example.com/?a=1&amp;b=2">x</a>"#),
            r#"<a href="https://example.com/?a=1&amp;b=2">x</a>"#
        );
        assert_eq!(
            sanitize(r#"<abbr title="Release &quot;candidate&quot;">RC</abbr>"#),
            r#"<abbr title="Release &quot;candidate&quot;">RC</abbr>"#
        );
    }

    #[test]
    fn test_sanitize_keeps_text_and_void_elements() {
        assert_eq!(
            sanitize("<p>Fish &amp; chips<br>it's 1 &lt; 2</p><!-- note -->"),
            "<p>Fish &amp; chips<br>it's 1 &lt; 2</p>"
        );
        assert_eq!(sanitize("Commit message: Tagging 1.0"), "Commit message: Tagging 1.0");
        assert_eq!(sanitize(""), "");
    }
}
