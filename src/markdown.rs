//! Markdown rendering pipeline.
//!
//! Rendering is delegated to `pulldown-cmark`; this module only applies a
//! few event transforms on top:
//!
//! - headings get anchor ids derived from their text,
//! - fenced code blocks with a language token are syntax-highlighted via
//!   `syntect`, blocks without one get a plain escaped wrapper,
//! - absolute `http(s)` links open in a new tab.

use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html,
};
use std::sync::OnceLock;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME: OnceLock<Theme> = OnceLock::new();

fn syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme() -> &'static Theme {
    THEME.get_or_init(|| {
        let mut themes = ThemeSet::load_defaults().themes;
        themes
            .remove("InspiredGitHub")
            .or_else(|| themes.remove("base16-ocean.light"))
            .unwrap_or_default()
    })
}

// ============================================================================
// Renderer
// ============================================================================

/// Markdown renderer shared across all pages of a build.
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        Self { options }
    }

    /// Convert a markdown body to an HTML fragment.
    pub fn render(&self, markdown: &str) -> String {
        let events: Vec<Event<'_>> = Parser::new_ext(markdown, self.options).collect();

        let events = inject_heading_ids(events);
        let events = highlight_code_blocks(events);
        let events = retarget_external_links(events);

        let mut output = String::new();
        html::push_html(&mut output, events.into_iter());
        output
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Event Transforms
// ============================================================================

/// Build an anchor id from heading text: lowercased, spaces become dashes.
fn anchor_id(text: &str) -> String {
    text.to_lowercase().replace(' ', "-")
}

/// In-flight heading state while buffering its inner events.
struct HeadingBuf<'a> {
    level: HeadingLevel,
    classes: Vec<CowStr<'a>>,
    attrs: Vec<(CowStr<'a>, Option<CowStr<'a>>)>,
    inner: Vec<Event<'a>>,
    text: String,
}

/// Give every heading an id derived from its visible text.
fn inject_heading_ids(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut heading: Option<HeadingBuf<'_>> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading {
                level,
                classes,
                attrs,
                ..
            }) => {
                heading = Some(HeadingBuf {
                    level,
                    classes,
                    attrs,
                    inner: Vec::new(),
                    text: String::new(),
                });
            }
            Event::End(TagEnd::Heading(end_level)) => {
                if let Some(buf) = heading.take() {
                    let id = CowStr::Boxed(anchor_id(&buf.text).into_boxed_str());
                    out.push(Event::Start(Tag::Heading {
                        level: buf.level,
                        id: Some(id),
                        classes: buf.classes,
                        attrs: buf.attrs,
                    }));
                    out.extend(buf.inner);
                }
                out.push(Event::End(TagEnd::Heading(end_level)));
            }
            event => {
                if let Some(buf) = heading.as_mut() {
                    match &event {
                        Event::Text(text) | Event::Code(text) => buf.text.push_str(text),
                        _ => {}
                    }
                    buf.inner.push(event);
                } else {
                    out.push(event);
                }
            }
        }
    }

    out
}

/// Replace code blocks with highlighted HTML.
///
/// Fenced blocks with a language token go through syntect; everything else
/// (bare fences, indented blocks) is wrapped and escaped as-is.
fn highlight_code_blocks(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut code: Option<(Option<String>, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match &kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|token| !token.is_empty())
                        .map(str::to_owned),
                    CodeBlockKind::Indented => None,
                };
                code = Some((lang, String::new()));
            }
            Event::Text(text) if code.is_some() => {
                if let Some((_, content)) = code.as_mut() {
                    content.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, content)) = code.take() {
                    let html = match lang {
                        Some(lang) => highlight_code(&content, &lang),
                        None => format!(
                            "<div class=\"althighlight\"><pre><code>{}</code></pre></div>",
                            escape_html(&content)
                        ),
                    };
                    out.push(Event::Html(CowStr::Boxed(html.into_boxed_str())));
                }
            }
            event => out.push(event),
        }
    }

    out
}

fn highlight_code(code: &str, lang: &str) -> String {
    let set = syntax_set();
    let syntax = set
        .find_syntax_by_token(lang)
        .or_else(|| set.find_syntax_by_extension(lang))
        .unwrap_or_else(|| set.find_syntax_plain_text());

    match highlighted_html_for_string(code, set, syntax, theme()) {
        Ok(html) => html,
        // Fall back to a plain escaped block
        Err(_) => format!("<pre><code>{}</code></pre>", escape_html(code)),
    }
}

/// Rewrite absolute links to open in a new tab (`target="_new"`).
fn retarget_external_links(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut link_stack: Vec<bool> = Vec::new();

    for event in events {
        match event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let external = dest_url.starts_with("http");
                if external {
                    let mut anchor = format!("<a href=\"{}\"", escape_html(&dest_url));
                    if !title.is_empty() {
                        anchor.push_str(&format!(" title=\"{}\"", escape_html(&title)));
                    }
                    anchor.push_str(" target=\"_new\">");
                    out.push(Event::InlineHtml(CowStr::Boxed(anchor.into_boxed_str())));
                } else {
                    out.push(Event::Start(Tag::Link {
                        link_type,
                        dest_url,
                        title,
                        id,
                    }));
                }
                link_stack.push(external);
            }
            Event::End(TagEnd::Link) => {
                if link_stack.pop().unwrap_or(false) {
                    out.push(Event::InlineHtml(CowStr::Borrowed("</a>")));
                } else {
                    out.push(Event::End(TagEnd::Link));
                }
            }
            event => out.push(event),
        }
    }

    out
}

/// Minimal HTML escaping for text placed into markup or attributes.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        MarkdownRenderer::new().render(markdown)
    }

    // ------------------------------------------------------------------------
    // anchor_id tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_anchor_id_basic() {
        assert_eq!(anchor_id("Hello World"), "hello-world");
    }

    #[test]
    fn test_anchor_id_mixed_case() {
        assert_eq!(anchor_id("Binary Search Trees"), "binary-search-trees");
    }

    #[test]
    fn test_anchor_id_already_lower() {
        assert_eq!(anchor_id("notes"), "notes");
    }

    // ------------------------------------------------------------------------
    // heading tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_heading_gets_anchor_id() {
        let html = render("# Hello World\n");
        assert!(html.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
    }

    #[test]
    fn test_heading_with_code_span() {
        let html = render("## Using `map` here\n");
        assert!(html.contains(r#"id="using-map-here""#));
        assert!(html.contains("<code>map</code>"));
    }

    #[test]
    fn test_multiple_headings() {
        let html = render("# One\n\n## Two Parts\n");
        assert!(html.contains(r#"<h1 id="one">"#));
        assert!(html.contains(r#"<h2 id="two-parts">"#));
    }

    // ------------------------------------------------------------------------
    // code block tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_fenced_code_with_lang_is_highlighted() {
        let html = render("```rust\nfn main() {}\n```\n");
        // syntect emits inline-styled spans inside a <pre>
        assert!(html.contains("<pre"));
        assert!(html.contains("style="));
        assert!(!html.contains("althighlight"));
    }

    #[test]
    fn test_fenced_code_without_lang_uses_alt_wrapper() {
        let html = render("```\nplain <text>\n```\n");
        assert!(html.contains(r#"<div class="althighlight"><pre><code>"#));
        assert!(html.contains("plain &lt;text&gt;"));
    }

    #[test]
    fn test_indented_code_uses_alt_wrapper() {
        let html = render("    indented code\n");
        assert!(html.contains("althighlight"));
        assert!(html.contains("indented code"));
    }

    #[test]
    fn test_unknown_lang_falls_back_to_plain_text_syntax() {
        let html = render("```nosuchlang\nsome code\n```\n");
        assert!(html.contains("some code"));
        assert!(!html.contains("althighlight"));
    }

    // ------------------------------------------------------------------------
    // link tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_external_link_opens_new_tab() {
        let html = render("[example](https://example.com)\n");
        assert!(html.contains(r#"<a href="https://example.com" target="_new">example</a>"#));
    }

    #[test]
    fn test_external_link_keeps_title() {
        let html = render("[example](https://example.com \"The Example\")\n");
        assert!(html.contains(r#"title="The Example""#));
        assert!(html.contains(r#"target="_new""#));
    }

    #[test]
    fn test_internal_link_untouched() {
        let html = render("[local](/graphs/bfs/)\n");
        assert!(html.contains(r#"<a href="/graphs/bfs/">local</a>"#));
        assert!(!html.contains("_new"));
    }

    // ------------------------------------------------------------------------
    // misc rendering tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_tables_enabled() {
        let html = render("| a | b |\n| - | - |\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }
}
