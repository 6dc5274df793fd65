use std::collections::{HashMap, HashSet};

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "strong", "em", "del", "code", "pre", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "ul", "ol", "li", "hr", "table", "thead", "tbody", "tr", "th", "td", "a",
];
const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBlock {
    RichText(Vec<InlineSpan>),
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    Heading {
        level: u8,
        spans: Vec<InlineSpan>,
    },
    BlockQuote(Vec<MessageBlock>),
    OrderedList(Vec<Vec<MessageBlock>>),
    UnorderedList(Vec<Vec<MessageBlock>>),
    Table {
        header: Vec<Vec<InlineSpan>>,
        rows: Vec<Vec<Vec<InlineSpan>>>,
    },
    HorizontalRule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineSpan {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub link_url: Option<String>,
}

impl InlineSpan {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            strikethrough: false,
            code: false,
            link_url: None,
        }
    }
}

pub fn parse_markdown(input: &str) -> Vec<MessageBlock> {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let parser = Parser::new_ext(input, options);

    let mut ctx = ParseContext::new();
    for event in parser {
        ctx.handle_event(&event);
    }
    ctx.finish()
}

/// Renders markdown to HTML that is safe to embed.
///
/// Text is escaped before any markup is produced and raw HTML in the input is shown
/// literally. The result is then run through an allow-list sanitizer that also forces
/// links to open in a new context without an opener reference.
pub fn render(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }

    let mut html = String::new();
    for block in parse_markdown(input) {
        block_to_html(&block, &mut html);
    }
    sanitize(&html)
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn sanitize(html: &str) -> String {
    let tags: HashSet<&str> = ALLOWED_TAGS.iter().copied().collect();
    let tag_attributes: HashMap<&str, HashSet<&str>> =
        HashMap::from([("a", HashSet::from(["href"]))]);
    let url_schemes: HashSet<&str> = ALLOWED_URL_SCHEMES.iter().copied().collect();

    ammonia::Builder::default()
        .tags(tags)
        .tag_attributes(tag_attributes)
        .generic_attributes(HashSet::new())
        .url_schemes(url_schemes)
        .link_rel(Some("noopener noreferrer"))
        .set_tag_attribute_value("a", "target", "_blank")
        .clean(html)
        .to_string()
}

fn block_to_html(block: &MessageBlock, out: &mut String) {
    match block {
        MessageBlock::RichText(spans) => {
            out.push_str("<p>");
            spans_to_html(spans, out);
            out.push_str("</p>");
        }
        MessageBlock::CodeBlock { code, .. } => {
            out.push_str("<pre><code>");
            out.push_str(&escape_html(code));
            out.push_str("</code></pre>");
        }
        MessageBlock::Heading { level, spans } => {
            out.push_str(&format!("<h{}>", level));
            spans_to_html(spans, out);
            out.push_str(&format!("</h{}>", level));
        }
        MessageBlock::BlockQuote(inner) => {
            out.push_str("<blockquote>");
            for block in inner {
                block_to_html(block, out);
            }
            out.push_str("</blockquote>");
        }
        MessageBlock::OrderedList(items) | MessageBlock::UnorderedList(items) => {
            let tag = if matches!(block, MessageBlock::OrderedList(_)) { "ol" } else { "ul" };
            out.push_str(&format!("<{}>", tag));
            for item in items {
                out.push_str("<li>");
                list_item_to_html(item, out);
                out.push_str("</li>");
            }
            out.push_str(&format!("</{}>", tag));
        }
        MessageBlock::Table { header, rows } => {
            out.push_str("<table><thead><tr>");
            for cell in header {
                out.push_str("<th>");
                spans_to_html(cell, out);
                out.push_str("</th>");
            }
            out.push_str("</tr></thead><tbody>");
            for row in rows {
                out.push_str("<tr>");
                for cell in row {
                    out.push_str("<td>");
                    spans_to_html(cell, out);
                    out.push_str("</td>");
                }
                out.push_str("</tr>");
            }
            out.push_str("</tbody></table>");
        }
        MessageBlock::HorizontalRule => out.push_str("<hr>"),
    }
}

// Tight list items hold a single paragraph; render it without the <p> wrapper.
fn list_item_to_html(item: &[MessageBlock], out: &mut String) {
    match item {
        [MessageBlock::RichText(spans)] => spans_to_html(spans, out),
        blocks => {
            for block in blocks {
                block_to_html(block, out);
            }
        }
    }
}

fn spans_to_html(spans: &[InlineSpan], out: &mut String) {
    for span in spans {
        if let Some(url) = &span.link_url {
            out.push_str("<a href=\"");
            out.push_str(&escape_html(url));
            out.push_str("\">");
        }
        if span.strikethrough {
            out.push_str("<del>");
        }
        if span.italic {
            out.push_str("<em>");
        }
        if span.bold {
            out.push_str("<strong>");
        }
        if span.code {
            out.push_str("<code>");
        }

        let escaped = escape_html(&span.text);
        out.push_str(&escaped.replace('\n', "<br>"));

        if span.code {
            out.push_str("</code>");
        }
        if span.bold {
            out.push_str("</strong>");
        }
        if span.italic {
            out.push_str("</em>");
        }
        if span.strikethrough {
            out.push_str("</del>");
        }
        if span.link_url.is_some() {
            out.push_str("</a>");
        }
    }
}

struct ParseContext {
    blocks: Vec<MessageBlock>,
    current_spans: Vec<InlineSpan>,
    bold: bool,
    italic: bool,
    strikethrough: bool,
    link_url: Option<String>,
    in_code_block: bool,
    code_block_lang: Option<String>,
    code_block_content: String,
    heading_level: Option<u8>,
    heading_spans: Vec<InlineSpan>,
    /// Open quotes and lists, innermost last.
    containers: Vec<Container>,
    table: Option<TableState>,
}

enum Container {
    Quote(Vec<MessageBlock>),
    List(ListState),
}

struct ListState {
    ordered: bool,
    items: Vec<Vec<MessageBlock>>,
    current_item_blocks: Vec<MessageBlock>,
}

#[derive(Default)]
struct TableState {
    header: Vec<Vec<InlineSpan>>,
    rows: Vec<Vec<Vec<InlineSpan>>>,
    current_row: Vec<Vec<InlineSpan>>,
}

impl ParseContext {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            current_spans: Vec::new(),
            bold: false,
            italic: false,
            strikethrough: false,
            link_url: None,
            in_code_block: false,
            code_block_lang: None,
            code_block_content: String::new(),
            heading_level: None,
            heading_spans: Vec::new(),
            containers: Vec::new(),
            table: None,
        }
    }

    fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Start(tag) => self.handle_start(tag),
            Event::End(tag) => self.handle_end(tag),
            Event::Text(text) => self.handle_text(text),
            Event::Code(code) => self.push_span(self.styled(code, true)),
            // Raw HTML is never interpreted, only shown.
            Event::Html(html) | Event::InlineHtml(html) => self.handle_text(html),
            Event::SoftBreak | Event::HardBreak => self.push_span(InlineSpan::plain("\n")),
            Event::Rule => {
                self.flush_paragraph();
                self.push_block(MessageBlock::HorizontalRule);
            }
            _ => {}
        }
    }

    fn handle_start(&mut self, tag: &Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_paragraph();
                self.heading_level = Some(heading_level_to_u8(level));
                self.heading_spans.clear();
            }
            Tag::Strong => self.bold = true,
            Tag::Emphasis => self.italic = true,
            Tag::Strikethrough => self.strikethrough = true,
            Tag::Link { dest_url, .. } => self.link_url = Some(dest_url.to_string()),
            Tag::CodeBlock(kind) => {
                self.flush_paragraph();
                self.in_code_block = true;
                self.code_block_content.clear();
                self.code_block_lang = match kind {
                    pulldown_cmark::CodeBlockKind::Fenced(lang) => {
                        Some(lang.trim().to_string()).filter(|l| !l.is_empty())
                    }
                    pulldown_cmark::CodeBlockKind::Indented => None,
                };
            }
            Tag::BlockQuote(_) => {
                self.flush_paragraph();
                self.containers.push(Container::Quote(Vec::new()));
            }
            Tag::List(start) => {
                self.flush_paragraph();
                self.containers.push(Container::List(ListState {
                    ordered: start.is_some(),
                    items: Vec::new(),
                    current_item_blocks: Vec::new(),
                }));
            }
            Tag::Item => self.flush_paragraph(),
            Tag::Table(_) => {
                self.flush_paragraph();
                self.table = Some(TableState::default());
            }
            _ => {}
        }
    }

    fn handle_end(&mut self, tag: &TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::HtmlBlock => self.flush_paragraph(),
            TagEnd::Heading(_) => {
                if let Some(level) = self.heading_level.take() {
                    let spans = std::mem::take(&mut self.heading_spans);
                    self.push_block(MessageBlock::Heading { level, spans });
                }
            }
            TagEnd::Strong => self.bold = false,
            TagEnd::Emphasis => self.italic = false,
            TagEnd::Strikethrough => self.strikethrough = false,
            TagEnd::Link => self.link_url = None,
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                let code = std::mem::take(&mut self.code_block_content);
                let language = self.code_block_lang.take();
                let code = code.trim_end_matches('\n').to_string();
                self.push_block(MessageBlock::CodeBlock { language, code });
            }
            TagEnd::BlockQuote(_) => {
                self.flush_paragraph();
                match self.containers.pop() {
                    Some(Container::Quote(inner_blocks)) => {
                        self.push_block(MessageBlock::BlockQuote(inner_blocks));
                    }
                    Some(other) => self.containers.push(other),
                    None => {}
                }
            }
            TagEnd::List(_) => {
                self.flush_paragraph();
                match self.containers.pop() {
                    Some(Container::List(mut list_state)) => {
                        if !list_state.current_item_blocks.is_empty() {
                            let item_blocks = std::mem::take(&mut list_state.current_item_blocks);
                            list_state.items.push(item_blocks);
                        }
                        let block = if list_state.ordered {
                            MessageBlock::OrderedList(list_state.items)
                        } else {
                            MessageBlock::UnorderedList(list_state.items)
                        };
                        self.push_block(block);
                    }
                    Some(other) => self.containers.push(other),
                    None => {}
                }
            }
            TagEnd::Item => {
                self.flush_paragraph();
                if let Some(Container::List(list_state)) = self.containers.last_mut() {
                    let item_blocks = std::mem::take(&mut list_state.current_item_blocks);
                    list_state.items.push(item_blocks);
                }
            }
            TagEnd::TableCell => {
                let cell = std::mem::take(&mut self.current_spans);
                if let Some(table) = self.table.as_mut() {
                    table.current_row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = std::mem::take(&mut table.current_row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.current_row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.push_block(MessageBlock::Table {
                        header: table.header,
                        rows: table.rows,
                    });
                }
            }
            _ => {}
        }
    }

    fn styled(&self, text: &str, code: bool) -> InlineSpan {
        InlineSpan {
            text: text.to_string(),
            bold: self.bold,
            italic: self.italic,
            strikethrough: self.strikethrough,
            code,
            link_url: self.link_url.clone(),
        }
    }

    fn handle_text(&mut self, text: &str) {
        if self.in_code_block {
            self.code_block_content.push_str(text);
            return;
        }
        // HTML blocks arrive line by line with their newline attached.
        let text = text.strip_suffix('\n').unwrap_or(text);
        if text.is_empty() {
            return;
        }
        self.push_span(self.styled(text, false));
    }

    fn push_span(&mut self, span: InlineSpan) {
        if self.heading_level.is_some() {
            self.heading_spans.push(span);
        } else {
            self.current_spans.push(span);
        }
    }

    fn flush_paragraph(&mut self) {
        if self.current_spans.is_empty() || self.table.is_some() {
            return;
        }
        let spans = std::mem::take(&mut self.current_spans);
        self.push_block(MessageBlock::RichText(spans));
    }

    fn push_block(&mut self, block: MessageBlock) {
        match self.containers.last_mut() {
            Some(Container::List(list_state)) => list_state.current_item_blocks.push(block),
            Some(Container::Quote(quote_blocks)) => quote_blocks.push(block),
            None => self.blocks.push(block),
        }
    }

    fn finish(mut self) -> Vec<MessageBlock> {
        self.flush_paragraph();
        self.blocks
    }
}

fn heading_level_to_u8(level: &HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let blocks = parse_markdown("Hello world");
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            MessageBlock::RichText(spans) => {
                assert_eq!(spans.len(), 1);
                assert_eq!(spans[0].text, "Hello world");
                assert!(!spans[0].bold);
            }
            _ => panic!("Expected RichText"),
        }
    }

    #[test]
    fn test_code_block() {
        let blocks = parse_markdown("```sql\nSELECT 1;\n```");
        assert_eq!(
            blocks,
            vec![MessageBlock::CodeBlock {
                language: Some("sql".to_string()),
                code: "SELECT 1;".to_string(),
            }]
        );
    }

    #[test]
    fn test_table_blocks() {
        let input = "| Name | Value |\n|:---|---:|\n| cutoff | 0.5 |\n| density | 2.7 |";
        let blocks = parse_markdown(input);
        match &blocks[..] {
            [MessageBlock::Table { header, rows }] => {
                assert_eq!(header.len(), 2);
                assert_eq!(header[0][0].text, "Name");
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1][1][0].text, "2.7");
            }
            other => panic!("Expected a table, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_list_in_quote() {
        let blocks = parse_markdown("> - one\n> - two");
        match &blocks[..] {
            [MessageBlock::BlockQuote(inner)] => match &inner[..] {
                [MessageBlock::UnorderedList(items)] => assert_eq!(items.len(), 2),
                other => panic!("Expected a list, got {:?}", other),
            },
            other => panic!("Expected a quote, got {:?}", other),
        }
    }

    #[test]
    fn test_quote_inside_list_item_keeps_its_content() {
        let blocks = parse_markdown("- item\n\n  > quoted");
        match &blocks[..] {
            [MessageBlock::UnorderedList(items)] => match &items[..] {
                [item] => match &item[..] {
                    [MessageBlock::RichText(text), MessageBlock::BlockQuote(quoted)] => {
                        assert_eq!(text[0].text, "item");
                        match &quoted[..] {
                            [MessageBlock::RichText(spans)] => assert_eq!(spans[0].text, "quoted"),
                            other => panic!("Expected quoted text, got {:?}", other),
                        }
                    }
                    other => panic!("Expected text then quote, got {:?}", other),
                },
                other => panic!("Expected one item, got {:?}", other),
            },
            other => panic!("Expected a list, got {:?}", other),
        }

        let html = render("- item\n\n  > quoted");
        assert!(html.contains("<blockquote><p>quoted</p></blockquote>"), "{}", html);
    }

    #[test]
    fn test_render_bold_and_code() {
        let html = render("**bold** and `code`");
        assert!(html.contains("<strong>bold</strong>"), "{}", html);
        assert!(html.contains("<code>code</code>"), "{}", html);
    }

    #[test]
    fn test_render_escapes_script() {
        let html = render("<script>alert(1)</script>");
        assert!(!html.contains("<script"), "{}", html);
        assert!(html.contains("&lt;script&gt;"), "{}", html);

        let inline = render("Click <img src=x onerror=alert(1)> here");
        assert!(!inline.contains("<img"), "{}", inline);
    }

    #[test]
    fn test_render_table_drops_separator() {
        let html = render("| Step | Action |\n|------|--------|\n| 1 | Open the project |");
        assert_eq!(html.matches("<tr>").count(), 2, "{}", html);
        assert_eq!(html.matches("<th>").count(), 2, "{}", html);
        assert!(html.contains("<td>Open the project</td>"), "{}", html);
        assert!(!html.contains("---"), "{}", html);
    }

    #[test]
    fn test_render_links_open_safely() {
        let html = render("See [the guide](https://docs.example.com/guide).");
        assert!(html.contains("href=\"https://docs.example.com/guide\""), "{}", html);
        assert!(html.contains("target=\"_blank\""), "{}", html);
        assert!(html.contains("rel=\"noopener noreferrer\""), "{}", html);

        let script_link = render("[x](javascript:alert(1))");
        assert!(!script_link.contains("javascript:"), "{}", script_link);
    }

    #[test]
    fn test_render_paragraphs_and_line_breaks() {
        let html = render("First line\nsecond line\n\nNext paragraph");
        assert_eq!(html.matches("<p>").count(), 2, "{}", html);
        assert!(html.contains("First line<br>second line"), "{}", html);
    }

    #[test]
    fn test_render_code_block_content_escaped() {
        let html = render("```\nif a < b && c > d {}\n```");
        let expected = "<pre><code>if a &lt; b &amp;&amp; c &gt; d {}</code></pre>";
        assert!(html.contains(expected), "{}", html);
    }

    #[test]
    fn test_render_empty_input() {
        assert_eq!(render(""), "");
        assert_eq!(render("   \n"), "");
    }
}
