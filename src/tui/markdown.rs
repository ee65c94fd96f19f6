// ABOUTME: Converts bot reply markdown into styled ratatui lines
// ABOUTME: Handles bold, italic, headings, lists, inline code and links; anything else renders as text

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::prelude::*;

use super::theme;

struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    bold: usize,
    italic: usize,
    heading: bool,
    code_block: bool,
    /// One entry per open list: next number for ordered lists, None for bullets
    lists: Vec<Option<u64>>,
    link_targets: Vec<String>,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            current: Vec::new(),
            bold: 0,
            italic: 0,
            heading: false,
            code_block: false,
            lists: Vec::new(),
            link_targets: Vec::new(),
        }
    }

    fn style(&self) -> Style {
        let mut style = Style::default().fg(theme::TEXT_COLOR);
        if self.bold > 0 || self.heading {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.heading {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if self.code_block {
            style = style.fg(theme::PRICE_COLOR);
        }
        style
    }

    fn push_text(&mut self, text: &str) {
        let style = self.style();
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.flush();
            }
            if !part.is_empty() {
                self.current.push(Span::styled(part.to_string(), style));
            }
        }
    }

    fn push_span(&mut self, span: Span<'static>) {
        self.current.push(span);
    }

    fn flush(&mut self) {
        let spans = std::mem::take(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn flush_pending(&mut self) {
        if !self.current.is_empty() {
            self.flush();
        }
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|l| l.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn start_item(&mut self) {
        self.flush_pending();
        let depth = self.lists.len().saturating_sub(1);
        let marker = match self.lists.last_mut() {
            Some(Some(n)) => {
                let marker = format!("{}. ", n);
                *n += 1;
                marker
            }
            _ => "• ".to_string(),
        };
        self.push_span(Span::styled(
            format!("{}{}", "  ".repeat(depth), marker),
            Style::default().fg(theme::BOT_COLOR),
        ));
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_pending();
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Render markdown text as terminal lines. Partially revealed markdown
/// (an unclosed `**`, say) renders literally until it is complete.
pub fn markdown_lines(text: &str) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut builder = LineBuilder::new();
    for event in Parser::new_ext(text, options) {
        match event {
            Event::Start(Tag::Strong) => builder.bold += 1,
            Event::End(TagEnd::Strong) => builder.bold = builder.bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => builder.italic += 1,
            Event::End(TagEnd::Emphasis) => builder.italic = builder.italic.saturating_sub(1),
            Event::Start(Tag::Heading { .. }) => {
                builder.flush_pending();
                builder.heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                builder.flush();
                builder.heading = false;
                builder.blank_line();
            }
            Event::Start(Tag::Paragraph) => builder.flush_pending(),
            Event::End(TagEnd::Paragraph) => {
                builder.flush_pending();
                if builder.lists.is_empty() {
                    builder.blank_line();
                }
            }
            Event::Start(Tag::List(start)) => {
                builder.flush_pending();
                builder.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                builder.lists.pop();
                if builder.lists.is_empty() {
                    builder.blank_line();
                }
            }
            Event::Start(Tag::Item) => builder.start_item(),
            Event::End(TagEnd::Item) => builder.flush_pending(),
            Event::Start(Tag::CodeBlock(_)) => {
                builder.flush_pending();
                builder.code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                builder.flush_pending();
                builder.code_block = false;
                builder.blank_line();
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                builder.link_targets.push(dest_url.to_string());
            }
            Event::End(TagEnd::Link) => {
                if let Some(url) = builder.link_targets.pop() {
                    builder.push_span(Span::styled(
                        format!(" ({})", url),
                        Style::default().fg(theme::LINK_COLOR),
                    ));
                }
            }
            Event::Text(text) => builder.push_text(&text),
            Event::Code(code) => builder.push_span(Span::styled(
                code.to_string(),
                Style::default().fg(theme::PRICE_COLOR),
            )),
            Event::SoftBreak | Event::HardBreak => builder.flush(),
            Event::Rule => {
                builder.flush_pending();
                builder.push_span(Span::styled(
                    "────────",
                    Style::default().fg(theme::DIM_TEXT),
                ));
                builder.flush();
            }
            _ => {}
        }
    }
    builder.finish()
}

/// Concatenated text of a line, for tests and width estimates
pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paragraphs() {
        let lines = markdown_lines("First line.\n\nSecond paragraph.");
        let text: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(text, vec!["First line.", "", "Second paragraph."]);
    }

    #[test]
    fn test_bold_span_is_styled() {
        let lines = markdown_lines("Use **sunscreen** daily");
        assert_eq!(lines.len(), 1);
        let bold = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "sunscreen")
            .unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_lists_get_markers() {
        let lines = markdown_lines("Steps:\n\n1. Cleanse\n2. Tone\n\n- Serum\n- Moisturizer");
        let text: Vec<String> = lines.iter().map(line_text).collect();
        assert!(text.contains(&"1. Cleanse".to_string()));
        assert!(text.contains(&"2. Tone".to_string()));
        assert!(text.contains(&"• Serum".to_string()));
    }

    #[test]
    fn test_unclosed_emphasis_renders_literally() {
        let lines = markdown_lines("Try **Snail");
        assert_eq!(line_text(&lines[0]), "Try **Snail");
    }

    #[test]
    fn test_empty_text_has_no_lines() {
        assert!(markdown_lines("").is_empty());
    }
}
