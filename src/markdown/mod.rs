//! Markdown preview rendering.
//!
//! [`MarkdownRenderer`] wraps pulldown-cmark with a fixed configuration and a
//! few passes over its event stream (autolinking, line breaks, the
//! subscript/superscript rules). [`MarkdownRenderer::render_preview`] adds the
//! math guard on top, which is what the preview pane shows.

pub mod inline;
pub mod linkify;
pub mod math;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

pub use inline::{DelimiterRule, InlineMatch, InlineRule, InlineRuler};
pub use math::{
    guard_and_render, protect, try_guard_and_render, GuardedText, MathKind, MathSpan,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RendererConfig {
    /// Pass raw HTML through instead of escaping it.
    pub html: bool,
    /// Turn bare URLs into links.
    pub linkify: bool,
    /// Render single newlines inside a paragraph as `<br />`.
    pub breaks: bool,
    pub tables: bool,
    pub strikethrough: bool,
    pub task_lists: bool,
    pub smart_punctuation: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            html: true,
            linkify: true,
            breaks: true,
            tables: true,
            strikethrough: true,
            task_lists: true,
            smart_punctuation: false,
        }
    }
}

impl RendererConfig {
    fn parser_options(&self) -> Options {
        let mut options = Options::empty();
        if self.tables {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.strikethrough {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.task_lists {
            options.insert(Options::ENABLE_TASKLISTS);
        }
        if self.smart_punctuation {
            options.insert(Options::ENABLE_SMART_PUNCTUATION);
        }
        options
    }
}

/// Immutable renderer handle, built once and shared by every render.
#[derive(Debug)]
pub struct MarkdownRenderer {
    config: RendererConfig,
    options: Options,
    ruler: InlineRuler,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl MarkdownRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self::with_ruler(config, InlineRuler::default())
    }

    pub fn with_ruler(config: RendererConfig, ruler: InlineRuler) -> Self {
        Self {
            options: config.parser_options(),
            config,
            ruler,
        }
    }

    pub fn ruler(&self) -> &InlineRuler {
        &self.ruler
    }

    /// Markdown to HTML, without any math protection.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options).into_offset_iter();
        let mut events = unwrap_single_tilde(markdown, parser);

        if !self.config.html {
            events = escape_raw_html(events);
        }
        events = merge_text(events);
        if self.config.linkify {
            events = linkify::linkify(events);
        }
        events = self.ruler.tokenize(&events);
        if self.config.breaks {
            events = hard_breaks(events);
        }

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }

    /// The full preview pipeline: math guard around [`Self::render`].
    pub fn render_preview(&self, raw: &str) -> String {
        guard_and_render(raw, |text| self.render(text))
    }
}

/// pulldown-cmark treats `~x~` as strikethrough. Only `~~x~~` is
/// strikethrough here; single tildes go back to text for the subscript rule.
fn unwrap_single_tilde<'a>(
    source: &str,
    parser: impl Iterator<Item = (Event<'a>, std::ops::Range<usize>)>,
) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut open: Vec<bool> = Vec::new();

    for (event, range) in parser {
        match event {
            Event::Start(Tag::Strikethrough) => {
                let single = !source[range.start..].starts_with("~~");
                open.push(single);
                if single {
                    out.push(Event::Text(CowStr::Borrowed("~")));
                } else {
                    out.push(Event::Start(Tag::Strikethrough));
                }
            }
            Event::End(TagEnd::Strikethrough) => {
                if open.pop().unwrap_or(false) {
                    out.push(Event::Text(CowStr::Borrowed("~")));
                } else {
                    out.push(Event::End(TagEnd::Strikethrough));
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn escape_raw_html(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    events
        .into_iter()
        .filter_map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Some(Event::Text(raw)),
            Event::Start(Tag::HtmlBlock) | Event::End(TagEnd::HtmlBlock) => None,
            other => Some(other),
        })
        .collect()
}

fn merge_text(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out: Vec<Event<'_>> = Vec::with_capacity(events.len());
    for event in events {
        if let Event::Text(next) = &event {
            if let Some(Event::Text(prev)) = out.last_mut() {
                let mut joined = prev.to_string();
                joined.push_str(next);
                *prev = CowStr::from(joined);
                continue;
            }
        }
        out.push(event);
    }
    out
}

fn hard_breaks(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    events
        .into_iter()
        .map(|event| match event {
            Event::SoftBreak => Event::HardBreak,
            other => other,
        })
        .collect()
}
