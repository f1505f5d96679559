//! Inline extension rules layered over the pulldown-cmark event stream.
//!
//! pulldown-cmark has already resolved emphasis, links and code spans by the
//! time these rules run, so a rule only ever sees plain text interleaved with
//! balanced inline elements. Rules scan that text the way a markdown-it inline
//! rule scans source: one character position at a time, optionally in silent
//! (lookahead only) mode.

use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use std::ops::Range;

/// Position inside an event slice: an event index plus a byte offset into
/// that event's text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub event: usize,
    pub offset: usize,
}

impl Cursor {
    fn new(event: usize, offset: usize) -> Self {
        Self { event, offset }
    }
}

/// A rule that can claim text starting at the current scan position.
pub trait InlineRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// The only character this rule can start on.
    fn marker(&self) -> char;

    /// Tries to match at `state.pos`. On success the rule moves `state.pos`
    /// past the match and, unless `silent`, pushes its tokens.
    fn parse(&self, state: &mut InlineState<'_, '_>, silent: bool) -> bool;
}

/// Scan state for one run of inline events.
pub struct InlineState<'s, 'a> {
    ruler: &'s InlineRuler,
    events: &'s [Event<'a>],
    pub pos: Cursor,
    pending: String,
    tokens: Vec<Event<'a>>,
}

impl<'s, 'a> InlineState<'s, 'a> {
    fn new(ruler: &'s InlineRuler, events: &'s [Event<'a>]) -> Self {
        Self {
            ruler,
            events,
            pos: Cursor::default(),
            pending: String::new(),
            tokens: Vec::with_capacity(events.len()),
        }
    }

    pub fn ruler(&self) -> &'s InlineRuler {
        self.ruler
    }

    fn text_at(&self, index: usize) -> &'s str {
        let events: &'s [Event<'a>] = self.events;
        match events.get(index) {
            Some(Event::Text(text)) => &**text,
            _ => "",
        }
    }

    pub fn current_char(&self) -> Option<char> {
        self.text_at(self.pos.event)
            .get(self.pos.offset..)
            .and_then(|rest| rest.chars().next())
    }

    /// Pushes a token, flushing any pending literal text first.
    pub fn push(&mut self, event: Event<'a>) {
        self.flush_pending();
        self.tokens.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event<'a>>) {
        self.flush_pending();
        self.tokens.extend(events);
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            let text = std::mem::take(&mut self.pending);
            self.tokens.push(Event::Text(CowStr::from(text)));
        }
    }

    fn advance_event(&mut self) {
        self.pos = Cursor::new(self.pos.event + 1, 0);
    }

    /// Finds the next `marker` on the current line at the nesting depth of
    /// `from`. Nested inline elements are stepped over; a line break, the end
    /// of the enclosing element or a block boundary ends the search.
    pub fn find_closing(&self, from: Cursor, marker: char) -> Option<Cursor> {
        let mut depth = 0usize;
        let mut index = from.event;
        let mut offset = from.offset;

        while let Some(event) = self.events.get(index) {
            match event {
                Event::Text(text) => {
                    let rest = text.get(offset..).unwrap_or_default();
                    if depth == 0 {
                        for (at, ch) in rest.char_indices() {
                            if ch == '\n' {
                                return None;
                            }
                            if ch == marker {
                                return Some(Cursor::new(index, offset + at));
                            }
                        }
                    } else if rest.contains('\n') {
                        return None;
                    }
                }
                Event::Start(tag) if is_inline_tag(tag) => depth += 1,
                Event::End(tag) if is_inline_tag_end(tag) => {
                    if depth == 0 {
                        return None;
                    }
                    depth -= 1;
                }
                Event::Code(_)
                | Event::InlineHtml(_)
                | Event::InlineMath(_)
                | Event::FootnoteReference(_)
                | Event::TaskListMarker(_) => {}
                _ => return None,
            }
            index += 1;
            offset = 0;
        }
        None
    }

    /// Events strictly between two text positions, splitting the boundary
    /// text events as needed.
    pub fn slice(&self, start: Cursor, end: Cursor) -> Vec<Event<'a>> {
        let mut out = Vec::new();
        let mut push_text = |text: &str| {
            if !text.is_empty() {
                out.push(Event::Text(CowStr::from(text.to_string())));
            }
        };

        if start.event == end.event {
            push_text(&self.text_at(start.event)[start.offset..end.offset]);
            return out;
        }

        push_text(&self.text_at(start.event)[start.offset..]);
        let middle = &self.events[start.event + 1..end.event];
        let tail = &self.text_at(end.event)[..end.offset];
        out.extend(middle.iter().cloned());
        if !tail.is_empty() {
            out.push(Event::Text(CowStr::from(tail.to_string())));
        }
        out
    }

    fn finish(mut self) -> Vec<Event<'a>> {
        self.flush_pending();
        self.tokens
    }
}

fn is_inline_tag(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
    )
}

fn is_inline_tag_end(tag: &TagEnd) -> bool {
    matches!(
        tag,
        TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image
    )
}

/// Tracks containers whose text the rules must leave alone: code blocks,
/// raw HTML blocks, image alt text and autolinks.
#[derive(Debug, Default)]
struct OpaqueTracker {
    depth: usize,
    links: Vec<bool>,
}

impl OpaqueTracker {
    fn observe(&mut self, event: &Event<'_>) {
        match event {
            Event::Start(Tag::Link { link_type, .. }) => {
                let autolink = matches!(link_type, LinkType::Autolink | LinkType::Email);
                self.links.push(autolink);
                if autolink {
                    self.depth += 1;
                }
            }
            Event::End(TagEnd::Link) => {
                if self.links.pop() == Some(true) {
                    self.depth = self.depth.saturating_sub(1);
                }
            }
            Event::Start(Tag::CodeBlock(_) | Tag::HtmlBlock | Tag::Image { .. }) => {
                self.depth += 1;
            }
            Event::End(TagEnd::CodeBlock | TagEnd::HtmlBlock | TagEnd::Image) => {
                self.depth = self.depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn active(&self) -> bool {
        self.depth > 0
    }
}

/// One rule match found by [`InlineRuler::scan_line`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineMatch {
    pub rule: &'static str,
    pub range: Range<usize>,
}

/// Ordered set of inline rules.
pub struct InlineRuler {
    rules: Vec<Box<dyn InlineRule>>,
}

impl Default for InlineRuler {
    fn default() -> Self {
        let mut ruler = Self::new();
        ruler.push(DelimiterRule::subscript());
        ruler.push(DelimiterRule::superscript());
        ruler
    }
}

impl std::fmt::Debug for InlineRuler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| rule.name()))
            .finish()
    }
}

impl InlineRuler {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn push(&mut self, rule: impl InlineRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    fn run_rules(
        &self,
        state: &mut InlineState<'_, '_>,
        ch: char,
        silent: bool,
    ) -> Option<&'static str> {
        self.rules
            .iter()
            .filter(|rule| rule.marker() == ch)
            .find(|rule| rule.parse(state, silent))
            .map(|rule| rule.name())
    }

    /// Applies the rules to every text run of `events`.
    pub fn tokenize<'a>(&self, events: &[Event<'a>]) -> Vec<Event<'a>> {
        let mut state = InlineState::new(self, events);
        let mut opaque = OpaqueTracker::default();

        while let Some(event) = events.get(state.pos.event) {
            match event {
                Event::Text(_) if !opaque.active() => {
                    let Some(ch) = state.current_char() else {
                        state.advance_event();
                        continue;
                    };
                    if self.run_rules(&mut state, ch, false).is_none() {
                        state.pending.push(ch);
                        state.pos.offset += ch.len_utf8();
                    }
                }
                _ => {
                    opaque.observe(event);
                    state.push(event.clone());
                    state.advance_event();
                }
            }
        }
        state.finish()
    }

    /// Reports the spans the rules would claim in one raw source line,
    /// running every rule in silent mode.
    pub fn scan_line(&self, line: &str) -> Vec<InlineMatch> {
        let events = [Event::Text(CowStr::Borrowed(line))];
        let mut state = InlineState::new(self, &events);
        let mut found = Vec::new();

        while let Some(ch) = state.current_char() {
            let start = state.pos.offset;
            match self.run_rules(&mut state, ch, true) {
                Some(rule) => found.push(InlineMatch {
                    rule,
                    range: start..state.pos.offset,
                }),
                None => state.pos.offset += ch.len_utf8(),
            }
        }
        found
    }
}

/// Same-line, single-character delimiter pair: `~sub~`, `^sup^`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelimiterRule {
    name: &'static str,
    marker: char,
    open: &'static str,
    close: &'static str,
}

impl DelimiterRule {
    pub fn subscript() -> Self {
        Self {
            name: "subscript",
            marker: '~',
            open: "<sub>",
            close: "</sub>",
        }
    }

    pub fn superscript() -> Self {
        Self {
            name: "superscript",
            marker: '^',
            open: "<sup>",
            close: "</sup>",
        }
    }
}

impl InlineRule for DelimiterRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn marker(&self) -> char {
        self.marker
    }

    fn parse(&self, state: &mut InlineState<'_, '_>, silent: bool) -> bool {
        if state.current_char() != Some(self.marker) {
            return false;
        }

        let width = self.marker.len_utf8();
        let content_start = Cursor::new(state.pos.event, state.pos.offset + width);
        let Some(close) = state.find_closing(content_start, self.marker) else {
            return false;
        };

        let content = state.slice(content_start, close);
        if content.is_empty() {
            return false;
        }

        let after = Cursor::new(close.event, close.offset + width);
        if silent {
            state.pos = after;
            return true;
        }

        let nested = state.ruler().tokenize(&content);
        state.push(Event::InlineHtml(CowStr::Borrowed(self.open)));
        state.extend(nested);
        state.push(Event::InlineHtml(CowStr::Borrowed(self.close)));
        state.pos = after;
        true
    }
}
