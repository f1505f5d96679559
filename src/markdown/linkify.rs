//! Bare URL autolinking for text that pulldown-cmark left as plain text.

use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use regex::Regex;
use std::sync::OnceLock;

const TRAILING_PUNCTUATION: &[char] = &[
    '.', ',', ':', ';', '!', '?', '\'', '"', ')', ']', '*', '_',
];

fn url_re() -> &'static Regex {
    static RE_URL: OnceLock<Regex> = OnceLock::new();
    RE_URL.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"`]+"#).expect("valid url regex")
    })
}

fn href_for(url: &str) -> String {
    if url.len() >= 4 && url[..4].eq_ignore_ascii_case("www.") {
        format!("http://{url}")
    } else {
        url.to_string()
    }
}

/// Turns bare URLs in text events into autolinks. Text already inside a
/// link, an image, a code block or a raw HTML block is left alone.
pub fn linkify(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut skip_depth = 0usize;

    for event in events {
        match &event {
            Event::Start(
                Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_) | Tag::HtmlBlock,
            ) => {
                skip_depth += 1;
            }
            Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock | TagEnd::HtmlBlock) => {
                skip_depth = skip_depth.saturating_sub(1);
            }
            Event::Text(text) if skip_depth == 0 && url_re().is_match(text) => {
                split_links(text, &mut out);
                continue;
            }
            _ => {}
        }
        out.push(event);
    }
    out
}

fn split_links<'a>(text: &str, out: &mut Vec<Event<'a>>) {
    let mut last = 0usize;
    for found in url_re().find_iter(text) {
        let url = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        // "www." or "http://" with nothing after is not a link.
        if url.ends_with("://") || url.eq_ignore_ascii_case("www.") {
            continue;
        }
        if found.start() > last {
            out.push(Event::Text(CowStr::from(text[last..found.start()].to_string())));
        }
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(href_for(url)),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(CowStr::from(url.to_string())));
        out.push(Event::End(TagEnd::Link));
        last = found.start() + url.len();
    }
    if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}
