//! Math guard: keeps LaTeX spans away from the Markdown renderer.
//!
//! Block (`$$...$$`) and inline (`$...$`) spans are swapped for opaque
//! placeholders before rendering and swapped back, verbatim, afterwards.
//! The restored source is left for MathJax to typeset in the live preview.

use regex::{Captures, Regex};
use std::sync::OnceLock;

const DEFAULT_FENCE: &str = "@@";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MathKind {
    Block,
    Inline,
}

impl MathKind {
    fn label(self) -> &'static str {
        match self {
            MathKind::Block => "BLOCK",
            MathKind::Inline => "INLINE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MathSpan {
    pub kind: MathKind,
    pub placeholder: String,
    /// Full source of the span, delimiters included.
    pub original: String,
}

/// Placeholder-substituted text together with the spans it stands for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardedText {
    pub text: String,
    pub spans: Vec<MathSpan>,
}

impl GuardedText {
    /// Puts every recorded span back into `html`. A placeholder the renderer
    /// copied (an autolink's `href` and text) is restored everywhere.
    pub fn restore(&self, html: &str) -> String {
        let mut restored = html.to_string();
        for span in &self.spans {
            if restored.contains(&span.placeholder) {
                restored = restored.replace(&span.placeholder, &span.original);
            } else {
                tracing::warn!(
                    placeholder = %span.placeholder,
                    "math placeholder missing from rendered output"
                );
            }
        }
        restored
    }
}

pub(crate) fn block_math_re() -> &'static Regex {
    static RE_BLOCK: OnceLock<Regex> = OnceLock::new();
    RE_BLOCK.get_or_init(|| {
        Regex::new(r"\\[\\$]|\$\$(?s:.*?)\$\$").expect("valid block math regex")
    })
}

pub(crate) fn inline_math_re() -> &'static Regex {
    static RE_INLINE: OnceLock<Regex> = OnceLock::new();
    RE_INLINE.get_or_init(|| {
        Regex::new(r"\\[\\$]|\$(?:\\.|[^$\n\\])+?\$").expect("valid inline math regex")
    })
}

/// Widens the placeholder fence until user text cannot contain a placeholder.
fn placeholder_fence(raw: &str) -> String {
    let mut fence = DEFAULT_FENCE.to_string();
    while raw.contains(&format!("{fence}MATH_")) {
        fence.push('@');
    }
    fence
}

struct Extractor {
    fence: String,
    spans: Vec<MathSpan>,
}

impl Extractor {
    fn substitute(&mut self, text: &str, re: &Regex, kind: MathKind) -> String {
        re.replace_all(text, |caps: &Captures| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            // `\$` and `\\` are escapes; the renderer turns them into literals.
            if whole.starts_with('\\') {
                return whole.to_string();
            }
            let placeholder = format!(
                "{fence}MATH_{label}_{index}{fence}",
                fence = self.fence,
                label = kind.label(),
                index = self.spans.len()
            );
            self.spans.push(MathSpan {
                kind,
                placeholder: placeholder.clone(),
                original: whole.to_string(),
            });
            placeholder
        })
        .into_owned()
    }
}

/// Replaces all math spans in `raw`, block spans first, with placeholders.
pub fn protect(raw: &str) -> GuardedText {
    if !raw.contains('$') {
        return GuardedText {
            text: raw.to_string(),
            spans: Vec::new(),
        };
    }

    let mut extractor = Extractor {
        fence: placeholder_fence(raw),
        spans: Vec::new(),
    };
    let text = extractor.substitute(raw, block_math_re(), MathKind::Block);
    let text = extractor.substitute(&text, inline_math_re(), MathKind::Inline);

    tracing::trace!(spans = extractor.spans.len(), "protected math spans");
    GuardedText {
        text,
        spans: extractor.spans,
    }
}

/// Renders `raw` with `render` while shielding math spans from it.
pub fn guard_and_render<F>(raw: &str, render: F) -> String
where
    F: FnOnce(&str) -> String,
{
    let guarded = protect(raw);
    let html = render(&guarded.text);
    guarded.restore(&html)
}

/// Same as [`guard_and_render`], passing the render error through untouched.
pub fn try_guard_and_render<F, E>(raw: &str, render: F) -> Result<String, E>
where
    F: FnOnce(&str) -> Result<String, E>,
{
    let guarded = protect(raw);
    let html = render(&guarded.text)?;
    Ok(guarded.restore(&html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wrap_paragraph(text: &str) -> String {
        format!("<p>{text}</p>\n")
    }

    #[test]
    fn text_without_dollars_passes_through() {
        let guarded = protect("plain *markdown* text\nsecond line");
        assert_eq!(guarded.text, "plain *markdown* text\nsecond line");
        assert!(guarded.spans.is_empty());
    }

    #[test]
    fn block_math_spans_lines() {
        let guarded = protect("before\n$$\na+b\n$$\nafter");
        assert_eq!(guarded.text, "before\n@@MATH_BLOCK_0@@\nafter");
        assert_eq!(guarded.spans[0].original, "$$\na+b\n$$");
        assert_eq!(guarded.spans[0].kind, MathKind::Block);
    }

    #[test]
    fn block_match_is_non_greedy() {
        let guarded = protect("$$a$$ and $$b$$");
        assert_eq!(guarded.text, "@@MATH_BLOCK_0@@ and @@MATH_BLOCK_1@@");
        assert_eq!(guarded.spans[1].original, "$$b$$");
    }

    #[test]
    fn inline_math_after_block_indices_continue() {
        let guarded = protect("$x$ then $$y$$");
        assert_eq!(guarded.text, "@@MATH_INLINE_1@@ then @@MATH_BLOCK_0@@");
        assert_eq!(guarded.spans[0].original, "$$y$$");
        assert_eq!(guarded.spans[1].original, "$x$");
    }

    #[test]
    fn inline_looking_text_inside_block_stays_in_block() {
        let guarded = protect("$$ $a$ $$");
        assert_eq!(guarded.spans.len(), 1);
        assert_eq!(guarded.spans[0].kind, MathKind::Block);
        assert_eq!(guarded.spans[0].original, "$$ $a$ $$");
    }

    #[test]
    fn inline_math_does_not_cross_lines() {
        let guarded = protect("$a\nb$");
        assert!(guarded.spans.is_empty());
        assert_eq!(guarded.text, "$a\nb$");
    }

    #[test]
    fn empty_inline_span_is_not_math() {
        let guarded = protect("costs $$ nothing");
        assert!(guarded.spans.is_empty());
    }

    #[test]
    fn unterminated_spans_stay_literal() {
        assert!(protect("$unterminated").spans.is_empty());
        assert!(protect("$$\nnever closed").spans.is_empty());
    }

    #[test]
    fn escaped_dollar_is_never_a_delimiter() {
        let guarded = protect(r"price \$5 and \$6");
        assert!(guarded.spans.is_empty());
        assert_eq!(guarded.text, r"price \$5 and \$6");

        let guarded = protect(r"$a\$b$");
        assert_eq!(guarded.spans.len(), 1);
        assert_eq!(guarded.spans[0].original, r"$a\$b$");

        let guarded = protect(r"cost $5 and \$6");
        assert!(guarded.spans.is_empty());
        assert_eq!(guarded.text, r"cost $5 and \$6");
    }

    #[test]
    fn escaped_backslash_does_not_escape_the_dollar() {
        let guarded = protect(r"\\$x$ and \\$$y$$");
        assert_eq!(guarded.spans.len(), 2);
        assert_eq!(guarded.spans[0].original, "$$y$$");
        assert_eq!(guarded.spans[1].original, "$x$");
        assert_eq!(guarded.text, r"\\@@MATH_INLINE_1@@ and \\@@MATH_BLOCK_0@@");
    }

    #[test]
    fn restore_replaces_duplicated_placeholders() {
        let html = guard_and_render("$x$", |text| format!("<a href=\"{text}\">{text}</a>"));
        assert_eq!(html, "<a href=\"$x$\">$x$</a>");
    }

    #[test]
    fn fence_widens_when_user_text_contains_placeholder_prefix() {
        let raw = "literal @@MATH_INLINE_0@@ and $x$";
        let guarded = protect(raw);
        assert_eq!(guarded.spans[0].placeholder, "@@@MATH_INLINE_0@@@");

        let html = guarded.restore(&wrap_paragraph(&guarded.text));
        assert_eq!(html, "<p>literal @@MATH_INLINE_0@@ and $x$</p>\n");
    }

    #[test]
    fn restore_tolerates_surrounding_markup() {
        let html = guard_and_render("$$x^2$$", |text| format!("<div><p>{text}</p></div>"));
        assert_eq!(html, "<div><p>$$x^2$$</p></div>");
    }

    #[test]
    fn restore_skips_dropped_placeholders() {
        let html = guard_and_render("$a$ $b$", |_| "<p>gone</p>".to_string());
        assert_eq!(html, "<p>gone</p>");
    }

    #[test]
    fn render_error_is_propagated() {
        let result: Result<String, &str> = try_guard_and_render("$a$", |_| Err("boom"));
        assert_eq!(result, Err("boom"));
    }

    proptest! {
        #[test]
        fn dollar_free_text_is_untouched(text in "[^$]{0,64}") {
            let mut seen = None;
            let html = guard_and_render(&text, |t| {
                seen = Some(t.to_string());
                t.to_string()
            });
            prop_assert_eq!(seen.as_deref(), Some(text.as_str()));
            prop_assert_eq!(html, text);
        }

        #[test]
        fn block_span_survives_verbatim(
            before in "[a-z ]{0,12}",
            body in "[a-z0-9+=^_ \\\\\n]{1,24}",
            after in "[a-z ]{0,12}",
        ) {
            let raw = format!("{before}$${body}$${after}");
            let html = guard_and_render(&raw, wrap_paragraph);
            let expected = format!("$${body}$$");
            prop_assert!(html.contains(&expected));
            prop_assert!(!html.contains("MATH_BLOCK"));
        }

        #[test]
        fn inline_span_survives_verbatim(
            before in "[a-z ]{0,12}",
            body in "[a-z0-9+=^_ ]{1,24}",
            after in "[a-z ]{0,12}",
        ) {
            let raw = format!("{before}${body}${after}");
            let html = guard_and_render(&raw, wrap_paragraph);
            let expected = format!("${body}$");
            prop_assert!(html.contains(&expected));
            prop_assert!(!html.contains("MATH_INLINE"));
        }

        #[test]
        fn restoration_is_repeatable(raw in "[a-z$ \n]{0,48}") {
            let first = guard_and_render(&raw, wrap_paragraph);
            let second = guard_and_render(&raw, wrap_paragraph);
            prop_assert_eq!(first, second);
        }
    }
}
