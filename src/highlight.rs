use regex::Regex;
use std::sync::OnceLock;

use crate::markdown::{protect, InlineRuler};

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escapes one line and tints the spans the sub/superscript rules claim.
fn highlight_line(line: &str, ruler: &InlineRuler, out: &mut String) {
    let mut last = 0usize;
    for found in ruler.scan_line(line) {
        out.push_str(&escape_html(&line[last..found.range.start]));
        let class = match found.rule {
            "subscript" => "hl-sub",
            "superscript" => "hl-sup",
            other => other,
        };
        out.push_str(&format!(
            "<span class=\"{class}\">{}</span>",
            escape_html(&line[found.range.clone()])
        ));
        last = found.range.end;
    }
    out.push_str(&escape_html(&line[last..]));
}

/// Source overlay for the editor textarea. Every character of `text` is kept
/// in place, only wrapped in `hl-*` spans, so the overlay lines up with the
/// transparent textarea on top of it.
pub fn highlight_markdown(text: &str, ruler: &InlineRuler) -> String {
    static RE_H1: OnceLock<Regex> = OnceLock::new();
    static RE_H2: OnceLock<Regex> = OnceLock::new();
    static RE_H3: OnceLock<Regex> = OnceLock::new();
    static RE_H4: OnceLock<Regex> = OnceLock::new();
    static RE_BOLD: OnceLock<Regex> = OnceLock::new();
    static RE_ITALIC: OnceLock<Regex> = OnceLock::new();
    static RE_CODE: OnceLock<Regex> = OnceLock::new();
    static RE_QUOTE: OnceLock<Regex> = OnceLock::new();

    let re_h1 = RE_H1.get_or_init(|| Regex::new(r"(?m)^(#[^\S\n]+.*)$").expect("valid h1 regex"));
    let re_h2 = RE_H2.get_or_init(|| Regex::new(r"(?m)^(##[^\S\n]+.*)$").expect("valid h2 regex"));
    let re_h3 = RE_H3.get_or_init(|| Regex::new(r"(?m)^(###[^\S\n]+.*)$").expect("valid h3 regex"));
    let re_h4 =
        RE_H4.get_or_init(|| Regex::new(r"(?m)^(####[^\S\n]+.*)$").expect("valid h4 regex"));
    let re_bold =
        RE_BOLD.get_or_init(|| Regex::new(r"\*\*[^*\n]+?\*\*").expect("valid bold regex"));
    let re_italic =
        RE_ITALIC.get_or_init(|| Regex::new(r"(^|[^*])(\*[^*\n]+\*)").expect("valid italic regex"));
    let re_code = RE_CODE.get_or_init(|| Regex::new(r"`[^`\n]+`").expect("valid code regex"));
    let re_quote =
        RE_QUOTE.get_or_init(|| Regex::new(r"(?m)^(&gt;.*)$").expect("valid quote regex"));

    // Math is swapped out first so no other tint reaches inside it.
    let guarded = protect(text);

    let mut html = String::with_capacity(text.len() * 2);
    for (index, line) in guarded.text.split('\n').enumerate() {
        if index > 0 {
            html.push('\n');
        }
        highlight_line(line, ruler, &mut html);
    }

    html = re_h1.replace_all(&html, "<span class=\"hl-h1\">$1</span>").to_string();
    html = re_h2.replace_all(&html, "<span class=\"hl-h2\">$1</span>").to_string();
    html = re_h3.replace_all(&html, "<span class=\"hl-h3\">$1</span>").to_string();
    html = re_h4.replace_all(&html, "<span class=\"hl-h4\">$1</span>").to_string();
    html = re_bold.replace_all(&html, "<span class=\"hl-bold\">$0</span>").to_string();
    html = re_italic.replace_all(&html, "$1<span class=\"hl-italic\">$2</span>").to_string();
    html = re_code.replace_all(&html, "<span class=\"hl-code\">$0</span>").to_string();
    html = re_quote.replace_all(&html, "<span class=\"hl-quote\">$1</span>").to_string();

    for span in &guarded.spans {
        if let Some(at) = html.find(&span.placeholder) {
            let tinted = format!("<span class=\"hl-math\">{}</span>", escape_html(&span.original));
            html.replace_range(at..at + span.placeholder.len(), &tinted);
        }
    }

    // Keeps a trailing newline in the textarea the same height as the overlay.
    html.push_str("\n ");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlight(text: &str) -> String {
        highlight_markdown(text, &InlineRuler::default())
    }

    #[test]
    fn escapes_and_pads() {
        assert_eq!(highlight("a < b & c"), "a &lt; b &amp; c\n ");
    }

    #[test]
    fn headings_keep_their_markers() {
        assert_eq!(highlight("## Two"), "<span class=\"hl-h2\">## Two</span>\n ");
    }

    #[test]
    fn bold_and_italic_keep_their_markers() {
        assert_eq!(
            highlight("**b** and *i*"),
            "<span class=\"hl-bold\">**b**</span> and <span class=\"hl-italic\">*i*</span>\n "
        );
    }

    #[test]
    fn math_is_tinted_and_escaped() {
        assert_eq!(
            highlight("see $a<b$"),
            "see <span class=\"hl-math\">$a&lt;b$</span>\n "
        );
        assert_eq!(
            highlight("$$\n**x**\n$$"),
            "<span class=\"hl-math\">$$\n**x**\n$$</span>\n "
        );
    }

    #[test]
    fn escaped_dollar_is_not_math() {
        assert_eq!(highlight(r"\$5 and \$6"), "\\$5 and \\$6\n ");
    }

    #[test]
    fn sub_and_superscript_are_tinted() {
        assert_eq!(
            highlight("H~2~O and x^2^"),
            "H<span class=\"hl-sub\">~2~</span>O and x<span class=\"hl-sup\">^2^</span>\n "
        );
    }

    #[test]
    fn quotes_are_tinted_after_escaping() {
        assert_eq!(highlight("> hi"), "<span class=\"hl-quote\">&gt; hi</span>\n ");
    }

    #[test]
    fn overlay_text_matches_source() {
        let source = "# T\n**b** *i* `c` $x$ ~s~\n> q <b>";
        let html = highlight(source);
        let tags = Regex::new(r"<[^>]+>").unwrap();
        let text = tags.replace_all(&html, "");
        let text = text.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&");
        assert_eq!(text, format!("{source}\n "));
    }
}
