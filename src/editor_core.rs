use regex::Regex;
use std::sync::OnceLock;

use crate::error::EditError;

const HISTORY_LIMIT: usize = 200;

/// Byte range inside the note, always normalized so `start <= end`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn is_cursor(self) -> bool {
        self.start == self.end
    }

    pub fn clamp(self, len: usize) -> Self {
        Self::new(self.start.min(len), self.end.min(len))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextChange {
    pub start: usize,
    pub end: usize,
    pub insert: String,
}

impl TextChange {
    pub fn new(start: usize, end: usize, insert: impl Into<String>) -> Self {
        Self {
            start,
            end,
            insert: insert.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChangeOrigin {
    /// Typing in the textarea.
    Input,
    /// Toolbar, shortcut or list continuation.
    Command,
    #[default]
    System,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub changes: Vec<TextChange>,
    pub selection_after: Option<Selection>,
    pub origin: ChangeOrigin,
    pub label: &'static str,
}

impl Transaction {
    pub fn command(change: TextChange, selection_after: Selection, label: &'static str) -> Self {
        Self {
            changes: vec![change],
            selection_after: Some(selection_after),
            origin: ChangeOrigin::Command,
            label,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub text_changed: bool,
    pub selection_changed: bool,
    pub revision: u64,
}

impl ApplyOutcome {
    pub fn changed(self) -> bool {
        self.text_changed || self.selection_changed
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Snapshot {
    text: String,
    selection: Selection,
}

/// Undo/redo stacks. Consecutive typing on the same line collapses into one
/// undo step; every command starts a new one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    typing: bool,
}

impl History {
    fn record(&mut self, before: Snapshot, origin: ChangeOrigin, line_break: bool) {
        self.redo.clear();
        let coalesce = origin == ChangeOrigin::Input && self.typing && !line_break;
        self.typing = origin == ChangeOrigin::Input;
        if coalesce {
            return;
        }
        self.undo.push(before);
        if self.undo.len() > HISTORY_LIMIT {
            self.undo.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

/// The note being edited: text, selection and undo history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteBuffer {
    text: String,
    selection: Selection,
    revision: u64,
    history: History,
}

impl NoteBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let len = text.len();
        Self {
            text,
            selection: Selection::cursor(len),
            revision: 0,
            history: History::default(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamp(self.text.len());
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            text: self.text.clone(),
            selection: self.selection,
        }
    }

    fn commit(&mut self, text: String, selection: Selection, origin: ChangeOrigin) -> ApplyOutcome {
        let selection = selection.clamp(text.len());
        let text_changed = self.text != text;
        let selection_changed = self.selection != selection;

        if text_changed {
            let line_break = text.matches('\n').count() != self.text.matches('\n').count();
            let before = self.snapshot();
            self.history.record(before, origin, line_break);
            self.text = text;
            self.revision += 1;
        }
        self.selection = selection;

        ApplyOutcome {
            text_changed,
            selection_changed,
            revision: self.revision,
        }
    }

    /// Mirrors the textarea after an input event.
    pub fn replace_from_input(&mut self, text: String, selection: Selection) -> ApplyOutcome {
        self.commit(text, selection, ChangeOrigin::Input)
    }

    pub fn apply(&mut self, transaction: Transaction) -> Result<ApplyOutcome, EditError> {
        let changes = validate_changes(&transaction.changes, self.text.len())?;
        let text = splice(&self.text, &changes);
        let selection = transaction.selection_after.unwrap_or_else(|| {
            Selection::new(
                map_offset(self.selection.start, &changes),
                map_offset(self.selection.end, &changes),
            )
        });
        tracing::trace!(label = transaction.label, changes = changes.len(), "applying transaction");
        Ok(self.commit(text, selection, transaction.origin))
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.history.redo.push(current);
        self.restore(previous);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.history.undo.push(current);
        self.restore(next);
        true
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.text = snapshot.text;
        self.selection = snapshot.selection.clamp(self.text.len());
        self.revision += 1;
        self.history.typing = false;
    }

    /// Runs a toolbar tool against the current selection.
    pub fn apply_tool(&mut self, tool: Tool) -> Result<bool, EditError> {
        match tool {
            Tool::Undo => Ok(self.undo()),
            Tool::Redo => Ok(self.redo()),
            _ => match tool.wrapping() {
                Some(wrapping) => {
                    let transaction =
                        wrap_selection(&self.text, self.selection, wrapping, tool.id());
                    Ok(self.apply(transaction)?.changed())
                }
                None => Ok(false),
            },
        }
    }

    /// Enter on a list, task or quote line: repeat the marker on the next
    /// line, or end the block when the current item is empty.
    pub fn continue_block(&mut self) -> Result<bool, EditError> {
        match continue_block_transaction(&self.text, self.selection) {
            Some(transaction) => Ok(self.apply(transaction)?.changed()),
            None => Ok(false),
        }
    }
}

fn validate_changes(changes: &[TextChange], len: usize) -> Result<Vec<TextChange>, EditError> {
    let mut sorted = changes.to_vec();
    sorted.sort_by_key(|change| (change.start, change.end));

    if let Some(bad) = sorted
        .iter()
        .find(|change| change.start > change.end || change.end > len)
    {
        return Err(EditError::InvalidRange {
            start: bad.start,
            end: bad.end,
            len,
        });
    }

    if let Some(pair) = sorted.windows(2).find(|pair| pair[1].start < pair[0].end) {
        return Err(EditError::OverlappingChanges {
            first_start: pair[0].start,
            first_end: pair[0].end,
            next_start: pair[1].start,
            next_end: pair[1].end,
        });
    }

    Ok(sorted)
}

fn splice(text: &str, changes: &[TextChange]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0usize;
    for change in changes {
        out.push_str(&text[copied..change.start]);
        out.push_str(&change.insert);
        copied = change.end;
    }
    out.push_str(&text[copied..]);
    out
}

/// `changes` must be sorted and non-overlapping. An offset inside a replaced
/// range lands after the inserted text.
fn map_offset(offset: usize, changes: &[TextChange]) -> usize {
    let mut delta: isize = 0;
    for change in changes {
        if offset < change.start {
            break;
        }
        if offset <= change.end {
            return (change.start as isize + delta) as usize + change.insert.len();
        }
        delta += change.insert.len() as isize - (change.end - change.start) as isize;
    }
    (offset as isize + delta) as usize
}

/// Prefix, suffix and placeholder a toolbar tool wraps around the selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wrapping {
    pub prefix: &'static str,
    pub suffix: &'static str,
    pub placeholder: &'static str,
}

const fn wrapping(
    prefix: &'static str,
    suffix: &'static str,
    placeholder: &'static str,
) -> Wrapping {
    Wrapping {
        prefix,
        suffix,
        placeholder,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tool {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Subscript,
    Superscript,
    Heading,
    List,
    Quote,
    HorizontalRule,
    Link,
    InlineMath,
    BlockMath,
    DriveImage,
    Video,
    Slides,
    Table,
    Undo,
    Redo,
}

impl Tool {
    pub const ALL: [Tool; 19] = [
        Tool::Undo,
        Tool::Redo,
        Tool::Bold,
        Tool::Italic,
        Tool::Underline,
        Tool::Strikethrough,
        Tool::Subscript,
        Tool::Superscript,
        Tool::Heading,
        Tool::List,
        Tool::Quote,
        Tool::HorizontalRule,
        Tool::Link,
        Tool::InlineMath,
        Tool::BlockMath,
        Tool::DriveImage,
        Tool::Video,
        Tool::Slides,
        Tool::Table,
    ];

    /// Stable identifier, used as the button's `data-tool`.
    pub fn id(self) -> &'static str {
        match self {
            Tool::Bold => "bold",
            Tool::Italic => "italic",
            Tool::Underline => "underline",
            Tool::Strikethrough => "strikethrough",
            Tool::Subscript => "sub",
            Tool::Superscript => "sup",
            Tool::Heading => "heading",
            Tool::List => "list",
            Tool::Quote => "quote",
            Tool::HorizontalRule => "hr",
            Tool::Link => "link",
            Tool::InlineMath => "inline-math",
            Tool::BlockMath => "block-math",
            Tool::DriveImage => "drive-image",
            Tool::Video => "video",
            Tool::Slides => "slides",
            Tool::Table => "table",
            Tool::Undo => "undo",
            Tool::Redo => "redo",
        }
    }

    pub fn from_id(id: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|tool| tool.id() == id)
    }

    pub fn label(self) -> &'static str {
        match self {
            Tool::Bold => "B",
            Tool::Italic => "I",
            Tool::Underline => "U",
            Tool::Strikethrough => "S",
            Tool::Subscript => "x₂",
            Tool::Superscript => "x²",
            Tool::Heading => "H",
            Tool::List => "•",
            Tool::Quote => "❝",
            Tool::HorizontalRule => "—",
            Tool::Link => "🔗",
            Tool::InlineMath => "∑",
            Tool::BlockMath => "∫",
            Tool::DriveImage => "🖼",
            Tool::Video => "▶",
            Tool::Slides => "📊",
            Tool::Table => "▦",
            Tool::Undo => "↶",
            Tool::Redo => "↷",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tool::Bold => "Bold (Ctrl+B)",
            Tool::Italic => "Italic (Ctrl+I)",
            Tool::Underline => "Underline (Ctrl+U)",
            Tool::Strikethrough => "Strikethrough",
            Tool::Subscript => "Subscript",
            Tool::Superscript => "Superscript",
            Tool::Heading => "Heading (Ctrl+H)",
            Tool::List => "Bulleted list",
            Tool::Quote => "Quote",
            Tool::HorizontalRule => "Horizontal rule",
            Tool::Link => "Link (Ctrl+K)",
            Tool::InlineMath => "Inline math",
            Tool::BlockMath => "Block math",
            Tool::DriveImage => "Google Drive image",
            Tool::Video => "YouTube video",
            Tool::Slides => "Google Slides",
            Tool::Table => "Table",
            Tool::Undo => "Undo (Ctrl+Z)",
            Tool::Redo => "Redo (Ctrl+Y)",
        }
    }

    pub fn wrapping(self) -> Option<Wrapping> {
        let wrap = match self {
            Tool::Bold => wrapping("**", "**", "bold text"),
            Tool::Italic => wrapping("*", "*", "italic text"),
            Tool::Underline => wrapping("<u>", "</u>", "underlined text"),
            Tool::Strikethrough => wrapping("~~", "~~", "strikethrough"),
            Tool::Subscript => wrapping("<sub>", "</sub>", "sub"),
            Tool::Superscript => wrapping("<sup>", "</sup>", "sup"),
            Tool::Heading => wrapping("\n## ", "\n", "Heading"),
            Tool::List => wrapping("\n- ", "", "list item"),
            Tool::Quote => wrapping("\n> ", "", "quote"),
            Tool::HorizontalRule => wrapping("\n---\n", "", ""),
            Tool::Link => wrapping("[", "](http://)", "link text"),
            Tool::InlineMath => wrapping("$", "$", "E=mc^2"),
            Tool::BlockMath => wrapping("\n$$\n", "\n$$\n", "E=mc^2"),
            Tool::DriveImage => wrapping(
                "![Image](https://lh3.googleusercontent.com/d/",
                ")",
                "ID_HERE",
            ),
            Tool::Video => wrapping(
                concat!(
                    "\n<div style=\"position:relative;padding-bottom:56.25%;height:0;",
                    "overflow:hidden;max-width:100%;\">\n",
                    "    <iframe src=\"https://www.youtube.com/embed/",
                ),
                concat!(
                    "\" frameborder=\"0\" allowfullscreen style=\"position:absolute;top:0;",
                    "left:0;width:100%;height:100%;\"></iframe>\n</div>\n",
                ),
                "VIDEO_ID",
            ),
            Tool::Slides => wrapping(
                "\n<div class=\"ppt-card\" data-ppt-url=\"https://docs.google.com/presentation/d/",
                concat!(
                    "/embed\">\n",
                    "  <div class=\"ppt-title\">Slides Title</div>\n",
                    "  <button class=\"ppt-open-btn\">Study PPT</button>\n",
                    "</div>\n",
                ),
                "SLIDE_ID",
            ),
            Tool::Table => wrapping("\n| Col | Col |\n|---|---|\n| ", " | Val |", "Val"),
            Tool::Undo | Tool::Redo => return None,
        };
        Some(wrap)
    }
}

/// Wraps the selection (or the placeholder when nothing is selected).
/// A wrapped selection stays selected as a whole; an inserted placeholder is
/// selected so typing replaces it.
fn wrap_selection(
    text: &str,
    selection: Selection,
    wrap: Wrapping,
    label: &'static str,
) -> Transaction {
    let selection = selection.clamp(text.len());
    let selected = &text[selection.start..selection.end];
    let content = if selected.is_empty() {
        wrap.placeholder
    } else {
        selected
    };
    let replacement = format!("{}{}{}", wrap.prefix, content, wrap.suffix);

    let selection_after = if selected.is_empty() {
        let content_start = selection.start + wrap.prefix.len();
        Selection::new(content_start, content_start + content.len())
    } else {
        Selection::new(selection.start, selection.start + replacement.len())
    };

    Transaction::command(
        TextChange::new(selection.start, selection.end, replacement),
        selection_after,
        label,
    )
}

fn continue_block_transaction(text: &str, selection: Selection) -> Option<Transaction> {
    let selection = selection.clamp(text.len());
    if !selection.is_cursor() {
        return None;
    }

    static RE_TASK: OnceLock<Regex> = OnceLock::new();
    static RE_BULLET: OnceLock<Regex> = OnceLock::new();
    static RE_ORDERED: OnceLock<Regex> = OnceLock::new();
    static RE_QUOTE: OnceLock<Regex> = OnceLock::new();

    let re_task = RE_TASK.get_or_init(|| {
        Regex::new(r"^(\s*[-*+]\s+)\[[ xX]\]\s*(.*)$").expect("valid task regex")
    });
    let re_bullet =
        RE_BULLET.get_or_init(|| Regex::new(r"^(\s*[-*+]\s+)(.*)$").expect("valid bullet regex"));
    let re_ordered = RE_ORDERED
        .get_or_init(|| Regex::new(r"^(\s*)(\d+)([.)])\s+(.*)$").expect("valid ordered regex"));
    let re_quote =
        RE_QUOTE.get_or_init(|| Regex::new(r"^(\s*>\s?)(.*)$").expect("valid quote regex"));

    let line_start = line_start(text, selection.start);
    let line = &text[line_start..line_end(text, selection.start)];

    // (marker for the next line, body of the current item)
    let (marker, body) = if let Some(cap) = re_task.captures(line) {
        (format!("{}[ ] ", &cap[1]), cap.get(2))
    } else if let Some(cap) = re_ordered.captures(line) {
        let next = cap[2].parse::<u64>().map(|n| n + 1).unwrap_or(1);
        (format!("{}{}{} ", &cap[1], next, &cap[3]), cap.get(4))
    } else if let Some(cap) = re_bullet.captures(line) {
        (cap[1].to_string(), cap.get(2))
    } else if let Some(cap) = re_quote.captures(line) {
        (cap[1].to_string(), cap.get(2))
    } else {
        return None;
    };

    let empty_item = body.map_or(true, |m| m.as_str().trim().is_empty());
    if empty_item {
        // An empty item ends the block: drop its marker.
        let line_end = line_end(text, selection.start);
        return Some(Transaction::command(
            TextChange::new(line_start, line_end, ""),
            Selection::cursor(line_start),
            "end-markdown-block",
        ));
    }

    let insert = format!("\n{marker}");
    let cursor = selection.start + insert.len();
    Some(Transaction::command(
        TextChange::new(selection.start, selection.end, insert),
        Selection::cursor(cursor),
        "continue-markdown-block",
    ))
}

fn line_start(text: &str, pos: usize) -> usize {
    let clamped = pos.min(text.len());
    text[..clamped].rfind('\n').map_or(0, |i| i + 1)
}

fn line_end(text: &str, pos: usize) -> usize {
    let clamped = pos.min(text.len());
    text[clamped..]
        .find('\n')
        .map_or(text.len(), |i| clamped + i)
}

/// What a Ctrl/Cmd key combination does in the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortcut {
    Tool(Tool),
    Save,
}

pub fn shortcut_for(key: &str, ctrl_or_meta: bool, shift: bool) -> Option<Shortcut> {
    if !ctrl_or_meta {
        return None;
    }
    let tool = match key.to_ascii_lowercase().as_str() {
        "z" if shift => Tool::Redo,
        "z" => Tool::Undo,
        "y" => Tool::Redo,
        "b" => Tool::Bold,
        "i" => Tool::Italic,
        "u" => Tool::Underline,
        "h" => Tool::Heading,
        "k" => Tool::Link,
        "s" => return Some(Shortcut::Save),
        _ => return None,
    };
    Some(Shortcut::Tool(tool))
}

/// Textarea selection offsets are UTF-16 code units; the buffer uses bytes.
pub fn utf16_to_byte(text: &str, utf16: usize) -> usize {
    let mut units = 0usize;
    for (byte, ch) in text.char_indices() {
        if units >= utf16 {
            return byte;
        }
        units += ch.len_utf16();
    }
    text.len()
}

pub fn byte_to_utf16(text: &str, byte: usize) -> usize {
    let byte = byte.min(text.len());
    text.char_indices()
        .take_while(|(at, _)| *at < byte)
        .map(|(_, ch)| ch.len_utf16())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(text: &str, selection: Selection) -> NoteBuffer {
        let mut buffer = NoteBuffer::new(text);
        buffer.set_selection(selection);
        buffer
    }

    #[test]
    fn applies_multi_change_transaction() {
        let mut buffer = buffer_with("hello world", Selection::cursor(0));
        let transaction = Transaction {
            changes: vec![TextChange::new(11, 11, "<<"), TextChange::new(0, 0, ">>")],
            selection_after: Some(Selection::cursor(13)),
            origin: ChangeOrigin::Command,
            label: "wrap",
        };

        let outcome = buffer.apply(transaction).unwrap();
        assert!(outcome.text_changed);
        assert_eq!(buffer.text(), ">>hello world<<");
        assert_eq!(buffer.selection(), Selection::cursor(13));
        assert_eq!(buffer.revision(), 1);
    }

    #[test]
    fn maps_selection_through_changes() {
        let mut buffer = buffer_with("abc def", Selection::new(4, 7));
        let transaction = Transaction {
            changes: vec![TextChange::new(0, 3, "a")],
            selection_after: None,
            origin: ChangeOrigin::System,
            label: "shrink",
        };
        buffer.apply(transaction).unwrap();
        assert_eq!(buffer.text(), "a def");
        assert_eq!(buffer.selection(), Selection::new(2, 5));
    }

    #[test]
    fn rejects_overlapping_and_out_of_range_changes() {
        let mut buffer = NoteBuffer::new("abcdef");
        let overlapping = Transaction {
            changes: vec![TextChange::new(1, 4, "x"), TextChange::new(3, 5, "y")],
            selection_after: None,
            origin: ChangeOrigin::Command,
            label: "bad",
        };
        assert!(matches!(
            buffer.apply(overlapping),
            Err(EditError::OverlappingChanges { .. })
        ));

        let out_of_range = Transaction {
            changes: vec![TextChange::new(2, 10, "x")],
            selection_after: None,
            origin: ChangeOrigin::Command,
            label: "bad",
        };
        assert_eq!(
            buffer.apply(out_of_range),
            Err(EditError::InvalidRange {
                start: 2,
                end: 10,
                len: 6
            })
        );
        assert_eq!(buffer.text(), "abcdef");
    }

    #[test]
    fn bold_wraps_selection_and_keeps_it_selected() {
        let mut buffer = buffer_with("make this loud", Selection::new(5, 9));
        assert!(buffer.apply_tool(Tool::Bold).unwrap());
        assert_eq!(buffer.text(), "make **this** loud");
        assert_eq!(buffer.selection(), Selection::new(5, 13));
    }

    #[test]
    fn empty_selection_inserts_and_selects_placeholder() {
        let mut buffer = buffer_with("x", Selection::cursor(1));
        buffer.apply_tool(Tool::InlineMath).unwrap();
        assert_eq!(buffer.text(), "x$E=mc^2$");
        assert_eq!(buffer.selection(), Selection::new(2, 8));
    }

    #[test]
    fn block_math_and_rule_tools() {
        let mut buffer = NoteBuffer::new("");
        buffer.apply_tool(Tool::BlockMath).unwrap();
        assert_eq!(buffer.text(), "\n$$\nE=mc^2\n$$\n");

        let mut buffer = NoteBuffer::new("");
        buffer.apply_tool(Tool::HorizontalRule).unwrap();
        assert_eq!(buffer.text(), "\n---\n");
        assert_eq!(buffer.selection(), Selection::cursor(5));
    }

    #[test]
    fn tool_ids_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_id(tool.id()), Some(tool));
        }
        assert_eq!(Tool::from_id("nope"), None);
    }

    #[test]
    fn undo_and_redo_restore_text_and_selection() {
        let mut buffer = buffer_with("word", Selection::new(0, 4));
        buffer.apply_tool(Tool::Italic).unwrap();
        assert_eq!(buffer.text(), "*word*");

        assert!(buffer.apply_tool(Tool::Undo).unwrap());
        assert_eq!(buffer.text(), "word");
        assert_eq!(buffer.selection(), Selection::new(0, 4));

        assert!(buffer.history().can_redo());
        assert!(buffer.apply_tool(Tool::Redo).unwrap());
        assert_eq!(buffer.text(), "*word*");
        assert!(!buffer.history().can_redo());
        assert!(!buffer.redo());
    }

    #[test]
    fn typing_on_one_line_is_one_undo_step() {
        let mut buffer = NoteBuffer::new("");
        for text in ["h", "he", "hel", "hell", "hello"] {
            buffer.replace_from_input(text.to_string(), Selection::cursor(text.len()));
        }
        buffer.replace_from_input("hello\n".to_string(), Selection::cursor(6));
        buffer.replace_from_input("hello\nw".to_string(), Selection::cursor(7));

        assert!(buffer.undo());
        assert!(buffer.history().can_redo());
        assert_eq!(buffer.text(), "hello");
        assert!(buffer.undo());
        assert_eq!(buffer.text(), "");
        assert!(!buffer.undo());
    }

    #[test]
    fn command_breaks_typing_group() {
        let mut buffer = NoteBuffer::new("");
        buffer.replace_from_input("ab".to_string(), Selection::new(0, 2));
        buffer.apply_tool(Tool::Bold).unwrap();
        buffer.replace_from_input("**ab**c".to_string(), Selection::cursor(7));

        buffer.undo();
        assert_eq!(buffer.text(), "**ab**");
        buffer.undo();
        assert_eq!(buffer.text(), "ab");
    }

    #[test]
    fn selection_only_input_does_not_touch_history() {
        let mut buffer = NoteBuffer::new("abc");
        let outcome = buffer.replace_from_input("abc".to_string(), Selection::new(0, 1));
        assert!(!outcome.text_changed);
        assert!(outcome.selection_changed);
        assert!(!buffer.history().can_undo());
    }

    #[test]
    fn continues_unordered_list() {
        let mut buffer = NoteBuffer::new("- item");
        assert!(buffer.continue_block().unwrap());
        assert_eq!(buffer.text(), "- item\n- ");
        assert_eq!(buffer.selection(), Selection::cursor(9));
    }

    #[test]
    fn continues_ordered_list_and_tasks() {
        let mut buffer = NoteBuffer::new("  9. nine");
        buffer.continue_block().unwrap();
        assert_eq!(buffer.text(), "  9. nine\n  10. ");

        let mut buffer = NoteBuffer::new("- [x] done");
        buffer.continue_block().unwrap();
        assert_eq!(buffer.text(), "- [x] done\n- [ ] ");
    }

    #[test]
    fn empty_item_ends_the_block() {
        let mut buffer = NoteBuffer::new("> quoted\n> ");
        assert!(buffer.continue_block().unwrap());
        assert_eq!(buffer.text(), "> quoted\n");
        assert_eq!(buffer.selection(), Selection::cursor(9));
    }

    #[test]
    fn plain_line_is_not_continued() {
        let mut buffer = NoteBuffer::new("just text");
        assert!(!buffer.continue_block().unwrap());
        assert_eq!(buffer.text(), "just text");
    }

    #[test]
    fn shortcuts_map_to_tools() {
        assert_eq!(shortcut_for("b", true, false), Some(Shortcut::Tool(Tool::Bold)));
        assert_eq!(shortcut_for("Z", true, true), Some(Shortcut::Tool(Tool::Redo)));
        assert_eq!(shortcut_for("z", true, false), Some(Shortcut::Tool(Tool::Undo)));
        assert_eq!(shortcut_for("s", true, false), Some(Shortcut::Save));
        assert_eq!(shortcut_for("b", false, false), None);
        assert_eq!(shortcut_for("q", true, false), None);
    }

    #[test]
    fn converts_between_utf16_and_bytes() {
        let text = "a😀é";
        assert_eq!(utf16_to_byte(text, 0), 0);
        assert_eq!(utf16_to_byte(text, 1), 1);
        assert_eq!(utf16_to_byte(text, 3), 5);
        assert_eq!(utf16_to_byte(text, 4), 7);
        assert_eq!(utf16_to_byte(text, 99), 7);
        assert_eq!(byte_to_utf16(text, 5), 3);
        assert_eq!(byte_to_utf16(text, 7), 4);
    }
}
