/// Live counters for the footer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DocumentStats {
    pub characters: usize,
    pub words: usize,
}

impl DocumentStats {
    /// Counts the raw note as typed, math included.
    pub fn of(text: &str) -> Self {
        Self {
            characters: text.chars().count(),
            words: text.split_whitespace().count(),
        }
    }

    pub fn characters_label(&self) -> String {
        format!("{} characters", self.characters)
    }

    pub fn words_label(&self) -> String {
        format!("{} words", self.words)
    }
}
