use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Sepia,
    Ocean,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Light, Theme::Dark, Theme::Sepia, Theme::Ocean];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Sepia => "sepia",
            Theme::Ocean => "ocean",
        }
    }

    pub fn body_class(self) -> String {
        format!("theme-{}", self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Split,
    Editor,
    Preview,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::Split, ViewMode::Editor, ViewMode::Preview];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Split => "split",
            ViewMode::Editor => "editor",
            ViewMode::Preview => "preview",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Split => "Split",
            ViewMode::Editor => "Editor",
            ViewMode::Preview => "Preview",
        }
    }

    pub fn container_class(self) -> String {
        let view = self.as_str();
        format!("editor-container {view}-view {view}-mode")
    }
}

/// UI preferences persisted next to the note.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub view: ViewMode,
    /// Editor pane width in percent, set by dragging the resizer.
    pub editor_width: Option<f64>,
}

impl Settings {
    pub fn editor_flex_basis(&self) -> Option<String> {
        self.editor_width.map(|width| format!("{width}%"))
    }
}
