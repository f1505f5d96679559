pub mod app;
pub mod editor_core;
pub mod error;
pub mod highlight;
pub mod layout;
pub mod markdown;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod typeset;

pub use markdown::{MarkdownRenderer, RendererConfig};
