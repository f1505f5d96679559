use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos::{ev, html};
use wasm_bindgen_futures::JsFuture;

use crate::editor_core::{
    byte_to_utf16, shortcut_for, utf16_to_byte, NoteBuffer, Selection, Shortcut, Tool,
};
use crate::highlight::highlight_markdown;
use crate::layout::{split_percentage, sync_scroll, Pane, ScrollMetrics, ScrollSync};
use crate::markdown::MarkdownRenderer;
use crate::settings::{Theme, ViewMode};
use crate::stats::DocumentStats;
use crate::storage::{BrowserStore, NoteStore};
use crate::typeset::typeset_in_background;

const SCROLL_RELEASE_MS: u32 = 50;
const COPIED_FEEDBACK_MS: u32 = 2000;

const WELCOME_NOTE: &str = "# Welcome to Lumina Notes\n\n\
Write **Markdown** on the left, see it rendered on the right.\n\n\
Inline math: $E=mc^2$, water is H~2~O, and 2^10^ is 1024.\n\n\
$$\n\\int_0^1 x^2 \\, dx = \\frac{1}{3}\n$$\n";

fn clock_time() -> String {
    let now = js_sys::Date::new_0();
    format!(
        "{:02}:{:02}:{:02}",
        now.get_hours(),
        now.get_minutes(),
        now.get_seconds()
    )
}

fn scroll_metrics(element: &web_sys::Element) -> ScrollMetrics {
    ScrollMetrics {
        top: f64::from(element.scroll_top()),
        height: f64::from(element.scroll_height()),
        client: f64::from(element.client_height()),
    }
}

#[component]
pub fn App() -> impl IntoView {
    let notes = NoteStore::new(BrowserStore);

    let initial_text = match notes.load_content() {
        Ok(Some(text)) if !text.is_empty() => text,
        Ok(_) => WELCOME_NOTE.to_string(),
        Err(err) => {
            tracing::warn!(%err, "could not load saved note");
            WELCOME_NOTE.to_string()
        }
    };

    let buffer = RwSignal::new(NoteBuffer::new(initial_text.clone()));
    let settings = RwSignal::new(notes.load_settings());
    let renderer = StoredValue::new(MarkdownRenderer::default());

    let save_status = RwSignal::new(String::new());
    let copied = RwSignal::new(false);
    let resizing = RwSignal::new(false);
    let fullscreen = RwSignal::new(false);
    let (editor_scroll, set_editor_scroll) = signal(0);

    let scroll_sync = StoredValue::new(ScrollSync::default());
    let scroll_release = StoredValue::new_local(None::<Timeout>);

    let textarea_ref = NodeRef::<html::Textarea>::new();
    let preview_ref = NodeRef::<html::Div>::new();
    let preview_pane_ref = NodeRef::<html::Section>::new();

    let text = Memo::new(move |_| buffer.with(|b| b.text().to_string()));
    let preview_html =
        Memo::new(move |_| text.with(|t| renderer.with_value(|r| r.render_preview(t))));
    let highlighted = Memo::new(move |_| {
        text.with(|t| renderer.with_value(|r| highlight_markdown(t, r.ruler())))
    });
    let stats = Memo::new(move |_| text.with(|t| DocumentStats::of(t)));

    let persist = move || {
        match buffer.with_untracked(|b| notes.save_content(b.text())) {
            Ok(()) => save_status.set(format!("Last saved: {}", clock_time())),
            Err(err) => tracing::warn!(%err, "could not save note"),
        }
    };

    // Textarea selection, converted to byte offsets.
    let read_selection = move || -> Option<Selection> {
        let textarea = textarea_ref.get()?;
        let value = textarea.value();
        let start = textarea.selection_start().ok().flatten()? as usize;
        let end = textarea.selection_end().ok().flatten()? as usize;
        Some(Selection::new(
            utf16_to_byte(&value, start),
            utf16_to_byte(&value, end),
        ))
    };

    let write_textarea = move || {
        let Some(textarea) = textarea_ref.get() else {
            return;
        };
        buffer.with_untracked(|b| {
            textarea.set_value(b.text());
            let selection = b.selection();
            let start = byte_to_utf16(b.text(), selection.start) as u32;
            let end = byte_to_utf16(b.text(), selection.end) as u32;
            if let Err(err) = textarea.set_selection_range(start, end) {
                tracing::debug!(?err, "could not restore selection");
            }
        });
        let _ = textarea.focus();
    };

    let run_tool = move |tool: Tool| {
        if let Some(selection) = read_selection() {
            buffer.update(|b| b.set_selection(selection));
        }
        match buffer.try_update(|b| b.apply_tool(tool)) {
            Some(Ok(true)) => {
                write_textarea();
                persist();
            }
            Some(Ok(false)) | None => {}
            Some(Err(err)) => tracing::warn!(%err, tool = tool.id(), "toolbar edit rejected"),
        }
    };

    let on_input = move |ev: ev::Event| {
        let value = event_target_value(&ev);
        let selection = read_selection().unwrap_or_else(|| Selection::cursor(value.len()));
        buffer.update(|b| {
            b.replace_from_input(value, selection);
        });
        persist();
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        let modifier = ev.ctrl_key() || ev.meta_key();
        match shortcut_for(&ev.key(), modifier, ev.shift_key()) {
            Some(Shortcut::Tool(tool)) => {
                ev.prevent_default();
                run_tool(tool);
            }
            Some(Shortcut::Save) => {
                ev.prevent_default();
                persist();
            }
            None if ev.key() == "Enter" && !modifier && !ev.shift_key() => {
                if let Some(selection) = read_selection() {
                    buffer.update(|b| b.set_selection(selection));
                }
                match buffer.try_update(|b| b.continue_block()) {
                    Some(Ok(true)) => {
                        ev.prevent_default();
                        write_textarea();
                        persist();
                    }
                    Some(Err(err)) => tracing::warn!(%err, "list continuation rejected"),
                    _ => {}
                }
            }
            None => {}
        }
    };

    let follow_scroll = move |pane: Pane| {
        if !scroll_sync.try_update_value(|s| s.begin(pane)).unwrap_or(false) {
            return;
        }
        let (Some(textarea), Some(preview)) = (textarea_ref.get(), preview_pane_ref.get()) else {
            return;
        };
        match pane {
            Pane::Editor => {
                let top = sync_scroll(scroll_metrics(&textarea), scroll_metrics(&preview));
                preview.set_scroll_top(top as i32);
            }
            Pane::Preview => {
                let top = sync_scroll(scroll_metrics(&preview), scroll_metrics(&textarea));
                textarea.set_scroll_top(top as i32);
            }
        }
        let release = Timeout::new(SCROLL_RELEASE_MS, move || {
            scroll_sync.update_value(|s| s.release(pane));
        });
        // Replacing the pending timeout cancels it.
        scroll_release.set_value(Some(release));
    };

    let on_editor_scroll = move |ev: ev::Event| {
        let target: web_sys::Element = event_target(&ev);
        set_editor_scroll.set(target.scroll_top());
        follow_scroll(Pane::Editor);
    };

    let copy_markdown = move |_| {
        let markdown = buffer.with_untracked(|b| b.text().to_string());
        let clipboard = window().navigator().clipboard();
        spawn_local(async move {
            match JsFuture::from(clipboard.write_text(&markdown)).await {
                Ok(_) => {
                    copied.set(true);
                    Timeout::new(COPIED_FEEDBACK_MS, move || copied.set(false)).forget();
                }
                Err(err) => tracing::warn!(?err, "failed to copy markdown"),
            }
        });
    };

    let toggle_fullscreen = move |_| {
        let doc = document();
        if doc.fullscreen_element().is_some() {
            doc.exit_fullscreen();
            fullscreen.set(false);
        } else if let Some(root) = doc.document_element() {
            match root.request_fullscreen() {
                Ok(()) => fullscreen.set(true),
                Err(err) => tracing::warn!(?err, "could not enter fullscreen"),
            }
        }
    };

    let _ = window_event_listener(ev::mousemove, move |ev| {
        if !resizing.get_untracked() {
            return;
        }
        let width = window()
            .inner_width()
            .ok()
            .and_then(|w| w.as_f64())
            .unwrap_or(0.0);
        if let Some(percent) = split_percentage(f64::from(ev.client_x()), width) {
            settings.update(|s| s.editor_width = Some(percent));
        }
    });
    let _ = window_event_listener(ev::mouseup, move |_| {
        if resizing.get_untracked() {
            resizing.set(false);
        }
    });

    Effect::new(move |_| {
        let current = settings.get();
        if resizing.get() {
            return;
        }
        if let Err(err) = notes.save_settings(&current) {
            tracing::warn!(%err, "could not save settings");
        }
    });

    Effect::new(move |_| {
        let class = settings.with(|s| s.theme.body_class());
        if let Some(body) = document().body() {
            body.set_class_name(&class);
        }
    });

    // Typeset after the preview HTML has been swapped in.
    Effect::new(move |_| {
        preview_html.track();
        if let Some(preview) = preview_ref.get() {
            typeset_in_background(preview.into());
        }
    });

    let unavailable = move |tool: Tool| {
        buffer.with(|b| match tool {
            Tool::Undo => !b.history().can_undo(),
            Tool::Redo => !b.history().can_redo(),
            _ => false,
        })
    };

    let toolbar = Tool::ALL
        .into_iter()
        .map(|tool| {
            view! {
                <button
                    class="tool-btn"
                    data-tool=tool.id()
                    title=tool.title()
                    disabled=move || unavailable(tool)
                    on:click=move |_| run_tool(tool)
                >
                    {tool.label()}
                </button>
            }
        })
        .collect_view();

    let theme_dots = Theme::ALL
        .into_iter()
        .map(|theme| {
            view! {
                <button
                    class=move || {
                        if settings.with(|s| s.theme == theme) {
                            "theme-dot active"
                        } else {
                            "theme-dot"
                        }
                    }
                    data-theme=theme.as_str()
                    title=theme.as_str()
                    on:click=move |_| settings.update(|s| s.theme = theme)
                ></button>
            }
        })
        .collect_view();

    let view_buttons = ViewMode::ALL
        .into_iter()
        .map(|mode| {
            view! {
                <button
                    class=move || {
                        if settings.with(|s| s.view == mode) {
                            "view-btn active"
                        } else {
                            "view-btn"
                        }
                    }
                    data-view=mode.as_str()
                    on:click=move |_| settings.update(|s| s.view = mode)
                >
                    {mode.label()}
                </button>
            }
        })
        .collect_view();

    view! {
        <main class="app-layout">
            <header class="topbar">
                <span class="brand">"Lumina Notes"</span>
                <div class="toolbar">{toolbar}</div>
                <div class="topbar-actions">
                    <div class="theme-picker">{theme_dots}</div>
                    <div class="view-switch">{view_buttons}</div>
                    <button id="copy-markdown-btn" class="view-btn" on:click=copy_markdown>
                        {move || if copied.get() { "Copied!" } else { "Copy Markdown" }}
                    </button>
                    <button id="fullscreen-btn" class="view-btn" on:click=toggle_fullscreen>
                        {move || if fullscreen.get() { "Exit fullscreen" } else { "Fullscreen" }}
                    </button>
                </div>
            </header>
            <div class=move || settings.with(|s| s.view.container_class())>
                <section
                    class="editor-pane"
                    style=move || {
                        settings
                            .with(|s| s.editor_flex_basis())
                            .map(|basis| format!("flex: 0 0 {basis};"))
                            .unwrap_or_default()
                    }
                >
                    <div
                        class="markdown-highlight-layer"
                        inner_html=move || highlighted.get()
                        prop:scrollTop=move || editor_scroll.get()
                    ></div>
                    <textarea
                        id="editor"
                        class="raw-editor"
                        node_ref=textarea_ref
                        prop:value=initial_text
                        on:input=on_input
                        on:keydown=on_keydown
                        on:scroll=on_editor_scroll
                        placeholder="Start writing markdown..."
                        spellcheck="false"
                    ></textarea>
                </section>
                <div
                    id="resizer"
                    class="resizer"
                    on:mousedown=move |ev: ev::MouseEvent| {
                        ev.prevent_default();
                        resizing.set(true);
                    }
                ></div>
                <section
                    class="preview-pane"
                    node_ref=preview_pane_ref
                    on:scroll=move |_| follow_scroll(Pane::Preview)
                >
                    <div
                        id="preview"
                        class="markdown-body"
                        node_ref=preview_ref
                        inner_html=move || preview_html.get()
                    ></div>
                </section>
            </div>
            <footer class="statusbar">
                <span>{move || stats.with(|s| s.characters_label())}</span>
                <span>{move || stats.with(|s| s.words_label())}</span>
                <span id="save-status">{move || save_status.get()}</span>
            </footer>
        </main>
    }
}
