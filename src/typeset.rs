//! MathJax bridge for the preview pane.

use js_sys::{Array, Function, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlElement;

use crate::error::TypesetError;

/// Returns `window.MathJax.typesetPromise` bound to `MathJax`, if MathJax
/// has finished loading.
fn typeset_promise_fn(window: &JsValue) -> Option<(JsValue, Function)> {
    let mathjax = Reflect::get(window, &JsValue::from_str("MathJax")).ok()?;
    if mathjax.is_undefined() || mathjax.is_null() {
        return None;
    }
    let typeset = Reflect::get(&mathjax, &JsValue::from_str("typesetPromise")).ok()?;
    let typeset = typeset.dyn_into::<Function>().ok()?;
    Some((mathjax, typeset))
}

/// Typesets the `$…$` and `$$…$$` spans left in `element`.
///
/// `Ok(false)` means MathJax is not loaded (yet); the delimiters stay
/// visible as text.
pub async fn typeset(element: &HtmlElement) -> Result<bool, TypesetError> {
    let window: JsValue = web_sys::window().ok_or(TypesetError::NoWindow)?.into();
    let Some((mathjax, typeset)) = typeset_promise_fn(&window) else {
        tracing::debug!("MathJax not loaded, skipping typeset");
        return Ok(false);
    };

    let targets = Array::of1(element);
    let promise = typeset
        .call1(&mathjax, &targets)
        .map_err(|err| TypesetError::Rejected(format!("{err:?}")))?
        .dyn_into::<Promise>()
        .map_err(|_| TypesetError::NotAPromise)?;

    JsFuture::from(promise)
        .await
        .map_err(|err| TypesetError::Rejected(format!("{err:?}")))?;
    Ok(true)
}

/// Fire-and-forget [`typeset`]; failures are logged, never surfaced.
pub fn typeset_in_background(element: HtmlElement) {
    wasm_bindgen_futures::spawn_local(async move {
        match typeset(&element).await {
            Ok(true) => tracing::trace!("preview typeset"),
            Ok(false) => {}
            Err(err) => tracing::warn!(%err, "MathJax typeset failed"),
        }
    });
}
