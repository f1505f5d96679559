//! Pane geometry: the split resizer and proportional scroll sync.

const MIN_SPLIT: f64 = 20.0;
const MAX_SPLIT: f64 = 80.0;

/// Editor width in percent for a resizer drag at `pointer_x`, or `None` when
/// the drag would make either pane narrower than 20%.
pub fn split_percentage(pointer_x: f64, viewport_width: f64) -> Option<f64> {
    if viewport_width <= 0.0 {
        return None;
    }
    let percent = pointer_x / viewport_width * 100.0;
    (percent > MIN_SPLIT && percent < MAX_SPLIT).then_some(percent)
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollMetrics {
    pub top: f64,
    pub height: f64,
    pub client: f64,
}

impl ScrollMetrics {
    pub fn scrollable(&self) -> f64 {
        (self.height - self.client).max(0.0)
    }
}

/// Scroll position for `target` that shows the same fraction `source` does.
pub fn sync_scroll(source: ScrollMetrics, target: ScrollMetrics) -> f64 {
    let range = source.scrollable();
    if range == 0.0 {
        return 0.0;
    }
    let fraction = (source.top / range).clamp(0.0, 1.0);
    fraction * target.scrollable()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pane {
    Editor,
    Preview,
}

/// Keeps the two panes from echoing each other's scroll events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollSync {
    driver: Option<Pane>,
}

impl ScrollSync {
    /// Returns `false` when `pane` is only reacting to the other pane.
    pub fn begin(&mut self, pane: Pane) -> bool {
        match self.driver {
            Some(driver) if driver != pane => false,
            _ => {
                self.driver = Some(pane);
                true
            }
        }
    }

    pub fn release(&mut self, pane: Pane) {
        if self.driver == Some(pane) {
            self.driver = None;
        }
    }
}
