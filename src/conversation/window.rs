//! Visible-window computation for long conversations.
//!
//! # Responsibilities
//! - Map (length, item height, scroll offset, viewport height) to the slice
//!   of messages worth materializing
//! - Size the spacers above and below so total scroll height stays correct
//! - Skip windowing entirely for short histories
//!
//! # Data Flow
//! ```text
//! scroll / resize / append
//!     → VirtualizedView::on_* (explicit recompute)
//!     → compute_window()
//!     → VisibleWindow { start..=end, top_spacer, bottom_spacer }
//! ```
//!
//! Pure arithmetic: no timers, no I/O.

use std::ops::RangeInclusive;

use crate::config::RendererConfig;

/// Fixed parameters of the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSettings {
    /// Windowing only kicks in above this many messages.
    pub threshold: usize,
    pub overscan: usize,
    /// Estimated height of one message, in the same unit as offsets.
    pub item_height: f64,
}

impl From<&RendererConfig> for WindowSettings {
    fn from(config: &RendererConfig) -> Self {
        Self {
            threshold: config.threshold,
            overscan: config.overscan,
            item_height: config.item_height,
        }
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self::from(&RendererConfig::default())
    }
}

/// Which messages to materialize. `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleWindow {
    pub start: usize,
    pub end: usize,
    pub top_spacer: f64,
    pub bottom_spacer: f64,
    /// False when the history is short enough to render directly.
    pub windowed: bool,
}

impl VisibleWindow {
    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices().contains(&index)
    }
}

/// Compute the window for `len` messages. `None` for an empty conversation.
pub fn compute_window(
    len: usize,
    settings: &WindowSettings,
    scroll_offset: f64,
    viewport_height: f64,
) -> Option<VisibleWindow> {
    if len == 0 {
        return None;
    }
    if len <= settings.threshold || settings.item_height <= 0.0 {
        return Some(VisibleWindow {
            start: 0,
            end: len - 1,
            top_spacer: 0.0,
            bottom_spacer: 0.0,
            windowed: false,
        });
    }

    let h = settings.item_height;
    let viewport = viewport_height.max(0.0);
    let max_offset = (len as f64 * h - viewport).max(0.0);
    let offset = if scroll_offset.is_finite() {
        scroll_offset.clamp(0.0, max_offset)
    } else {
        max_offset
    };

    let last_index = len - 1;
    let first = ((offset / h).floor() as usize).min(last_index);
    // Last item whose top edge is above the bottom of the viewport.
    let last = (((offset + viewport) / h).ceil() as usize)
        .saturating_sub(1)
        .clamp(first, last_index);

    let start = first.saturating_sub(settings.overscan);
    let end = (last + settings.overscan).min(last_index);

    Some(VisibleWindow {
        start,
        end,
        top_spacer: start as f64 * h,
        bottom_spacer: (last_index - end) as f64 * h,
        windowed: true,
    })
}

/// Scroll state plus the current window, recomputed on every event.
#[derive(Debug, Clone)]
pub struct VirtualizedView {
    settings: WindowSettings,
    len: usize,
    scroll_offset: f64,
    viewport_height: f64,
    window: Option<VisibleWindow>,
}

impl VirtualizedView {
    pub fn new(settings: WindowSettings, viewport_height: f64) -> Self {
        let mut view = Self {
            settings,
            len: 0,
            scroll_offset: 0.0,
            viewport_height,
            window: None,
        };
        view.recompute();
        view
    }

    pub fn on_scroll(&mut self, offset: f64) -> Option<VisibleWindow> {
        self.scroll_offset = offset;
        self.recompute()
    }

    pub fn on_resize(&mut self, viewport_height: f64) -> Option<VisibleWindow> {
        self.viewport_height = viewport_height;
        self.recompute()
    }

    /// New length of the conversation. A view pinned to the bottom stays there.
    pub fn on_length_change(&mut self, len: usize) -> Option<VisibleWindow> {
        let pinned = self.is_at_end();
        self.len = len;
        if pinned {
            self.scroll_offset = self.max_offset();
        }
        self.recompute()
    }

    pub fn scroll_to_end(&mut self) -> Option<VisibleWindow> {
        self.scroll_offset = self.max_offset();
        self.recompute()
    }

    pub fn window(&self) -> Option<VisibleWindow> {
        self.window
    }

    pub fn total_height(&self) -> f64 {
        self.len as f64 * self.settings.item_height
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// The materialized slice of `items`.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        match self.window {
            Some(w) if w.end < items.len() => &items[w.start..=w.end],
            Some(w) if w.start < items.len() => &items[w.start..],
            _ => &[],
        }
    }

    fn is_at_end(&self) -> bool {
        self.scroll_offset >= self.max_offset() - f64::EPSILON
    }

    fn max_offset(&self) -> f64 {
        (self.total_height() - self.viewport_height).max(0.0)
    }

    fn recompute(&mut self) -> Option<VisibleWindow> {
        self.scroll_offset = self.scroll_offset.clamp(0.0, self.max_offset());
        self.window = compute_window(
            self.len,
            &self.settings,
            self.scroll_offset,
            self.viewport_height,
        );
        self.window
    }
}
