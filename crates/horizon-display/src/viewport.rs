//! Viewport windowing.
//!
//! A [`Viewport`] narrows [`Collection::each`](crate::collection::Collection::each)
//! to a window of visible positions. Sticky items (pinned or being edited)
//! outside the window are still visited, once, at their true position and
//! flagged as rendered outside the range.
//!
//! Two strategies are provided:
//!
//! - [`VirtualScroll`] visits `[start, stop)` plus sticky items.
//! - [`RenderedScroll`] visits every item that has ever been inside the
//!   window until [`hide_rendered`](Viewport::hide_rendered) is called. It
//!   avoids flicker while scrolling fast at the cost of keeping more items
//!   around.

use std::any::Any;
use std::ops::Range;

use horizon_display_core::logging::targets;

use crate::item::{DisplayItem, ItemArena, ItemId};

/// Callback of windowed iteration: visible position, item id and item.
pub type EachFn<'a, R> = &'a mut dyn FnMut(usize, ItemId, &DisplayItem<R>);

/// A windowing strategy installed on a projection.
pub trait Viewport<R>: Send + 'static {
    /// Visit the items this viewport shows.
    fn each(&mut self, items: &[ItemId], arena: &mut ItemArena<R>, f: EachFn<'_, R>);

    /// Forget the window and start over with `count` visible items.
    fn reset(&mut self, count: usize);

    /// The current window.
    fn range(&self) -> Range<usize>;

    /// Move the window to `[start, stop)`. Returns whether anything changed.
    fn set_range(&mut self, start: usize, stop: usize, items: &[ItemId], arena: &mut ItemArena<R>) -> bool;

    /// Whether the item at `index` is outside the window.
    fn is_hidden(&self, index: usize) -> bool {
        !self.range().contains(&index)
    }

    /// Drop items that stay rendered after leaving the window. Returns
    /// whether any item was hidden.
    fn hide_rendered(&mut self, _items: &[ItemId], _arena: &mut ItemArena<R>) -> bool {
        false
    }

    /// `count` items appeared at `index`.
    fn on_items_added(&mut self, index: usize, count: usize);

    /// `count` items disappeared from `index`.
    fn on_items_removed(&mut self, index: usize, count: usize);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Window bookkeeping shared by both strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    start: usize,
    stop: usize,
    page_size: usize,
    count: usize,
}

impl Window {
    fn new(page_size: usize) -> Self {
        Self {
            start: 0,
            stop: 0,
            page_size,
            count: 0,
        }
    }

    fn reset(&mut self, count: usize) {
        self.count = count;
        self.start = 0;
        self.stop = self.page_size.min(count);
    }

    fn set(&mut self, start: usize, stop: usize) {
        self.stop = stop.min(self.count);
        self.start = start.min(self.stop);
    }

    /// Keep `start`, grow `stop` back to a full page.
    fn refill(&mut self) {
        self.stop = (self.start + self.page_size).min(self.count);
        if self.stop - self.start < self.page_size {
            self.start = self.stop.saturating_sub(self.page_size);
        }
    }

    fn shift_to(&mut self, index: usize) {
        self.start = index.min(self.count.saturating_sub(self.page_size));
        self.refill();
    }

    fn reach_top(&mut self, segment: usize) {
        self.start = self.start.saturating_sub(segment);
        self.refill();
    }

    fn reach_bottom(&mut self, segment: usize) {
        self.stop = (self.stop + segment).min(self.count);
        self.start = self.stop.saturating_sub(self.page_size);
    }

    fn added(&mut self, index: usize, count: usize) {
        self.count += count;
        if index < self.start {
            self.start += count;
            self.stop += count;
        } else if index <= self.stop {
            self.refill();
        }
    }

    fn removed(&mut self, index: usize, count: usize) {
        self.count = self.count.saturating_sub(count);
        if index + count <= self.start {
            self.start -= count;
            self.stop -= count;
        } else if index < self.stop {
            self.start = self.start.min(index);
            self.refill();
        }
        self.stop = self.stop.min(self.count);
        self.start = self.start.min(self.stop);
    }

    fn range(&self) -> Range<usize> {
        self.start..self.stop
    }
}

/// Visit one item, flagging whether it lies outside the window.
fn visit<R>(arena: &mut ItemArena<R>, index: usize, id: ItemId, outside: bool, f: EachFn<'_, R>) {
    let Some(item) = arena.get_mut(id) else {
        return;
    };
    if let Some(renderable) = item.renderable_mut() {
        renderable.set_rendered_outside_range(outside);
    }
    f(index, id, &*item);
}

/// Range-checked windowing.
#[derive(Debug, Clone)]
pub struct VirtualScroll {
    window: Window,
}

impl VirtualScroll {
    /// A window of `page_size` items, starting at the top.
    pub fn new(page_size: usize) -> Self {
        Self {
            window: Window::new(page_size),
        }
    }

    pub fn page_size(&self) -> usize {
        self.window.page_size
    }

    /// Put `index` at the top of the window, clamped so the window stays
    /// full.
    pub fn shift_to(&mut self, index: usize) {
        self.window.shift_to(index);
        tracing::trace!(target: targets::VIEWPORT, range = ?self.window.range(), "shifted");
    }

    /// Scroll reached the top: move the window up by `segment`.
    pub fn update_window_on_reach_top(&mut self, segment: usize) {
        self.window.reach_top(segment);
    }

    /// Scroll reached the bottom: move the window down by `segment`.
    pub fn update_window_on_reach_bottom(&mut self, segment: usize) {
        self.window.reach_bottom(segment);
    }
}

impl<R: 'static> Viewport<R> for VirtualScroll {
    fn each(&mut self, items: &[ItemId], arena: &mut ItemArena<R>, f: EachFn<'_, R>) {
        let range = self.window.range();
        for (index, &id) in items.iter().enumerate() {
            if range.contains(&index) {
                visit(arena, index, id, false, f);
            } else if arena.get(id).is_some_and(DisplayItem::is_sticky) {
                visit(arena, index, id, true, f);
            }
        }
    }

    fn reset(&mut self, count: usize) {
        self.window.reset(count);
    }

    fn range(&self) -> Range<usize> {
        self.window.range()
    }

    fn set_range(&mut self, start: usize, stop: usize, _items: &[ItemId], _arena: &mut ItemArena<R>) -> bool {
        let before = self.window.range();
        self.window.set(start, stop);
        self.window.range() != before
    }

    fn on_items_added(&mut self, index: usize, count: usize) {
        self.window.added(index, count);
    }

    fn on_items_removed(&mut self, index: usize, count: usize) {
        self.window.removed(index, count);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Windowing by a per-item rendered flag.
///
/// Moving the window marks the items inside it as rendered; they stay
/// rendered when the window moves on.
#[derive(Debug, Clone)]
pub struct RenderedScroll {
    window: Window,
}

impl RenderedScroll {
    pub fn new(page_size: usize) -> Self {
        Self {
            window: Window::new(page_size),
        }
    }
}

impl<R: 'static> Viewport<R> for RenderedScroll {
    fn each(&mut self, items: &[ItemId], arena: &mut ItemArena<R>, f: EachFn<'_, R>) {
        let range = self.window.range();
        for (index, &id) in items.iter().enumerate() {
            let Some(item) = arena.get(id) else {
                continue;
            };
            let rendered = item.renderable().is_some_and(|r| r.is_rendered());
            if rendered || item.is_sticky() {
                visit(arena, index, id, !range.contains(&index), f);
            }
        }
    }

    fn reset(&mut self, count: usize) {
        self.window.reset(count);
    }

    fn range(&self) -> Range<usize> {
        self.window.range()
    }

    fn set_range(&mut self, start: usize, stop: usize, items: &[ItemId], arena: &mut ItemArena<R>) -> bool {
        let before = self.window.range();
        self.window.set(start, stop);
        let mut changed = self.window.range() != before;
        for &id in items.get(self.window.range()).unwrap_or_default() {
            if let Some(renderable) = arena.get_mut(id).and_then(DisplayItem::renderable_mut) {
                changed |= renderable.set_rendered(true);
            }
        }
        changed
    }

    fn hide_rendered(&mut self, items: &[ItemId], arena: &mut ItemArena<R>) -> bool {
        let range = self.window.range();
        let mut hidden = false;
        for (index, &id) in items.iter().enumerate() {
            if range.contains(&index) {
                continue;
            }
            if let Some(renderable) = arena.get_mut(id).and_then(DisplayItem::renderable_mut) {
                hidden |= renderable.set_rendered(false);
            }
        }
        hidden
    }

    fn on_items_added(&mut self, index: usize, count: usize) {
        self.window.added(index, count);
    }

    fn on_items_removed(&mut self, index: usize, count: usize) {
        self.window.removed(index, count);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
