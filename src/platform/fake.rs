//! In-memory platform doubles for tests, benches and headless embedding.

use crate::error::OverlayError;
use crate::geometry::{Display, Point, ScreenRect};
use crate::platform::{CursorProvider, DisplayProvider, ElementHandle, WindowInfo, WindowInventory};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, Mutex};

/// Element with scripted geometry. Range lookups not scripted are unavailable.
#[derive(Debug, Default, Clone)]
pub struct FakeElement {
    frame: Option<ScreenRect>,
    ranges: HashMap<(usize, usize), ScreenRect>,
    fallback_range: Option<ScreenRect>,
}

impl FakeElement {
    pub fn new(frame: Option<ScreenRect>) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }

    pub fn with_range(mut self, start: usize, end: usize, rect: ScreenRect) -> Self {
        self.ranges.insert((start, end), rect);
        self
    }

    /// Answer every range query with `rect`, as some hosts do.
    pub fn with_any_range(mut self, rect: ScreenRect) -> Self {
        self.fallback_range = Some(rect);
        self
    }
}

impl ElementHandle for FakeElement {
    fn range_bounds(&self, range: Range<usize>) -> Result<ScreenRect, OverlayError> {
        self.ranges
            .get(&(range.start, range.end))
            .copied()
            .or(self.fallback_range)
            .ok_or_else(|| OverlayError::unavailable(format!("no bounds for {range:?}")))
    }

    fn frame(&self) -> Option<ScreenRect> {
        self.frame
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeInventory {
    windows: Arc<Mutex<Vec<WindowInfo>>>,
}

impl FakeInventory {
    pub fn new(windows: Vec<WindowInfo>) -> Self {
        Self {
            windows: Arc::new(Mutex::new(windows)),
        }
    }

    pub fn set_windows(&self, windows: Vec<WindowInfo>) {
        if let Ok(mut guard) = self.windows.lock() {
            *guard = windows;
        }
    }
}

impl WindowInventory for FakeInventory {
    fn windows(&self) -> Vec<WindowInfo> {
        self.windows
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeDisplays {
    displays: Vec<Display>,
}

impl FakeDisplays {
    pub fn new(displays: Vec<Display>) -> Self {
        Self { displays }
    }

    /// One primary display of the given size at the origin.
    pub fn single(width: f64, height: f64) -> Self {
        Self::new(vec![Display::new(
            ScreenRect::canonical(0.0, 0.0, width, height),
            true,
        )])
    }
}

impl DisplayProvider for FakeDisplays {
    fn displays(&self) -> Vec<Display> {
        self.displays.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixedCursor {
    position: Arc<Mutex<Option<Point>>>,
}

impl FixedCursor {
    pub fn new(position: Option<Point>) -> Self {
        Self {
            position: Arc::new(Mutex::new(position)),
        }
    }

    pub fn set(&self, position: Option<Point>) {
        if let Ok(mut guard) = self.position.lock() {
            *guard = position;
        }
    }
}

impl CursorProvider for FixedCursor {
    fn cursor_position(&self) -> Option<Point> {
        self.position.lock().ok().and_then(|guard| *guard)
    }
}
