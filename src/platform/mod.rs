//! OS seams: accessibility elements, window inventory, displays and the cursor.
//!
//! Every trait has a Windows implementation in `win32` and an inert one
//! elsewhere so the rest of the crate stays platform independent.

pub mod fake;
#[cfg(windows)]
pub mod win32;

use crate::error::OverlayError;
use crate::geometry::{Display, Point, ScreenRect};
use std::ops::Range;

/// Accessibility handle for a foreign text element.
///
/// Geometry is reported in window-manager space.
pub trait ElementHandle {
    fn range_bounds(&self, range: Range<usize>) -> Result<ScreenRect, OverlayError>;
    fn frame(&self) -> Option<ScreenRect>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    /// Window-manager space.
    pub frame: ScreenRect,
    pub pid: u32,
    /// Stacking layer; 0 is a normal application window.
    pub layer: i32,
    pub title: String,
}

pub trait WindowInventory: Send + Sync {
    fn windows(&self) -> Vec<WindowInfo>;
}

pub trait DisplayProvider: Send + Sync {
    fn displays(&self) -> Vec<Display>;
}

pub trait CursorProvider: Send + Sync {
    /// Window-manager space.
    fn cursor_position(&self) -> Option<Point>;
}

/// Largest normal-layer window owned by `pid`.
pub fn find_element_window(
    inventory: &dyn WindowInventory,
    pid: u32,
) -> Result<WindowInfo, OverlayError> {
    inventory
        .windows()
        .into_iter()
        .filter(|window| window.pid == pid && window.layer == 0)
        .filter(|window| window.frame.is_well_formed() && window.frame.area() > 0.0)
        .max_by(|a, b| a.frame.area().total_cmp(&b.frame.area()))
        .ok_or(OverlayError::ElementWindowUnresolvable { pid })
}

#[derive(Debug, Default)]
pub struct SystemWindowInventory;

impl WindowInventory for SystemWindowInventory {
    fn windows(&self) -> Vec<WindowInfo> {
        #[cfg(windows)]
        {
            win32::enumerate_windows()
        }

        #[cfg(not(windows))]
        {
            Vec::new()
        }
    }
}

#[derive(Debug, Default)]
pub struct SystemDisplays;

impl DisplayProvider for SystemDisplays {
    fn displays(&self) -> Vec<Display> {
        #[cfg(windows)]
        {
            win32::enumerate_displays()
        }

        #[cfg(not(windows))]
        {
            Vec::new()
        }
    }
}

#[derive(Debug, Default)]
pub struct SystemCursor;

impl CursorProvider for SystemCursor {
    fn cursor_position(&self) -> Option<Point> {
        #[cfg(windows)]
        {
            win32::cursor_position()
        }

        #[cfg(not(windows))]
        {
            None
        }
    }
}
