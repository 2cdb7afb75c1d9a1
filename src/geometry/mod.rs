pub mod convert;
pub mod validate;

pub use convert::CoordinateConverter;
pub use validate::{BoundsValidator, ValidationFailure, ValidationThresholds};

use serde::{Deserialize, Serialize};

/// The three coordinate systems geometry moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Top-left origin, y down. Window inventory and accessibility geometry.
    WindowManager,
    /// Bottom-left origin, y up. Native window placement.
    Canonical,
    /// Top-left origin of one overlay window, y down. Drawing.
    OverlayLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from(value: (f64, f64)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

/// Axis-aligned rectangle tagged with the space its origin is expressed in.
///
/// Rectangles coming from foreign processes are stored as reported; use
/// [`ScreenRect::is_well_formed`] or the [`BoundsValidator`] before trusting one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub space: CoordinateSpace,
}

impl ScreenRect {
    pub const fn new(space: CoordinateSpace, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            space,
        }
    }

    pub const fn window_manager(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(CoordinateSpace::WindowManager, x, y, width, height)
    }

    pub const fn canonical(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(CoordinateSpace::Canonical, x, y, width, height)
    }

    pub const fn local(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(CoordinateSpace::OverlayLocal, x, y, width, height)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    pub fn is_well_formed(&self) -> bool {
        self.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Min edges inclusive, max edges exclusive.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.min_y()
            && point.y < self.max_y()
    }

    /// Overlap of the two rectangles, compared by raw components.
    pub fn intersection(&self, other: &ScreenRect) -> Option<ScreenRect> {
        let x0 = self.min_x().max(other.min_x());
        let y0 = self.min_y().max(other.min_y());
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(ScreenRect::new(self.space, x0, y0, x1 - x0, y1 - y0))
    }

    pub fn intersection_area(&self, other: &ScreenRect) -> f64 {
        self.intersection(other).map(|r| r.area()).unwrap_or(0.0)
    }

    pub fn intersects(&self, other: &ScreenRect) -> bool {
        self.intersection(other).is_some()
    }

    pub fn union(&self, other: &ScreenRect) -> ScreenRect {
        let x0 = self.min_x().min(other.min_x());
        let y0 = self.min_y().min(other.min_y());
        let x1 = self.max_x().max(other.max_x());
        let y1 = self.max_y().max(other.max_y());
        ScreenRect::new(self.space, x0, y0, x1 - x0, y1 - y0)
    }

    pub fn expanded(&self, amount: f64) -> ScreenRect {
        ScreenRect::new(
            self.space,
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }

    pub fn translated(&self, dx: f64, dy: f64) -> ScreenRect {
        ScreenRect::new(self.space, self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn centered_on(space: CoordinateSpace, center: Point, width: f64, height: f64) -> Self {
        Self::new(
            space,
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
    }

    pub fn approx_eq(&self, other: &ScreenRect, epsilon: f64) -> bool {
        self.space == other.space
            && (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.width - other.width).abs() <= epsilon
            && (self.height - other.height).abs() <= epsilon
    }
}

/// One physical display. `frame` is expressed in [`CoordinateSpace::Canonical`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Display {
    pub frame: ScreenRect,
    #[serde(default)]
    pub primary: bool,
}

impl Display {
    pub fn new(frame: ScreenRect, primary: bool) -> Self {
        Self { frame, primary }
    }
}

/// The display flagged as primary, else the first one reported.
pub fn primary_display(displays: &[Display]) -> Option<&Display> {
    displays
        .iter()
        .find(|display| display.primary)
        .or_else(|| displays.first())
}
