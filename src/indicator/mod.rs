//! Status badge placement and drag handling.
//!
//! All geometry here is window-manager space: the badge follows the
//! monitored window's frame as reported by the window inventory.

pub mod store;

pub use store::{IndicatorStore, StoredIndicatorPosition, INDICATOR_POSITIONS_FILE_NAME};

use crate::geometry::{
    primary_display, CoordinateConverter, CoordinateSpace, Display, Point, ScreenRect,
};
use crate::model::AppId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorPreset {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    MiddleLeft,
    MiddleRight,
}

impl IndicatorPreset {
    pub const ALL: [IndicatorPreset; 6] = [
        IndicatorPreset::TopLeft,
        IndicatorPreset::TopRight,
        IndicatorPreset::BottomLeft,
        IndicatorPreset::BottomRight,
        IndicatorPreset::MiddleLeft,
        IndicatorPreset::MiddleRight,
    ];

    /// Fractions of the frame, y measured from the top.
    pub fn percents(self) -> (f64, f64) {
        match self {
            Self::TopLeft => (0.0, 0.0),
            Self::TopRight => (1.0, 0.0),
            Self::BottomLeft => (0.0, 1.0),
            Self::BottomRight => (1.0, 1.0),
            Self::MiddleLeft => (0.0, 0.5),
            Self::MiddleRight => (1.0, 0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Hovering,
    Dragging,
    SnapAnimating,
}

pub fn can_transition(from: DragPhase, to: DragPhase) -> bool {
    matches!(
        (from, to),
        (DragPhase::Idle, DragPhase::Hovering)
            | (DragPhase::Hovering, DragPhase::Idle)
            | (DragPhase::Hovering, DragPhase::Dragging)
            | (DragPhase::Dragging, DragPhase::SnapAnimating)
            | (DragPhase::SnapAnimating, DragPhase::Idle)
    ) || from == to
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementSource {
    Stored,
    Preset,
    DisplayFallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorState {
    pub bounds: ScreenRect,
    pub phase: DragPhase,
    pub source: PlacementSource,
    /// Number of annotations the badge reports.
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorMetrics {
    pub badge_size: f64,
    pub margin: f64,
}

impl Default for IndicatorMetrics {
    fn default() -> Self {
        Self {
            badge_size: 24.0,
            margin: 8.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Snap {
    from: Point,
    to: Point,
}

pub struct IndicatorPositioner {
    preset: IndicatorPreset,
    metrics: IndicatorMetrics,
    store: IndicatorStore,
    phase: DragPhase,
    app: Option<AppId>,
    window_frame: Option<ScreenRect>,
    center: Option<Point>,
    source: PlacementSource,
    grab_offset: Point,
    snap: Option<Snap>,
    count: usize,
}

impl IndicatorPositioner {
    pub fn new(preset: IndicatorPreset, metrics: IndicatorMetrics, store: IndicatorStore) -> Self {
        Self {
            preset,
            metrics,
            store,
            phase: DragPhase::Idle,
            app: None,
            window_frame: None,
            center: None,
            source: PlacementSource::Preset,
            grab_offset: Point::default(),
            snap: None,
            count: 0,
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn store(&self) -> &IndicatorStore {
        &self.store
    }

    pub fn set_preset(&mut self, preset: IndicatorPreset) {
        self.preset = preset;
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    pub fn state(&self) -> Option<IndicatorState> {
        let center = self.center?;
        Some(IndicatorState {
            bounds: self.badge_rect(center),
            phase: self.phase,
            source: self.source,
            count: self.count,
        })
    }

    /// Place the badge for `app`. `window_frame` is `None` when the monitored
    /// window could not be resolved.
    pub fn place(
        &mut self,
        app: Option<&AppId>,
        window_frame: Option<ScreenRect>,
        displays: &[Display],
    ) -> Option<IndicatorState> {
        if matches!(self.phase, DragPhase::Dragging | DragPhase::SnapAnimating) {
            return self.state();
        }
        self.app = app.cloned();
        self.window_frame = window_frame.filter(|frame| frame.is_well_formed() && frame.area() > 0.0);

        let (center, source) = match self.window_frame {
            Some(frame) => {
                let stored = app.and_then(|app| self.store.get(app));
                let (percents, source) = match stored {
                    Some(stored) => ((stored.x_percent, stored.y_percent), PlacementSource::Stored),
                    None => (self.preset.percents(), PlacementSource::Preset),
                };
                (self.center_for_percents(frame, percents), source)
            }
            None => {
                debug!(?app, "monitored window unresolved; using display corner");
                let display = primary_display(displays)?;
                let frame = CoordinateConverter::from_canonical(display.frame, display.frame.height);
                (
                    self.center_for_percents(frame, self.preset.percents()),
                    PlacementSource::DisplayFallback,
                )
            }
        };
        self.center = Some(center);
        self.source = source;
        self.state()
    }

    pub fn pointer_moved(&mut self, point: Point) {
        match self.phase {
            DragPhase::Idle if self.hit(point) => self.transition(DragPhase::Hovering),
            DragPhase::Hovering if !self.hit(point) => self.transition(DragPhase::Idle),
            DragPhase::Dragging => {
                self.center = Some(Point::new(
                    point.x - self.grab_offset.x,
                    point.y - self.grab_offset.y,
                ));
            }
            _ => {}
        }
    }

    pub fn pointer_down(&mut self, point: Point) -> bool {
        if self.phase != DragPhase::Hovering || !self.hit(point) {
            return false;
        }
        let Some(center) = self.center else {
            return false;
        };
        self.grab_offset = Point::new(point.x - center.x, point.y - center.y);
        self.transition(DragPhase::Dragging);
        true
    }

    /// Release: snap to the nearest border of the window frame and persist.
    pub fn pointer_up(&mut self, point: Point) {
        if self.phase != DragPhase::Dragging {
            return;
        }
        self.pointer_moved(point);
        let (Some(center), Some(frame)) = (self.center, self.window_frame) else {
            self.transition(DragPhase::SnapAnimating);
            self.finish_snap();
            return;
        };

        let target = self.snap_target(frame, center);
        self.snap = Some(Snap {
            from: center,
            to: target,
        });
        self.transition(DragPhase::SnapAnimating);

        if let Some(app) = self.app.clone() {
            let position = StoredIndicatorPosition::new(
                (target.x - frame.x) / frame.width,
                (target.y - frame.y) / frame.height,
            );
            self.store.set(app.clone(), position);
            if let Err(err) = self.store.save() {
                warn!(?err, %app, "failed to persist indicator position");
            }
        }
    }

    /// Advance the snap animation; `progress` runs from 0 to 1.
    pub fn advance_snap(&mut self, progress: f64) {
        if self.phase != DragPhase::SnapAnimating {
            return;
        }
        let Some(snap) = self.snap else {
            self.finish_snap();
            return;
        };
        if progress >= 1.0 {
            self.finish_snap();
            return;
        }
        let t = progress.clamp(0.0, 1.0);
        // Ease out.
        let eased = 1.0 - (1.0 - t) * (1.0 - t);
        self.center = Some(Point::new(
            snap.from.x + (snap.to.x - snap.from.x) * eased,
            snap.from.y + (snap.to.y - snap.from.y) * eased,
        ));
    }

    pub fn finish_snap(&mut self) {
        if self.phase != DragPhase::SnapAnimating {
            return;
        }
        if let Some(snap) = self.snap.take() {
            self.center = Some(snap.to);
            self.source = PlacementSource::Stored;
        }
        self.transition(DragPhase::Idle);
    }

    fn transition(&mut self, to: DragPhase) {
        if !can_transition(self.phase, to) {
            warn!(from = ?self.phase, ?to, "ignoring invalid indicator transition");
            return;
        }
        self.phase = to;
    }

    fn hit(&self, point: Point) -> bool {
        self.center
            .map(|center| self.badge_rect(center).contains(point))
            .unwrap_or(false)
    }

    fn badge_rect(&self, center: Point) -> ScreenRect {
        ScreenRect::centered_on(
            CoordinateSpace::WindowManager,
            center,
            self.metrics.badge_size,
            self.metrics.badge_size,
        )
    }

    fn inset(&self) -> f64 {
        self.metrics.badge_size / 2.0 + self.metrics.margin
    }

    fn clamp_center(&self, frame: ScreenRect, center: Point) -> Point {
        let inset = self.inset();
        let clamp = |v: f64, lo: f64, hi: f64| if lo > hi { (lo + hi) / 2.0 } else { v.clamp(lo, hi) };
        Point::new(
            clamp(center.x, frame.min_x() + inset, frame.max_x() - inset),
            clamp(center.y, frame.min_y() + inset, frame.max_y() - inset),
        )
    }

    fn center_for_percents(&self, frame: ScreenRect, (x, y): (f64, f64)) -> Point {
        let raw = Point::new(frame.x + frame.width * x, frame.y + frame.height * y);
        self.clamp_center(frame, raw)
    }

    fn snap_target(&self, frame: ScreenRect, center: Point) -> Point {
        let inset = self.inset();
        let center = self.clamp_center(frame, center);
        let distances = [
            (center.x - frame.min_x(), Point::new(frame.min_x() + inset, center.y)),
            (frame.max_x() - center.x, Point::new(frame.max_x() - inset, center.y)),
            (center.y - frame.min_y(), Point::new(center.x, frame.min_y() + inset)),
            (frame.max_y() - center.y, Point::new(center.x, frame.max_y() - inset)),
        ];
        let nearest = distances
            .iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, target)| *target)
            .unwrap_or(center);
        self.clamp_center(frame, nearest)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        can_transition, DragPhase, IndicatorMetrics, IndicatorPositioner, IndicatorPreset,
        IndicatorStore, PlacementSource, StoredIndicatorPosition,
    };
    use crate::geometry::{Display, Point, ScreenRect};
    use crate::model::AppId;

    fn frame() -> ScreenRect {
        ScreenRect::window_manager(100.0, 100.0, 800.0, 600.0)
    }

    fn positioner() -> IndicatorPositioner {
        IndicatorPositioner::new(
            IndicatorPreset::BottomRight,
            IndicatorMetrics::default(),
            IndicatorStore::in_memory(),
        )
    }

    #[test]
    fn transitions_follow_the_drag_cycle() {
        assert!(can_transition(DragPhase::Idle, DragPhase::Hovering));
        assert!(can_transition(DragPhase::Dragging, DragPhase::SnapAnimating));
        assert!(!can_transition(DragPhase::Idle, DragPhase::Dragging));
        assert!(!can_transition(DragPhase::SnapAnimating, DragPhase::Dragging));
    }

    #[test]
    fn preset_places_badge_inside_the_window() {
        let mut positioner = positioner();
        let state = positioner
            .place(Some(&AppId::new("notepad.exe")), Some(frame()), &[])
            .expect("placed");
        assert_eq!(state.source, PlacementSource::Preset);
        // 12 half-size + 8 margin from the bottom-right corner.
        assert_eq!(state.bounds.center(), Point::new(880.0, 680.0));
    }

    #[test]
    fn stored_position_beats_preset() {
        let mut store = IndicatorStore::in_memory();
        store.set(AppId::new("code.exe"), StoredIndicatorPosition::new(0.5, 0.0));
        let mut positioner =
            IndicatorPositioner::new(IndicatorPreset::TopLeft, IndicatorMetrics::default(), store);
        let state = positioner
            .place(Some(&AppId::new("code.exe")), Some(frame()), &[])
            .expect("placed");
        assert_eq!(state.source, PlacementSource::Stored);
        assert_eq!(state.bounds.center(), Point::new(500.0, 120.0));
    }

    #[test]
    fn unresolved_window_falls_back_to_display_corner() {
        let displays = [Display::new(ScreenRect::canonical(0.0, 0.0, 1440.0, 900.0), true)];
        let mut positioner = positioner();
        let state = positioner.place(None, None, &displays).expect("placed");
        assert_eq!(state.source, PlacementSource::DisplayFallback);
        assert_eq!(state.bounds.center(), Point::new(1420.0, 880.0));
        assert!(positioner.place(None, None, &[]).is_none());
    }

    #[test]
    fn drag_release_snaps_to_nearest_border_and_persists() {
        let app = AppId::new("slack.exe");
        let mut positioner = positioner();
        positioner.place(Some(&app), Some(frame()), &[]);

        positioner.pointer_moved(Point::new(880.0, 680.0));
        assert_eq!(positioner.phase(), DragPhase::Hovering);
        assert!(positioner.pointer_down(Point::new(880.0, 680.0)));
        assert_eq!(positioner.phase(), DragPhase::Dragging);

        // Drop near the top edge, left of center.
        positioner.pointer_moved(Point::new(300.0, 150.0));
        positioner.pointer_up(Point::new(300.0, 150.0));
        assert_eq!(positioner.phase(), DragPhase::SnapAnimating);

        positioner.advance_snap(0.5);
        assert_eq!(positioner.phase(), DragPhase::SnapAnimating);
        positioner.advance_snap(1.0);
        assert_eq!(positioner.phase(), DragPhase::Idle);

        let state = positioner.state().expect("state");
        assert_eq!(state.bounds.center(), Point::new(300.0, 120.0));
        let stored = positioner.store().get(&app).expect("persisted");
        assert!((stored.x_percent - 0.25).abs() < 1e-9);
        assert!((stored.y_percent - 20.0 / 600.0).abs() < 1e-9);
    }

    #[test]
    fn pointer_down_outside_badge_does_not_drag() {
        let mut positioner = positioner();
        positioner.place(None, Some(frame()), &[]);
        assert!(!positioner.pointer_down(Point::new(880.0, 680.0)));
        positioner.pointer_moved(Point::new(880.0, 680.0));
        assert!(!positioner.pointer_down(Point::new(100.0, 100.0)));
        assert_eq!(positioner.phase(), DragPhase::Hovering);
    }
}
