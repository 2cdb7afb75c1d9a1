use crate::geometry::{CoordinateConverter, Point, ScreenRect};
use crate::model::AnnotationKind;
use crate::overlay::hover::PointerEvent;
use crate::overlay::render::DrawList;
use crate::state::AnnotationSnapshot;
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Native window behind an [`OverlaySurface`].
///
/// Implementations must never take focus or activate the window.
pub trait SurfaceBackend: Send {
    /// `frame` is canonical; `screen_height` is the flip height of its display.
    fn set_frame(&mut self, frame: ScreenRect, screen_height: f64) -> Result<()>;
    fn show_without_activation(&mut self) -> Result<()>;
    fn hide(&mut self) -> Result<()>;
    fn set_click_through(&mut self, click_through: bool) -> Result<()>;
    fn present(&mut self, list: &DrawList) -> Result<()>;
    /// Clicks delivered to the window itself, window-manager space.
    fn drain_clicks(&mut self) -> Vec<Point> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Hidden,
    Visible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerDisposition {
    /// Left for the window underneath.
    Unhandled,
    Handled {
        kind: AnnotationKind,
        index: usize,
    },
}

/// Transparent, always-on-top window sized to the monitored element.
pub struct OverlaySurface {
    backend: Box<dyn SurfaceBackend>,
    state: SurfaceState,
    frame: Option<ScreenRect>,
    screen_height: f64,
    click_through: bool,
}

impl OverlaySurface {
    pub fn new(mut backend: Box<dyn SurfaceBackend>, click_through: bool) -> Self {
        if let Err(err) = backend.set_click_through(click_through) {
            warn!(?err, "failed to configure overlay click-through");
        }
        Self {
            backend,
            state: SurfaceState::Hidden,
            frame: None,
            screen_height: 0.0,
            click_through,
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state == SurfaceState::Visible
    }

    /// Canonical frame while visible.
    pub fn frame(&self) -> Option<ScreenRect> {
        self.frame
    }

    pub fn screen_height(&self) -> f64 {
        self.screen_height
    }

    pub fn is_click_through(&self) -> bool {
        self.click_through
    }

    pub fn set_click_through(&mut self, click_through: bool) {
        if self.click_through == click_through {
            return;
        }
        match self.backend.set_click_through(click_through) {
            Ok(()) => self.click_through = click_through,
            Err(err) => warn!(?err, "failed to change overlay click-through"),
        }
    }

    /// Reposition, repaint and make visible without activating.
    pub fn show(&mut self, frame: ScreenRect, screen_height: f64, list: &DrawList) {
        if let Err(err) = self.backend.set_frame(frame, screen_height) {
            warn!(?err, ?frame, "failed to position overlay");
            return;
        }
        self.frame = Some(frame);
        self.screen_height = screen_height;
        if let Err(err) = self.backend.present(list) {
            warn!(?err, "failed to paint overlay");
        }
        if self.state == SurfaceState::Hidden {
            match self.backend.show_without_activation() {
                Ok(()) => {
                    info!(?frame, "overlay shown");
                    self.state = SurfaceState::Visible;
                }
                Err(err) => warn!(?err, "failed to show overlay"),
            }
        }
    }

    pub fn redraw(&mut self, list: &DrawList) {
        if self.state != SurfaceState::Visible {
            return;
        }
        if let Err(err) = self.backend.present(list) {
            warn!(?err, "failed to repaint overlay");
        }
    }

    /// Idempotent.
    pub fn hide(&mut self) {
        if self.state == SurfaceState::Hidden {
            return;
        }
        if let Err(err) = self.backend.hide() {
            warn!(?err, "failed to hide overlay");
        }
        self.state = SurfaceState::Hidden;
        self.frame = None;
        info!("overlay hidden");
    }

    /// Window-manager point to overlay-local, or `None` outside the surface.
    pub fn local_point(&self, point: Point) -> Option<Point> {
        if self.state != SurfaceState::Visible {
            return None;
        }
        let frame = self.frame?;
        let canonical = CoordinateConverter::point_to_canonical(point, self.screen_height);
        let local = CoordinateConverter::point_to_overlay_local(canonical, frame);
        let bounds = ScreenRect::local(0.0, 0.0, frame.width, frame.height);
        bounds.contains(local).then_some(local)
    }

    /// First annotation whose hit rectangle contains `local`.
    pub fn hit_test(
        snapshot: &AnnotationSnapshot,
        local: Point,
    ) -> Option<(AnnotationKind, usize)> {
        snapshot
            .iter_all()
            .find(|(_, _, record)| record.hit_bounds.contains(local))
            .map(|(kind, index, _)| (kind, index))
    }

    pub fn handle_pointer(
        &self,
        event: PointerEvent,
        snapshot: &AnnotationSnapshot,
    ) -> PointerDisposition {
        if self.click_through {
            return PointerDisposition::Unhandled;
        }
        let PointerEvent::LeftDown(point) = event else {
            return PointerDisposition::Unhandled;
        };
        self.local_point(point)
            .and_then(|local| Self::hit_test(snapshot, local))
            .map(|(kind, index)| PointerDisposition::Handled { kind, index })
            .unwrap_or(PointerDisposition::Unhandled)
    }

    pub fn drain_clicks(&mut self) -> Vec<Point> {
        self.backend.drain_clicks()
    }
}

impl Drop for OverlaySurface {
    fn drop(&mut self) {
        self.hide();
    }
}

#[derive(Debug, Default)]
pub struct NoopSurface;

impl SurfaceBackend for NoopSurface {
    fn set_frame(&mut self, _frame: ScreenRect, _screen_height: f64) -> Result<()> {
        Ok(())
    }

    fn show_without_activation(&mut self) -> Result<()> {
        Ok(())
    }

    fn hide(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_click_through(&mut self, _click_through: bool) -> Result<()> {
        Ok(())
    }

    fn present(&mut self, _list: &DrawList) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    SetFrame(ScreenRect),
    Show,
    Hide,
    ClickThrough(bool),
    Present(usize),
}

#[derive(Debug, Default)]
struct RecordingState {
    calls: Vec<SurfaceCall>,
    last_list: Option<DrawList>,
    clicks: Vec<Point>,
}

/// Backend that records calls, for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, call: &SurfaceCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn last_list(&self) -> Option<DrawList> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.last_list.clone())
    }

    /// Queue a click as if the window received it.
    pub fn click(&self, point: Point) {
        if let Ok(mut state) = self.state.lock() {
            state.clicks.push(point);
        }
    }

    fn record(&self, call: SurfaceCall) {
        if let Ok(mut state) = self.state.lock() {
            state.calls.push(call);
        }
    }
}

impl SurfaceBackend for RecordingSurface {
    fn set_frame(&mut self, frame: ScreenRect, _screen_height: f64) -> Result<()> {
        self.record(SurfaceCall::SetFrame(frame));
        Ok(())
    }

    fn show_without_activation(&mut self) -> Result<()> {
        self.record(SurfaceCall::Show);
        Ok(())
    }

    fn hide(&mut self) -> Result<()> {
        self.record(SurfaceCall::Hide);
        Ok(())
    }

    fn set_click_through(&mut self, click_through: bool) -> Result<()> {
        self.record(SurfaceCall::ClickThrough(click_through));
        Ok(())
    }

    fn present(&mut self, list: &DrawList) -> Result<()> {
        if let Ok(mut state) = self.state.lock() {
            state.calls.push(SurfaceCall::Present(list.commands.len()));
            state.last_list = Some(list.clone());
        }
        Ok(())
    }

    fn drain_clicks(&mut self) -> Vec<Point> {
        self.state
            .lock()
            .map(|mut state| std::mem::take(&mut state.clicks))
            .unwrap_or_default()
    }
}
