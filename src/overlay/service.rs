use crate::error::OverlayError;
use crate::geometry::{BoundsValidator, CoordinateConverter, Display, Point, ScreenRect};
use crate::model::{
    deduplicate_overlapping, AnnotationKind, AnnotationRecord, AnnotationSource, AppId,
    ErrorRange, MonitoredElement, ReadabilityRange, StyleSuggestion,
};
use crate::overlay::hover::{HoverChange, HoverMonitor, PointerEvent, PointerHookBackend};
use crate::overlay::messages::{OverlayEvent, UpdateSummary};
use crate::overlay::render::{build_draw_list, DebugOutline, DebugOutlineKind, DrawList, RenderStyle};
use crate::overlay::surface::{OverlaySurface, PointerDisposition, SurfaceBackend};
use crate::platform::{find_element_window, CursorProvider, DisplayProvider, WindowInventory};
use crate::resolver::{
    hit_rect_for, BoundsDiagnostics, ParserRegistry, PositionResolver, ResolveContext,
    ResolveOutcome,
};
use crate::settings::Preferences;
use crate::state::{AnnotationSnapshot, AnnotationStateManager};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::debug;

/// Per-update information about where the text lives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateContext {
    pub app: Option<AppId>,
}

impl UpdateContext {
    pub fn for_app(app: impl AsRef<str>) -> Self {
        Self {
            app: Some(AppId::new(app)),
        }
    }
}

/// Collaborators injected into [`ErrorOverlay`].
pub struct OverlayDeps {
    pub surface: Box<dyn SurfaceBackend>,
    pub hook: Box<dyn PointerHookBackend>,
    pub inventory: Arc<dyn WindowInventory>,
    pub displays: Arc<dyn DisplayProvider>,
    pub cursor: Arc<dyn CursorProvider>,
    pub parsers: Arc<ParserRegistry>,
}

/// Geometry shared by every annotation of one update.
#[derive(Debug, Clone, Copy)]
struct Placement {
    /// Canonical.
    frame: ScreenRect,
    screen_height: f64,
}

struct Resolved {
    records: Vec<AnnotationRecord>,
    diagnostics: Vec<BoundsDiagnostics>,
    unresolved: usize,
}

/// Grammar overlay for one monitored element at a time.
///
/// Not reentrant: call every method from the interaction thread.
pub struct ErrorOverlay {
    preferences: Preferences,
    resolver: PositionResolver,
    state: AnnotationStateManager,
    surface: OverlaySurface,
    hover: HoverMonitor,
    inventory: Arc<dyn WindowInventory>,
    displays: Arc<dyn DisplayProvider>,
    events: Sender<OverlayEvent>,
    placement: Option<Placement>,
    window_frame: Option<ScreenRect>,
    diagnostics: Vec<BoundsDiagnostics>,
    underlines_disabled: bool,
}

impl ErrorOverlay {
    pub fn new(preferences: Preferences, deps: OverlayDeps, events: Sender<OverlayEvent>) -> Self {
        let validator = BoundsValidator::new(preferences.thresholds)
            .with_denylist(deps.parsers.untrusted_apps());
        let resolver = PositionResolver::new(
            validator,
            preferences.fallback,
            Arc::clone(&deps.parsers),
            deps.cursor,
        );
        let surface = OverlaySurface::new(deps.surface, preferences.click_through);
        Self {
            preferences,
            resolver,
            state: AnnotationStateManager::new(),
            surface,
            hover: HoverMonitor::new(deps.hook),
            inventory: deps.inventory,
            displays: deps.displays,
            events,
            placement: None,
            window_frame: None,
            diagnostics: Vec::new(),
            underlines_disabled: false,
        }
    }

    pub fn snapshot(&self) -> Arc<AnnotationSnapshot> {
        self.state.snapshot()
    }

    pub fn surface(&self) -> &OverlaySurface {
        &self.surface
    }

    pub fn is_visible(&self) -> bool {
        self.surface.is_visible()
    }

    pub fn is_hover_active(&self) -> bool {
        self.hover.is_active()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Frame of the foreign window from the last update, window-manager space.
    pub fn window_frame(&self) -> Option<ScreenRect> {
        self.window_frame
    }

    /// Replace grammar and style annotations. Readability annotations are kept.
    pub fn update(
        &mut self,
        errors: &[ErrorRange],
        style_suggestions: &[StyleSuggestion],
        element: &MonitoredElement<'_>,
        context: &UpdateContext,
        source_text: &str,
    ) -> UpdateSummary {
        let displays = self.displays.displays();
        let Some(placement) = self.prepare(element, &displays) else {
            debug!(pid = element.pid, "no element frame; hiding overlay");
            self.hide();
            return UpdateSummary::default();
        };

        let text = full_text(element, source_text);
        let sources = deduplicate_overlapping(errors)
            .into_iter()
            .map(AnnotationSource::Error)
            .chain(style_suggestions.iter().cloned().map(AnnotationSource::Style));

        let resolved = match self.resolve_all(sources, element, context, text, &displays, placement)
        {
            Ok(resolved) => resolved,
            Err(err) => return self.refuse(err),
        };

        let (grammar, style): (Vec<_>, Vec<_>) = resolved
            .records
            .into_iter()
            .partition(|record| record.source.kind() == AnnotationKind::Grammar);
        let readability = self.state.snapshot().readability.clone();
        self.state.update_all(grammar, style, readability);
        self.diagnostics = resolved.diagnostics;
        self.placement = Some(placement);
        self.underlines_disabled = self
            .resolver
            .parsers()
            .parser_for(context.app.as_ref())
            .disables_visual_underlines();

        let visible = self.present();
        UpdateSummary {
            annotations: self.state.snapshot().total(),
            unresolved: resolved.unresolved,
            refused: false,
            visible,
        }
    }

    /// Replace readability annotations, keeping grammar and style.
    pub fn update_readability(
        &mut self,
        ranges: &[ReadabilityRange],
        element: &MonitoredElement<'_>,
        context: &UpdateContext,
        source_text: &str,
    ) -> UpdateSummary {
        let displays = self.displays.displays();
        let Some(placement) = self.prepare(element, &displays) else {
            self.hide();
            return UpdateSummary::default();
        };

        let text = full_text(element, source_text);
        let sources = ranges.iter().cloned().map(AnnotationSource::Readability);
        let resolved = match self.resolve_all(sources, element, context, text, &displays, placement)
        {
            Ok(resolved) => resolved,
            Err(err) => return self.refuse(err),
        };

        let current = self.state.snapshot();
        self.state.update_all(
            current.grammar.clone(),
            current.style.clone(),
            resolved.records,
        );
        self.placement = Some(placement);
        self.underlines_disabled = self
            .resolver
            .parsers()
            .parser_for(context.app.as_ref())
            .disables_visual_underlines();

        let visible = self.present();
        UpdateSummary {
            annotations: self.state.snapshot().total(),
            unresolved: resolved.unresolved,
            refused: false,
            visible,
        }
    }

    /// Drop what `update` delivered (grammar and style), keeping readability.
    pub fn clear_grammar(&mut self) {
        self.state.clear_grammar_underlines();
        self.state.clear_style_underlines();
        self.present();
    }

    pub fn clear_readability(&mut self) {
        self.state.clear_readability_underlines();
        self.present();
    }

    /// Keep a grammar annotation highlighted, e.g. while its popup is open.
    pub fn lock_highlight(&mut self, index: usize) -> bool {
        let changed = self.state.set_locked_highlight(Some(index));
        if changed {
            self.redraw();
        }
        changed
    }

    pub fn unlock_highlight(&mut self) {
        if self.state.set_locked_highlight(None) {
            self.redraw();
        }
    }

    /// Universal reset. Safe to call at any time, any number of times.
    pub fn hide(&mut self) {
        self.state.clear();
        self.diagnostics.clear();
        self.placement = None;
        self.deactivate();
    }

    /// Apply pointer events queued by the hook and clicks on the surface.
    /// Returns the number of events handled.
    pub fn pump_pointer_events(&mut self) -> usize {
        let events = self.hover.pump();
        let clicks = self.surface.drain_clicks();
        let count = events.len() + clicks.len();

        for event in events {
            if let PointerEvent::Moved(point) = event {
                self.on_pointer_moved(point);
            }
        }
        for point in clicks {
            self.on_click(PointerEvent::LeftDown(point));
        }
        count
    }

    fn on_pointer_moved(&mut self, point: Point) {
        let snapshot = self.state.snapshot();
        let local = self.surface.local_point(point);
        match self.hover.track(local, &snapshot) {
            HoverChange::Unchanged => {
                // A rebuild can move the hovered error to a new index.
                if let Some(current) = self.hover.current() {
                    if snapshot.hovered(current.kind) != Some(current.index)
                        && self.state.set_hovered(current.kind, current.index)
                    {
                        self.redraw();
                    }
                }
            }
            HoverChange::Began(hit) => {
                self.state.set_hovered(hit.kind, hit.index);
                if let Some(record) = snapshot.list(hit.kind).get(hit.index) {
                    let anchor = self.anchor_for(record);
                    let _ = self.events.send(OverlayEvent::HoverBegan {
                        annotation: record.clone(),
                        kind: hit.kind,
                        index: hit.index,
                        anchor,
                        window_frame: self.window_frame,
                    });
                }
                self.redraw();
            }
            HoverChange::Ended => {
                self.state.clear_hover();
                let _ = self.events.send(OverlayEvent::HoverEnded);
                self.redraw();
            }
        }
    }

    fn on_click(&mut self, event: PointerEvent) {
        let snapshot = self.state.snapshot();
        if let PointerDisposition::Handled { kind, index } =
            self.surface.handle_pointer(event, &snapshot)
        {
            if let Some(record) = snapshot.list(kind).get(index) {
                let anchor = self.anchor_for(record);
                let _ = self.events.send(OverlayEvent::Clicked {
                    annotation: record.clone(),
                    kind,
                    index,
                    anchor,
                });
            }
        }
    }

    fn anchor_for(&self, record: &AnnotationRecord) -> Point {
        let center = record.draw_bounds.center();
        match self.placement {
            Some(placement) => CoordinateConverter::point_from_overlay_local(center, placement.frame),
            None => center,
        }
    }

    /// Resolve the element frame and the foreign window for this update.
    fn prepare(&mut self, element: &MonitoredElement<'_>, displays: &[Display]) -> Option<Placement> {
        self.window_frame = match find_element_window(self.inventory.as_ref(), element.pid) {
            Ok(window) => Some(window.frame),
            Err(err) => {
                debug!(%err, "falling back to default placement");
                None
            }
        };

        let (frame_wm, _) = self.resolver.element_frame(element)?;
        let screen_height = CoordinateConverter::flip_height_for(&frame_wm, displays)?;
        Some(Placement {
            frame: CoordinateConverter::to_canonical(frame_wm, screen_height),
            screen_height,
        })
    }

    fn resolve_all<I>(
        &self,
        sources: I,
        element: &MonitoredElement<'_>,
        context: &UpdateContext,
        text: &str,
        displays: &[Display],
        placement: Placement,
    ) -> Result<Resolved, OverlayError>
    where
        I: Iterator<Item = AnnotationSource>,
    {
        let ctx = ResolveContext {
            element,
            full_text: text,
            app: context.app.as_ref(),
            displays,
        };
        let thickness = self.preferences.underline_thickness;
        let mut resolved = Resolved {
            records: Vec::new(),
            diagnostics: Vec::new(),
            unresolved: 0,
        };

        for source in sources {
            let range = match &source {
                AnnotationSource::Error(error) => error.clone(),
                AnnotationSource::Style(style) => style.as_error_range(),
                AnnotationSource::Readability(readability) => readability.as_error_range(),
            };
            match self.resolver.resolve(&range, &ctx) {
                ResolveOutcome::Resolved(result) => {
                    let draw = CoordinateConverter::to_overlay_local(result.rect, placement.frame);
                    resolved.records.push(AnnotationRecord {
                        hit_bounds: hit_rect_for(draw, thickness),
                        draw_bounds: draw,
                        color_category: range.category,
                        source,
                    });
                    resolved.diagnostics.push(result.diagnostics);
                }
                ResolveOutcome::Unresolved => resolved.unresolved += 1,
                ResolveOutcome::Refused(err) => return Err(err),
            }
        }
        Ok(resolved)
    }

    fn refuse(&mut self, err: OverlayError) -> UpdateSummary {
        debug!(%err, "suppressing overlay for this update");
        self.hide();
        UpdateSummary {
            refused: true,
            ..UpdateSummary::default()
        }
    }

    /// Show or hide according to the current snapshot. Returns visibility.
    fn present(&mut self) -> bool {
        let placement = match self.placement {
            Some(placement) if self.state.has_content() && !self.underlines_disabled => placement,
            _ => {
                self.deactivate();
                return false;
            }
        };
        let list = self.draw_list(placement);
        self.surface
            .show(placement.frame, placement.screen_height, &list);
        if self.surface.is_visible() {
            self.hover.start();
        }
        self.surface.is_visible()
    }

    fn redraw(&mut self) {
        if let Some(placement) = self.placement {
            let list = self.draw_list(placement);
            self.surface.redraw(&list);
        }
    }

    fn deactivate(&mut self) {
        let was_hovering = self.hover.stop();
        if was_hovering {
            let _ = self.events.send(OverlayEvent::HoverEnded);
        }
        self.surface.hide();
    }

    fn draw_list(&self, placement: Placement) -> DrawList {
        let style = RenderStyle {
            underline_thickness: self.preferences.underline_thickness,
            hover_tint: self.preferences.hover_tint,
            locked_tint: self.preferences.locked_tint,
        };
        let debug = self.debug_outlines(placement);
        let size = (
            placement.frame.width.max(0.0).ceil() as u32,
            placement.frame.height.max(0.0).ceil() as u32,
        );
        build_draw_list(&self.state.snapshot(), size, &style, &debug)
    }

    fn debug_outlines(&self, placement: Placement) -> Vec<DebugOutline> {
        let toggles = self.preferences.debug;
        if !toggles.any() {
            return Vec::new();
        }
        let local = |rect: ScreenRect| CoordinateConverter::to_overlay_local(rect, placement.frame);
        let displays = self.displays.displays();
        let mut outlines = Vec::new();
        for diagnostics in &self.diagnostics {
            if toggles.show_raw_bounds {
                let raw = diagnostics
                    .raw
                    .and_then(|raw| CoordinateConverter::window_manager_to_canonical(raw, &displays));
                if let Some(canonical) = raw {
                    outlines.push(DebugOutline {
                        rect: local(canonical),
                        kind: DebugOutlineKind::Raw,
                    });
                }
            }
            if toggles.show_validated_bounds {
                if let Some(validated) = diagnostics.validated {
                    outlines.push(DebugOutline {
                        rect: local(validated),
                        kind: DebugOutlineKind::Validated,
                    });
                }
            }
            if toggles.show_converted_bounds {
                if let Some(converted) = diagnostics.converted {
                    outlines.push(DebugOutline {
                        rect: local(converted),
                        kind: DebugOutlineKind::Converted,
                    });
                }
            }
        }
        outlines
    }
}

impl Drop for ErrorOverlay {
    fn drop(&mut self) {
        self.deactivate();
    }
}

fn full_text<'a>(element: &MonitoredElement<'a>, source_text: &'a str) -> &'a str {
    if source_text.is_empty() {
        element.text.unwrap_or(source_text)
    } else {
        source_text
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorOverlay, OverlayDeps, UpdateContext};
    use crate::geometry::{Display, Point, ScreenRect};
    use crate::model::{ErrorRange, MonitoredElement, ReadabilityRange, StyleSuggestion};
    use crate::overlay::hover::{MockPointerHook, MockPointerHookHandle, PointerEvent};
    use crate::overlay::messages::OverlayEvent;
    use crate::overlay::render::DrawCommand;
    use crate::overlay::surface::{RecordingSurface, SurfaceCall};
    use crate::platform::fake::{FakeDisplays, FakeElement, FakeInventory, FixedCursor};
    use crate::platform::WindowInfo;
    use crate::resolver::ParserRegistry;
    use crate::settings::Preferences;
    use std::sync::mpsc::{channel, Receiver};
    use std::sync::Arc;

    struct Harness {
        overlay: ErrorOverlay,
        surface: RecordingSurface,
        hook: MockPointerHookHandle,
        events: Receiver<OverlayEvent>,
    }

    fn harness(preferences: Preferences) -> Harness {
        harness_on(preferences, FakeDisplays::single(1440.0, 900.0))
    }

    fn harness_on(preferences: Preferences, displays: FakeDisplays) -> Harness {
        let surface = RecordingSurface::new();
        let (hook, handle) = MockPointerHook::new();
        let (tx, rx) = channel();
        let deps = OverlayDeps {
            surface: Box::new(surface.clone()),
            hook: Box::new(hook),
            inventory: Arc::new(FakeInventory::new(vec![WindowInfo {
                frame: ScreenRect::window_manager(50.0, 50.0, 900.0, 500.0),
                pid: 42,
                layer: 0,
                title: "Editor".to_string(),
            }])),
            displays: Arc::new(displays),
            cursor: Arc::new(FixedCursor::new(None)),
            parsers: Arc::new(ParserRegistry::with_builtin()),
        };
        Harness {
            overlay: ErrorOverlay::new(preferences, deps, tx),
            surface,
            hook: handle,
            events: rx,
        }
    }

    fn element() -> FakeElement {
        FakeElement::new(Some(ScreenRect::window_manager(100.0, 100.0, 400.0, 40.0)))
            .with_range(0, 3, ScreenRect::window_manager(104.0, 106.0, 27.0, 18.0))
            .with_range(8, 12, ScreenRect::window_manager(176.0, 106.0, 36.0, 18.0))
    }

    const TEXT: &str = "Teh cat wnet home";

    #[test]
    fn update_shows_surface_and_installs_hook() {
        let mut h = harness(Preferences::default());
        let element = element();
        let monitored = MonitoredElement::new(&element, 42);
        let summary = h.overlay.update(
            &[ErrorRange::new(0, 3, "Spelling"), ErrorRange::new(8, 12, "Spelling")],
            &[],
            &monitored,
            &UpdateContext::for_app("notepad.exe"),
            TEXT,
        );
        assert_eq!(summary.annotations, 2);
        assert!(summary.visible);
        assert!(h.hook.is_installed());
        assert_eq!(
            h.overlay.window_frame(),
            Some(ScreenRect::window_manager(50.0, 50.0, 900.0, 500.0))
        );
        // Draw rect for 0..3: 6 below the element top, 4 right of its left edge.
        let snapshot = h.overlay.snapshot();
        assert_eq!(
            snapshot.grammar[0].draw_bounds,
            ScreenRect::local(4.0, 6.0, 27.0, 18.0)
        );
        assert_eq!(h.surface.count(&SurfaceCall::Show), 1);
    }

    #[test]
    fn empty_update_hides_and_uninstalls() {
        let mut h = harness(Preferences::default());
        let element = element();
        let monitored = MonitoredElement::new(&element, 42);
        let ctx = UpdateContext::default();
        h.overlay
            .update(&[ErrorRange::new(0, 3, "Spelling")], &[], &monitored, &ctx, TEXT);
        let summary = h.overlay.update(&[], &[], &monitored, &ctx, TEXT);
        assert!(!summary.visible);
        assert!(!h.overlay.is_visible());
        assert_eq!(h.hook.install_count(), 1);
        assert_eq!(h.hook.uninstall_count(), 1);
    }

    #[test]
    fn hover_and_click_events_reach_the_owner() {
        let mut preferences = Preferences::default();
        preferences.click_through = false;
        let mut h = harness(preferences);
        let element = element();
        let monitored = MonitoredElement::new(&element, 42);
        h.overlay.update(
            &[ErrorRange::new(8, 12, "Grammar")],
            &[],
            &monitored,
            &UpdateContext::default(),
            TEXT,
        );

        assert!(h.hook.emit(PointerEvent::Moved(Point::new(190.0, 115.0))));
        h.overlay.pump_pointer_events();
        match h.events.try_recv().expect("hover began") {
            OverlayEvent::HoverBegan { index, anchor, .. } => {
                assert_eq!(index, 0);
                // Center of (176,106,36,18) flipped on a 900 display.
                assert_eq!(anchor, Point::new(194.0, 785.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.overlay.snapshot().hovered_grammar_idx, Some(0));

        h.surface.click(Point::new(190.0, 115.0));
        h.overlay.pump_pointer_events();
        assert!(matches!(
            h.events.try_recv(),
            Ok(OverlayEvent::Clicked { index: 0, .. })
        ));

        h.overlay.hide();
        assert_eq!(h.events.try_recv(), Ok(OverlayEvent::HoverEnded));
        h.overlay.hide();
        assert!(h.events.try_recv().is_err());
    }

    #[test]
    fn hover_follows_its_error_across_a_rebuild() {
        let mut h = harness(Preferences::default());
        let element = element();
        let monitored = MonitoredElement::new(&element, 42);
        let ctx = UpdateContext::default();
        h.overlay.update(
            &[ErrorRange::new(0, 3, "Spelling"), ErrorRange::new(8, 12, "Spelling")],
            &[],
            &monitored,
            &ctx,
            TEXT,
        );
        h.hook.emit(PointerEvent::Moved(Point::new(190.0, 115.0)));
        h.overlay.pump_pointer_events();
        assert_eq!(h.overlay.snapshot().hovered_grammar_idx, Some(1));

        // "Teh" was fixed; "wnet" is now the only error.
        h.overlay
            .update(&[ErrorRange::new(8, 12, "Spelling")], &[], &monitored, &ctx, TEXT);
        h.hook.emit(PointerEvent::Moved(Point::new(191.0, 115.0)));
        h.overlay.pump_pointer_events();
        assert_eq!(h.overlay.snapshot().hovered_grammar_idx, Some(0));

        let began = h
            .events
            .try_iter()
            .filter(|event| matches!(event, OverlayEvent::HoverBegan { .. }))
            .count();
        assert_eq!(began, 1);
    }

    #[test]
    fn readability_is_independent_of_grammar_updates() {
        let mut h = harness(Preferences::default());
        let element = element().with_range(4, 17, ScreenRect::window_manager(140.0, 106.0, 120.0, 18.0));
        let monitored = MonitoredElement::new(&element, 42);
        let ctx = UpdateContext::default();
        h.overlay.update_readability(
            &[ReadabilityRange {
                start: 4,
                end: 17,
                score: 12.5,
                label: "Hard to read".to_string(),
            }],
            &monitored,
            &ctx,
            TEXT,
        );
        h.overlay.update(
            &[ErrorRange::new(0, 3, "Spelling")],
            &[StyleSuggestion {
                start: 8,
                end: 12,
                original: "wnet".to_string(),
                suggested: "went".to_string(),
                explanation: String::new(),
                confidence: 0.9,
            }],
            &monitored,
            &ctx,
            TEXT,
        );
        let snapshot = h.overlay.snapshot();
        assert_eq!(snapshot.grammar.len(), 1);
        assert_eq!(snapshot.style.len(), 1);
        assert_eq!(snapshot.readability.len(), 1);

        h.overlay.clear_grammar();
        let snapshot = h.overlay.snapshot();
        assert!(snapshot.grammar.is_empty() && snapshot.style.is_empty());
        assert_eq!(snapshot.readability.len(), 1);
        assert!(h.overlay.is_visible());

        h.overlay.clear_readability();
        assert!(!h.overlay.is_visible());
    }

    #[test]
    fn terminal_hosts_keep_annotations_but_stay_hidden() {
        let mut h = harness(Preferences::default());
        let element = element();
        let monitored = MonitoredElement::new(&element, 42);
        let summary = h.overlay.update(
            &[ErrorRange::new(0, 3, "Spelling")],
            &[],
            &monitored,
            &UpdateContext::for_app("WindowsTerminal.exe"),
            TEXT,
        );
        assert_eq!(summary.annotations, 1);
        assert!(!summary.visible);
        assert!(!h.hook.is_installed());
    }

    #[test]
    fn terminal_hosts_stay_hidden_when_readability_arrives_first() {
        let mut h = harness(Preferences::default());
        let element =
            element().with_range(4, 17, ScreenRect::window_manager(140.0, 106.0, 120.0, 18.0));
        let monitored = MonitoredElement::new(&element, 42);
        let summary = h.overlay.update_readability(
            &[ReadabilityRange {
                start: 4,
                end: 17,
                score: 12.5,
                label: "Hard to read".to_string(),
            }],
            &monitored,
            &UpdateContext::for_app("WindowsTerminal.exe"),
            TEXT,
        );
        assert_eq!(summary.annotations, 1);
        assert!(!summary.visible);
        assert!(!h.overlay.is_visible());
        assert!(!h.hook.is_installed());
        assert_eq!(h.overlay.snapshot().readability.len(), 1);
    }

    #[test]
    fn lock_highlight_is_bounded_by_grammar_list() {
        let mut h = harness(Preferences::default());
        let element = element();
        let monitored = MonitoredElement::new(&element, 42);
        h.overlay.update(
            &[ErrorRange::new(0, 3, "Spelling")],
            &[],
            &monitored,
            &UpdateContext::default(),
            TEXT,
        );
        assert!(!h.overlay.lock_highlight(1));
        assert!(h.overlay.lock_highlight(0));
        assert_eq!(h.overlay.snapshot().locked_highlight_idx, Some(0));
        h.overlay.unlock_highlight();
        assert_eq!(h.overlay.snapshot().locked_highlight_idx, None);
    }

    #[test]
    fn debug_outlines_are_drawn_when_enabled() {
        let mut preferences = Preferences::default();
        preferences.debug.show_raw_bounds = true;
        preferences.debug.show_converted_bounds = true;
        let mut h = harness(preferences);
        let element = element();
        let monitored = MonitoredElement::new(&element, 42);
        h.overlay.update(
            &[ErrorRange::new(0, 3, "Spelling")],
            &[],
            &monitored,
            &UpdateContext::default(),
            TEXT,
        );
        let list = h.surface.last_list().expect("presented");
        // One underline plus raw and converted outlines.
        assert_eq!(list.commands.len(), 3);
        assert_eq!((list.width, list.height), (400, 40));
    }

    #[test]
    fn raw_outline_flips_on_the_display_under_the_range() {
        let mut preferences = Preferences::default();
        preferences.debug.show_raw_bounds = true;
        preferences.debug.show_converted_bounds = true;
        // The element straddles into the taller display; its first word does not.
        let displays = FakeDisplays::new(vec![
            Display::new(ScreenRect::canonical(0.0, 0.0, 1440.0, 900.0), true),
            Display::new(ScreenRect::canonical(1440.0, 0.0, 1920.0, 1200.0), false),
        ]);
        let mut h = harness_on(preferences, displays);
        let element = FakeElement::new(Some(ScreenRect::window_manager(1300.0, 100.0, 300.0, 40.0)))
            .with_range(0, 3, ScreenRect::window_manager(1304.0, 106.0, 27.0, 18.0));
        let monitored = MonitoredElement::new(&element, 42);
        h.overlay.update(
            &[ErrorRange::new(0, 3, "Spelling")],
            &[],
            &monitored,
            &UpdateContext::default(),
            TEXT,
        );

        let list = h.surface.last_list().expect("presented");
        let outlines: Vec<ScreenRect> = list
            .commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Outline { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect();
        assert_eq!(outlines.len(), 2);
        assert_eq!(outlines[0], outlines[1]);
    }
}
