//! Strategy chain that places an error range on screen.
//!
//! Strategies run in order and the first usable result wins:
//! parser override, range query, app-specific estimation, fixed-width
//! fallback, cursor-proximity fallback.

pub mod parsers;
pub mod text;

pub use parsers::{
    AdjustRequest, BoundsAdjustment, BoundsEstimate, ContentParser, GenericParser,
    ParserRegistry, ProportionalParser, TerminalParser,
};
pub use text::{char_slice, line_context, LineContext};

use crate::error::OverlayError;
use crate::geometry::{
    BoundsValidator, CoordinateConverter, CoordinateSpace, Display, ScreenRect,
};
use crate::model::{AppId, ErrorRange, MonitoredElement};
use crate::platform::CursorProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Results at or above this confidence are usable.
pub const USABLE_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ParserOverride,
    RangeQuery,
    AppEstimation,
    FixedWidth,
    CursorProximity,
}

/// Intermediate rectangles kept for the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundsDiagnostics {
    /// As reported by the accessibility API, window-manager space.
    pub raw: Option<ScreenRect>,
    /// Canonical rectangle that passed validation, if any.
    pub validated: Option<ScreenRect>,
    /// Canonical rectangle the chosen strategy produced.
    pub converted: Option<ScreenRect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionResult {
    /// Canonical space.
    pub rect: ScreenRect,
    pub strategy: Strategy,
    pub confidence: f64,
    pub diagnostics: BoundsDiagnostics,
}

impl PositionResult {
    pub fn new(rect: ScreenRect, strategy: Strategy, confidence: f64) -> Self {
        Self {
            rect,
            strategy,
            confidence: confidence.clamp(0.0, 1.0),
            diagnostics: BoundsDiagnostics {
                converted: Some(rect),
                ..BoundsDiagnostics::default()
            },
        }
    }

    pub fn is_usable(&self) -> bool {
        self.confidence >= USABLE_CONFIDENCE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Resolved(PositionResult),
    /// Every strategy came up empty for this range.
    Unresolved,
    /// The app's parser refused; nothing from this update may be shown.
    Refused(OverlayError),
}

/// Metrics used when the host gives no usable geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackMetrics {
    pub average_glyph_width: f64,
    pub line_height: f64,
    pub fixed_width_confidence: f64,
    pub cursor_confidence: f64,
    pub synthetic_element_width: f64,
    pub synthetic_element_height: f64,
    pub min_confidence: f64,
}

impl Default for FallbackMetrics {
    fn default() -> Self {
        Self {
            average_glyph_width: 9.0,
            line_height: 18.0,
            fixed_width_confidence: USABLE_CONFIDENCE,
            cursor_confidence: USABLE_CONFIDENCE,
            synthetic_element_width: 400.0,
            synthetic_element_height: 40.0,
            min_confidence: USABLE_CONFIDENCE,
        }
    }
}

/// Everything the chain needs to know about the current update.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub element: &'a MonitoredElement<'a>,
    pub full_text: &'a str,
    pub app: Option<&'a AppId>,
    /// Canonical display frames.
    pub displays: &'a [Display],
}

pub struct PositionResolver {
    validator: BoundsValidator,
    metrics: FallbackMetrics,
    parsers: Arc<ParserRegistry>,
    cursor: Arc<dyn CursorProvider>,
}

impl PositionResolver {
    pub fn new(
        validator: BoundsValidator,
        metrics: FallbackMetrics,
        parsers: Arc<ParserRegistry>,
        cursor: Arc<dyn CursorProvider>,
    ) -> Self {
        Self {
            validator,
            metrics,
            parsers,
            cursor,
        }
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    pub fn metrics(&self) -> &FallbackMetrics {
        &self.metrics
    }

    /// Element frame in window-manager space, or a synthetic frame centered
    /// on the pointer when the host cannot report one.
    pub fn element_frame(&self, element: &MonitoredElement<'_>) -> Option<(ScreenRect, bool)> {
        if let Some(frame) = element.handle.frame().filter(|f| f.is_well_formed()) {
            return Some((frame, false));
        }
        let pointer = self.cursor.cursor_position()?;
        Some((
            ScreenRect::centered_on(
                CoordinateSpace::WindowManager,
                pointer,
                self.metrics.synthetic_element_width,
                self.metrics.synthetic_element_height,
            ),
            true,
        ))
    }

    pub fn resolve(&self, error: &ErrorRange, ctx: &ResolveContext<'_>) -> ResolveOutcome {
        if error.is_empty() {
            debug!(start = error.start, end = error.end, "skipping empty error range");
            return ResolveOutcome::Unresolved;
        }
        let parser = self.parsers.parser_for(ctx.app);

        if let Some(result) = parser.resolve_position(error.range(), ctx.element, ctx.full_text) {
            if result.confidence >= self.metrics.min_confidence {
                return ResolveOutcome::Resolved(result);
            }
            debug!(
                parser = parser.parser_name(),
                confidence = result.confidence,
                "parser override below confidence threshold"
            );
        }

        let mut diagnostics = BoundsDiagnostics::default();
        match self.range_query(error, ctx, &mut diagnostics) {
            Ok(rect) => {
                let mut result = PositionResult::new(rect, Strategy::RangeQuery, 1.0);
                result.diagnostics.raw = diagnostics.raw;
                result.diagnostics.validated = Some(rect);
                return ResolveOutcome::Resolved(result);
            }
            Err(err) => debug!(%err, "range query unusable; advancing strategy chain"),
        }

        // Estimation and fixed width both lay the error out from the text snapshot.
        let Some(line) = line_context(ctx.full_text, error.start, error.end) else {
            debug!(
                start = error.start,
                end = error.end,
                "error range outside element text"
            );
            return ResolveOutcome::Unresolved;
        };

        if let Some((frame, synthetic)) = self.element_frame(ctx.element) {
            if !synthetic {
                let request = AdjustRequest {
                    element: ctx.element,
                    range: error.range(),
                    text_before_on_line: line.text_before_on_line,
                    error_text: line.error_text,
                    full_text: ctx.full_text,
                };
                match parser.adjust_bounds(&request) {
                    BoundsAdjustment::Estimate(estimate)
                        if estimate.confidence >= self.metrics.min_confidence =>
                    {
                        let left = frame.x + parser.left_padding() + estimate.offset;
                        let top = frame.y + line.line_index as f64 * self.metrics.line_height;
                        let rect = ScreenRect::window_manager(
                            left,
                            top,
                            estimate.width,
                            self.metrics.line_height,
                        );
                        if let Some(result) = self.finish(
                            rect,
                            Strategy::AppEstimation,
                            estimate.confidence,
                            ctx,
                            diagnostics,
                        ) {
                            return ResolveOutcome::Resolved(result);
                        }
                    }
                    BoundsAdjustment::Estimate(estimate) => {
                        debug!(
                            parser = parser.parser_name(),
                            confidence = estimate.confidence,
                            note = %estimate.note,
                            "estimate below confidence threshold"
                        );
                    }
                    BoundsAdjustment::Decline => {}
                    BoundsAdjustment::Refuse { reason } => {
                        return ResolveOutcome::Refused(OverlayError::ParserRefusal {
                            parser: parser.parser_name().to_string(),
                            reason,
                        });
                    }
                }
            }

            let strategy = if synthetic {
                Strategy::CursorProximity
            } else {
                Strategy::FixedWidth
            };
            let confidence = if synthetic {
                self.metrics.cursor_confidence
            } else {
                self.metrics.fixed_width_confidence
            };
            let rect = self.fixed_width_rect(frame, parser.left_padding(), &line);
            if let Some(result) = self.finish(rect, strategy, confidence, ctx, diagnostics) {
                return ResolveOutcome::Resolved(result);
            }
        }

        debug!(
            start = error.start,
            end = error.end,
            "no strategy produced a position"
        );
        ResolveOutcome::Unresolved
    }

    fn range_query(
        &self,
        error: &ErrorRange,
        ctx: &ResolveContext<'_>,
        diagnostics: &mut BoundsDiagnostics,
    ) -> Result<ScreenRect, OverlayError> {
        let raw = ctx.element.handle.range_bounds(error.range())?;
        diagnostics.raw = Some(raw);

        let canonical = CoordinateConverter::window_manager_to_canonical(raw, ctx.displays)
            .ok_or_else(|| OverlayError::unavailable("no displays to convert against"))?;
        diagnostics.converted = Some(canonical);

        match self
            .validator
            .validate(&canonical, ctx.app, ctx.displays, Some("range query"))
        {
            Ok(()) => Ok(canonical),
            Err(reason) => {
                if canonical.width < 0.0 || canonical.height < 0.0 {
                    if let Some(repaired) =
                        self.validator
                            .repair(&canonical, ctx.app, ctx.displays, Some("range repair"))
                    {
                        return Ok(repaired);
                    }
                }
                Err(OverlayError::GeometryImplausible {
                    label: format!("range {}..{}", error.start, error.end),
                    reason,
                })
            }
        }
    }

    /// Window-manager rectangle for a monospace-ish layout inside `frame`.
    fn fixed_width_rect(&self, frame: ScreenRect, padding: f64, line: &LineContext<'_>) -> ScreenRect {
        let glyph = self.metrics.average_glyph_width;
        let column = line.text_before_on_line.chars().count() as f64;
        let length = line.error_text.chars().count().max(1) as f64;
        ScreenRect::window_manager(
            frame.x + padding + column * glyph,
            frame.y + line.line_index as f64 * self.metrics.line_height,
            length * glyph,
            self.metrics.line_height,
        )
    }

    fn finish(
        &self,
        rect_wm: ScreenRect,
        strategy: Strategy,
        confidence: f64,
        ctx: &ResolveContext<'_>,
        mut diagnostics: BoundsDiagnostics,
    ) -> Option<PositionResult> {
        let canonical = CoordinateConverter::window_manager_to_canonical(rect_wm, ctx.displays)?;
        diagnostics.converted = Some(canonical);
        let mut result = PositionResult::new(canonical, strategy, confidence);
        result.diagnostics = diagnostics;
        Some(result)
    }
}

/// Grow a draw rectangle downward so the underline and a margin are easy to target.
///
/// Operates in overlay-local space where y grows downward.
pub fn hit_rect_for(draw: ScreenRect, thickness: f64) -> ScreenRect {
    let extra = (thickness / 2.0).max(2.0) + thickness + 2.0;
    ScreenRect::new(draw.space, draw.x, draw.y, draw.width, draw.height + extra)
}

#[cfg(test)]
mod tests {
    use super::{
        hit_rect_for, FallbackMetrics, PositionResolver, ResolveContext, ResolveOutcome, Strategy,
    };
    use crate::geometry::{BoundsValidator, Display, Point, ScreenRect, ValidationThresholds};
    use crate::model::{ErrorRange, MonitoredElement};
    use crate::platform::fake::{FakeElement, FixedCursor};
    use crate::resolver::ParserRegistry;
    use std::sync::Arc;

    fn resolver(cursor: Option<Point>) -> PositionResolver {
        PositionResolver::new(
            BoundsValidator::new(ValidationThresholds::default()),
            FallbackMetrics::default(),
            Arc::new(ParserRegistry::new()),
            Arc::new(FixedCursor::new(cursor)),
        )
    }

    fn displays() -> Vec<Display> {
        vec![Display::new(ScreenRect::canonical(0.0, 0.0, 1440.0, 900.0), true)]
    }

    #[test]
    fn valid_range_query_wins_with_full_confidence() {
        let element = FakeElement::new(Some(ScreenRect::window_manager(100.0, 100.0, 400.0, 40.0)))
            .with_range(4, 7, ScreenRect::window_manager(140.0, 110.0, 27.0, 18.0));
        let monitored = MonitoredElement::new(&element, 1);
        let displays = displays();
        let ctx = ResolveContext {
            element: &monitored,
            full_text: "The cta sat",
            app: None,
            displays: &displays,
        };
        match resolver(None).resolve(&ErrorRange::new(4, 7, "Spelling"), &ctx) {
            ResolveOutcome::Resolved(result) => {
                assert_eq!(result.strategy, Strategy::RangeQuery);
                assert_eq!(result.confidence, 1.0);
                assert_eq!(result.rect, ScreenRect::canonical(140.0, 772.0, 27.0, 18.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn range_query_resolves_without_a_text_snapshot() {
        let element = FakeElement::new(Some(ScreenRect::window_manager(100.0, 100.0, 400.0, 40.0)))
            .with_range(4, 7, ScreenRect::window_manager(140.0, 110.0, 27.0, 18.0));
        let monitored = MonitoredElement::new(&element, 1);
        let displays = displays();
        let ctx = ResolveContext {
            element: &monitored,
            full_text: "",
            app: None,
            displays: &displays,
        };
        match resolver(None).resolve(&ErrorRange::new(4, 7, "Spelling"), &ctx) {
            ResolveOutcome::Resolved(result) => {
                assert_eq!(result.strategy, Strategy::RangeQuery);
                assert_eq!(result.confidence, 1.0);
                assert_eq!(result.rect, ScreenRect::canonical(140.0, 772.0, 27.0, 18.0));
            }
            other => panic!("unexpected {other:?}"),
        }

        // Without geometry or text there is nothing left to lay the error out from.
        let bare = FakeElement::new(Some(ScreenRect::window_manager(100.0, 100.0, 400.0, 40.0)));
        let monitored = MonitoredElement::new(&bare, 1);
        let ctx = ResolveContext {
            element: &monitored,
            full_text: "",
            app: None,
            displays: &displays,
        };
        assert!(matches!(
            resolver(None).resolve(&ErrorRange::new(4, 7, "Spelling"), &ctx),
            ResolveOutcome::Unresolved
        ));
    }

    #[test]
    fn falls_back_to_fixed_width_on_second_line() {
        let element =
            FakeElement::new(Some(ScreenRect::window_manager(100.0, 100.0, 400.0, 60.0)));
        let monitored = MonitoredElement::new(&element, 1);
        let displays = displays();
        let ctx = ResolveContext {
            element: &monitored,
            full_text: "line one\nab wrod",
            app: None,
            displays: &displays,
        };
        match resolver(None).resolve(&ErrorRange::new(12, 16, "Spelling"), &ctx) {
            ResolveOutcome::Resolved(result) => {
                assert_eq!(result.strategy, Strategy::FixedWidth);
                assert!(result.is_usable());
                // x = 100 + 3 * 9, y(wm) = 100 + 18, flipped on a 900 display.
                assert_eq!(result.rect, ScreenRect::canonical(127.0, 764.0, 36.0, 18.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cursor_fallback_when_element_has_no_frame() {
        let element = FakeElement::new(None);
        let monitored = MonitoredElement::new(&element, 1);
        let displays = displays();
        let ctx = ResolveContext {
            element: &monitored,
            full_text: "teh",
            app: None,
            displays: &displays,
        };
        let outcome = resolver(Some(Point::new(600.0, 300.0)))
            .resolve(&ErrorRange::new(0, 3, "Spelling"), &ctx);
        match outcome {
            ResolveOutcome::Resolved(result) => {
                assert_eq!(result.strategy, Strategy::CursorProximity);
                assert_eq!(result.rect.x, 400.0);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(
            resolver(None).resolve(&ErrorRange::new(0, 3, "Spelling"), &ctx),
            ResolveOutcome::Unresolved
        );
    }

    #[test]
    fn hit_rect_grows_downward_only() {
        let draw = ScreenRect::local(10.0, 5.0, 40.0, 18.0);
        assert_eq!(hit_rect_for(draw, 2.0), ScreenRect::local(10.0, 5.0, 40.0, 24.0));
        assert_eq!(hit_rect_for(draw, 6.0).height, 18.0 + 3.0 + 6.0 + 2.0);
    }
}
