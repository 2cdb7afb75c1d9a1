use grammar_overlay::geometry::{
    BoundsValidator, Display, Point, ScreenRect, ValidationThresholds,
};
use grammar_overlay::model::{AppId, ErrorRange, MonitoredElement};
use grammar_overlay::overlay::{
    ErrorOverlay, MockPointerHook, OverlayDeps, RecordingSurface, SurfaceCall, UpdateContext,
};
use grammar_overlay::platform::fake::{FakeDisplays, FakeElement, FakeInventory, FixedCursor};
use grammar_overlay::platform::WindowInfo;
use grammar_overlay::resolver::{
    AdjustRequest, BoundsAdjustment, BoundsEstimate, ContentParser, FallbackMetrics,
    ParserRegistry, PositionResolver, ResolveContext, ResolveOutcome, Strategy,
};
use grammar_overlay::settings::Preferences;
use std::sync::mpsc::channel;
use std::sync::Arc;

const TEXT: &str = "Teh cat wnet home";

fn displays() -> Vec<Display> {
    vec![Display::new(ScreenRect::canonical(0.0, 0.0, 1440.0, 900.0), true)]
}

fn element_frame() -> ScreenRect {
    ScreenRect::window_manager(100.0, 100.0, 400.0, 40.0)
}

fn resolver(parsers: ParserRegistry) -> PositionResolver {
    let validator = BoundsValidator::new(ValidationThresholds::default())
        .with_denylist(parsers.untrusted_apps());
    PositionResolver::new(
        validator,
        FallbackMetrics::default(),
        Arc::new(parsers),
        Arc::new(FixedCursor::new(Some(Point::new(700.0, 450.0)))),
    )
}

/// Host with a fixed, known layout.
struct ColumnParser;

impl ContentParser for ColumnParser {
    fn parser_name(&self) -> &str {
        "column"
    }

    fn adjust_bounds(&self, request: &AdjustRequest<'_>) -> BoundsAdjustment {
        BoundsAdjustment::Estimate(BoundsEstimate {
            offset: request.text_before_on_line.chars().count() as f64 * 10.0,
            width: request.error_text.chars().count() as f64 * 10.0,
            confidence: 0.8,
            note: "fixed columns".to_string(),
        })
    }
}

#[test]
fn estimation_wins_over_implausible_range_query() {
    let mut parsers = ParserRegistry::new();
    parsers.register(AppId::new("column.exe"), Arc::new(ColumnParser));
    let resolver = resolver(parsers);

    // A scrollback-sized rectangle reported for a four-letter word.
    let element = FakeElement::new(Some(element_frame()))
        .with_any_range(ScreenRect::window_manager(100.0, 100.0, 400.0, 800.0));
    let monitored = MonitoredElement::new(&element, 42);
    let app = AppId::new("column.exe");
    let displays = displays();
    let ctx = ResolveContext {
        element: &monitored,
        full_text: TEXT,
        app: Some(&app),
        displays: &displays,
    };

    let ResolveOutcome::Resolved(result) = resolver.resolve(&ErrorRange::new(8, 12, "Spelling"), &ctx)
    else {
        panic!("expected a position");
    };
    assert_eq!(result.strategy, Strategy::AppEstimation);
    assert_eq!(result.confidence, 0.8);
    assert!(result
        .rect
        .approx_eq(&ScreenRect::canonical(180.0, 782.0, 40.0, 18.0), 1e-9));
    assert!(result.diagnostics.raw.is_some());
}

#[test]
fn browser_geometry_is_never_trusted() {
    let resolver = resolver(ParserRegistry::with_builtin());
    let element = FakeElement::new(Some(element_frame()))
        .with_range(8, 12, ScreenRect::window_manager(176.0, 106.0, 36.0, 18.0));
    let monitored = MonitoredElement::new(&element, 42);
    let app = AppId::new("chrome.exe");
    let displays = displays();
    let ctx = ResolveContext {
        element: &monitored,
        full_text: TEXT,
        app: Some(&app),
        displays: &displays,
    };

    let ResolveOutcome::Resolved(result) = resolver.resolve(&ErrorRange::new(8, 12, "Spelling"), &ctx)
    else {
        panic!("expected a position");
    };
    assert_eq!(result.strategy, Strategy::AppEstimation);
    assert_eq!(result.confidence, 0.8);
    // "Teh cat " measures 3.66em and "wnet" 2.25em at 14px, after 8px padding.
    assert!(result.rect.approx_eq(
        &ScreenRect::canonical(100.0 + 8.0 + 3.66 * 14.0, 782.0, 2.25 * 14.0, 18.0),
        1e-6
    ));
}

#[test]
fn parser_refusal_mid_batch_suppresses_everything() {
    let surface = RecordingSurface::new();
    let (hook, hook_handle) = MockPointerHook::new();
    let (tx, _rx) = channel();
    let deps = OverlayDeps {
        surface: Box::new(surface.clone()),
        hook: Box::new(hook),
        inventory: Arc::new(FakeInventory::new(vec![WindowInfo {
            frame: ScreenRect::window_manager(50.0, 50.0, 900.0, 500.0),
            pid: 42,
            layer: 0,
            title: "Slack".to_string(),
        }])),
        displays: Arc::new(FakeDisplays::single(1440.0, 900.0)),
        cursor: Arc::new(FixedCursor::new(None)),
        parsers: Arc::new(ParserRegistry::with_builtin()),
    };
    let mut overlay = ErrorOverlay::new(Preferences::default(), deps, tx);

    let text = "Teh cat wnet home and then the quick brown fox jumped over the lazy dog agian";
    let late = text.find("agian").expect("typo present");
    let element = FakeElement::new(Some(element_frame()));
    let monitored = MonitoredElement::new(&element, 42).with_text(text);
    let errors = [
        ErrorRange::new(0, 3, "Spelling"),
        ErrorRange::new(8, 12, "Spelling"),
        ErrorRange::new(late, late + 5, "Spelling"),
    ];

    let shown = overlay.update(
        &errors[..2],
        &[],
        &monitored,
        &UpdateContext::for_app("slack.exe"),
        text,
    );
    assert_eq!(shown.annotations, 2);
    assert!(overlay.is_visible());

    let summary = overlay.update(
        &errors,
        &[],
        &monitored,
        &UpdateContext::for_app("slack.exe"),
        text,
    );
    assert!(summary.refused);
    assert_eq!(summary.annotations, 0);
    assert!(!overlay.snapshot().has_content());
    assert!(!overlay.is_visible());
    assert_eq!(surface.count(&SurfaceCall::Hide), 1);
    assert!(!hook_handle.is_installed());
}
