use grammar_overlay::model::{ErrorRange, ReadabilityRange, StyleSuggestion};
use serde::Deserialize;
use std::path::Path;

/// Engine output replayed onto whatever text control has focus.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CheckResults {
    errors: Vec<ErrorRange>,
    style: Vec<StyleSuggestion>,
    readability: Vec<ReadabilityRange>,
}

fn load_results(path: &Path) -> anyhow::Result<CheckResults> {
    use anyhow::Context;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read check results {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("deserialize check results {}", path.display()))
}

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use grammar_overlay::indicator::{IndicatorPositioner, IndicatorStore};
    use grammar_overlay::model::{AnnotationKind, MonitoredElement};
    use grammar_overlay::overlay::{
        DefaultPointerHook, ErrorOverlay, LayeredSurface, OverlayDeps, OverlayEvent,
        UpdateContext,
    };
    use grammar_overlay::platform::win32::UiaElement;
    use grammar_overlay::platform::{
        DisplayProvider, SystemCursor, SystemDisplays, SystemWindowInventory,
    };
    use grammar_overlay::resolver::ParserRegistry;
    use grammar_overlay::{logging, settings};
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing::{debug, info, warn};

    let preferences = settings::load().unwrap_or_default();
    logging::init(&preferences);

    let results_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "check_results.json".to_string());
    let results = load_results(Path::new(&results_path))?;
    info!(
        errors = results.errors.len(),
        style = results.style.len(),
        readability = results.readability.len(),
        "loaded check results"
    );

    let displays = Arc::new(SystemDisplays);
    let (events_tx, events_rx) = channel();
    let deps = OverlayDeps {
        surface: Box::new(LayeredSurface::new(preferences.click_through)?),
        hook: Box::new(DefaultPointerHook::default()),
        inventory: Arc::new(SystemWindowInventory),
        displays: displays.clone(),
        cursor: Arc::new(SystemCursor),
        parsers: Arc::new(ParserRegistry::with_builtin()),
    };
    let mut overlay = ErrorOverlay::new(preferences.clone(), deps, events_tx);
    let store = IndicatorStore::load().unwrap_or_else(|err| {
        warn!(?err, "indicator positions unavailable; using presets");
        IndicatorStore::in_memory()
    });
    let mut indicator =
        IndicatorPositioner::new(preferences.indicator_position, Default::default(), store);

    loop {
        match UiaElement::focused() {
            Ok(focused) => {
                let text = focused.text().unwrap_or_default();
                let app = focused.app_id();
                let element = MonitoredElement::new(&focused, focused.pid()).with_text(&text);
                let context = UpdateContext { app: app.clone() };

                let summary =
                    overlay.update(&results.errors, &results.style, &element, &context, &text);
                if !summary.refused && !results.readability.is_empty() {
                    overlay.update_readability(&results.readability, &element, &context, &text);
                }

                indicator.set_count(overlay.snapshot().total());
                let state =
                    indicator.place(app.as_ref(), overlay.window_frame(), &displays.displays());
                debug!(?state, "indicator placed");
            }
            Err(err) => {
                debug!(?err, "no focused element");
                overlay.hide();
            }
        }

        let deadline = std::time::Instant::now() + Duration::from_millis(500);
        while std::time::Instant::now() < deadline {
            overlay.pump_pointer_events();
            while let Ok(event) = events_rx.try_recv() {
                match event {
                    OverlayEvent::HoverBegan { annotation, anchor, .. } => {
                        info!(message = %annotation.source.message(), x = anchor.x, y = anchor.y, "hover")
                    }
                    OverlayEvent::HoverEnded => debug!("hover ended"),
                    OverlayEvent::Clicked {
                        kind: AnnotationKind::Grammar,
                        index,
                        ..
                    } => {
                        overlay.lock_highlight(index);
                    }
                    OverlayEvent::Clicked { .. } => {}
                }
            }
            std::thread::sleep(Duration::from_millis(16));
        }
    }
}

#[cfg(not(windows))]
fn main() -> anyhow::Result<()> {
    let preferences = grammar_overlay::settings::load().unwrap_or_default();
    grammar_overlay::logging::init(&preferences);

    if let Some(path) = std::env::args().nth(1) {
        let results = load_results(Path::new(&path))?;
        tracing::info!(
            errors = results.errors.len(),
            style = results.style.len(),
            readability = results.readability.len(),
            "loaded check results"
        );
    }
    tracing::warn!("the overlay requires Windows UI Automation; nothing to show");
    Ok(())
}
