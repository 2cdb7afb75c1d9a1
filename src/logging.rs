//! Subscriber setup for the overlay binary and embedders.

use crate::settings::Preferences;
use tracing_subscriber::EnvFilter;

/// Modules whose debug output explains where an underline ended up.
const GEOMETRY_TARGETS: &[&str] = &["grammar_overlay::geometry", "grammar_overlay::resolver"];

/// `RUST_LOG` is only honored when debug logging is enabled in preferences.
/// Debug outlines alone raise just the geometry modules to `debug`.
pub fn filter_for(preferences: &Preferences) -> EnvFilter {
    if preferences.debug_logging {
        return EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    }

    let mut filter = EnvFilter::new("info");
    if preferences.debug.any() {
        for target in GEOMETRY_TARGETS {
            if let Ok(directive) = format!("{target}=debug").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

pub fn init(preferences: &Preferences) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(preferences))
        .with_target(preferences.debug.any())
        .try_init();
}
